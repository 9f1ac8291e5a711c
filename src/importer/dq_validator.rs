// ==========================================
// 样品导入系统 - 数据质量校验器
// ==========================================
// 职责: 按固定顺序执行六条规则，产出逐格诊断
// 规则: 名单 → 样品名字符集 → 空样品名 → 重复样品名
//       → 提案号 → 重复位置
// 修复: 字符集 / 重复样品名 两条规则直接改写数据（警告级）
// ==========================================

use crate::config::container_lists::{ContainerLists, ListToggles};
use crate::domain::diagnostic::{Diagnostic, RuleFailure, RuleKind, ValidationReport};
use crate::domain::sample_row::SampleRow;
use crate::domain::types::Field;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

pub const MAX_SAMPLE_NAME_LEN: usize = 25;
pub const PROPOSAL_DIGITS: usize = 6;

pub const MSG_CONTAINER_LIST: &str = "Pucks submitted do not match master list. Blacklisted pucks in red and pucks not in whitelist are yellow";
pub const MSG_SAMPLE_CHARSET: &str = "Invalid Sample names found. Only numbers, letters, dash (\"-\"), and underscore (\"_\") are allowed. Total length of sample name cannot exceed 25 Automatically changed invalid characters to underscore and highlighted in yellow";
pub const MSG_EMPTY_SAMPLE: &str = "Empty sample names found";
pub const MSG_DUPLICATE_SAMPLE: &str =
    "Duplicate sample names found. Added postfix and highlighted in yellow";
pub const MSG_PROPOSAL_NUMBER: &str = "Invalid proposal numbers";
pub const MSG_MIXED_PROPOSALS: &str = "Multiple proposal numbers found in one batch";
pub const MSG_DUPLICATE_POSITION: &str = "Duplicate Puck name and position combinations found";

/// 规则执行上下文
pub struct RuleContext<'a> {
    pub lists: &'a ContainerLists,
    pub toggles: &'a ListToggles,
}

/// 单条校验规则
///
/// 返回 None 表示通过；返回 Some(message) 表示失败
pub trait ValidationRule: Send + Sync {
    fn kind(&self) -> RuleKind;

    fn check(
        &self,
        rows: &mut [SampleRow],
        ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String>;
}

// ==========================================
// 规则 1: 容器名单
// ==========================================
pub struct ContainerListRule;

impl ValidationRule for ContainerListRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ContainerList
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let allow = ctx.lists.allow_set(ctx.toggles);
        let deny = ctx.lists.deny_set();
        let mut failed = false;

        for row in rows.iter() {
            let name = match row.container_name.as_deref() {
                Some(n) => n,
                None => continue,
            };

            if ctx.toggles.whitelist && !allow.contains(name) {
                diagnostics.push(Diagnostic::warning(
                    row.row_number,
                    Field::ContainerName,
                    format!("{} is not in the whitelist", name),
                ));
                failed = true;
            }
            // 同时命中时两条诊断都保留，严重度取高
            if ctx.toggles.blacklist && deny.contains(name) {
                diagnostics.push(Diagnostic::error(
                    row.row_number,
                    Field::ContainerName,
                    format!("{} is blacklisted", name),
                ));
                failed = true;
            }
        }

        failed.then(|| MSG_CONTAINER_LIST.to_string())
    }
}

// ==========================================
// 规则 2: 样品名字符集（自动修复）
// ==========================================
pub struct SampleCharsetRule;

fn allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// 替换非法字符为 '_' 并截断到 25 个字符
pub fn repair_sample_name(name: &str) -> String {
    name.chars()
        .map(|c| if allowed_char(c) { c } else { '_' })
        .take(MAX_SAMPLE_NAME_LEN)
        .collect()
}

pub fn is_valid_sample_name(name: &str) -> bool {
    name.chars().count() <= MAX_SAMPLE_NAME_LEN && name.chars().all(allowed_char)
}

impl ValidationRule for SampleCharsetRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SampleCharset
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        _ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let mut failed = false;

        for row in rows.iter_mut() {
            let repaired = match row.sample_name.as_deref() {
                Some(name) if !is_valid_sample_name(name) => repair_sample_name(name),
                _ => continue,
            };
            diagnostics.push(Diagnostic::warning(
                row.row_number,
                Field::SampleName,
                format!("sample name changed to {}", repaired),
            ));
            row.sample_name = Some(repaired);
            failed = true;
        }

        failed.then(|| MSG_SAMPLE_CHARSET.to_string())
    }
}

// ==========================================
// 规则 3: 空样品名
// ==========================================
pub struct EmptySampleRule;

impl ValidationRule for EmptySampleRule {
    fn kind(&self) -> RuleKind {
        RuleKind::EmptySample
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        _ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let mut failed = false;
        for row in rows.iter() {
            let blank = row
                .sample_name
                .as_deref()
                .map(|n| n.trim().is_empty())
                .unwrap_or(true);
            if blank {
                diagnostics.push(Diagnostic::error(
                    row.row_number,
                    Field::SampleName,
                    "sample name is empty",
                ));
                failed = true;
            }
        }
        failed.then(|| MSG_EMPTY_SAMPLE.to_string())
    }
}

// ==========================================
// 规则 4: 重复样品名（自动追加 _001, _002 ...）
// ==========================================
pub struct DuplicateSampleRule;

/// `base_NNN`，base 截断使总长不超过 25
pub fn suffixed_name(base: &str, counter: usize) -> String {
    let suffix = format!("_{:03}", counter);
    let keep = MAX_SAMPLE_NAME_LEN.saturating_sub(suffix.chars().count());
    let trimmed: String = base.chars().take(keep).collect();
    format!("{}{}", trimmed, suffix)
}

impl ValidationRule for DuplicateSampleRule {
    fn kind(&self) -> RuleKind {
        RuleKind::DuplicateSample
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        _ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in rows.iter() {
            if let Some(name) = row.sample_name.as_deref().filter(|n| !n.is_empty()) {
                *counts.entry(name.to_string()).or_default() += 1;
            }
        }

        // 批次内已占用的名称（含改名结果），后缀跳过已占用值
        let mut taken: HashSet<String> = counts.keys().cloned().collect();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut failed = false;
        for row in rows.iter_mut() {
            let name = match row.sample_name.as_deref().filter(|n| !n.is_empty()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            if counts.get(&name).copied().unwrap_or(0) < 2 {
                continue;
            }

            let occurrence = seen.entry(name.clone()).or_default();
            if *occurrence > 0 {
                let mut counter = *occurrence;
                let mut renamed = suffixed_name(&name, counter);
                while taken.contains(&renamed) {
                    counter += 1;
                    renamed = suffixed_name(&name, counter);
                }
                *occurrence = counter;
                taken.insert(renamed.clone());
                row.sample_name = Some(renamed);
            }
            *occurrence += 1;

            diagnostics.push(Diagnostic::warning(
                row.row_number,
                Field::SampleName,
                format!("duplicate sample name {}", name),
            ));
            failed = true;
        }

        failed.then(|| MSG_DUPLICATE_SAMPLE.to_string())
    }
}

// ==========================================
// 规则 5: 提案号（6 位数字且批次内唯一）
// ==========================================
pub struct ProposalNumberRule;

/// 仅保留数字字符
pub fn proposal_digits(value: Option<i64>) -> String {
    value
        .map(|v| v.to_string().chars().filter(|c| c.is_ascii_digit()).collect())
        .unwrap_or_default()
}

impl ValidationRule for ProposalNumberRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ProposalNumber
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        _ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let mut invalid = false;
        let mut distinct: BTreeSet<String> = BTreeSet::new();

        for row in rows.iter() {
            let digits = proposal_digits(row.proposal_number);
            if digits.len() != PROPOSAL_DIGITS {
                diagnostics.push(Diagnostic::error(
                    row.row_number,
                    Field::ProposalNumber,
                    format!("proposal number '{}' is not {} digits", digits, PROPOSAL_DIGITS),
                ));
                invalid = true;
            }
            distinct.insert(digits);
        }
        if invalid {
            return Some(MSG_PROPOSAL_NUMBER.to_string());
        }

        if distinct.len() > 1 {
            for row in rows.iter() {
                diagnostics.push(Diagnostic::error(
                    row.row_number,
                    Field::ProposalNumber,
                    "batch contains more than one proposal number",
                ));
            }
            return Some(MSG_MIXED_PROPOSALS.to_string());
        }

        None
    }
}

// ==========================================
// 规则 6: 重复 (容器名, 位置)
// ==========================================
pub struct DuplicatePositionRule;

impl ValidationRule for DuplicatePositionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::DuplicatePosition
    }

    fn check(
        &self,
        rows: &mut [SampleRow],
        _ctx: &RuleContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let mut counts: HashMap<(Option<&str>, Option<i64>), usize> = HashMap::new();
        for row in rows.iter() {
            *counts
                .entry((row.container_name.as_deref(), row.position))
                .or_default() += 1;
        }

        let duplicated: Vec<usize> = rows
            .iter()
            .filter(|row| {
                counts
                    .get(&(row.container_name.as_deref(), row.position))
                    .copied()
                    .unwrap_or(0)
                    > 1
            })
            .map(|row| row.row_number)
            .collect();

        for row_number in &duplicated {
            for field in [Field::ContainerName, Field::Position] {
                diagnostics.push(Diagnostic::error(
                    *row_number,
                    field,
                    "duplicate puck name and position",
                ));
            }
        }

        (!duplicated.is_empty()).then(|| MSG_DUPLICATE_POSITION.to_string())
    }
}

// ==========================================
// DqValidator - 规则编排
// ==========================================
pub struct DqValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for DqValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl DqValidator {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// 标准六条规则
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ContainerListRule),
            Box::new(SampleCharsetRule),
            Box::new(EmptySampleRule),
            Box::new(DuplicateSampleRule),
            Box::new(ProposalNumberRule),
            Box::new(DuplicatePositionRule),
        ])
    }

    /// 执行全部规则
    ///
    /// 所有规则都会执行（修复总会发生）；报告中 failures 按规则顺序排列，
    /// 对外展示的消息取第一条失败规则
    pub fn validate(
        &self,
        rows: &mut [SampleRow],
        lists: &ContainerLists,
        toggles: &ListToggles,
    ) -> ValidationReport {
        let ctx = RuleContext { lists, toggles };
        let mut report = ValidationReport::new();

        for rule in &self.rules {
            let before = report.diagnostics.len();
            if let Some(message) = rule.check(rows, &ctx, &mut report.diagnostics) {
                debug!(
                    rule = %rule.kind(),
                    diagnostics = report.diagnostics.len() - before,
                    "校验规则未通过"
                );
                report.failures.push(RuleFailure {
                    rule: rule.kind(),
                    message,
                });
            }
        }

        info!(
            rows = rows.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            valid = report.valid_data(),
            "校验完成"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;

    fn row(n: usize, puck: &str, pos: i64, sample: &str, proposal: i64) -> SampleRow {
        let mut r = SampleRow::new(n);
        r.container_name = Some(puck.to_string());
        r.position = Some(pos);
        r.sample_name = Some(sample.to_string());
        r.proposal_number = Some(proposal);
        r
    }

    fn open_lists() -> (ContainerLists, ListToggles) {
        (
            ContainerLists::default(),
            ListToggles {
                whitelist: false,
                blacklist: false,
                etched: false,
            },
        )
    }

    #[test]
    fn test_clean_batch_passes() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![
            row(0, "PuckA", 1, "s1", 301234),
            row(1, "PuckA", 2, "s2", 301234),
        ];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert!(report.valid_data());
        assert!(report.failures.is_empty());
        assert_eq!(report.summary(), "Validation passed");
    }

    #[test]
    fn test_duplicate_position_scenario() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "PuckA", 1, "s1", 200), row(1, "PuckA", 1, "s2", 200)];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        assert!(!report.valid_data());
        assert!(report.failed(RuleKind::DuplicatePosition));
        assert!(report
            .failures
            .iter()
            .any(|f| f.message == "Duplicate Puck name and position combinations found"));
        assert_eq!(
            report.cell_severity(1, Field::Position),
            Some(Severity::Error)
        );
        assert_eq!(
            report.cell_severity(0, Field::ContainerName),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_whitelist_miss_is_warning_only() {
        let lists = ContainerLists {
            whitelist: vec!["PuckA".to_string()],
            ..Default::default()
        };
        let toggles = ListToggles::default();
        let mut rows = vec![row(0, "PuckB", 1, "s1", 301234)];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        assert_eq!(
            report.cell_severity(0, Field::ContainerName),
            Some(Severity::Warning)
        );
        assert!(report.valid_data());
        assert_eq!(
            report.first_failure().map(|f| f.message.as_str()),
            Some(MSG_CONTAINER_LIST)
        );
    }

    #[test]
    fn test_allow_and_deny_both_recorded_deny_wins() {
        let lists = ContainerLists {
            whitelist: vec![],
            blacklist: vec!["PuckX".to_string()],
            etched: vec![],
        };
        let mut rows = vec![row(0, "PuckX", 1, "s1", 301234)];
        let report =
            DqValidator::standard().validate(&mut rows, &lists, &ListToggles::default());

        let on_cell: Vec<Severity> = report
            .diagnostics
            .iter()
            .filter(|d| d.field == Field::ContainerName)
            .map(|d| d.severity)
            .collect();
        assert_eq!(on_cell, vec![Severity::Warning, Severity::Error]);
        assert_eq!(
            report.cell_severity(0, Field::ContainerName),
            Some(Severity::Error)
        );
        assert!(!report.valid_data());
    }

    #[test]
    fn test_disabled_lists_skip_rule() {
        let lists = ContainerLists {
            whitelist: vec![],
            blacklist: vec!["PuckX".to_string()],
            etched: vec![],
        };
        let (_, toggles) = open_lists();
        let mut rows = vec![row(0, "PuckX", 1, "s1", 301234)];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert!(!report.failed(RuleKind::ContainerList));
    }

    #[test]
    fn test_charset_repair() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "bad name/with#chars_and_more_text", 301234)];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        let repaired = rows[0].sample_name.clone().unwrap();
        assert_eq!(repaired, "bad_name_with_chars_and_m");
        assert!(is_valid_sample_name(&repaired));
        assert!(report.failed(RuleKind::SampleCharset));
        assert_eq!(
            report.cell_severity(0, Field::SampleName),
            Some(Severity::Warning)
        );
        assert!(report.valid_data());
    }

    #[test]
    fn test_empty_sample_is_error() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "s1", 301234), SampleRow::new(1)];
        rows[1].container_name = Some("P".to_string());
        rows[1].position = Some(2);
        rows[1].proposal_number = Some(301234);

        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert!(report.failed(RuleKind::EmptySample));
        assert_eq!(
            report.cell_severity(1, Field::SampleName),
            Some(Severity::Error)
        );
        assert!(!report.valid_data());
    }

    #[test]
    fn test_duplicate_samples_get_suffixes() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![
            row(0, "P", 1, "lyso", 301234),
            row(1, "P", 2, "lyso", 301234),
            row(2, "P", 3, "other", 301234),
            row(3, "P", 4, "lyso", 301234),
        ];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        let names: Vec<String> = rows.iter().filter_map(|r| r.sample_name.clone()).collect();
        assert_eq!(names, vec!["lyso", "lyso_001", "other", "lyso_002"]);
        assert!(report.valid_data());
        assert_eq!(report.warning_count(), 3);
        assert_eq!(report.cell_severity(2, Field::SampleName), None);
    }

    #[test]
    fn test_suffix_skips_names_already_in_batch() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![
            row(0, "P", 1, "a", 301234),
            row(1, "P", 2, "a", 301234),
            row(2, "P", 3, "a_001", 301234),
        ];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        let names: Vec<String> = rows.iter().filter_map(|r| r.sample_name.clone()).collect();
        assert_eq!(names, vec!["a", "a_002", "a_001"]);
        assert!(report.valid_data());

        let second = DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert!(second.diagnostics.is_empty());
    }

    #[test]
    fn test_suffix_keeps_name_within_max_length() {
        let (lists, toggles) = open_lists();
        let long = "a".repeat(MAX_SAMPLE_NAME_LEN);
        let mut rows = vec![row(0, "P", 1, &long, 301234), row(1, "P", 2, &long, 301234)];
        DqValidator::standard().validate(&mut rows, &lists, &toggles);

        let renamed = rows[1].sample_name.clone().unwrap();
        assert_eq!(renamed.chars().count(), MAX_SAMPLE_NAME_LEN);
        assert!(renamed.ends_with("_001"));
        assert_ne!(renamed, long);
        assert!(is_valid_sample_name(&renamed));
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("lyso", 2), "lyso_002");
        assert_eq!(suffixed_name(&"b".repeat(30), 1).len(), MAX_SAMPLE_NAME_LEN);
        assert_eq!(suffixed_name("x", 1000), "x_1000");
    }

    #[test]
    fn test_summary_names_first_failing_rule_only() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![
            row(0, "P", 1, "", 301234),
            row(1, "P", 1, "s2", 301235),
        ];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        // 多条规则失败，全部记录
        assert!(report.failed(RuleKind::EmptySample));
        assert!(report.failed(RuleKind::ProposalNumber));
        assert!(report.failed(RuleKind::DuplicatePosition));

        let summary = report.summary();
        assert!(summary.starts_with(MSG_EMPTY_SAMPLE));
        assert!(!summary.contains(MSG_MIXED_PROPOSALS));
        assert!(!summary.contains(MSG_DUPLICATE_POSITION));
    }

    #[test]
    fn test_charset_repair_feeds_duplicate_check() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "a b", 301234), row(1, "P", 2, "a_b", 301234)];
        DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert_eq!(rows[0].sample_name.as_deref(), Some("a_b"));
        assert_eq!(rows[1].sample_name.as_deref(), Some("a_b_001"));
    }

    #[test]
    fn test_proposal_number_length() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "s1", 12345), row(1, "P", 2, "s2", 301234)];
        rows.push(SampleRow {
            proposal_number: None,
            ..row(2, "P", 3, "s3", 0)
        });
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);

        assert!(report.failed(RuleKind::ProposalNumber));
        assert_eq!(
            report.cell_severity(0, Field::ProposalNumber),
            Some(Severity::Error)
        );
        assert_eq!(report.cell_severity(1, Field::ProposalNumber), None);
        assert_eq!(
            report.cell_severity(2, Field::ProposalNumber),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_mixed_proposals_rejected() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "s1", 301234), row(1, "P", 2, "s2", 301235)];
        let report = DqValidator::standard().validate(&mut rows, &lists, &toggles);
        assert!(!report.valid_data());
        assert_eq!(
            report.first_failure().map(|f| f.message.as_str()),
            Some(MSG_MIXED_PROPOSALS)
        );
    }

    #[test]
    fn test_revalidation_is_stable() {
        let (lists, toggles) = open_lists();
        let mut rows = vec![row(0, "P", 1, "x.y", 301234), row(1, "P", 2, "x_y", 301234)];
        let validator = DqValidator::standard();
        validator.validate(&mut rows, &lists, &toggles);
        let second = validator.validate(&mut rows, &lists, &toggles);
        assert!(second.valid_data());
        assert!(second.diagnostics.is_empty());
    }
}
