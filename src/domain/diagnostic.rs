// ==========================================
// 样品导入系统 - 校验诊断
// ==========================================
// 职责: 单元格级诊断 (行, 字段, 级别, 消息) + 校验报告
// 说明: UI 高亮由外部消费此列表，不在本层渲染
// ==========================================

use crate::domain::types::{Field, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// Diagnostic
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub row_number: usize,
    pub field: Field,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(row_number: usize, field: Field, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(row_number: usize, field: Field, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

// ==========================================
// 校验规则种类（固定执行顺序）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    ContainerList,
    SampleCharset,
    EmptySample,
    DuplicateSample,
    ProposalNumber,
    DuplicatePosition,
}

impl RuleKind {
    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::ContainerList => "CONTAINER_LIST",
            RuleKind::SampleCharset => "SAMPLE_CHARSET",
            RuleKind::EmptySample => "EMPTY_SAMPLE",
            RuleKind::DuplicateSample => "DUPLICATE_SAMPLE",
            RuleKind::ProposalNumber => "PROPOSAL_NUMBER",
            RuleKind::DuplicatePosition => "DUPLICATE_POSITION",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 某条规则未通过
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule: RuleKind,
    pub message: String,
}

// ==========================================
// ValidationReport
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    /// 按规则顺序排列的失败项
    pub failures: Vec<RuleFailure>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空上一轮结果（重新校验前调用）
    pub fn reset(&mut self) {
        self.diagnostics.clear();
        self.failures.clear();
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 可提交: 不存在 Error 级诊断（Warning 已自动修复，不阻断）
    pub fn valid_data(&self) -> bool {
        !self.has_errors()
    }

    /// 对外展示的首条失败消息
    pub fn first_failure(&self) -> Option<&RuleFailure> {
        self.failures.first()
    }

    pub fn failed(&self, rule: RuleKind) -> bool {
        self.failures.iter().any(|f| f.rule == rule)
    }

    /// 单元格的有效级别（同一单元格同时有 Warning/Error 时取 Error）
    pub fn cell_severity(&self, row_number: usize, field: Field) -> Option<Severity> {
        self.diagnostics
            .iter()
            .filter(|d| d.row_number == row_number && d.field == field)
            .map(|d| d.severity)
            .max()
    }

    /// 高亮面: (行, 字段) → 有效级别
    pub fn highlight_map(&self) -> BTreeMap<(usize, Field), Severity> {
        let mut map: BTreeMap<(usize, Field), Severity> = BTreeMap::new();
        for d in &self.diagnostics {
            map.entry((d.row_number, d.field))
                .and_modify(|s| {
                    if d.severity > *s {
                        *s = d.severity;
                    }
                })
                .or_insert(d.severity);
        }
        map
    }

    /// 人类可读摘要
    pub fn summary(&self) -> String {
        match self.first_failure() {
            None => "Validation passed".to_string(),
            Some(first) => format!(
                "{} (errors: {}, warnings: {})",
                first.message,
                self.error_count(),
                self.warning_count()
            ),
        }
    }
}
