// ==========================================
// 样品导入系统 - 样品表导入流程
// ==========================================
// 流程: 打开工作簿 → 逐表定位表头 → 字段映射 → 校验
// 多表: 第一个满足必需列的工作表胜出，后续工作表不再检查
// ==========================================

use crate::config::container_lists::{ContainerLists, ListToggles};
use crate::domain::diagnostic::ValidationReport;
use crate::domain::sample_row::SampleRow;
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, NormalizeOutcome};
use crate::importer::file_parser::SheetSet;
use crate::importer::header_locator::{HeaderLocator, LocatedTable};
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 单个工作表的映射结果
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    pub sheet_name: String,
    pub header_row: usize,
    pub outcome: NormalizeOutcome,
}

#[derive(Default)]
pub struct PuckImporter {
    locator: HeaderLocator,
}

impl PuckImporter {
    pub fn new(locator: HeaderLocator) -> Self {
        Self { locator }
    }

    #[instrument(skip(self, path), fields(file = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ImportResult<LoadedSheet> {
        let mut sheets = SheetSet::open(path)?;
        self.load_from(&mut sheets)
    }

    /// 逐表尝试表头定位
    ///
    /// # 返回
    /// - 第一个定位成功的工作表
    /// - 全部失败时: 以第一个非空工作表补空列返回（outcome.fabricated 非空），
    ///   调用方展示后再按 MissingColumnHeaders 处理
    /// - Err(EmptyWorkbook): 所有工作表均无数据
    pub fn load_from(&self, sheets: &mut SheetSet) -> ImportResult<LoadedSheet> {
        let names = sheets.sheet_names().to_vec();
        let mut fallback: Option<LocatedTable> = None;

        for sheet in &names {
            let table = match sheets.parse(sheet, 0) {
                Ok(t) => t,
                Err(ImportError::EmptySheet(_)) => {
                    debug!(sheet = %sheet, "空工作表，跳过");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.locator.locate(sheets, sheet, &table) {
                Ok(located) => {
                    info!(
                        sheet = %sheet,
                        header_row = located.table.header_row,
                        "已定位表头"
                    );
                    return Ok(Self::normalize(located));
                }
                Err(e @ ImportError::MissingColumns { .. }) => {
                    warn!(sheet = %sheet, error = %e, "工作表不满足必需列，尝试下一个");
                    if fallback.is_none() {
                        fallback = Some(LocatedTable::unlocated(table));
                    }
                }
                Err(ImportError::EmptySheet(_)) => {
                    if fallback.is_none() {
                        fallback = Some(LocatedTable::unlocated(table));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        match fallback {
            Some(located) => Ok(Self::normalize(located)),
            None => Err(ImportError::EmptyWorkbook),
        }
    }

    fn normalize(located: LocatedTable) -> LoadedSheet {
        let outcome = FieldMapper::normalize(&located);
        LoadedSheet {
            sheet_name: located.table.sheet_name,
            header_row: located.table.header_row,
            outcome,
        }
    }
}

// ==========================================
// ImportSession - 一次导入批次
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub batch_id: String,
    pub sheet_name: String,
    pub header_row: usize,
    pub rows: Vec<SampleRow>,
    /// 补空的列（非空时批次不可提交）
    pub fabricated: Vec<String>,
    pub report: ValidationReport,
    validated: bool,
}

impl ImportSession {
    pub fn new(loaded: LoadedSheet) -> Self {
        let batch_id = Uuid::new_v4().to_string();
        info!(
            batch_id = %batch_id,
            sheet = %loaded.sheet_name,
            rows = loaded.outcome.rows.len(),
            "导入批次已创建"
        );
        Self {
            batch_id,
            sheet_name: loaded.sheet_name,
            header_row: loaded.header_row,
            rows: loaded.outcome.rows,
            fabricated: loaded.outcome.fabricated,
            report: ValidationReport::new(),
            validated: false,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        PuckImporter::default().load(path).map(Self::new)
    }

    /// 缺列检查（映射完成后才报错）
    pub fn ensure_columns(&self) -> ImportResult<()> {
        if self.fabricated.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumnHeaders {
                columns: self.fabricated.clone(),
            })
        }
    }

    /// 重新校验: 先清空上次诊断，再执行全部规则（修复会保留在 rows 中）
    pub fn validate(
        &mut self,
        validator: &DqValidator,
        lists: &ContainerLists,
        toggles: &ListToggles,
    ) -> &ValidationReport {
        self.report.reset();
        self.report = validator.validate(&mut self.rows, lists, toggles);
        self.validated = true;
        &self.report
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// 可提交的行
    ///
    /// # 返回
    /// - Err(NotValidated): 尚未校验
    /// - Err(MissingColumnHeaders): 存在补空列
    /// - Err(Validation): 存在错误级诊断（消息取第一条失败规则）
    pub fn committable_rows(&self) -> ImportResult<&[SampleRow]> {
        if !self.validated {
            return Err(ImportError::NotValidated);
        }
        self.ensure_columns()?;
        if self.report.has_errors() {
            return Err(ImportError::Validation(self.report.summary()));
        }
        Ok(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn header() -> Vec<Cell> {
        ["puckName", "position", "sampleName", "model", "sequence", "proposalNum"]
            .iter()
            .map(|h| text(h))
            .collect()
    }

    fn sample(puck: &str, pos: i64, name: &str) -> Vec<Cell> {
        vec![
            text(puck),
            Cell::Int(pos),
            text(name),
            Cell::Empty,
            Cell::Empty,
            Cell::Int(301234),
        ]
    }

    fn open_toggles() -> ListToggles {
        ListToggles {
            whitelist: false,
            blacklist: false,
            etched: false,
        }
    }

    #[test]
    fn test_first_matching_sheet_wins() {
        let mut sheets = SheetSet::from_grids(
            "memory",
            vec![
                ("Empty".to_string(), vec![]),
                (
                    "Notes".to_string(),
                    vec![vec![text("comment")], vec![text("nothing here")]],
                ),
                ("Pucks".to_string(), vec![header(), sample("P1", 1, "s1")]),
                ("Later".to_string(), vec![header(), sample("P2", 1, "s2")]),
            ],
        );

        let loaded = PuckImporter::default().load_from(&mut sheets).unwrap();
        assert_eq!(loaded.sheet_name, "Pucks");
        assert!(loaded.outcome.fabricated.is_empty());
        assert_eq!(loaded.outcome.rows.len(), 1);
    }

    #[test]
    fn test_fallback_keeps_partial_table() {
        let mut sheets = SheetSet::from_grids(
            "memory",
            vec![(
                "S".to_string(),
                vec![
                    vec![text("puckName"), text("position"), text("sampleName")],
                    vec![text("P1"), Cell::Int(1), text("s1")],
                ],
            )],
        );
        let loaded = PuckImporter::default().load_from(&mut sheets).unwrap();
        assert_eq!(loaded.outcome.rows.len(), 1);
        assert_eq!(
            loaded.outcome.fabricated,
            vec!["model", "sequence", "proposalnum"]
        );

        let session = ImportSession::new(loaded);
        assert!(matches!(
            session.ensure_columns(),
            Err(ImportError::MissingColumnHeaders { .. })
        ));
    }

    #[test]
    fn test_all_empty_sheets() {
        let mut sheets =
            SheetSet::from_grids("memory", vec![("A".to_string(), vec![]), ("B".to_string(), vec![])]);
        assert!(matches!(
            PuckImporter::default().load_from(&mut sheets),
            Err(ImportError::EmptyWorkbook)
        ));
    }

    #[test]
    fn test_session_requires_validation_before_commit() {
        let mut sheets = SheetSet::from_grids(
            "memory",
            vec![(
                "S".to_string(),
                vec![header(), sample("P1", 1, "s1"), sample("P1", 1, "s2")],
            )],
        );
        let loaded = PuckImporter::default().load_from(&mut sheets).unwrap();
        let mut session = ImportSession::new(loaded);
        assert!(matches!(
            session.committable_rows(),
            Err(ImportError::NotValidated)
        ));

        let report = session.validate(
            &DqValidator::standard(),
            &ContainerLists::default(),
            &open_toggles(),
        );
        assert!(!report.valid_data());
        match session.committable_rows() {
            Err(ImportError::Validation(msg)) => {
                assert!(msg.contains("Duplicate Puck name and position combinations found"))
            }
            other => panic!("unexpected result: {:?}", other),
        }

        session.rows[1].position = Some(2);
        session.validate(
            &DqValidator::standard(),
            &ContainerLists::default(),
            &open_toggles(),
        );
        assert_eq!(session.committable_rows().unwrap().len(), 2);
    }
}
