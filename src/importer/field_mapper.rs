// ==========================================
// 样品导入系统 - 字段映射器
// ==========================================
// 职责: 源列 → 标准列映射 + 类型转换
// 缺列: 补空列并在映射完成后报 MissingColumnHeaders
// ==========================================

use crate::domain::sample_row::SampleRow;
use crate::domain::types::Field;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{Cell, EMPTY_CELL};
use crate::importer::header_locator::LocatedTable;
use tracing::{debug, warn};

/// 映射结果（缺列时仍保留已构建的行，供展示）
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub rows: Vec<SampleRow>,
    /// 源表中不存在、被补为空列的标准列
    pub fabricated: Vec<String>,
}

impl NormalizeOutcome {
    pub fn into_result(self) -> ImportResult<Vec<SampleRow>> {
        if self.fabricated.is_empty() {
            Ok(self.rows)
        } else {
            Err(ImportError::MissingColumnHeaders {
                columns: self.fabricated,
            })
        }
    }
}

pub struct FieldMapper;

impl FieldMapper {
    /// 将已定位表头的表格映射为标准样品行
    pub fn normalize(located: &LocatedTable) -> NormalizeOutcome {
        let fabricated: Vec<String> = Field::ALL
            .iter()
            .filter(|f| located.column(f.key()).is_none())
            .map(|f| f.key().to_string())
            .collect();
        if !fabricated.is_empty() {
            warn!(
                sheet = %located.table.sheet_name,
                columns = ?fabricated,
                "缺少列，已补空列"
            );
        }

        let columns: Vec<Option<usize>> = Field::ALL
            .iter()
            .map(|f| located.column(f.key()))
            .collect();

        let mut rows = Vec::new();
        for raw in located.table.rows() {
            let cells: Vec<&Cell> = columns
                .iter()
                .map(|c| c.and_then(|i| raw.get(i)).unwrap_or(&EMPTY_CELL))
                .collect();
            if cells.iter().all(|c| c.is_blank()) {
                continue;
            }

            let mut row = SampleRow::new(rows.len());
            row.container_name = clean_text(cells[0]);
            row.position = parse_integer(cells[1]);
            row.sample_name = clean_sample_name(cells[2]);
            row.model = clean_text(cells[3]).unwrap_or_default();
            row.sequence = clean_text(cells[4]).unwrap_or_default();
            row.proposal_number = parse_integer(cells[5]);
            rows.push(row);
        }

        debug!(
            sheet = %located.table.sheet_name,
            rows = rows.len(),
            "字段映射完成"
        );
        NormalizeOutcome { rows, fabricated }
    }
}

/// 去除全部空白（含内部空白）
pub fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn clean_text(cell: &Cell) -> Option<String> {
    cell.as_text().map(|s| strip_whitespace(&s))
}

/// 样品名额外去除句点
fn clean_sample_name(cell: &Cell) -> Option<String> {
    cell.as_text()
        .map(|s| s.chars().filter(|c| !c.is_whitespace() && *c != '.').collect())
}

/// 可空整数: 整数 / 无小数部分的浮点 / 可解析文本，其余为 None
pub fn parse_integer(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        Cell::Text(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::RawTable;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn located(header: Vec<&str>, data: Vec<Vec<Cell>>) -> LocatedTable {
        LocatedTable::unlocated(RawTable {
            sheet_name: "S".to_string(),
            header_row: 0,
            header: header.into_iter().map(text).collect(),
            data,
        })
    }

    #[test]
    fn test_normalize_full_row() {
        let table = located(
            vec!["Model", "puckName", "Position", "sampleName", "sequence", "proposalNum"],
            vec![vec![
                text("m1"),
                text(" Puck A "),
                Cell::Float(3.0),
                text("lyso.zyme 1"),
                Cell::Empty,
                text("301234"),
            ]],
        );

        let outcome = FieldMapper::normalize(&table);
        assert!(outcome.fabricated.is_empty());
        let rows = outcome.into_result().unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.container_name.as_deref(), Some("PuckA"));
        assert_eq!(row.position, Some(3));
        assert_eq!(row.sample_name.as_deref(), Some("lysozyme1"));
        assert_eq!(row.model, "m1");
        assert_eq!(row.sequence, "");
        assert_eq!(row.proposal_number, Some(301234));
    }

    #[test]
    fn test_model_and_sequence_whitespace_stripped() {
        let table = located(
            vec!["puckName", "position", "sampleName", "model", "sequence", "proposalNum"],
            vec![vec![
                text("P1"),
                Cell::Float(1.0),
                text("s1"),
                text(" apo form "),
                text("MKV LLA\nGHT"),
                text("301234"),
            ]],
        );

        let rows = FieldMapper::normalize(&table).into_result().unwrap();
        assert_eq!(rows[0].model, "apoform");
        assert_eq!(rows[0].sequence, "MKVLLAGHT");
    }

    #[test]
    fn test_non_numeric_position_is_none() {
        let table = located(
            vec!["puckName", "position", "sampleName", "model", "sequence", "proposalNum"],
            vec![vec![
                text("P1"),
                text("first"),
                text("s1"),
                Cell::Empty,
                Cell::Empty,
                Cell::Float(1.5),
            ]],
        );
        let rows = FieldMapper::normalize(&table).into_result().unwrap();
        assert_eq!(rows[0].position, None);
        assert_eq!(rows[0].proposal_number, None);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let table = located(
            vec!["puckName", "position", "sampleName", "model", "sequence", "proposalNum"],
            vec![
                vec![Cell::Empty, text("  "), Cell::Empty],
                vec![text("P1"), Cell::Int(1), text("s1")],
            ],
        );
        let rows = FieldMapper::normalize(&table).into_result().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 0);
    }

    #[test]
    fn test_fabricated_columns_reported_after_mapping() {
        let table = located(
            vec!["puckName", "position", "sampleName", "proposalNum"],
            vec![vec![text("P1"), Cell::Int(1), text("s1"), Cell::Int(301234)]],
        );
        let outcome = FieldMapper::normalize(&table);
        assert_eq!(outcome.fabricated, vec!["model", "sequence"]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].model, "");

        match outcome.into_result() {
            Err(ImportError::MissingColumnHeaders { columns }) => {
                assert_eq!(columns, vec!["model", "sequence"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
