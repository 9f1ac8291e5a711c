// ==========================================
// 样品导入系统 - 导出
// ==========================================
// 职责: 标准列顺序写回 xlsx（可带诊断底色）/ 诊断报告导出 CSV
// 空行集: 写一行空占位行，避免零行工作表
// ==========================================

use crate::domain::diagnostic::ValidationReport;
use crate::domain::sample_row::SampleRow;
use crate::domain::types::{Field, Severity};
use crate::importer::error::ImportResult;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const SAMPLE_SHEET_NAME: &str = "Pucks";

/// 空行集占位单元格（读回时视为空白）
const PLACEHOLDER: &str = " ";

/// 导出样品行（标准列顺序）
///
/// # 参数
/// - report: 提供时按诊断给单元格着色（错误红 / 警告黄）
pub fn export_samples<P: AsRef<Path>>(
    rows: &[SampleRow],
    report: Option<&ValidationReport>,
    path: P,
) -> ImportResult<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SAMPLE_SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    for field in Field::ALL {
        worksheet.write_string_with_format(0, col(field), field.header(), &header_format)?;
    }

    if rows.is_empty() {
        // 空白单元格读取时会被丢弃，占位行写单个空格
        for field in Field::ALL {
            worksheet.write_string(1, col(field), PLACEHOLDER)?;
        }
    }

    let highlights = report.map(|r| r.highlight_map()).unwrap_or_default();
    let warning = Format::new().set_background_color(Color::Yellow);
    let error = Format::new().set_background_color(Color::Red);

    for (i, row) in rows.iter().enumerate() {
        let excel_row = (i + 1) as u32;
        for field in Field::ALL {
            let format = match highlights.get(&(row.row_number, field)) {
                Some(Severity::Error) => Some(&error),
                Some(Severity::Warning) => Some(&warning),
                None => None,
            };
            write_cell(worksheet, excel_row, field, row, format)?;
        }
    }

    workbook.save(path)?;
    info!(path = %path.display(), rows = rows.len(), "样品表已导出");
    Ok(())
}

fn col(field: Field) -> u16 {
    field.column_index() as u16
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    field: Field,
    sample: &SampleRow,
    format: Option<&Format>,
) -> ImportResult<()> {
    let number = match field {
        Field::Position => Some(sample.position),
        Field::ProposalNumber => Some(sample.proposal_number),
        _ => None,
    };

    match (number, format) {
        (Some(Some(n)), Some(f)) => {
            ws.write_number_with_format(row, col(field), n as f64, f)?;
        }
        (Some(Some(n)), None) => {
            ws.write_number(row, col(field), n as f64)?;
        }
        (Some(None), Some(f)) => {
            ws.write_blank(row, col(field), f)?;
        }
        (Some(None), None) => {}
        (None, _) => {
            let value = sample.display_value(field);
            match format {
                Some(f) if value.is_empty() => {
                    ws.write_blank(row, col(field), f)?;
                }
                Some(f) => {
                    ws.write_string_with_format(row, col(field), &value, f)?;
                }
                None if !value.is_empty() => {
                    ws.write_string(row, col(field), &value)?;
                }
                None => {}
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DiagnosticRecord<'a> {
    row: usize,
    field: &'a str,
    severity: String,
    message: &'a str,
}

/// 导出诊断报告为 CSV
pub fn export_diagnostics<P: AsRef<Path>>(report: &ValidationReport, path: P) -> ImportResult<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for d in &report.diagnostics {
        writer.serialize(DiagnosticRecord {
            // 面向操作员: 表格中的数据行从 1 开始
            row: d.row_number + 1,
            field: d.field.header(),
            severity: d.severity.to_string(),
            message: &d.message,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), diagnostics = report.diagnostics.len(), "诊断报告已导出");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::Diagnostic;
    use crate::importer::file_parser::SheetSet;
    use crate::importer::puck_importer::ImportSession;
    use tempfile::TempDir;

    #[test]
    fn test_empty_export_has_placeholder_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.xlsx");
        export_samples(&[], None, &path).unwrap();

        let mut sheets = SheetSet::open(&path).unwrap();
        assert_eq!(sheets.sheet_names(), [SAMPLE_SHEET_NAME.to_string()]);
        let table = sheets.parse(SAMPLE_SHEET_NAME, 0).unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(table.rows().all(|r| r.iter().all(|c| c.is_blank())));
    }

    #[test]
    fn test_empty_export_reimports_as_empty_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.xlsx");
        export_samples(&[], None, &path).unwrap();

        let session = ImportSession::open(&path).unwrap();
        assert_eq!(session.sheet_name, SAMPLE_SHEET_NAME);
        assert!(session.fabricated.is_empty());
        assert!(session.rows.is_empty());
    }

    #[test]
    fn test_diagnostics_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagnostics.csv");
        let mut report = ValidationReport::new();
        report
            .diagnostics
            .push(Diagnostic::error(0, Field::Position, "duplicate"));
        export_diagnostics(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("row,field,severity,message"));
        assert_eq!(lines.next(), Some("1,position,ERROR,duplicate"));
    }
}
