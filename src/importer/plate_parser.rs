// ==========================================
// 样品导入系统 - 96 孔板模板解析
// ==========================================
// 职责: 模板校验 + 按孔位行字母 (A-H) 分组 + 样品名重复检查
// 模板: 至少 99 行数据，最后一行 Notes = "lix template"
// ==========================================

use crate::domain::diagnostic::Diagnostic;
use crate::domain::sample_row::PlateWell;
use crate::domain::types::Field;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{Cell, RawTable, SheetSet, EMPTY_CELL};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const WELL_ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const TEMPLATE_MIN_ROWS: usize = 99;
pub const TEMPLATE_MARKER: &str = "lix template";

const SAMPLE: &str = "sample";
const BUFFER: &str = "buffer";
const WELL: &str = "well";
const VOLUME: &str = "volume(ul)";
const STOCK: &str = "stock";
const NOTES: &str = "notes";

/// 同一孔位行字母下的样品
#[derive(Debug, Clone, PartialEq)]
pub struct PlateGroup {
    pub letter: char,
    pub wells: Vec<PlateWell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlateLayout {
    pub sheet_name: String,
    pub groups: Vec<PlateGroup>,
    /// 板内重复样品名（错误级）
    pub diagnostics: Vec<Diagnostic>,
}

impl PlateLayout {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn well_count(&self) -> usize {
        self.groups.iter().map(|g| g.wells.len()).sum()
    }
}

pub struct PlateParser;

impl PlateParser {
    /// 解析全部非空工作表，每个工作表为一块板
    pub fn parse(sheets: &mut SheetSet) -> ImportResult<Vec<PlateLayout>> {
        let names = sheets.sheet_names().to_vec();
        let mut plates = Vec::new();

        for sheet in &names {
            let table = match sheets.parse(sheet, 0) {
                Ok(t) => t,
                Err(ImportError::EmptySheet(_)) => continue,
                Err(e) => return Err(e),
            };
            plates.push(Self::layout_of(&table)?);
        }

        if plates.is_empty() {
            return Err(ImportError::EmptyWorkbook);
        }
        info!(file = %sheets.source(), plates = plates.len(), "孔板表解析完成");
        Ok(plates)
    }

    pub fn layout_of(table: &RawTable) -> ImportResult<PlateLayout> {
        let index = table.column_index();
        let missing: Vec<String> = [SAMPLE, BUFFER, WELL, VOLUME, STOCK, NOTES]
            .iter()
            .filter(|c| !index.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                sheet: table.sheet_name.clone(),
                columns: missing,
            });
        }
        let col = |key: &str| index.get(key).copied().unwrap_or_default();

        check_template(table, col(NOTES))?;

        let mut groups: Vec<PlateGroup> = WELL_ROWS
            .iter()
            .map(|letter| PlateGroup {
                letter: *letter,
                wells: Vec::new(),
            })
            .collect();

        for (i, raw) in table.rows().enumerate() {
            let cell = |c: usize| raw.get(c).unwrap_or(&EMPTY_CELL);

            let sample = cell(col(SAMPLE));
            // 仅保留有样品且非储备液的行
            if sample.is_blank() || !cell(col(STOCK)).is_blank() {
                continue;
            }
            let well = cell(col(WELL)).as_text().unwrap_or_default();
            let letter = match well.chars().next() {
                Some(c) => c,
                None => continue,
            };
            let group = match groups.iter_mut().find(|g| g.letter == letter) {
                Some(g) => g,
                None => {
                    debug!(sheet = %table.sheet_name, well = %well, "未知孔位，跳过");
                    continue;
                }
            };

            group.wells.push(PlateWell {
                row_number: i,
                sample: sample.as_text().unwrap_or_default(),
                buffer: cell(col(BUFFER)).as_text().unwrap_or_default(),
                well,
                volume_ul: volume_of(cell(col(VOLUME))),
            });
        }

        let diagnostics = duplicate_samples(&groups);
        if !diagnostics.is_empty() {
            warn!(
                sheet = %table.sheet_name,
                duplicates = diagnostics.len(),
                "孔板中存在重复样品名"
            );
        }

        Ok(PlateLayout {
            sheet_name: table.sheet_name.clone(),
            groups,
            diagnostics,
        })
    }
}

fn check_template(table: &RawTable, notes_col: usize) -> ImportResult<()> {
    if table.row_count() < TEMPLATE_MIN_ROWS {
        return Err(ImportError::InvalidTemplate(format!(
            "sheet '{}' has {} rows, expected at least {}",
            table.sheet_name,
            table.row_count(),
            TEMPLATE_MIN_ROWS
        )));
    }
    let last_note = table
        .cell(table.row_count() - 1, notes_col)
        .as_text()
        .unwrap_or_default();
    if last_note.trim() != TEMPLATE_MARKER {
        return Err(ImportError::InvalidTemplate(format!(
            "sheet '{}' is missing the '{}' marker",
            table.sheet_name, TEMPLATE_MARKER
        )));
    }
    Ok(())
}

fn volume_of(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(i) => Some(*i as f64),
        Cell::Float(f) if f.is_finite() => Some(*f),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn duplicate_samples(groups: &[PlateGroup]) -> Vec<Diagnostic> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for well in groups.iter().flat_map(|g| g.wells.iter()) {
        *counts.entry(well.sample.as_str()).or_default() += 1;
    }

    groups
        .iter()
        .flat_map(|g| g.wells.iter())
        .filter(|w| counts.get(w.sample.as_str()).copied().unwrap_or(0) > 1)
        .map(|w| {
            Diagnostic::error(
                w.row_number,
                Field::SampleName,
                format!("duplicate sample {} in well {}", w.sample, w.well),
            )
        })
        .collect()
}
