// ==========================================
// 样品导入系统 - 样品架（holder）表解析
// ==========================================
// 职责: 逐个非空工作表切分 holder 段
// 规则: holderName 非空的行开启新段，直到下一个非空 holderName
// ==========================================

use crate::domain::sample_row::{HolderRow, HolderSegment};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::parse_integer;
use crate::importer::file_parser::{Cell, RawTable, SheetSet, EMPTY_CELL};
use tracing::{debug, info};

const HOLDER_NAME: &str = "holdername";
const SAMPLE_NAME: &str = "samplename";
const BUFFER_NAME: &str = "buffername";
const VOLUME: &str = "volume";

pub struct HolderParser;

impl HolderParser {
    /// 解析全部非空工作表
    ///
    /// # 参数
    /// - override_name: 替换第一个 holder 段的名称
    pub fn parse(
        sheets: &mut SheetSet,
        override_name: Option<&str>,
    ) -> ImportResult<Vec<HolderSegment>> {
        let mut segments = Vec::new();
        let names = sheets.sheet_names().to_vec();

        for sheet in &names {
            let table = match sheets.parse(sheet, 0) {
                Ok(t) => t,
                Err(ImportError::EmptySheet(_)) => {
                    debug!(sheet = %sheet, "空工作表，跳过");
                    continue;
                }
                Err(e) => return Err(e),
            };
            segments.extend(Self::segments_of(&table)?);
        }

        if segments.is_empty() {
            return Err(ImportError::EmptyWorkbook);
        }
        if let (Some(name), Some(first)) = (override_name, segments.first_mut()) {
            first.holder_name = name.to_string();
        }

        info!(file = %sheets.source(), holders = segments.len(), "holder 表解析完成");
        Ok(segments)
    }

    fn segments_of(table: &RawTable) -> ImportResult<Vec<HolderSegment>> {
        let index = table.column_index();
        let missing: Vec<String> = [HOLDER_NAME, SAMPLE_NAME, BUFFER_NAME, VOLUME]
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
        let (holder_col, sample_col, buffer_col, volume_col) =
            (col(HOLDER_NAME), col(SAMPLE_NAME), col(BUFFER_NAME), col(VOLUME));

        let mut segments: Vec<HolderSegment> = Vec::new();
        for (i, raw) in table.rows().enumerate() {
            let cell = |c: usize| raw.get(c).unwrap_or(&EMPTY_CELL);

            let holder = cell(holder_col);
            if !holder.is_blank() {
                segments.push(HolderSegment {
                    sheet_name: table.sheet_name.clone(),
                    holder_name: holder.as_text().unwrap_or_default().trim().to_string(),
                    rows: Vec::new(),
                });
            }

            // 首个 holderName 之前的行不属于任何段
            let segment = match segments.last_mut() {
                Some(s) => s,
                None => {
                    debug!(sheet = %table.sheet_name, row = i, "holderName 之前的行被忽略");
                    continue;
                }
            };
            segment.rows.push(HolderRow {
                sample_name: cell(sample_col).as_text().unwrap_or_default(),
                buffer_name: cell(buffer_col).as_text().unwrap_or_default(),
                volume: parse_integer(cell(volume_col)).unwrap_or(0),
            });
        }

        Ok(segments)
    }
}
