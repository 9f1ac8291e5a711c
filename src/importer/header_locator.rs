// ==========================================
// 样品导入系统 - 表头定位器
// ==========================================
// 职责: 表头不在第 0 行时（模板中嵌入的录入区），
//       扫描哨兵列名，按偏移重新解析
// ==========================================

use crate::domain::types::Field;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{normalize_label, Cell, RawTable, SheetSet};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// 已确认表头的表格
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTable {
    pub table: RawTable,
    /// 标准列名 → 源列下标（仅含源表实际存在的列）
    pub columns: HashMap<String, usize>,
}

impl LocatedTable {
    /// 不做表头定位，直接按第 0 行建立列索引（缺列展示用）
    pub fn unlocated(table: RawTable) -> Self {
        let columns = table.column_index();
        Self { table, columns }
    }

    pub fn column(&self, key: &str) -> Option<usize> {
        self.columns.get(key).copied()
    }
}

pub struct HeaderLocator {
    required: BTreeSet<String>,
    sentinel: String,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self::for_samples()
    }
}

impl HeaderLocator {
    pub fn new<I, S>(required: I, sentinel: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required: required
                .into_iter()
                .map(|s| normalize_label(s.as_ref()))
                .collect(),
            sentinel: normalize_label(sentinel),
        }
    }

    /// 样品表: 六个标准列，哨兵为 puckname
    pub fn for_samples() -> Self {
        Self::new(Field::ALL.iter().map(|f| f.key()), Field::ContainerName.key())
    }

    /// 尚未满足的必需列（按字典序）
    pub fn missing_in(&self, table: &RawTable) -> Vec<String> {
        self.missing_in_row(&table.header)
    }

    fn missing_in_row(&self, row: &[Cell]) -> Vec<String> {
        let labels: BTreeSet<String> = row
            .iter()
            .filter_map(|c| c.as_label().map(normalize_label))
            .collect();
        self.required
            .iter()
            .filter(|c| !labels.contains(*c))
            .cloned()
            .collect()
    }

    fn has_sentinel(&self, row: &[Cell]) -> bool {
        row.iter()
            .filter_map(|c| c.as_label())
            .any(|label| normalize_label(label) == self.sentinel)
    }

    /// 定位表头
    ///
    /// # 流程
    /// 1. 第 0 行表头已满足必需列 → 直接返回
    /// 2. 否则按顺序扫描含哨兵列名的行，取第一个覆盖全部必需列的行
    /// 3. 以该行为表头重新解析
    ///
    /// # 返回
    /// - Err(MissingColumns): 无哨兵行，或哨兵行均不完整（按第一个哨兵行报缺列）
    pub fn locate(
        &self,
        sheets: &mut SheetSet,
        sheet_name: &str,
        table: &RawTable,
    ) -> ImportResult<LocatedTable> {
        let missing = self.missing_in(table);
        if missing.is_empty() {
            return Ok(LocatedTable::unlocated(table.clone()));
        }

        let sentinel_rows: Vec<usize> = table
            .rows()
            .enumerate()
            .filter(|(_, row)| self.has_sentinel(row))
            .map(|(i, _)| i)
            .collect();

        let first_sentinel = match sentinel_rows.first() {
            Some(i) => *i,
            None => {
                warn!(sheet = sheet_name, missing = ?missing, "未找到表头哨兵列");
                return Err(ImportError::MissingColumns {
                    sheet: sheet_name.to_string(),
                    columns: missing,
                });
            }
        };

        let complete = sentinel_rows
            .iter()
            .copied()
            .find(|i| self.missing_in_row(&table.data[*i]).is_empty());

        let data_index = match complete {
            Some(i) => i,
            None => {
                let missing = self.missing_in_row(&table.data[first_sentinel]);
                warn!(sheet = sheet_name, missing = ?missing, "哨兵行均缺少必需列");
                return Err(ImportError::MissingColumns {
                    sheet: sheet_name.to_string(),
                    columns: missing,
                });
            }
        };

        // 数据行 i 位于绝对行 header_row + 1 + i
        let skip_rows = table.header_row + data_index + 1;
        debug!(sheet = sheet_name, header_row = skip_rows, "按哨兵行重新解析");

        let reparsed = sheets.parse(sheet_name, skip_rows)?;
        Ok(LocatedTable::unlocated(reparsed))
    }
}
