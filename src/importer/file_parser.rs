// ==========================================
// 样品导入系统 - 表格数据源
// ==========================================
// 职责: 打开工作簿 / 枚举工作表 / 按偏移解析为原始表格
// 支持: .xls (OLE2) / .xlsx (ZIP)，按文件签名识别，不看扩展名
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{Data, Reader, Sheets, Xls, Xlsx};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// OLE2 复合文档签名（.xls）
const XLS_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// ZIP 本地文件头签名（.xlsx）
const XLSX_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

// ==========================================
// Cell - 带类型的单元格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// 越界读取时返回的空单元格
pub static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) if f.is_nan() => None,
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    /// 仅字符串单元格可作为列名
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::Error(_) => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

/// 列名标准化: 去除全部空白 + 小写
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

// ==========================================
// RawTable - 原始二维表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub sheet_name: String,
    /// 表头在工作表中的绝对行号（0 起）
    pub header_row: usize,
    pub header: Vec<Cell>,
    pub data: Vec<Vec<Cell>>,
}

impl RawTable {
    /// 标准化后的字符串列名（非字符串列名为 None）
    pub fn labels(&self) -> Vec<Option<String>> {
        self.header
            .iter()
            .map(|c| c.as_label().map(normalize_label))
            .collect()
    }

    /// 列名 → 列下标（重复列名取第一次出现）
    pub fn column_index(&self) -> HashMap<String, usize> {
        let mut index = HashMap::new();
        for (i, label) in self.labels().into_iter().enumerate() {
            if let Some(label) = label {
                index.entry(label).or_insert(i);
            }
        }
        index
    }

    /// 按行惰性遍历
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.data.iter().map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

// ==========================================
// SheetSet - 已打开的工作簿
// ==========================================
pub struct SheetSet {
    source: String,
    workbook: Option<Sheets<BufReader<File>>>,
    names: Vec<String>,
    /// 已读取的工作表网格（重新解析时复用）
    grids: HashMap<String, Vec<Vec<Cell>>>,
}

impl std::fmt::Debug for SheetSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetSet")
            .field("source", &self.source)
            .field("workbook", &self.workbook.is_some())
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl SheetSet {
    /// 打开工作簿（按签名识别格式）
    pub fn open<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();

        if !path.exists() {
            return Err(ImportError::FileNotFound(source));
        }

        let mut signature = [0u8; 8];
        let read = {
            let mut file = File::open(path)?;
            read_prefix(&mut file, &mut signature)?
        };

        let reader = BufReader::new(File::open(path)?);
        let workbook = if read >= XLS_SIGNATURE.len() && signature == XLS_SIGNATURE {
            debug!(file = %source, "识别为 xls 工作簿");
            let xls: Xls<_> =
                Xls::new(reader).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
            Sheets::Xls(xls)
        } else if read >= XLSX_SIGNATURE.len() && signature[..4] == XLSX_SIGNATURE {
            debug!(file = %source, "识别为 xlsx 工作簿");
            let xlsx: Xlsx<_> =
                Xlsx::new(reader).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
            Sheets::Xlsx(xlsx)
        } else {
            return Err(ImportError::UnreadableFileKind(source));
        };

        let names = workbook.sheet_names();
        info!(file = %source, sheets = names.len(), "工作簿已打开");

        Ok(Self {
            source,
            workbook: Some(workbook),
            names,
            grids: HashMap::new(),
        })
    }

    /// 由内存网格构造（测试 / 剪贴板数据）
    pub fn from_grids(source: &str, sheets: Vec<(String, Vec<Vec<Cell>>)>) -> Self {
        let names = sheets.iter().map(|(n, _)| n.clone()).collect();
        Self {
            source: source.to_string(),
            workbook: None,
            names,
            grids: sheets.into_iter().collect(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }

    /// 解析工作表: 跳过 skip_rows 行，下一行为表头，其余为数据行
    ///
    /// # 返回
    /// - Err(EmptySheet): 无表头或零数据行
    pub fn parse(&mut self, sheet_name: &str, skip_rows: usize) -> ImportResult<RawTable> {
        let grid = self.grid(sheet_name)?;

        let mut rows = grid.iter().skip(skip_rows);
        let header = match rows.next() {
            Some(h) => h.clone(),
            None => return Err(ImportError::EmptySheet(sheet_name.to_string())),
        };
        let data: Vec<Vec<Cell>> = rows.cloned().collect();
        if data.is_empty() {
            return Err(ImportError::EmptySheet(sheet_name.to_string()));
        }

        Ok(RawTable {
            sheet_name: sheet_name.to_string(),
            header_row: skip_rows,
            header,
            data,
        })
    }

    fn grid(&mut self, sheet_name: &str) -> ImportResult<&Vec<Vec<Cell>>> {
        if !self.grids.contains_key(sheet_name) {
            let workbook = self.workbook.as_mut().ok_or_else(|| {
                ImportError::ExcelParseError(format!("sheet '{}' not found", sheet_name))
            })?;
            let range = workbook.worksheet_range(sheet_name)?;
            let grid = range_to_grid(&range);
            debug!(sheet = sheet_name, rows = grid.len(), "工作表已读取");
            self.grids.insert(sheet_name.to_string(), grid);
        }

        self.grids
            .get(sheet_name)
            .ok_or_else(|| ImportError::ExcelParseError(format!("sheet '{}' not found", sheet_name)))
    }
}

/// calamine 的 Range 从首个非空单元格开始，这里补齐为绝对坐标
fn range_to_grid(range: &calamine::Range<Data>) -> Vec<Vec<Cell>> {
    let (end_row, end_col) = match range.end() {
        Some(end) => end,
        None => return Vec::new(),
    };

    (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| {
                    range
                        .get_value((r, c))
                        .map(Cell::from)
                        .unwrap_or(Cell::Empty)
                })
                .collect()
        })
        .collect()
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_open_rejects_unknown_signature() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "puckName,position").unwrap();

        let result = SheetSet::open(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnreadableFileKind(_))));
    }

    #[test]
    fn test_open_file_not_found() {
        let result = SheetSet::open("non_existent.xlsx");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_with_skip_rows() {
        let mut sheets = SheetSet::from_grids(
            "memory",
            vec![(
                "Sheet1".to_string(),
                vec![
                    vec![text("title"), Cell::Empty],
                    vec![text("puckName"), text("position")],
                    vec![text("P1"), Cell::Int(1)],
                ],
            )],
        );

        let table = sheets.parse("Sheet1", 1).unwrap();
        assert_eq!(table.header_row, 1);
        assert_eq!(table.labels()[0].as_deref(), Some("puckname"));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 1), &Cell::Int(1));
    }

    #[test]
    fn test_parse_empty_sheet() {
        let mut sheets = SheetSet::from_grids(
            "memory",
            vec![("Empty".to_string(), vec![vec![text("puckName")]])],
        );
        let result = sheets.parse("Empty", 0);
        assert!(matches!(result, Err(ImportError::EmptySheet(_))));
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" Puck Name "), "puckname");
        assert_eq!(normalize_label("proposalNum"), "proposalnum");
    }

    #[test]
    fn test_float_cell_as_text() {
        assert_eq!(Cell::Float(301234.0).as_text().as_deref(), Some("301234"));
        assert_eq!(Cell::Float(1.5).as_text().as_deref(), Some("1.5"));
        assert!(Cell::Text("  ".to_string()).is_blank());
    }
}
