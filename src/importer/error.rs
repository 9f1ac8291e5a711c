// ==========================================
// 样品导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 面向操作员的消息原样展示，不作为系统故障记录
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unreadable file kind: {0} (only .xls / .xlsx workbooks are supported)")]
    UnreadableFileKind(String),

    #[error("File read failed: {0}")]
    FileReadError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    #[error("Sheet '{0}' has no data rows")]
    EmptySheet(String),

    #[error("Workbook has no sheet with data")]
    EmptyWorkbook,

    // ===== 表头 / 列错误 =====
    #[error("Sheet '{sheet}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },

    #[error(
        "Missing column headers in excel file: {}. If data is present in the excel file, \
         make sure column names are correct and import the file again. Otherwise enter values \
         into the empty column generated by the puck importer.",
        .columns.join(", ")
    )]
    MissingColumnHeaders { columns: Vec<String> },

    #[error("This sample spreadsheet is not generated from a template: {0}")]
    InvalidTemplate(String),

    #[error("Puck name {name} already exists in the other list ({list})")]
    ListConflict { name: String, list: String },

    // ===== 校验 / 提交 =====
    #[error("{0}")]
    Validation(String),

    #[error("Batch has not been validated")]
    NotValidated,

    // ===== 导出 / 配置 =====
    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Config error ({path}): {message}")]
    ConfigError { path: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否属于操作员输入问题（错列 / 缺列 / 文件不可读）
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnreadableFileKind(_)
                | ImportError::EmptySheet(_)
                | ImportError::EmptyWorkbook
                | ImportError::MissingColumns { .. }
                | ImportError::MissingColumnHeaders { .. }
                | ImportError::InvalidTemplate(_)
                | ImportError::ListConflict { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ExportError(err.to_string())
    }
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_headers_lists_columns() {
        let err = ImportError::MissingColumnHeaders {
            columns: vec!["model".to_string(), "sequence".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("model, sequence"));
        assert!(err.is_user_input());
    }

    #[test]
    fn test_validation_is_not_user_input_error() {
        let err = ImportError::Validation("Invalid proposal numbers".to_string());
        assert_eq!(err.to_string(), "Invalid proposal numbers");
        assert!(!err.is_user_input());
    }
}
