// ==========================================
// 样品导入系统 - 导入层
// ==========================================
// 职责: 电子表格 → 标准样品行 → 校验诊断
// 支持: .xls / .xlsx；样品表 / holder 表 / 孔板模板
// ==========================================

// 模块声明
pub mod dq_validator;
pub mod error;
pub mod exporter;
pub mod field_mapper;
pub mod file_parser;
pub mod header_locator;
pub mod holder_parser;
pub mod plate_parser;
pub mod puck_importer;

// 重导出核心类型
pub use dq_validator::{DqValidator, RuleContext, ValidationRule};
pub use error::{ImportError, ImportResult};
pub use exporter::{export_diagnostics, export_samples};
pub use field_mapper::{FieldMapper, NormalizeOutcome};
pub use file_parser::{Cell, RawTable, SheetSet};
pub use header_locator::{HeaderLocator, LocatedTable};
pub use holder_parser::HolderParser;
pub use plate_parser::{PlateGroup, PlateLayout, PlateParser};
pub use puck_importer::{ImportSession, LoadedSheet, PuckImporter};
