// ==========================================
// 样品导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod barcode;
pub mod commit;
pub mod container;
pub mod diagnostic;
pub mod sample_row;
pub mod types;

// 重导出核心类型
pub use barcode::{sanitize_barcode, BarcodeEvent, SlotTransition};
pub use commit::{CommitReport, RowOutcome, RowResult};
pub use container::{
    Container, ContainerFilter, NewContainer, NewSample, Sample, SampleFilter,
};
pub use diagnostic::{Diagnostic, RuleFailure, RuleKind, ValidationReport};
pub use sample_row::{HolderRow, HolderSegment, PlateWell, SampleRow};
pub use types::{ContainerKind, Field, Severity};
