// ==========================================
// 样品导入系统 - 引擎层
// ==========================================
// 职责: 容器存储 / 批次提交 / 扫描对账
// 红线: 引擎不拼 SQL，所有后端访问经 TrackingClient
// ==========================================

pub mod barcode_reconciler;
pub mod commit_orchestrator;
pub mod container_store;
pub mod error;
pub mod progress;

// 重导出核心引擎
pub use barcode_reconciler::{BarcodeReconciler, ReconcileStats, PRIMARY_DEWAR_INFO};
pub use commit_orchestrator::{CommitOrchestrator, CommitSettings};
pub use container_store::ContainerStore;
pub use error::{ReconcileError, StoreError, StoreResult};
pub use progress::{CancelToken, CommitProgress, NoOpProgressSink, ProgressSink};
