// ==========================================
// 样品导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + calamine
// 系统定位: 电子表格批量登记样品载具，并与扫描器事件对账
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 跟踪服务客户端
pub mod repository;

// 引擎层 - 容器存储 / 提交 / 对账
pub mod engine;

// 导入层 - 电子表格
pub mod importer;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ContainerKind, Field, Severity};

// 领域实体
pub use domain::{
    BarcodeEvent, CommitReport, Container, Diagnostic, Sample, SampleRow, ValidationReport,
};

// 导入
pub use importer::{DqValidator, ImportError, ImportResult, ImportSession, PuckImporter};

// 引擎
pub use engine::{BarcodeReconciler, CancelToken, CommitOrchestrator, ContainerStore};

// 仓储
pub use repository::{SqliteTrackingClient, TrackingClient};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称（同时用作本地数据目录名）
pub const APP_NAME: &str = "puck-importer";
