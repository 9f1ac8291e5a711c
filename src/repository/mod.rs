// ==========================================
// 样品导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 跟踪服务窄接口，屏蔽存储细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod tracking_client;
pub mod tracking_client_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use tracking_client::TrackingClient;
pub use tracking_client_impl::SqliteTrackingClient;
