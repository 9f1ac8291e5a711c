// ==========================================
// 样品导入系统 - 配置层
// ==========================================
// 职责: 导入器配置 / 容器名单 / 扫描监控服务配置
// 存储: JSON 文件
// ==========================================

pub mod app_config;
pub mod container_lists;
pub mod monitor_config;

// 重导出核心配置类型
pub use app_config::{default_db_path, ImporterConfig};
pub use container_lists::{ContainerLists, ListKind, ListSource, ListToggles};
pub use monitor_config::MonitorConfig;
