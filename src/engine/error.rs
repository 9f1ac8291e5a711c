// ==========================================
// 样品导入系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 容器存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Position {position} is outside container capacity {capacity}")]
    PositionOutOfRange { position: usize, capacity: usize },

    #[error("Slot {position} holds '{actual}', expected '{expected}'")]
    StaleSlot {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Backend(#[from] RepositoryError),
}

/// 扫描事件对账错误（仅记录日志，不中断事件循环）
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Puck not found in tracking service: {0}")]
    PuckNotFound(String),

    #[error("Primary dewar not resolvable: {0}")]
    DewarNotFound(String),

    #[error("Slot {sector}{letter} is not served by this monitor")]
    UnknownSlot { sector: u32, letter: char },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RepositoryError> for ReconcileError {
    fn from(err: RepositoryError) -> Self {
        ReconcileError::Store(StoreError::Backend(err))
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;
