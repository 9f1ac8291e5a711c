// ==========================================
// 样品导入系统 - 提交进度与取消
// ==========================================
// 职责: 进度回调 trait + 协作式取消令牌
// 说明: 取消只在行间检查，已写入的槽位不回滚
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 单次进度通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitProgress {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// 进度接收者 Trait
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &CommitProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&CommitProgress) + Send + Sync,
{
    fn report(&self, progress: &CommitProgress) {
        self(progress)
    }
}

/// 空操作进度接收者
///
/// 用于不关心进度的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn report(&self, progress: &CommitProgress) {
        tracing::trace!(
            processed = progress.processed,
            total = progress.total,
            "NoOpProgressSink: 跳过进度通知"
        );
    }
}

/// 协作式取消令牌（可跨线程克隆）
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
