// ==========================================
// 样品导入系统 - 提交报告
// ==========================================
// 职责: 逐行提交结果（单行失败不阻断批次）
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowOutcome {
    Committed {
        container_uid: String,
        sample_uid: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowResult {
    pub row_number: usize,
    pub container_name: String,
    pub sample_name: String,
    pub outcome: RowOutcome,
}

impl RowResult {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, RowOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub total: usize,
    pub results: Vec<RowResult>,
    /// 已清空的容器（按首次触达顺序）
    pub emptied_containers: Vec<String>,
    pub cancelled: bool,
}

impl CommitReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_committed()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.processed() - self.success_count()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.processed() == self.total
    }
}
