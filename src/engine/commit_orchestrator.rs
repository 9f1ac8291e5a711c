// ==========================================
// 样品导入系统 - 提交编排器
// ==========================================
// 流程: 逐行 get-or-create 容器 → 首次触达时清空 → 创建样品 → 写槽位
// 约束: 每个容器在一个批次内只清空一次，且先于任何写入
// 失败: 单行失败累积到报告，不中断批次；取消在行间检查，不回滚
// ==========================================

use crate::domain::commit::{CommitReport, RowOutcome, RowResult};
use crate::domain::container::NewSample;
use crate::domain::sample_row::SampleRow;
use crate::domain::types::ContainerKind;
use crate::engine::container_store::ContainerStore;
use crate::engine::error::StoreError;
use crate::engine::progress::{CancelToken, CommitProgress, ProgressSink};
use crate::repository::TrackingClient;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 提交参数
#[derive(Debug, Clone, PartialEq)]
pub struct CommitSettings {
    pub owner: String,
    pub container_capacity: usize,
    pub container_kind: ContainerKind,
    pub sample_kind: String,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            container_capacity: crate::config::app_config::DEFAULT_PUCK_CAPACITY,
            container_kind: ContainerKind::Puck,
            sample_kind: crate::config::app_config::DEFAULT_SAMPLE_KIND.to_string(),
        }
    }
}

impl From<&crate::config::ImporterConfig> for CommitSettings {
    fn from(config: &crate::config::ImporterConfig) -> Self {
        Self {
            owner: config.owner.clone(),
            container_capacity: config.puck_capacity,
            container_kind: ContainerKind::parse(&config.puck_kind),
            sample_kind: config.sample_kind.clone(),
        }
    }
}

pub struct CommitOrchestrator<C: TrackingClient> {
    store: Arc<ContainerStore<C>>,
    settings: CommitSettings,
}

impl<C: TrackingClient> CommitOrchestrator<C> {
    pub fn new(store: Arc<ContainerStore<C>>, settings: CommitSettings) -> Self {
        Self { store, settings }
    }

    /// 提交已校验的行
    ///
    /// # 返回
    /// - CommitReport: 逐行结果；取消时为部分报告（cancelled = true）
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn commit(
        &self,
        rows: &[SampleRow],
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> CommitReport {
        let mut report = CommitReport::new(rows.len());
        let mut emptied: HashSet<String> = HashSet::new();

        for row in rows {
            if cancel.is_cancelled() {
                warn!(
                    processed = report.processed(),
                    total = report.total,
                    "提交已取消，已写入的槽位不回滚"
                );
                report.cancelled = true;
                progress.report(&snapshot(&report));
                break;
            }

            let outcome = match self.commit_row(row, &mut emptied, &mut report).await {
                Ok((container_uid, sample_uid)) => RowOutcome::Committed {
                    container_uid,
                    sample_uid,
                },
                Err(reason) => {
                    error!(row = row.row_number, reason = %reason, "行提交失败");
                    RowOutcome::Failed { reason }
                }
            };

            report.results.push(RowResult {
                row_number: row.row_number,
                container_name: row.container_name.clone().unwrap_or_default(),
                sample_name: row.sample_name.clone().unwrap_or_default(),
                outcome,
            });
            progress.report(&snapshot(&report));
        }

        info!(
            total = report.total,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            cancelled = report.cancelled,
            "提交完成"
        );
        report
    }

    async fn commit_row(
        &self,
        row: &SampleRow,
        emptied: &mut HashSet<String>,
        report: &mut CommitReport,
    ) -> Result<(String, String), String> {
        let container_name = row
            .container_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "missing container name".to_string())?;
        let slot = row
            .slot_index()
            .ok_or_else(|| format!("invalid position {:?}", row.position))?;
        let sample_name = row
            .sample_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "missing sample name".to_string())?;

        let container_uid = self
            .store
            .get_or_create(
                container_name,
                self.settings.container_capacity,
                &self.settings.container_kind,
            )
            .await
            .map_err(|e| e.to_string())?;

        // 首次触达: 清空一次
        if !emptied.contains(&container_uid) {
            let found = self
                .store
                .empty_container(&container_uid)
                .await
                .map_err(|e| e.to_string())?;
            if !found {
                return Err(StoreError::ContainerNotFound(container_name.to_string()).to_string());
            }
            emptied.insert(container_uid.clone());
            report.emptied_containers.push(container_name.to_string());
        }

        let sample_uid = self
            .store
            .client()
            .create_sample(NewSample {
                name: sample_name.to_string(),
                owner: self.settings.owner.clone(),
                kind: self.settings.sample_kind.clone(),
                proposal_id: row.proposal_number,
                model: row.model.clone(),
                sequence: row.sequence.clone(),
            })
            .await
            .map_err(|e| e.to_string())?;

        let inserted = self
            .store
            .insert_at(&container_uid, slot, &sample_uid)
            .await
            .map_err(|e| e.to_string())?;
        if !inserted {
            return Err(StoreError::ContainerNotFound(container_name.to_string()).to_string());
        }

        Ok((container_uid, sample_uid))
    }
}

fn snapshot(report: &CommitReport) -> CommitProgress {
    CommitProgress {
        processed: report.processed(),
        total: report.total,
        succeeded: report.success_count(),
        failed: report.failure_count(),
        cancelled: report.cancelled,
    }
}
