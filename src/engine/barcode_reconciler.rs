// ==========================================
// 样品导入系统 - 条码扫描对账器
// ==========================================
// 职责: 扫描器信号跳变 → 主 dewar 槽位写入 / 移除
// 状态: 按 (sector, letter) 记录最近一次扫描值
// 失败: 查找失败只记 warn 日志并丢弃事件，运行循环不中断
// 槽位: (sector - 1) * pucks.len() + letter 下标（0 起）
// ==========================================

use crate::config::MonitorConfig;
use crate::domain::barcode::{sanitize_barcode, BarcodeEvent, SlotTransition};
use crate::domain::types::ContainerKind;
use crate::engine::container_store::ContainerStore;
use crate::engine::error::{ReconcileError, StoreError};
use crate::repository::TrackingClient;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 线站信息中主 dewar 名称的键
pub const PRIMARY_DEWAR_INFO: &str = "primaryDewarName";

/// 运行循环统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub events: usize,
    pub applied: usize,
    pub dropped: usize,
}

pub struct BarcodeReconciler<C: TrackingClient> {
    store: Arc<ContainerStore<C>>,
    config: MonitorConfig,
    beamline_id: String,
    slots: HashMap<(u32, char), String>,
}

impl<C: TrackingClient> BarcodeReconciler<C> {
    pub fn new(store: Arc<ContainerStore<C>>, config: MonitorConfig, beamline_id: &str) -> Self {
        Self {
            store,
            config,
            beamline_id: beamline_id.to_string(),
            slots: HashMap::new(),
        }
    }

    /// 槽位最近一次扫描值
    pub fn last_seen(&self, sector: u32, letter: char) -> Option<&str> {
        self.slots
            .get(&(sector, letter.to_ascii_uppercase()))
            .map(String::as_str)
    }

    /// dewar 内绝对槽位（0 起）
    pub fn absolute_position(&self, sector: u32, letter: char) -> Result<usize, ReconcileError> {
        let unknown = || ReconcileError::UnknownSlot { sector, letter };
        if sector != self.config.sector || sector == 0 {
            return Err(unknown());
        }
        let index = self.config.letter_index(letter).ok_or_else(unknown)?;
        let position = (sector as usize - 1) * self.config.pucks.len() + index;
        match self.config.dewar_capacity {
            Some(capacity) if position >= capacity => Err(unknown()),
            _ => Ok(position),
        }
    }

    /// 处理单个扫描事件
    ///
    /// 槽位状态总是更新为新值，即便后续查找失败
    #[instrument(skip(self), fields(sector = event.sector, letter = %event.position))]
    pub async fn handle_event(
        &mut self,
        event: BarcodeEvent,
    ) -> Result<SlotTransition, ReconcileError> {
        let (sector, letter) = event.slot();
        let current = sanitize_barcode(&event.new_value);
        let previous = match self.slots.get(&(sector, letter)) {
            Some(seen) => seen.clone(),
            None => sanitize_barcode(&event.old_value),
        };
        self.slots.insert((sector, letter), current.clone());

        let transition = SlotTransition::classify(&previous, &current);
        if transition == SlotTransition::Unchanged {
            debug!("扫描值未变化");
            return Ok(transition);
        }

        let position = self.absolute_position(sector, letter)?;
        let dewar_uid = self.primary_dewar().await?;

        match &transition {
            SlotTransition::Load { puck } => {
                let puck_uid = self.puck_uid(puck).await?;
                self.write_slot(&dewar_uid, position, &puck_uid).await?;
                info!(puck = %puck, position, "puck 已装载");
            }
            SlotTransition::Unload { puck } => {
                let puck_uid = self.puck_uid(puck).await?;
                self.clear_slot(&dewar_uid, position, &puck_uid).await?;
                info!(puck = %puck, position, "puck 已卸载");
            }
            SlotTransition::Swap { from, to } => {
                // 先移除旧值，再写入新值
                let from_uid = self.puck_uid(from).await?;
                let to_uid = self.puck_uid(to).await?;
                self.clear_slot(&dewar_uid, position, &from_uid).await?;
                self.write_slot(&dewar_uid, position, &to_uid).await?;
                info!(from = %from, to = %to, position, "puck 已替换");
            }
            SlotTransition::Unchanged => {}
        }
        Ok(transition)
    }

    /// 消费事件流，直到流结束
    pub async fn run<S>(&mut self, mut events: S) -> ReconcileStats
    where
        S: Stream<Item = BarcodeEvent> + Unpin,
    {
        let mut stats = ReconcileStats::default();
        while let Some(event) = events.next().await {
            stats.events += 1;
            match self.handle_event(event).await {
                Ok(SlotTransition::Unchanged) => {}
                Ok(_) => stats.applied += 1,
                Err(e) => {
                    stats.dropped += 1;
                    warn!(error = %e, "扫描事件已丢弃");
                }
            }
        }
        info!(
            events = stats.events,
            applied = stats.applied,
            dropped = stats.dropped,
            "事件流已结束"
        );
        stats
    }

    async fn primary_dewar(&self) -> Result<String, ReconcileError> {
        let info = self
            .store
            .client()
            .find_config(&self.beamline_id, PRIMARY_DEWAR_INFO)
            .await?;
        let name = info
            .as_ref()
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ReconcileError::DewarNotFound(self.beamline_id.clone()))?;

        let dewar = self.store.find_by_name(&name, &ContainerKind::Dewar).await?;
        match dewar {
            Some(d) => Ok(d.uid),
            None => Err(ReconcileError::DewarNotFound(name)),
        }
    }

    async fn write_slot(
        &self,
        dewar_uid: &str,
        position: usize,
        puck_uid: &str,
    ) -> Result<(), ReconcileError> {
        if !self.store.insert_at(dewar_uid, position, puck_uid).await? {
            return Err(StoreError::ContainerNotFound(dewar_uid.to_string()).into());
        }
        Ok(())
    }

    async fn clear_slot(
        &self,
        dewar_uid: &str,
        position: usize,
        puck_uid: &str,
    ) -> Result<(), ReconcileError> {
        if !self.store.remove_at(dewar_uid, position, puck_uid).await? {
            return Err(StoreError::ContainerNotFound(dewar_uid.to_string()).into());
        }
        Ok(())
    }

    async fn puck_uid(&self, name: &str) -> Result<String, ReconcileError> {
        let puck = self
            .store
            .find_by_name(name, &ContainerKind::Puck)
            .await?
            .ok_or_else(|| ReconcileError::PuckNotFound(name.to_string()))?;
        Ok(puck.uid)
    }
}
