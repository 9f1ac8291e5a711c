// ==========================================
// 样品导入系统 - 容器存储
// ==========================================
// 职责: 幂等 get-or-create / 清空 / 按槽位写入 / 按槽位移除
// 并发: 同一进程内按容器串行化读-改-写；跨进程仍为最后写入者胜出
// 槽位: 0 起下标，越界写入报 PositionOutOfRange
// ==========================================

use crate::domain::container::{Container, ContainerFilter, NewContainer};
use crate::domain::types::ContainerKind;
use crate::engine::error::{StoreError, StoreResult};
use crate::repository::TrackingClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

pub struct ContainerStore<C: TrackingClient> {
    client: Arc<C>,
    owner: String,
    /// 每个容器一把写锁
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<C: TrackingClient> ContainerStore<C> {
    /// # 参数
    /// - client: 跟踪服务客户端
    /// - owner: 新建容器的所有者
    pub fn new(client: Arc<C>, owner: &str) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn lock_for(&self, uid: &str) -> Arc<AsyncMutex<()>> {
        // 锁表中毒时退化为不串行化（新建一把锁）
        match self.locks.lock() {
            Ok(mut locks) => locks
                .entry(uid.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone(),
            Err(_) => Arc::new(AsyncMutex::new(())),
        }
    }

    /// 按 (名称, 类型) 获取容器 uid，不存在时创建
    ///
    /// # 返回
    /// - Ok(uid): 已存在的容器 uid 原样返回；否则为新建容器 uid
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn get_or_create(
        &self,
        name: &str,
        capacity: usize,
        kind: &ContainerKind,
    ) -> StoreResult<String> {
        if let Some(existing) = self.find_by_name(name, kind).await? {
            debug!(container = %name, uid = %existing.uid, "容器已存在");
            return Ok(existing.uid);
        }

        let uid = self
            .client
            .create_container(NewContainer {
                name: name.to_string(),
                owner: self.owner.clone(),
                kind: kind.clone(),
                capacity,
            })
            .await?;
        info!(container = %name, uid = %uid, capacity, "容器已创建");
        Ok(uid)
    }

    pub async fn find_by_name(
        &self,
        name: &str,
        kind: &ContainerKind,
    ) -> StoreResult<Option<Container>> {
        let found = self
            .client
            .find_containers(&ContainerFilter::by_name_kind(name, kind))
            .await?;
        Ok(found.into_iter().next())
    }

    pub async fn fetch(&self, uid: &str) -> StoreResult<Option<Container>> {
        let found = self
            .client
            .find_containers(&ContainerFilter::by_uid(uid))
            .await?;
        Ok(found.into_iter().next())
    }

    /// 所有者名下的全部 puck
    pub async fn all_pucks(&self, owner: &str) -> StoreResult<Vec<Container>> {
        let pucks = self
            .client
            .find_containers(&ContainerFilter {
                kind: Some(ContainerKind::Puck),
                owner: Some(owner.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(pucks)
    }

    /// 清空全部槽位
    ///
    /// # 返回
    /// - Ok(false): 容器不存在
    pub async fn empty_container(&self, uid: &str) -> StoreResult<bool> {
        let lock = self.lock_for(uid);
        let _guard = lock.lock().await;

        let container = match self.fetch(uid).await? {
            Some(c) => c,
            None => {
                warn!(uid = %uid, "清空失败: 容器不存在");
                return Ok(false);
            }
        };
        let cleared = vec![String::new(); container.capacity()];
        self.client.update_container(uid, &cleared).await?;
        debug!(uid = %uid, container = %container.name, "容器已清空");
        Ok(true)
    }

    /// 写入单个槽位（0 起）
    ///
    /// # 返回
    /// - Ok(false): 容器不存在
    /// - Err(PositionOutOfRange): 槽位越界
    pub async fn insert_at(&self, uid: &str, position: usize, value: &str) -> StoreResult<bool> {
        let lock = self.lock_for(uid);
        let _guard = lock.lock().await;

        let mut container = match self.fetch(uid).await? {
            Some(c) => c,
            None => return Ok(false),
        };
        let capacity = container.capacity();
        let slot = container
            .content
            .get_mut(position)
            .ok_or(StoreError::PositionOutOfRange { position, capacity })?;
        *slot = value.to_string();

        self.client.update_container(uid, &container.content).await?;
        debug!(uid = %uid, position, value = %value, "槽位已写入");
        Ok(true)
    }

    /// 移除单个槽位的值（0 起）
    ///
    /// # 返回
    /// - Ok(false): 容器不存在
    /// - Err(StaleSlot): 槽位当前值不是 expected
    pub async fn remove_at(&self, uid: &str, position: usize, expected: &str) -> StoreResult<bool> {
        let lock = self.lock_for(uid);
        let _guard = lock.lock().await;

        let mut container = match self.fetch(uid).await? {
            Some(c) => c,
            None => return Ok(false),
        };
        let capacity = container.capacity();
        let slot = container
            .content
            .get_mut(position)
            .ok_or(StoreError::PositionOutOfRange { position, capacity })?;
        if slot.as_str() != expected {
            return Err(StoreError::StaleSlot {
                position,
                expected: expected.to_string(),
                actual: slot.clone(),
            });
        }
        slot.clear();

        self.client.update_container(uid, &container.content).await?;
        debug!(uid = %uid, position, "槽位已清除");
        Ok(true)
    }
}
