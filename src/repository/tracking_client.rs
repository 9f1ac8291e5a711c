// ==========================================
// 样品导入系统 - 跟踪服务客户端 Trait
// ==========================================
// 职责: 容器 / 样品 / 线站信息 的窄接口
// 红线: 不含业务规则（清空 / 插槽语义属于 ContainerStore）
// ==========================================

use crate::domain::container::{
    Container, ContainerFilter, NewContainer, NewSample, Sample, SampleFilter,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde_json::Value;

// ==========================================
// TrackingClient Trait
// ==========================================
// 实现者: SqliteTrackingClient（使用 rusqlite）
#[async_trait]
pub trait TrackingClient: Send + Sync {
    // ===== 容器 =====

    /// 按条件查询容器（条件为空的字段不参与过滤）
    async fn find_containers(&self, filter: &ContainerFilter) -> RepositoryResult<Vec<Container>>;

    /// 创建容器，content 为 capacity 个空槽位
    ///
    /// # 返回
    /// - Ok(String): 新容器 uid
    async fn create_container(&self, fields: NewContainer) -> RepositoryResult<String>;

    /// 整体替换容器 content 并刷新 modified_time
    ///
    /// # 返回
    /// - Err(NotFound): 容器不存在
    async fn update_container(&self, uid: &str, content: &[String]) -> RepositoryResult<String>;

    // ===== 样品 =====

    async fn find_samples(&self, filter: &SampleFilter) -> RepositoryResult<Vec<Sample>>;

    async fn create_sample(&self, fields: NewSample) -> RepositoryResult<String>;

    // ===== 线站信息 =====

    /// 读取线站信息（如 primaryDewarName）
    async fn find_config(&self, beamline_id: &str, info_name: &str)
        -> RepositoryResult<Option<Value>>;

    async fn update_config(
        &self,
        beamline_id: &str,
        info_name: &str,
        info: Value,
    ) -> RepositoryResult<()>;
}
