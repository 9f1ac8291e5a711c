// ==========================================
// 样品导入系统 - 容器 / 样品实体
// ==========================================
// 职责: 跟踪服务中的容器与样品文档
// 容器: 名称 + 种类唯一标识，content 为定长槽位数组（空串 = 空位）
// ==========================================

use crate::domain::types::ContainerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Container
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub uid: String,
    pub name: String,
    pub owner: String,
    pub kind: ContainerKind,
    pub content: Vec<String>,
    pub modified_time: DateTime<Utc>,
}

impl Container {
    pub fn capacity(&self) -> usize {
        self.content.len()
    }

    /// 已占用槽位数
    pub fn occupied(&self) -> usize {
        self.content.iter().filter(|slot| !slot.is_empty()).count()
    }
}

/// 容器查询条件（None 表示不过滤）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerFilter {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub kind: Option<ContainerKind>,
    pub owner: Option<String>,
}

impl ContainerFilter {
    pub fn by_uid(uid: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
            ..Default::default()
        }
    }

    pub fn by_name_kind(name: &str, kind: &ContainerKind) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some(kind.clone()),
            ..Default::default()
        }
    }
}

/// 新建容器字段
#[derive(Debug, Clone, PartialEq)]
pub struct NewContainer {
    pub name: String,
    pub owner: String,
    pub kind: ContainerKind,
    pub capacity: usize,
}

// ==========================================
// Sample
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub uid: String,
    pub name: String,
    pub owner: String,
    pub kind: String,
    pub proposal_id: Option<i64>,
    pub request_count: i64,
    pub model: String,
    pub sequence: String,
}

/// 新建样品字段
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub name: String,
    pub owner: String,
    pub kind: String,
    pub proposal_id: Option<i64>,
    pub model: String,
    pub sequence: String,
}

/// 样品查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleFilter {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub proposal_id: Option<i64>,
}
