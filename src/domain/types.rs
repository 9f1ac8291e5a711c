// ==========================================
// 样品导入系统 - 领域类型定义
// ==========================================
// 职责: 字段枚举 / 诊断级别 / 容器种类
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规范字段 (Canonical Field)
// ==========================================
// 顺序即导出列顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ContainerName, // puckname
    Position,      // position
    SampleName,    // samplename
    Model,         // model
    Sequence,      // sequence
    ProposalNumber, // proposalnum
}

impl Field {
    /// 规范列顺序
    pub const ALL: [Field; 6] = [
        Field::ContainerName,
        Field::Position,
        Field::SampleName,
        Field::Model,
        Field::Sequence,
        Field::ProposalNumber,
    ];

    /// 规范列名（小写、无空白，用于表头匹配）
    pub fn key(&self) -> &'static str {
        match self {
            Field::ContainerName => "puckname",
            Field::Position => "position",
            Field::SampleName => "samplename",
            Field::Model => "model",
            Field::Sequence => "sequence",
            Field::ProposalNumber => "proposalnum",
        }
    }

    /// 导出时写入的表头
    pub fn header(&self) -> &'static str {
        match self {
            Field::ContainerName => "puckName",
            Field::Position => "position",
            Field::SampleName => "sampleName",
            Field::Model => "model",
            Field::Sequence => "sequence",
            Field::ProposalNumber => "proposalNum",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    /// 在规范列中的下标
    pub fn column_index(&self) -> usize {
        Field::ALL
            .iter()
            .position(|f| f == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ==========================================
// 诊断级别 (Severity)
// ==========================================
// Warning: 已自动修复或仅提示（黄色）
// Error: 阻断提交（红色）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

// ==========================================
// 容器种类 (Container Kind)
// ==========================================
// 序列化为跟踪服务中的 kind 字符串
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Puck,
    Dewar,
    Holder,
    Plate,
    Other(String),
}

impl ContainerKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContainerKind::Puck => "16_puck_pin",
            ContainerKind::Dewar => "dewar",
            ContainerKind::Holder => "holder",
            ContainerKind::Plate => "plate",
            ContainerKind::Other(kind) => kind.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "16_puck_pin" => ContainerKind::Puck,
            "dewar" => ContainerKind::Dewar,
            "holder" => ContainerKind::Holder,
            "plate" => ContainerKind::Plate,
            other => ContainerKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
