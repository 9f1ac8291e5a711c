// ==========================================
// 样品导入系统 - 导入行实体
// ==========================================
// 职责: 规范化后的样品行 / 样品架行 / 样品板孔位
// 红线: 可空字段用 Option 表达，不使用哨兵值
// ==========================================

use crate::domain::types::Field;
use serde::{Deserialize, Serialize};

// ==========================================
// SampleRow - 一条“样品 → 槽位”分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRow {
    /// 规范化表中的行下标（0 起），诊断按此定位
    pub row_number: usize,
    pub container_name: Option<String>,
    /// 1 起的槽位号；非数字 → None
    pub position: Option<i64>,
    pub sample_name: Option<String>,
    /// 非数字 → None
    pub proposal_number: Option<i64>,
    pub model: String,
    pub sequence: String,
}

impl SampleRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            container_name: None,
            position: None,
            sample_name: None,
            proposal_number: None,
            model: String::new(),
            sequence: String::new(),
        }
    }

    /// 单元格显示值（导出 / 诊断报告使用）
    pub fn display_value(&self, field: Field) -> String {
        match field {
            Field::ContainerName => self.container_name.clone().unwrap_or_default(),
            Field::Position => self.position.map(|p| p.to_string()).unwrap_or_default(),
            Field::SampleName => self.sample_name.clone().unwrap_or_default(),
            Field::Model => self.model.clone(),
            Field::Sequence => self.sequence.clone(),
            Field::ProposalNumber => self
                .proposal_number
                .map(|p| p.to_string())
                .unwrap_or_default(),
        }
    }

    /// 0 起槽位下标（输入为 1 起）
    pub fn slot_index(&self) -> Option<usize> {
        match self.position {
            Some(p) if p >= 1 => usize::try_from(p - 1).ok(),
            _ => None,
        }
    }
}

// ==========================================
// HolderRow - 样品架导入行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRow {
    pub sample_name: String,
    pub buffer_name: String,
    pub volume: i64,
}

/// 一个样品架片段（由 holderName 非空行开启）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSegment {
    pub sheet_name: String,
    pub holder_name: String,
    pub rows: Vec<HolderRow>,
}

// ==========================================
// PlateWell - 样品板孔位
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateWell {
    /// 原表中的数据行下标
    pub row_number: usize,
    pub sample: String,
    pub buffer: String,
    pub well: String,
    pub volume_ul: Option<f64>,
}
