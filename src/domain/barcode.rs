// ==========================================
// 样品导入系统 - 条码扫描事件
// ==========================================
// 职责: 扫描器信号跳变 (sector, letter, old, new)
// 空 → 非空: 装载; 非空 → 空: 卸载
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeEvent {
    pub sector: u32,
    pub position: char,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
}

impl BarcodeEvent {
    pub fn new(sector: u32, position: char, old_value: &str, new_value: &str) -> Self {
        Self {
            sector,
            position,
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
        }
    }

    /// 槽位键
    pub fn slot(&self) -> (u32, char) {
        (self.sector, self.position.to_ascii_uppercase())
    }
}

/// 去除扫描值尾部换行 / 首尾空白
pub fn sanitize_barcode(raw: &str) -> String {
    raw.trim().to_string()
}

/// 信号跳变分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTransition {
    Load { puck: String },
    Unload { puck: String },
    Swap { from: String, to: String },
    Unchanged,
}

impl SlotTransition {
    pub fn classify(previous: &str, current: &str) -> Self {
        match (previous.is_empty(), current.is_empty()) {
            (true, false) => SlotTransition::Load {
                puck: current.to_string(),
            },
            (false, true) => SlotTransition::Unload {
                puck: previous.to_string(),
            },
            (false, false) if previous != current => SlotTransition::Swap {
                from: previous.to_string(),
                to: current.to_string(),
            },
            _ => SlotTransition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_trailing_newline() {
        assert_eq!(sanitize_barcode("PUCK01\n"), "PUCK01");
        assert_eq!(sanitize_barcode("  PUCK01 \r\n"), "PUCK01");
        assert_eq!(sanitize_barcode("\n"), "");
    }

    #[test]
    fn test_classify_transitions() {
        assert_eq!(
            SlotTransition::classify("", "P1"),
            SlotTransition::Load {
                puck: "P1".to_string()
            }
        );
        assert_eq!(
            SlotTransition::classify("P1", ""),
            SlotTransition::Unload {
                puck: "P1".to_string()
            }
        );
        assert_eq!(
            SlotTransition::classify("P1", "P2"),
            SlotTransition::Swap {
                from: "P1".to_string(),
                to: "P2".to_string()
            }
        );
        assert_eq!(SlotTransition::classify("P1", "P1"), SlotTransition::Unchanged);
        assert_eq!(SlotTransition::classify("", ""), SlotTransition::Unchanged);
    }

    #[test]
    fn test_event_json_defaults() {
        let event: BarcodeEvent =
            serde_json::from_str(r#"{"sector": 2, "position": "b", "new_value": "P9\n"}"#)
                .unwrap();
        assert_eq!(event.old_value, "");
        assert_eq!(event.slot(), (2, 'B'));
    }
}
