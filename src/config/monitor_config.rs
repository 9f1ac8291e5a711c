// ==========================================
// 样品导入系统 - 扫描监控服务配置
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// 扫描器 PV 后缀
    pub suffix: String,
    pub sector: u32,
    /// 本扇区服务的位置字母（顺序决定槽位下标）
    pub pucks: Vec<char>,
    pub dewar_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawMonitorConfig {
    suffix: Option<String>,
    sector: Option<u32>,
    pucks: Option<Vec<String>>,
    dewar_capacity: Option<usize>,
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        Self::from_json(&content).map_err(|message| ImportError::ConfigError {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let raw: RawMonitorConfig = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let mut missing = Vec::new();
        if raw.suffix.is_none() {
            missing.push("suffix");
        }
        if raw.sector.is_none() {
            missing.push("sector");
        }
        if raw.pucks.is_none() {
            missing.push("pucks");
        }
        if !missing.is_empty() {
            return Err(format!("missing keys: {}", missing.join(", ")));
        }

        let pucks = raw
            .pucks
            .unwrap_or_default()
            .iter()
            .map(|p| {
                let mut chars = p.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c.to_ascii_uppercase()),
                    _ => Err(format!("invalid puck position '{}'", p)),
                }
            })
            .collect::<Result<Vec<char>, String>>()?;

        Ok(Self {
            suffix: raw.suffix.unwrap_or_default(),
            sector: raw.sector.unwrap_or_default(),
            pucks,
            dewar_capacity: raw.dewar_capacity,
        })
    }

    /// 位置字母在本扇区内的下标
    pub fn letter_index(&self, letter: char) -> Option<usize> {
        let letter = letter.to_ascii_uppercase();
        self.pucks.iter().position(|p| *p == letter)
    }
}

fn config_error(path: &Path, e: std::io::Error) -> ImportError {
    ImportError::ConfigError {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
