// ==========================================
// 样品导入系统 - 导入器配置
// ==========================================
// 存储: JSON 文件，缺省键取默认值
// ==========================================

use crate::config::container_lists::ListToggles;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_PUCK_CAPACITY: usize = 16;
pub const DEFAULT_PUCK_KIND: &str = "16_puck_pin";
pub const DEFAULT_SAMPLE_KIND: &str = "pin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// 名单文件路径
    pub list_path: PathBuf,
    pub disable_whitelist: bool,
    pub disable_blacklist: bool,
    pub disable_etched: bool,
    pub beamline_id: String,
    /// 容器 / 样品所有者
    pub owner: String,
    pub db_path: PathBuf,
    pub puck_capacity: usize,
    pub puck_kind: String,
    pub sample_kind: String,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            list_path: PathBuf::from("puck_lists.json"),
            disable_whitelist: false,
            disable_blacklist: false,
            disable_etched: false,
            beamline_id: String::new(),
            owner: String::new(),
            db_path: default_db_path(),
            puck_capacity: DEFAULT_PUCK_CAPACITY,
            puck_kind: DEFAULT_PUCK_KIND.to_string(),
            sample_kind: DEFAULT_SAMPLE_KIND.to_string(),
        }
    }
}

impl ImporterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ImportError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: ImporterConfig =
            serde_json::from_str(&content).map_err(|e| ImportError::ConfigError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        info!(
            path = %path.display(),
            beamline = %config.beamline_id,
            owner = %config.owner,
            "导入器配置已加载"
        );
        Ok(config)
    }

    pub fn toggles(&self) -> ListToggles {
        ListToggles {
            whitelist: !self.disable_whitelist,
            blacklist: !self.disable_blacklist,
            etched: !self.disable_etched,
        }
    }

    pub fn db_path_str(&self) -> String {
        self.db_path.to_string_lossy().to_string()
    }
}

/// 默认数据库路径: <本地数据目录>/puck-importer/tracking.db
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::APP_NAME)
        .join("tracking.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_keys_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"owner": "staff", "disable_whitelist": true}"#).unwrap();

        let config = ImporterConfig::load(&path).unwrap();
        assert_eq!(config.owner, "staff");
        assert_eq!(config.puck_capacity, 16);
        assert_eq!(config.puck_kind, "16_puck_pin");
        assert_eq!(config.sample_kind, "pin");

        let toggles = config.toggles();
        assert!(!toggles.whitelist);
        assert!(toggles.blacklist);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"beamline_id": "amx", "admin_group": "staff-admins"}"#).unwrap();
        let config = ImporterConfig::load(&path).unwrap();
        assert_eq!(config.beamline_id, "amx");
    }

    #[test]
    fn test_unreadable_config() {
        let result = ImporterConfig::load("/nonexistent/config.json");
        assert!(matches!(result, Err(ImportError::ConfigError { .. })));
    }
}
