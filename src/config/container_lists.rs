// ==========================================
// 样品导入系统 - 容器名单
// ==========================================
// 职责: 白名单 / 黑名单 / 刻码名单 的读写
// 存储: JSON 文件，每次校验前整体重读
// 文件缺失: 视为三个空名单，并告知调用方
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLists {
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub etched: Vec<String>,
}

/// 名单来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    File,
    Missing,
}

/// 名单种类（CLI 维护用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Whitelist,
    Blacklist,
    Etched,
}

impl ListKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "whitelist" => Some(ListKind::Whitelist),
            "blacklist" => Some(ListKind::Blacklist),
            "etched" => Some(ListKind::Etched),
            _ => None,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Whitelist => write!(f, "whitelist"),
            ListKind::Blacklist => write!(f, "blacklist"),
            ListKind::Etched => write!(f, "etched"),
        }
    }
}

/// 各名单是否启用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListToggles {
    pub whitelist: bool,
    pub blacklist: bool,
    pub etched: bool,
}

impl Default for ListToggles {
    fn default() -> Self {
        Self {
            whitelist: true,
            blacklist: true,
            etched: true,
        }
    }
}

impl ContainerLists {
    /// 读取名单文件
    ///
    /// # 返回
    /// - (lists, ListSource::Missing): 文件不存在，三个空名单
    /// - Err(ConfigError): 文件存在但无法解析
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<(Self, ListSource)> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "名单文件不存在，按空名单处理");
            return Ok((Self::default(), ListSource::Missing));
        }

        let content = fs::read_to_string(path)?;
        let lists: ContainerLists =
            serde_json::from_str(&content).map_err(|e| ImportError::ConfigError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        debug!(
            whitelist = lists.whitelist.len(),
            blacklist = lists.blacklist.len(),
            etched = lists.etched.len(),
            "名单已加载"
        );
        Ok((lists, ListSource::File))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ImportResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(|e| ImportError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Whitelist => &mut self.whitelist,
            ListKind::Blacklist => &mut self.blacklist,
            ListKind::Etched => &mut self.etched,
        }
    }

    pub fn list(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
            ListKind::Etched => &self.etched,
        }
    }

    /// 白名单与黑名单互斥；刻码名单无对立名单
    pub fn opposite(kind: ListKind) -> Option<ListKind> {
        match kind {
            ListKind::Whitelist => Some(ListKind::Blacklist),
            ListKind::Blacklist => Some(ListKind::Whitelist),
            ListKind::Etched => None,
        }
    }

    /// 添加名称
    ///
    /// # 返回
    /// - Ok(false): 已在本名单中
    /// - Err(ListConflict): 已在对立名单中（白名单 ↔ 黑名单）
    pub fn add(&mut self, kind: ListKind, name: &str) -> ImportResult<bool> {
        if let Some(other) = Self::opposite(kind) {
            if self.list(other).iter().any(|n| n == name) {
                return Err(ImportError::ListConflict {
                    name: name.to_string(),
                    list: other.to_string(),
                });
            }
        }
        let list = self.list_mut(kind);
        if list.iter().any(|n| n == name) {
            return Ok(false);
        }
        list.push(name.to_string());
        Ok(true)
    }

    pub fn remove(&mut self, kind: ListKind, name: &str) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|n| n != name);
        list.len() != before
    }

    /// 允许集合: 白名单，刻码名单启用时并入
    pub fn allow_set(&self, toggles: &ListToggles) -> HashSet<&str> {
        let mut set: HashSet<&str> = self.whitelist.iter().map(String::as_str).collect();
        if toggles.etched {
            set.extend(self.etched.iter().map(String::as_str));
        }
        set
    }

    pub fn deny_set(&self) -> HashSet<&str> {
        self.blacklist.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_lists() {
        let dir = TempDir::new().unwrap();
        let (lists, source) = ContainerLists::load(dir.path().join("lists.json")).unwrap();
        assert_eq!(source, ListSource::Missing);
        assert_eq!(lists, ContainerLists::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("lists.json");

        let mut lists = ContainerLists::default();
        assert!(lists.add(ListKind::Whitelist, "PuckA").unwrap());
        assert!(!lists.add(ListKind::Whitelist, "PuckA").unwrap());
        assert!(lists.add(ListKind::Blacklist, "PuckB").unwrap());
        lists.save(&path).unwrap();

        let (reloaded, source) = ContainerLists::load(&path).unwrap();
        assert_eq!(source, ListSource::File);
        assert_eq!(reloaded.whitelist, vec!["PuckA"]);
        assert_eq!(reloaded.blacklist, vec!["PuckB"]);
    }

    #[test]
    fn test_add_rejects_name_in_opposite_list() {
        let mut lists = ContainerLists::default();
        lists.add(ListKind::Whitelist, "PuckA").unwrap();
        lists.add(ListKind::Blacklist, "PuckB").unwrap();

        match lists.add(ListKind::Blacklist, "PuckA") {
            Err(ImportError::ListConflict { name, list }) => {
                assert_eq!(name, "PuckA");
                assert_eq!(list, "whitelist");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            lists.add(ListKind::Whitelist, "PuckB"),
            Err(ImportError::ListConflict { .. })
        ));
        assert_eq!(lists.blacklist, vec!["PuckB"]);

        // 刻码名单不受互斥约束
        assert!(lists.add(ListKind::Etched, "PuckA").unwrap());
    }

    #[test]
    fn test_partial_file_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.json");
        fs::write(&path, r#"{"whitelist": ["P1"]}"#).unwrap();
        let (lists, _) = ContainerLists::load(&path).unwrap();
        assert_eq!(lists.whitelist, vec!["P1"]);
        assert!(lists.blacklist.is_empty());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ContainerLists::load(&path),
            Err(ImportError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_allow_set_includes_etched_when_enabled() {
        let lists = ContainerLists {
            whitelist: vec!["P1".to_string()],
            blacklist: vec![],
            etched: vec!["E1".to_string()],
        };
        let on = ListToggles::default();
        let off = ListToggles {
            etched: false,
            ..Default::default()
        };
        assert!(lists.allow_set(&on).contains("E1"));
        assert!(!lists.allow_set(&off).contains("E1"));
    }

    #[test]
    fn test_remove_only_touches_one_list() {
        let mut lists = ContainerLists {
            whitelist: vec!["P1".to_string()],
            blacklist: vec!["P1".to_string()],
            etched: vec![],
        };
        assert!(lists.remove(ListKind::Blacklist, "P1"));
        assert!(!lists.remove(ListKind::Blacklist, "P1"));
        assert_eq!(lists.list(ListKind::Whitelist), ["P1".to_string()]);
    }
}
