/// 编辑器配置
///
/// 从 JSON 文件加载，所有字段都有默认值。

use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::editor::history::DEFAULT_MAX_HISTORY;
use crate::utils::EditorError;

/// 编辑器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 撤销历史容量
    pub max_history: usize,
    /// 保存前是否创建带时间戳的备份
    pub backup_before_save: bool,
    /// 锁文件后缀
    pub lock_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            backup_before_save: true,
            lock_suffix: ".lock".to_string(),
        }
    }
}

impl EditorConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{ "max_history": 5 }"#).unwrap();

        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.max_history, 5);
        assert!(config.backup_before_save);
        assert_eq!(config.lock_suffix, ".lock");
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, "max_history = 5").unwrap();

        assert!(matches!(EditorConfig::load(&path), Err(EditorError::JsonError(_))));
    }
}
