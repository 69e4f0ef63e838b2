/// JSON 块文件 IO 实现
///
/// 提供基于文件系统的默认扫描/写回实现。文件格式：
///
/// ```json
/// {
///   "format_version": 1,
///   "blocks": [
///     { "container": "Layout1", "block_name": "TITLE", "handle": "3A",
///       "attributes": [ { "tag": "NAME", "value": "Sheet 1" } ] }
///   ]
/// }
/// ```
///
/// 未知字段会原样保留，写回时不丢失。
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use super::traits::{BlockScanner, BlockWriter, LockProbe, PendingChange};
use crate::block::{Attribute, BlockInstance};
use crate::utils::{create_backup, eq_ignore_case, EditorError};

/// JSON 块文件（磁盘格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFile {
    /// 格式版本，写回时保持不变
    pub format_version: u32,
    /// 块列表
    #[serde(default)]
    pub blocks: Vec<StoredBlock>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 磁盘上的单个块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlock {
    #[serde(default)]
    pub container: String,
    pub block_name: String,
    pub handle: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BlockFile {
    /// 从文件读取
    pub fn read(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        let file: BlockFile = serde_json::from_str(&content)?;
        Ok(file)
    }

    /// 转换为块实例列表
    pub fn to_instances(&self, file_path: &str) -> Vec<BlockInstance> {
        self.blocks
            .iter()
            .map(|block| BlockInstance {
                file_path: file_path.to_string(),
                container_name: block.container.clone(),
                block_name: block.block_name.clone(),
                instance_id: block.handle.clone(),
                attributes: block.attributes.clone(),
            })
            .collect()
    }

    /// 应用一条变更
    ///
    /// 按句柄定位块，校验块名，再按标签写入新值
    fn apply_change(&mut self, change: &PendingChange) -> Result<(), EditorError> {
        let key = &change.key;
        let block = self
            .blocks
            .iter_mut()
            .find(|block| eq_ignore_case(&block.handle, &key.instance_id))
            .ok_or_else(|| EditorError::InvalidFormat(format!("未找到句柄: {}", key.instance_id)))?;

        if !eq_ignore_case(&block.block_name, &key.block_name) {
            return Err(EditorError::InvalidFormat(format!(
                "句柄 {} 的块名不匹配: 期望 {}，实际 {}",
                key.instance_id, key.block_name, block.block_name
            )));
        }

        let attribute = block
            .attributes
            .iter_mut()
            .find(|attr| eq_ignore_case(&attr.tag, &key.tag))
            .ok_or_else(|| EditorError::InvalidFormat(format!(
                "句柄 {} 没有属性 {}",
                key.instance_id, key.tag
            )))?;

        attribute.value = change.value.clone();
        Ok(())
    }
}

/// 默认的块文件扫描器（JSON 格式）
#[derive(Debug, Clone, Default)]
pub struct DefaultBlockScanner;

impl BlockScanner for DefaultBlockScanner {
    fn scan(&self, path: &Path) -> Result<Vec<BlockInstance>, Box<dyn std::error::Error>> {
        let file = BlockFile::read(path)?;
        Ok(file.to_instances(&path.to_string_lossy()))
    }
}

/// 默认的块文件写入器（JSON 格式）
///
/// 先写入同目录临时文件再重命名，失败时源文件保持不变
#[derive(Debug, Clone, Default)]
pub struct DefaultBlockWriter {
    /// 写入前是否创建带时间戳的备份
    pub backup: bool,
}

impl DefaultBlockWriter {
    /// 创建写入器
    pub fn new(backup: bool) -> Self {
        Self { backup }
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }
}

impl BlockWriter for DefaultBlockWriter {
    fn write_and_save(
        &self,
        path: &Path,
        changes: &[PendingChange],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = BlockFile::read(path)?;

        // 先在内存中应用全部变更，任一失败则不触碰磁盘
        for change in changes {
            file.apply_change(change)?;
        }

        let json_output = serde_json::to_string_pretty(&file)?;

        if self.backup {
            let backup_path = create_backup(path)?;
            log::debug!("已创建备份: {:?}", backup_path);
        }

        replace_file(path, &Self::temp_path(path), json_output.as_bytes())?;
        Ok(())
    }
}

/// 先写临时文件再重命名覆盖目标；任一步失败都会删除临时文件
fn replace_file(path: &Path, temp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let result = std::fs::write(temp_path, contents).and_then(|_| std::fs::rename(temp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(temp_path);
    }
    result
}

/// 默认的锁检测器
///
/// 文件旁存在 `<文件名><suffix>` 的锁文件时视为被占用
#[derive(Debug, Clone)]
pub struct DefaultLockProbe {
    /// 锁文件后缀
    pub suffix: String,
}

impl DefaultLockProbe {
    /// 创建锁检测器
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    /// 锁文件路径
    pub fn lock_path(&self, path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(&self.suffix);
        path.with_file_name(name)
    }
}

impl Default for DefaultLockProbe {
    fn default() -> Self {
        Self::new(".lock")
    }
}

impl LockProbe for DefaultLockProbe {
    fn is_locked_externally(&self, path: &Path) -> bool {
        self.lock_path(path).exists()
    }
}
