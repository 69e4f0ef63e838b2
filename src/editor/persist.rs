/// 持久化合并模块
///
/// 将覆盖层条目按文件分组，针对重新扫描的基线逐文件写回，并汇总每个文件的结果。
/// 单个文件的失败不会中断整个保存过程。

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use serde::Serialize;
use crate::block::BlockInstance;
use crate::io::{BlockScanner, BlockWriter, LockProbe, PendingChange};
use crate::utils::{eq_ignore_case, fold_case, EditorError};
use super::overlay::{ChangeKey, ChangeOverlay};

/// 单个文件的错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file_path: String,
    pub message: String,
}

/// 保存结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateResult {
    /// 参与保存的文件总数
    pub total_files: usize,
    /// 成功的文件数（包括没有变更的文件）
    pub successful_files: usize,
    /// 失败的文件数
    pub failed_files: usize,
    /// 每个失败文件的错误
    pub errors: Vec<FileError>,
    /// 实际写入了磁盘的文件
    pub written_files: Vec<String>,
    /// 无法解析到记录/标签而跳过的条目数
    pub skipped_entries: usize,
    /// 是否在中途被取消
    pub cancelled: bool,
}

impl UpdateResult {
    /// 是否全部成功
    pub fn is_success(&self) -> bool {
        self.failed_files == 0 && !self.cancelled
    }

    fn fail(&mut self, file_path: &str, message: String) {
        log::warn!("保存失败 {}: {}", file_path, message);
        self.failed_files += 1;
        self.errors.push(FileError {
            file_path: file_path.to_string(),
            message,
        });
    }
}

impl std::fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 保存结果 ===")?;
        writeln!(f, "文件总数: {}", self.total_files)?;
        writeln!(f, "成功: {}", self.successful_files)?;
        writeln!(f, "失败: {}", self.failed_files)?;
        writeln!(f, "写入文件数: {}", self.written_files.len())?;
        if self.skipped_entries > 0 {
            writeln!(f, "跳过条目: {}", self.skipped_entries)?;
        }
        if self.cancelled {
            writeln!(f, "⚠ 保存已取消")?;
        }
        for error in &self.errors {
            writeln!(f, "  ✗ {}: {}", error.file_path, error.message)?;
        }
        Ok(())
    }
}

/// 逐文件进度（加载与保存共用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProgress {
    pub processed: usize,
    pub total: usize,
    pub current_file: String,
}

/// 在新扫描的实例中解析一条变更
///
/// 实例不存在、块名不一致（标识被复用）或标签缺失时返回 `None`
fn resolve<'a>(fresh: &'a [BlockInstance], key: &ChangeKey) -> Option<&'a BlockInstance> {
    fresh
        .iter()
        .find(|instance| eq_ignore_case(&instance.instance_id, &key.instance_id))
        .filter(|instance| instance.is_block(&key.block_name))
        .filter(|instance| instance.has_attribute(&key.tag))
}

/// 保存覆盖层中的变更
///
/// # 参数
/// * `overlay` - 覆盖层（调用方应传入快照，保存期间不要修改）
/// * `loaded_files` - 已加载的文件
/// * `scanner` - 用于重新扫描基线
/// * `writer` - 写入器
/// * `lock_probe` - 锁检测
/// * `progress` - 每处理完一个文件调用一次
/// * `cancel` - 协作式取消，在文件之间检查
///
/// # 返回
/// 单个文件的失败汇总在 `UpdateResult` 中；只有覆盖层引用了未加载的文件时返回错误
pub fn save_changes(
    overlay: &ChangeOverlay,
    loaded_files: &[String],
    scanner: &dyn BlockScanner,
    writer: &dyn BlockWriter,
    lock_probe: &dyn LockProbe,
    progress: &mut dyn FnMut(&FileProgress),
    cancel: Option<&AtomicBool>,
) -> Result<UpdateResult, EditorError> {
    let loaded: HashSet<String> = loaded_files.iter().map(|f| fold_case(f)).collect();

    let mut groups: HashMap<String, Vec<PendingChange>> = HashMap::new();
    for (key, value) in overlay.sorted_entries() {
        let folded = fold_case(&key.file_path);
        if !loaded.contains(&folded) {
            return Err(EditorError::InvalidScope(format!(
                "变更引用了未加载的文件: {}",
                key.file_path
            )));
        }
        groups.entry(folded).or_default().push(PendingChange {
            key: key.clone(),
            value: value.to_string(),
        });
    }

    let mut result = UpdateResult {
        total_files: loaded_files.len(),
        ..Default::default()
    };

    for (index, file) in loaded_files.iter().enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            log::info!("保存已取消，剩余 {} 个文件未处理", loaded_files.len() - index);
            result.cancelled = true;
            break;
        }

        save_file(file, groups.get(&fold_case(file)), scanner, writer, lock_probe, &mut result);

        progress(&FileProgress {
            processed: index + 1,
            total: loaded_files.len(),
            current_file: file.clone(),
        });
    }

    Ok(result)
}

/// 保存单个文件
fn save_file(
    file: &str,
    changes: Option<&Vec<PendingChange>>,
    scanner: &dyn BlockScanner,
    writer: &dyn BlockWriter,
    lock_probe: &dyn LockProbe,
    result: &mut UpdateResult,
) {
    let Some(changes) = changes.filter(|c| !c.is_empty()) else {
        result.successful_files += 1;
        return;
    };

    let path = Path::new(file);
    if lock_probe.is_locked_externally(path) {
        result.fail(file, "文件已被其他程序打开，请关闭后重试".to_string());
        return;
    }

    // 不使用缓存，避免针对过期数据写入
    let fresh = match scanner.scan(path) {
        Ok(instances) => instances,
        Err(e) => {
            result.fail(file, format!("重新扫描失败: {}", e));
            return;
        }
    };

    let mut resolved = Vec::with_capacity(changes.len());
    for change in changes {
        if resolve(&fresh, &change.key).is_some() {
            resolved.push(change.clone());
        } else {
            log::debug!("跳过无法解析的变更: {}", change.key);
            result.skipped_entries += 1;
        }
    }

    if resolved.is_empty() {
        result.successful_files += 1;
        return;
    }

    match writer.write_and_save(path, &resolved) {
        Ok(()) => {
            log::info!("已保存 {} ({} 处变更)", file, resolved.len());
            result.successful_files += 1;
            result.written_files.push(file.to_string());
        }
        Err(e) => result.fail(file, e.to_string()),
    }
}
