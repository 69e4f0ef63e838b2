use thiserror::Error;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("File not loaded: {0}")]
    FileNotLoaded(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 大小写不敏感的字符串比较
///
/// 与 [`hash_ignore_case`] 使用同一套折叠规则，保证 Eq 与 Hash 一致。
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// 大小写不敏感的哈希
pub fn hash_ignore_case<H: Hasher>(s: &str, state: &mut H) {
    for c in s.chars().flat_map(char::to_lowercase) {
        c.hash(state);
    }
    // 字段分隔，避免 ("ab","c") 与 ("a","bc") 冲突
    0xFFu8.hash(state);
}

/// 折叠大小写，用作映射表的键
///
/// 逐字符折叠，与 [`eq_ignore_case`] 规则一致（不套用词尾 Σ 等上下文规则）
pub fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<std::path::PathBuf, EditorError> {
    if !file_path.exists() {
        return Err(EditorError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(EditorError::IoError)?;

    Ok(backup_path)
}
