/// 变更覆盖层模块
///
/// 稀疏地保存 `ChangeKey → 待写入值`。任何与基线相等的值都会被立即剪除，
/// 因此"单元格是否已修改"就是一次成员检查。

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use serde::Serialize;
use crate::utils::{eq_ignore_case, fold_case, hash_ignore_case};

/// 变更键
///
/// 由 (文件, 实例标识, 块名, 属性标签) 组成，所有字段大小写不敏感。
/// `block_name` 与 `instance_id` 冗余，写回时用作安全校验。
#[derive(Debug, Clone, Serialize)]
pub struct ChangeKey {
    pub file_path: String,
    pub instance_id: String,
    pub block_name: String,
    pub tag: String,
}

impl ChangeKey {
    /// 创建变更键
    pub fn new(
        file_path: impl Into<String>,
        instance_id: impl Into<String>,
        block_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        ChangeKey {
            file_path: file_path.into(),
            instance_id: instance_id.into(),
            block_name: block_name.into(),
            tag: tag.into(),
        }
    }

    /// 排序键（折叠大小写）
    pub(crate) fn sort_key(&self) -> (String, String, String, String) {
        (
            fold_case(&self.file_path),
            fold_case(&self.block_name),
            fold_case(&self.instance_id),
            fold_case(&self.tag),
        )
    }
}

impl PartialEq for ChangeKey {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_case(&self.file_path, &other.file_path)
            && eq_ignore_case(&self.instance_id, &other.instance_id)
            && eq_ignore_case(&self.block_name, &other.block_name)
            && eq_ignore_case(&self.tag, &other.tag)
    }
}

impl Eq for ChangeKey {}

impl Hash for ChangeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.file_path, state);
        hash_ignore_case(&self.instance_id, state);
        hash_ignore_case(&self.block_name, state);
        hash_ignore_case(&self.tag, state);
    }
}

impl std::fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}.{}",
            self.file_path, self.instance_id, self.block_name, self.tag
        )
    }
}

/// 变更覆盖层
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeOverlay {
    entries: HashMap<ChangeKey, String>,
}

impl ChangeOverlay {
    /// 创建空覆盖层
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置待写入值
    ///
    /// # 返回
    /// 值与已存储的不同时返回 true
    pub fn set(&mut self, key: ChangeKey, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.entries.get(&key) == Some(&value) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// 获取待写入值
    pub fn get(&self, key: &ChangeKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// 移除条目，返回是否确实移除
    pub fn remove(&mut self, key: &ChangeKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// 应用编辑并向基线折叠
    ///
    /// 所有编辑路径的唯一入口：
    /// - 新值等于基线（逐字节比较）→ 删除已有条目
    /// - 否则写入新值
    ///
    /// `baseline` 为 `None` 表示没有可比较的基线，此时任何值都会被保存。
    /// 重复调用相同参数第二次返回 false。
    pub fn apply_with_baseline_collapse(
        &mut self,
        key: ChangeKey,
        new_value: &str,
        baseline: Option<&str>,
    ) -> bool {
        if baseline == Some(new_value) {
            self.remove(&key)
        } else {
            self.set(key, new_value)
        }
    }

    /// 按谓词批量移除，返回移除数量
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&ChangeKey, &str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, value| !predicate(key, value));
        before - self.entries.len()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否包含键
    pub fn contains(&self, key: &ChangeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// 遍历所有条目（无序）
    pub fn iter(&self) -> impl Iterator<Item = (&ChangeKey, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }

    /// 按文件、块名、实例、标签排序后的条目
    pub fn sorted_entries(&self) -> Vec<(&ChangeKey, &str)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_cached_key(|(key, _)| key.sort_key());
        entries
    }

    /// 含有变更的文件（折叠大小写后去重，保留首次出现的写法）
    pub fn files(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.sorted_entries()
            .into_iter()
            .filter(|(key, _)| seen.insert(fold_case(&key.file_path)))
            .map(|(key, _)| key.file_path.clone())
            .collect()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
