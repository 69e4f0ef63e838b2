/// 批量操作引擎
///
/// 单元格编辑、按块名/标签批量应用、四种粒度的撤回。
/// 所有编辑都经过 [`ChangeOverlay::apply_with_baseline_collapse`]。

use std::collections::HashSet;
use crate::baseline::BaselineCache;
use crate::utils::eq_ignore_case;
use super::overlay::{ChangeKey, ChangeOverlay};

/// 批量应用的目标文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFiles {
    /// 子选择中显式选定的文件
    Selected(Vec<String>),
    /// 当前作用域内的文件
    Scope,
    /// 所有已加载的文件
    AllLoaded,
}

/// 撤回目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertTarget {
    /// 一组单元格
    Cells(Vec<ChangeKey>),
    /// 单个属性（来自界面选择）
    Attribute(ChangeKey),
    /// 某块名的所有变更，跨所有已加载文件
    Block(String),
    /// 某文件的所有变更
    File(String),
}

impl RevertTarget {
    /// 描述（用于历史记录）
    pub fn describe(&self) -> String {
        match self {
            RevertTarget::Cells(keys) => format!("撤回 {} 个单元格", keys.len()),
            RevertTarget::Attribute(key) => format!("撤回属性 {}", key),
            RevertTarget::Block(name) => format!("撤回块 {}", name),
            RevertTarget::File(path) => format!("撤回文件 {}", path),
        }
    }
}

/// 编辑单个单元格
///
/// 实例不存在或没有该属性（"不适用"）时跳过并返回 false
pub fn edit_cell(
    cache: &BaselineCache,
    overlay: &mut ChangeOverlay,
    file_path: &str,
    instance_id: &str,
    tag: &str,
    new_value: &str,
) -> bool {
    let Some(instance) = cache.instance(file_path, instance_id) else {
        return false;
    };
    let Some(baseline) = instance.get_attribute(tag) else {
        return false;
    };

    let key = ChangeKey::new(
        instance.file_path.clone(),
        instance.instance_id.clone(),
        instance.block_name.clone(),
        tag,
    );
    overlay.apply_with_baseline_collapse(key, new_value, Some(baseline))
}

/// 对目标文件中所有匹配块名且拥有该属性的实例应用新值
///
/// # 返回
/// 实际发生变化的条目数量
pub fn apply_similar(
    cache: &BaselineCache,
    overlay: &mut ChangeOverlay,
    files: &[String],
    block_name: &str,
    tag: &str,
    new_value: &str,
) -> usize {
    let mut changed = 0;
    for file in files {
        for instance in cache.get(file).iter().filter(|i| i.is_block(block_name)) {
            let Some(baseline) = instance.get_attribute(tag) else {
                continue;
            };
            let key = ChangeKey::new(
                instance.file_path.clone(),
                instance.instance_id.clone(),
                instance.block_name.clone(),
                tag,
            );
            if overlay.apply_with_baseline_collapse(key, new_value, Some(baseline)) {
                changed += 1;
            }
        }
    }
    changed
}

/// 按撤回目标移除条目
///
/// 四种粒度统一为一次谓词移除
pub fn revert(overlay: &mut ChangeOverlay, target: &RevertTarget) -> usize {
    match target {
        RevertTarget::Cells(keys) => {
            let keys: HashSet<&ChangeKey> = keys.iter().collect();
            overlay.remove_where(|key, _| keys.contains(key))
        }
        RevertTarget::Attribute(target_key) => overlay.remove_where(|key, _| key == target_key),
        RevertTarget::Block(name) => {
            overlay.remove_where(|key, _| eq_ignore_case(&key.block_name, name))
        }
        RevertTarget::File(path) => {
            overlay.remove_where(|key, _| eq_ignore_case(&key.file_path, path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::tests::MemoryScanner;
    use crate::block::BlockInstance;

    fn setup() -> (BaselineCache, Vec<String>) {
        let scanner = MemoryScanner::default()
            .with_file(
                "F1",
                vec![
                    BlockInstance::new("F1", "Model", "DOOR", "3A").with_attribute("WIDTH", "30"),
                    BlockInstance::new("F1", "Model", "DOOR", "3B").with_attribute("WIDTH", "32"),
                    BlockInstance::new("F1", "Model", "TITLE", "10").with_attribute("NAME", "A"),
                ],
            )
            .with_file(
                "F2",
                vec![
                    BlockInstance::new("F2", "Model", "door", "3A").with_attribute("width", "30"),
                    BlockInstance::new("F2", "Model", "DOOR", "5C"),
                ],
            );
        let mut cache = BaselineCache::new();
        let files = vec!["F1".to_string(), "F2".to_string()];
        for file in &files {
            cache.ensure(file, false, &scanner);
        }
        (cache, files)
    }

    #[test]
    fn test_edit_cell_skips_not_applicable() {
        let (cache, _) = setup();
        let mut overlay = ChangeOverlay::new();

        assert!(!edit_cell(&cache, &mut overlay, "F2", "5C", "WIDTH", "40"));
        assert!(!edit_cell(&cache, &mut overlay, "F2", "99", "WIDTH", "40"));
        assert!(overlay.is_empty());

        assert!(edit_cell(&cache, &mut overlay, "F1", "3A", "WIDTH", "36"));
        assert!(!edit_cell(&cache, &mut overlay, "F1", "3a", "width", "36"));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn test_apply_similar_matches_block_and_tag() {
        let (cache, files) = setup();
        let mut overlay = ChangeOverlay::new();

        let changed = apply_similar(&cache, &mut overlay, &files, "DOOR", "WIDTH", "32");
        // F1/3B 已经是 32，5C 没有 WIDTH
        assert_eq!(changed, 2);
        assert_eq!(overlay.len(), 2);
        assert!(!overlay.contains(&ChangeKey::new("F1", "3B", "DOOR", "WIDTH")));
        assert!(overlay.contains(&ChangeKey::new("F2", "3A", "DOOR", "WIDTH")));

        assert_eq!(apply_similar(&cache, &mut overlay, &files, "DOOR", "WIDTH", "32"), 0);
    }

    #[test]
    fn test_apply_similar_respects_file_subset() {
        let (cache, _) = setup();
        let mut overlay = ChangeOverlay::new();

        let changed = apply_similar(&cache, &mut overlay, &["F2".to_string()], "DOOR", "WIDTH", "40");
        assert_eq!(changed, 1);
        assert_eq!(overlay.files(), vec!["F2".to_string()]);
    }

    #[test]
    fn test_revert_granularities() {
        let (cache, files) = setup();
        let mut overlay = ChangeOverlay::new();
        apply_similar(&cache, &mut overlay, &files, "DOOR", "WIDTH", "40");
        edit_cell(&cache, &mut overlay, "F1", "10", "NAME", "B");
        assert_eq!(overlay.len(), 4);

        let cell = ChangeKey::new("f1", "3a", "door", "width");
        assert_eq!(revert(&mut overlay, &RevertTarget::Attribute(cell.clone())), 1);
        assert_eq!(revert(&mut overlay, &RevertTarget::Cells(vec![cell])), 0);

        assert_eq!(revert(&mut overlay, &RevertTarget::File("f2".into())), 1);
        assert_eq!(revert(&mut overlay, &RevertTarget::Block("door".into())), 1);
        assert_eq!(overlay.len(), 1);
        assert!(overlay.contains(&ChangeKey::new("F1", "10", "TITLE", "NAME")));
    }
}
