/// 作用域解析模块
///
/// 将"已选文件"与"已选块名"解析为可见行集合，也是批量操作的默认目标。
/// 块名作用域为空时不显示任何行，即使所有文件都已选中。

use std::collections::{BTreeMap, BTreeSet};
use crate::baseline::BaselineCache;
use crate::block::BlockInstance;
use crate::utils::fold_case;

/// 选择状态
///
/// `All` 与 `Only(空集)` 不同：后者表示什么都不选
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// 空选择
    pub fn none() -> Self {
        Selection::Only(BTreeSet::new())
    }

    /// 由名称列表构造（折叠大小写）
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Selection::Only(names.into_iter().map(|n| fold_case(n.as_ref())).collect())
    }

    fn contains(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.contains(&fold_case(name)),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::All
    }
}

/// 作用域解析器
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    files: Selection,
    blocks: Selection,
    /// 当前作用域内可用的块名（折叠 → 显示名）
    available: BTreeMap<String, String>,
    /// 曾经出现过的全部块名（折叠），只增不减
    seen: BTreeSet<String>,
}

impl ScopeResolver {
    /// 创建作用域（默认全选）
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前文件选择
    pub fn file_selection(&self) -> &Selection {
        &self.files
    }

    /// 当前块名选择
    pub fn block_selection(&self) -> &Selection {
        &self.blocks
    }

    /// 设置文件选择（调用方随后需要 `refresh`）
    pub fn set_file_selection(&mut self, selection: Selection) {
        self.files = selection;
    }

    /// 设置块名选择
    pub fn set_block_selection(&mut self, selection: Selection) {
        self.blocks = selection;
    }

    /// 作用域内的文件（保持加载顺序）
    pub fn files_in_scope(&self, loaded_files: &[String]) -> Vec<String> {
        loaded_files
            .iter()
            .filter(|file| self.files.contains(file))
            .cloned()
            .collect()
    }

    /// 作用域内的块名（显示名，按折叠后排序）
    pub fn blocks_in_scope(&self) -> Vec<String> {
        self.available
            .iter()
            .filter(|(folded, _)| self.block_selected(folded))
            .map(|(_, display)| display.clone())
            .collect()
    }

    /// 作用域内可选的全部块名
    pub fn available_blocks(&self) -> Vec<String> {
        self.available.values().cloned().collect()
    }

    /// 块名是否曾经出现过
    pub fn has_seen_block(&self, block_name: &str) -> bool {
        self.seen.contains(&fold_case(block_name))
    }

    fn block_selected(&self, folded: &str) -> bool {
        match &self.blocks {
            Selection::All => true,
            Selection::Only(set) => set.contains(folded),
        }
    }

    /// 实例是否可见
    pub fn is_visible(&self, instance: &BlockInstance, loaded_files: &[String]) -> bool {
        let folded_block = fold_case(&instance.block_name);
        if !self.available.contains_key(&folded_block) || !self.block_selected(&folded_block) {
            return false;
        }
        let folded_file = fold_case(&instance.file_path);
        self.files.contains(&instance.file_path)
            && loaded_files.iter().any(|file| fold_case(file) == folded_file)
    }

    /// 文件作用域或已加载文件变化后刷新块名作用域
    ///
    /// - 已选块名若不再出现在作用域内的实例中则取消选择
    /// - 从未出现过的块名默认选中；出现过的不会被自动选中，显式取消的选择因此得以保留
    pub fn refresh(&mut self, cache: &BaselineCache, loaded_files: &[String]) {
        let mut available = BTreeMap::new();
        for file in self.files_in_scope(loaded_files) {
            for instance in cache.get(&file) {
                available
                    .entry(fold_case(&instance.block_name))
                    .or_insert_with(|| instance.block_name.clone());
            }
        }

        if let Selection::Only(selected) = &mut self.blocks {
            selected.retain(|name| available.contains_key(name));
            for name in available.keys() {
                if !self.seen.contains(name) {
                    selected.insert(name.clone());
                }
            }
        }

        self.seen.extend(available.keys().cloned());
        self.available = available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::tests::MemoryScanner;

    fn setup() -> (BaselineCache, Vec<String>) {
        let scanner = MemoryScanner::default()
            .with_file(
                "F1",
                vec![
                    BlockInstance::new("F1", "Model", "DOOR", "1"),
                    BlockInstance::new("F1", "Model", "TITLE", "2"),
                ],
            )
            .with_file("F2", vec![BlockInstance::new("F2", "Model", "WINDOW", "1")]);
        let mut cache = BaselineCache::new();
        let loaded = vec!["F1".to_string(), "F2".to_string()];
        for file in &loaded {
            cache.ensure(file, false, &scanner);
        }
        (cache, loaded)
    }

    #[test]
    fn test_all_selected_shows_everything() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.refresh(&cache, &loaded);

        assert_eq!(scope.files_in_scope(&loaded), loaded);
        assert_eq!(scope.blocks_in_scope(), vec!["DOOR", "TITLE", "WINDOW"]);
        assert!(cache.get("F2").iter().all(|i| scope.is_visible(i, &loaded)));
    }

    #[test]
    fn test_empty_block_scope_hides_everything() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.refresh(&cache, &loaded);
        scope.set_block_selection(Selection::none());

        assert!(scope.blocks_in_scope().is_empty());
        for file in &loaded {
            assert!(cache.get(file).iter().all(|i| !scope.is_visible(i, &loaded)));
        }
    }

    #[test]
    fn test_empty_file_scope_hides_everything() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.set_file_selection(Selection::none());
        scope.refresh(&cache, &loaded);

        assert!(scope.files_in_scope(&loaded).is_empty());
        assert!(scope.blocks_in_scope().is_empty());
    }

    #[test]
    fn test_file_scope_change_drops_missing_blocks() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.refresh(&cache, &loaded);
        scope.set_block_selection(Selection::only(["door", "window"]));

        scope.set_file_selection(Selection::only(["F1"]));
        scope.refresh(&cache, &loaded);

        // WINDOW 只存在于 F2，被移出；TITLE 之前已被显式取消，保持取消
        assert_eq!(scope.blocks_in_scope(), vec!["DOOR"]);
        assert_eq!(
            scope.block_selection(),
            &Selection::Only(["door".to_string()].into_iter().collect())
        );
    }

    #[test]
    fn test_new_blocks_are_selected_by_default() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.set_file_selection(Selection::only(["F1"]));
        scope.refresh(&cache, &loaded);
        scope.set_block_selection(Selection::only(["door"]));

        scope.set_file_selection(Selection::All);
        scope.refresh(&cache, &loaded);

        // WINDOW 是新出现的块名，自动选中；TITLE 保持取消
        assert_eq!(scope.blocks_in_scope(), vec!["DOOR", "WINDOW"]);
    }

    #[test]
    fn test_deselection_survives_scope_round_trip() {
        let (cache, loaded) = setup();
        let mut scope = ScopeResolver::new();
        scope.refresh(&cache, &loaded);
        scope.set_block_selection(Selection::only(["door", "window"]));

        scope.set_file_selection(Selection::only(["F2"]));
        scope.refresh(&cache, &loaded);
        assert_eq!(scope.blocks_in_scope(), vec!["WINDOW"]);

        scope.set_file_selection(Selection::All);
        scope.refresh(&cache, &loaded);

        // TITLE 曾被显式取消，重新出现时不会被自动选中
        assert!(scope.has_seen_block("title"));
        assert!(!scope.blocks_in_scope().contains(&"TITLE".to_string()));
        let title = &cache.get("F1")[1];
        assert!(!scope.is_visible(title, &loaded));
    }
}
