/// 属性编辑器模块
///
/// 提供有状态的编辑接口，协调基线缓存、覆盖层、作用域与撤销历史。
/// 遵循"修改-保存分离"原则，所有修改操作仅在内存中进行，需要显式调用保存。

use std::sync::atomic::AtomicBool;
use serde::Serialize;
use crate::baseline::{BaselineCache, ScanStatus};
use crate::block::BlockInstance;
use crate::config::EditorConfig;
use crate::io::{BlockScanner, BlockWriter, LockProbe};
use crate::utils::{eq_ignore_case, EditorError};
use crate::NOT_APPLICABLE;
use super::bulk::{self, RevertTarget, TargetFiles};
use super::history::UndoHistory;
use super::overlay::{ChangeKey, ChangeOverlay};
use super::persist::{self, FileError, FileProgress, UpdateResult};
use super::scope::{ScopeResolver, Selection};
use super::stats::EditorStats;

/// 加载结果
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// 新加载的文件
    pub loaded: Vec<String>,
    /// 已在工作集中而跳过的文件
    pub skipped: Vec<String>,
    /// 扫描失败的文件（仍会加入工作集，实例为空）
    pub errors: Vec<FileError>,
}

/// 待保存的属性变更（用于审阅）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub key: ChangeKey,
    /// 基线值，`None` 表示基线中已不存在
    pub old_value: Option<String>,
    pub new_value: String,
}

impl std::fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: \"{}\" -> \"{}\"",
            self.key,
            truncate(self.old_value.as_deref().unwrap_or(NOT_APPLICABLE), 30),
            truncate(&self.new_value, 30)
        )
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 单元格视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub tag: String,
    /// 有效值（覆盖层优先，否则基线）
    pub value: String,
    pub modified: bool,
}

/// 行视图（一个可见的块实例）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub file_path: String,
    pub container_name: String,
    pub block_name: String,
    pub instance_id: String,
    pub cells: Vec<CellView>,
}

impl RowView {
    /// 按标签取单元格
    pub fn cell(&self, tag: &str) -> Option<&CellView> {
        self.cells.iter().find(|cell| eq_ignore_case(&cell.tag, tag))
    }
}

/// 属性编辑器 - 管理多个文件的待保存修改
///
/// # 核心特性
/// - **稀疏**: 只保存与基线不同的值
/// - **可撤销**: 每次真实的状态变化都记录快照，包括文件移除
/// - **作用域**: 视图和批量操作都以当前作用域为默认目标
///
/// # 使用示例
///
/// ```rust,ignore
/// use block_attr_editor::{AttributeEditor, EditorConfig};
/// use block_attr_editor::io::{DefaultBlockScanner, DefaultBlockWriter, DefaultLockProbe};
///
/// let mut editor = AttributeEditor::new(Box::new(DefaultBlockScanner), &EditorConfig::default());
/// editor.load_files(&["a.json".into(), "b.json".into()], &mut |_: &FileProgress| {});
///
/// editor.apply_similar("DOOR", "WIDTH", "36", &TargetFiles::Scope);
/// println!("待保存 {} 处", editor.pending_count());
///
/// let result = editor.save(&DefaultBlockWriter::new(true), &DefaultLockProbe::default(), &mut |_: &FileProgress| {}, None)?;
/// println!("{}", result);
/// ```
pub struct AttributeEditor {
    scanner: Box<dyn BlockScanner>,
    cache: BaselineCache,
    loaded_files: Vec<String>,
    overlay: ChangeOverlay,
    scope: ScopeResolver,
    history: UndoHistory,
}

impl AttributeEditor {
    /// 创建编辑器
    pub fn new(scanner: Box<dyn BlockScanner>, config: &EditorConfig) -> Self {
        Self {
            scanner,
            cache: BaselineCache::new(),
            loaded_files: Vec::new(),
            overlay: ChangeOverlay::new(),
            scope: ScopeResolver::new(),
            history: UndoHistory::new(config.max_history),
        }
    }

    // === 文件集 ===

    /// 文件是否在工作集中
    pub fn is_loaded(&self, file_path: &str) -> bool {
        self.loaded_files.iter().any(|f| eq_ignore_case(f, file_path))
    }

    /// 加载文件（不进入撤销历史）
    ///
    /// 扫描失败的文件仍加入工作集，实例为空，失败原因记录在报告中
    pub fn load_files(
        &mut self,
        paths: &[String],
        progress: &mut dyn FnMut(&FileProgress),
    ) -> LoadReport {
        let mut report = LoadReport::default();

        for (index, path) in paths.iter().enumerate() {
            if self.is_loaded(path) {
                report.skipped.push(path.clone());
            } else {
                if let ScanStatus::Failed(message) =
                    self.cache.ensure(path, false, self.scanner.as_ref())
                {
                    report.errors.push(FileError {
                        file_path: path.clone(),
                        message,
                    });
                }
                self.loaded_files.push(path.clone());
                report.loaded.push(path.clone());
            }

            progress(&FileProgress {
                processed: index + 1,
                total: paths.len(),
                current_file: path.clone(),
            });
        }

        self.scope.refresh(&self.cache, &self.loaded_files);
        report
    }

    /// 强制重新扫描文件
    ///
    /// 与新基线相等的待保存值会被剪除；若发生剪除，历史重置为当前状态
    pub fn reload_file(&mut self, file_path: &str) -> Result<ScanStatus, EditorError> {
        let file = self
            .loaded_file(file_path)
            .ok_or_else(|| EditorError::FileNotLoaded(file_path.to_string()))?;

        let status = self.cache.ensure(&file, true, self.scanner.as_ref());
        if self.prune_against_baseline(&[file]) > 0 {
            self.reset_history();
        }
        self.scope.refresh(&self.cache, &self.loaded_files);
        Ok(status)
    }

    /// 从工作集移除文件（可撤销）
    ///
    /// 同时丢弃这些文件的待保存修改；撤销时文件会被重新加载
    pub fn remove_files(&mut self, paths: &[String]) -> bool {
        let targets: Vec<String> = paths
            .iter()
            .filter_map(|path| self.loaded_file(path))
            .collect();
        if targets.is_empty() {
            return false;
        }

        self.history.ensure_baseline(&self.overlay);
        self.detach_files(&targets);
        self.history.record(
            &self.overlay,
            format!("移除 {} 个文件", targets.len()),
            targets,
        );
        true
    }

    fn loaded_file(&self, file_path: &str) -> Option<String> {
        self.loaded_files
            .iter()
            .find(|f| eq_ignore_case(f, file_path))
            .cloned()
    }

    fn detach_files(&mut self, files: &[String]) {
        self.loaded_files
            .retain(|loaded| !files.iter().any(|f| eq_ignore_case(f, loaded)));
        for file in files {
            self.cache.evict(file);
        }
        let loaded = &self.loaded_files;
        self.overlay
            .remove_where(|key, _| !loaded.iter().any(|f| eq_ignore_case(f, &key.file_path)));
        self.scope.refresh(&self.cache, &self.loaded_files);
    }

    // === 作用域 ===

    /// 设置文件选择并刷新块名作用域
    pub fn set_file_selection(&mut self, selection: Selection) {
        self.scope.set_file_selection(selection);
        self.scope.refresh(&self.cache, &self.loaded_files);
    }

    /// 设置块名选择
    pub fn set_block_selection(&mut self, selection: Selection) {
        self.scope.set_block_selection(selection);
    }

    /// 作用域内的文件
    pub fn files_in_scope(&self) -> Vec<String> {
        self.scope.files_in_scope(&self.loaded_files)
    }

    /// 作用域内的块名
    pub fn blocks_in_scope(&self) -> Vec<String> {
        self.scope.blocks_in_scope()
    }

    /// 实例是否可见
    pub fn is_visible(&self, instance: &BlockInstance) -> bool {
        self.scope.is_visible(instance, &self.loaded_files)
    }

    fn target_files(&self, target: &TargetFiles) -> Vec<String> {
        match target {
            TargetFiles::Selected(files) => files
                .iter()
                .filter_map(|file| self.loaded_file(file))
                .collect(),
            TargetFiles::Scope => self.files_in_scope(),
            TargetFiles::AllLoaded => self.loaded_files.clone(),
        }
    }

    // === 编辑操作 ===

    /// 执行一次修改，仅在确有变化时记录快照
    fn mutate<F>(&mut self, description: String, operation: F) -> usize
    where
        F: FnOnce(&BaselineCache, &mut ChangeOverlay) -> usize,
    {
        self.history.ensure_baseline(&self.overlay);
        let changed = operation(&self.cache, &mut self.overlay);
        if changed > 0 {
            self.history.record(&self.overlay, description, Vec::new());
        }
        changed
    }

    /// 编辑单个单元格
    ///
    /// 属性不存在（不适用）的单元格是只读的，返回 false
    pub fn edit_cell(&mut self, file_path: &str, instance_id: &str, tag: &str, value: &str) -> bool {
        let description = format!("编辑 {} [{}] {}", file_path, instance_id, tag);
        self.mutate(description, |cache, overlay| {
            usize::from(bulk::edit_cell(cache, overlay, file_path, instance_id, tag, value))
        }) > 0
    }

    /// 对目标文件中的同名块批量应用值
    ///
    /// # 返回
    /// 实际发生变化的单元格数量
    pub fn apply_similar(
        &mut self,
        block_name: &str,
        tag: &str,
        value: &str,
        target: &TargetFiles,
    ) -> usize {
        let files = self.target_files(target);
        let description = format!("批量应用 {}.{} = {}", block_name, tag, value);
        self.mutate(description, |cache, overlay| {
            bulk::apply_similar(cache, overlay, &files, block_name, tag, value)
        })
    }

    /// 将源单元格的当前有效值传播到所有已加载文件的同名块（忽略作用域）
    pub fn apply_similar_global(&mut self, file_path: &str, instance_id: &str, tag: &str) -> usize {
        let Some(instance) = self.cache.instance(file_path, instance_id) else {
            return 0;
        };
        let block_name = instance.block_name.clone();
        let Some(value) = self.effective_value(file_path, instance_id, tag) else {
            return 0;
        };

        let files = self.loaded_files.clone();
        let description = format!("全局应用 {}.{} = {}", block_name, tag, value);
        self.mutate(description, |cache, overlay| {
            bulk::apply_similar(cache, overlay, &files, &block_name, tag, &value)
        })
    }

    /// 撤回修改
    pub fn revert(&mut self, target: &RevertTarget) -> usize {
        self.mutate(target.describe(), |_, overlay| bulk::revert(overlay, target))
    }

    // === 撤销/重做 ===

    /// 撤销，返回被撤销操作的描述
    ///
    /// 若被撤销的操作移除过文件，这些文件会被重新加载；
    /// 与新基线相等的条目被剪除，若发生剪除，历史重置为当前状态
    pub fn undo(&mut self) -> Option<String> {
        let step = self.history.undo()?;
        self.overlay = step.overlay;

        let mut restored = Vec::new();
        for file in step.restore_files {
            if !self.is_loaded(&file) {
                log::info!("撤销移除，重新加载 {}", file);
                self.cache.ensure(&file, true, self.scanner.as_ref());
                self.loaded_files.push(file.clone());
                restored.push(file);
            }
        }
        if !restored.is_empty() && self.prune_against_baseline(&restored) > 0 {
            log::warn!("重新加载的文件在移除期间已变化，历史重置");
            self.reset_history();
        }

        self.scope.refresh(&self.cache, &self.loaded_files);
        Some(step.description)
    }

    /// 重做，返回被重做操作的描述
    pub fn redo(&mut self) -> Option<String> {
        let step = self.history.redo()?;
        self.overlay = step.overlay;
        // 再次移除文件，并丢弃因此孤立的条目
        self.detach_files(&step.remove_files);
        Some(step.description)
    }

    /// 是否可以撤销
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// 是否可以重做
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn reset_history(&mut self) {
        self.history.clear();
        if !self.overlay.is_empty() {
            self.history.ensure_baseline(&self.overlay);
        }
    }

    // === 查询 ===

    /// 有效值：覆盖层值优先，否则基线值；属性不存在时为 `None`
    pub fn effective_value(&self, file_path: &str, instance_id: &str, tag: &str) -> Option<String> {
        let instance = self.cache.instance(file_path, instance_id)?;
        let baseline = instance.get_attribute(tag)?;
        let key = ChangeKey::new(file_path, instance_id, instance.block_name.clone(), tag);
        Some(self.overlay.get(&key).unwrap_or(baseline).to_string())
    }

    /// 显示值：属性不存在时为 [`NOT_APPLICABLE`]
    pub fn display_value(&self, file_path: &str, instance_id: &str, tag: &str) -> String {
        self.effective_value(file_path, instance_id, tag)
            .unwrap_or_else(|| NOT_APPLICABLE.to_string())
    }

    /// 单元格是否已修改
    pub fn is_modified(&self, file_path: &str, instance_id: &str, tag: &str) -> bool {
        self.cache
            .instance(file_path, instance_id)
            .map(|instance| {
                self.overlay.contains(&ChangeKey::new(
                    file_path,
                    instance_id,
                    instance.block_name.clone(),
                    tag,
                ))
            })
            .unwrap_or(false)
    }

    /// 基线值
    pub fn original_value(&self, file_path: &str, instance_id: &str, tag: &str) -> Option<&str> {
        self.cache.original_value(file_path, instance_id, tag)
    }

    /// 所有待保存修改（按文件、块名、实例、标签排序）
    pub fn pending_changes(&self) -> Vec<AttributeChange> {
        self.overlay
            .sorted_entries()
            .into_iter()
            .map(|(key, value)| AttributeChange {
                key: key.clone(),
                old_value: self
                    .cache
                    .original_value(&key.file_path, &key.instance_id, &key.tag)
                    .map(str::to_string),
                new_value: value.to_string(),
            })
            .collect()
    }

    /// 待保存修改数量
    pub fn pending_count(&self) -> usize {
        self.overlay.len()
    }

    /// 可见行（基线与覆盖层合并后的视图）
    pub fn rows(&self) -> Vec<RowView> {
        self.visible_instances()
            .map(|instance| RowView {
                file_path: instance.file_path.clone(),
                container_name: instance.container_name.clone(),
                block_name: instance.block_name.clone(),
                instance_id: instance.instance_id.clone(),
                cells: instance
                    .attributes
                    .iter()
                    .map(|attr| {
                        let key = ChangeKey::new(
                            instance.file_path.clone(),
                            instance.instance_id.clone(),
                            instance.block_name.clone(),
                            attr.tag.clone(),
                        );
                        let pending = self.overlay.get(&key);
                        CellView {
                            tag: attr.tag.clone(),
                            value: pending.unwrap_or(&attr.value).to_string(),
                            modified: pending.is_some(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// 可见行中出现过的所有属性标签（按首次出现顺序，大小写不敏感去重）
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for instance in self.visible_instances() {
            for attr in &instance.attributes {
                if !columns.iter().any(|c| eq_ignore_case(c, &attr.tag)) {
                    columns.push(attr.tag.clone());
                }
            }
        }
        columns
    }

    fn visible_instances(&self) -> impl Iterator<Item = &BlockInstance> {
        self.files_in_scope()
            .into_iter()
            .flat_map(move |file| self.cache.get(&file).iter())
            .filter(move |instance| self.is_visible(instance))
    }

    /// 统计信息
    pub fn stats(&self) -> EditorStats {
        EditorStats {
            loaded_files: self.loaded_files.len(),
            failed_files: self
                .loaded_files
                .iter()
                .filter(|f| self.cache.failure(f).is_some())
                .count(),
            instance_count: self.cache.instance_count(),
            visible_rows: self.visible_instances().count(),
            pending_changes: self.overlay.len(),
            files_with_changes: self.overlay.files().len(),
            history_depth: self.history.len(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    // === 保存 ===

    /// 保存所有待保存修改（需要显式调用）
    ///
    /// 成功写入的文件会被重新扫描，与新基线相等的条目被剪除；
    /// 若发生剪除，撤销历史重置为保存后的状态
    pub fn save(
        &mut self,
        writer: &dyn BlockWriter,
        lock_probe: &dyn LockProbe,
        progress: &mut dyn FnMut(&FileProgress),
        cancel: Option<&AtomicBool>,
    ) -> Result<UpdateResult, EditorError> {
        let snapshot = self.overlay.clone();
        let result = persist::save_changes(
            &snapshot,
            &self.loaded_files,
            self.scanner.as_ref(),
            writer,
            lock_probe,
            progress,
            cancel,
        )?;

        for file in &result.written_files {
            self.cache.ensure(file, true, self.scanner.as_ref());
        }
        if self.prune_against_baseline(&result.written_files) > 0 {
            self.reset_history();
        }
        self.scope.refresh(&self.cache, &self.loaded_files);

        Ok(result)
    }

    /// 剪除与基线相等或已无法解析的条目
    fn prune_against_baseline(&mut self, files: &[String]) -> usize {
        let cache = &self.cache;
        self.overlay.remove_where(|key, value| {
            if !files.iter().any(|f| eq_ignore_case(f, &key.file_path)) {
                return false;
            }
            match cache.instance(&key.file_path, &key.instance_id) {
                Some(instance) if instance.is_block(&key.block_name) => {
                    instance.get_attribute(&key.tag).map_or(true, |b| b == value)
                }
                _ => true,
            }
        })
    }

    // === 访问器 ===

    /// 已加载的文件
    pub fn loaded_files(&self) -> &[String] {
        &self.loaded_files
    }

    /// 文件的基线实例
    pub fn instances(&self, file_path: &str) -> &[BlockInstance] {
        self.cache.get(file_path)
    }

    /// 基线缓存
    pub fn cache(&self) -> &BaselineCache {
        &self.cache
    }

    /// 覆盖层
    pub fn overlay(&self) -> &ChangeOverlay {
        &self.overlay
    }

    /// 作用域
    pub fn scope(&self) -> &ScopeResolver {
        &self.scope
    }

    /// 撤销历史
    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// 生成编辑摘要
    pub fn summary(&self) -> String {
        format!(
            "文件: {}, 修改状态: {}, {}",
            self.loaded_files.len(),
            if self.overlay.is_empty() {
                "未修改"
            } else {
                "已修改"
            },
            self.history.summary()
        )
    }
}
