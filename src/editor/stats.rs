/// 编辑器统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorStats {
    pub loaded_files: usize,
    pub failed_files: usize,
    pub instance_count: usize,
    pub visible_rows: usize,
    pub pending_changes: usize,
    pub files_with_changes: usize,
    pub history_depth: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl std::fmt::Display for EditorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 编辑器统计信息 ===")?;
        writeln!(f, "已加载文件数: {}", self.loaded_files)?;
        writeln!(f, "扫描失败文件数: {}", self.failed_files)?;
        writeln!(f, "块实例数量: {}", self.instance_count)?;
        writeln!(f, "可见行数: {}", self.visible_rows)?;
        writeln!(f, "待保存修改: {}", self.pending_changes)?;
        writeln!(f, "涉及文件数: {}", self.files_with_changes)?;
        writeln!(f, "历史快照数: {}", self.history_depth)?;
        writeln!(f, "可撤销: {}", if self.can_undo { "是" } else { "否" })?;
        writeln!(f, "可重做: {}", if self.can_redo { "是" } else { "否" })?;
        Ok(())
    }
}
