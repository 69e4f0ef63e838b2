/// 撤销/重做历史模块
///
/// 线性、有界的覆盖层快照历史。每个快照是整个覆盖层的深拷贝，
/// 并可携带该操作移除的文件，使撤销能够恢复文件本身。

use chrono::{DateTime, Local};
use super::overlay::ChangeOverlay;

/// 默认历史容量
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// 初始快照描述
pub const INITIAL_STATE: &str = "initial state";

/// 覆盖层快照（不可变）
#[derive(Debug, Clone)]
pub struct ChangeSnapshot {
    description: String,
    changes: ChangeOverlay,
    removed_files: Vec<String>,
    created_at: DateTime<Local>,
}

impl ChangeSnapshot {
    fn new(description: String, changes: ChangeOverlay, removed_files: Vec<String>) -> Self {
        Self {
            description,
            changes,
            removed_files,
            created_at: Local::now(),
        }
    }

    /// 描述
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 快照时的覆盖层
    pub fn changes(&self) -> &ChangeOverlay {
        &self.changes
    }

    /// 该操作移除的文件
    pub fn removed_files(&self) -> &[String] {
        &self.removed_files
    }

    /// 创建时间
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// 一次撤销或重做的结果，由调用方应用
#[derive(Debug, Clone)]
pub struct HistoryStep {
    /// 应恢复的覆盖层
    pub overlay: ChangeOverlay,
    /// 被撤销/重做的操作描述
    pub description: String,
    /// 撤销后需要重新加载的文件
    pub restore_files: Vec<String>,
    /// 重做后需要再次移除的文件
    pub remove_files: Vec<String>,
}

/// 撤销历史
///
/// # 不变式
/// 任何时刻实时覆盖层都等于 `cursor` 处的快照（`cursor` 为 `None` 时为空）
#[derive(Debug, Clone)]
pub struct UndoHistory {
    snapshots: Vec<ChangeSnapshot>,
    /// `None` 表示尚未应用任何快照（位于第一个快照之前）
    cursor: Option<usize>,
    max_history: usize,
}

impl UndoHistory {
    /// 创建历史，容量至少为 1
    pub fn new(max_history: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: None,
            max_history: max_history.max(1),
        }
    }

    /// 首次破坏性修改前记录初始状态
    pub fn ensure_baseline(&mut self, current: &ChangeOverlay) {
        if self.snapshots.is_empty() {
            self.record(current, INITIAL_STATE, Vec::new());
        }
    }

    /// 记录快照
    ///
    /// # 行为
    /// - 丢弃 cursor 之后的可重做记录
    /// - 深拷贝当前覆盖层并追加
    /// - 超出容量时淘汰最旧的快照
    pub fn record(
        &mut self,
        current: &ChangeOverlay,
        description: impl Into<String>,
        removed_files: Vec<String>,
    ) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.snapshots.truncate(keep);
        self.snapshots
            .push(ChangeSnapshot::new(description.into(), current.clone(), removed_files));
        self.cursor = Some(self.snapshots.len() - 1);

        if self.snapshots.len() > self.max_history {
            let evicted = self.snapshots.remove(0);
            log::debug!("历史已满，淘汰快照: {}", evicted.description);
            self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
        }
    }

    /// 撤销
    ///
    /// cursor 位于起点之前时返回 `None`
    pub fn undo(&mut self) -> Option<HistoryStep> {
        let current = self.cursor?;
        let undone = &self.snapshots[current];
        let description = undone.description.clone();
        let restore_files = undone.removed_files.clone();

        self.cursor = current.checked_sub(1);
        let overlay = self
            .cursor
            .map(|c| self.snapshots[c].changes.clone())
            .unwrap_or_default();

        Some(HistoryStep {
            overlay,
            description,
            restore_files,
            remove_files: Vec::new(),
        })
    }

    /// 重做
    ///
    /// 已在最新快照时返回 `None`
    pub fn redo(&mut self) -> Option<HistoryStep> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let snapshot = self.snapshots.get(next)?;
        let step = HistoryStep {
            overlay: snapshot.changes.clone(),
            description: snapshot.description.clone(),
            restore_files: Vec::new(),
            remove_files: snapshot.removed_files.clone(),
        };
        self.cursor = Some(next);
        Some(step)
    }

    /// 是否可以撤销
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// 是否可以重做
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.snapshots.len()
    }

    /// 当前位置
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// 快照数量
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// 是否没有快照
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// 所有快照
    pub fn snapshots(&self) -> &[ChangeSnapshot] {
        &self.snapshots
    }

    /// 当前快照
    pub fn current(&self) -> Option<&ChangeSnapshot> {
        self.cursor.map(|c| &self.snapshots[c])
    }

    /// 容量
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// 清空历史
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = None;
    }

    /// 生成历史摘要
    pub fn summary(&self) -> String {
        format!(
            "快照数: {}, 当前位置: {}, 可撤销: {}, 可重做: {}",
            self.snapshots.len(),
            self.cursor.map_or_else(|| "-1".to_string(), |c| c.to_string()),
            self.can_undo(),
            self.can_redo()
        )
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
