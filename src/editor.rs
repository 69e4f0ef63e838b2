/// 编辑器层模块
///
/// 该模块提供有状态的编辑接口，支持稀疏变更覆盖、作用域、撤销/重做等功能。
/// 遵循"修改-保存分离"原则，所有修改操作仅在内存中进行，需要显式调用保存。
///
/// # 架构设计
///
/// - **overlay**: 变更覆盖层，向基线折叠
/// - **scope**: 作用域解析，决定可见行与批量操作目标
/// - **bulk**: 批量编辑与四种粒度的撤回
/// - **history**: 有界快照历史，支持撤销/重做（包括文件移除）
/// - **persist**: 逐文件写回并汇总结果
/// - **attribute_editor**: 协调以上组件的编辑器
///
/// # 使用示例
///
/// ```rust,ignore
/// use block_attr_editor::{AttributeEditor, EditorConfig, TargetFiles};
/// use block_attr_editor::io::{DefaultBlockScanner, DefaultBlockWriter, DefaultLockProbe};
///
/// // 加载 + 编辑 + 保存工作流
/// let mut editor = AttributeEditor::new(Box::new(DefaultBlockScanner), &EditorConfig::default());
/// editor.load_files(&files, &mut |_| {});
///
/// editor.apply_similar("DOOR", "WIDTH", "36", &TargetFiles::AllLoaded);
/// println!("修改了 {} 处", editor.pending_count());
///
/// editor.save(&DefaultBlockWriter::default(), &DefaultLockProbe::default(), &mut |_| {}, None)?;
/// ```
pub mod overlay;
pub mod scope;
pub mod bulk;
pub mod history;
pub mod persist;
pub mod stats;
pub mod attribute_editor;

// === 导出公共接口 ===
pub use overlay::{ChangeKey, ChangeOverlay};
pub use scope::{ScopeResolver, Selection};
pub use bulk::{RevertTarget, TargetFiles};
pub use history::{ChangeSnapshot, HistoryStep, UndoHistory};
pub use persist::{save_changes, FileError, FileProgress, UpdateResult};
pub use stats::EditorStats;
pub use attribute_editor::{AttributeChange, AttributeEditor, CellView, LoadReport, RowView};
