pub mod block;
pub mod baseline;
pub mod config;
pub mod editor;
pub mod io;
pub mod utils;

// 重新导出主要结构
pub use block::{Attribute, BlockInstance};
pub use baseline::{BaselineCache, ScanStatus};
pub use config::EditorConfig;
pub use editor::{
    AttributeChange, AttributeEditor, ChangeKey, ChangeOverlay, FileError, RevertTarget,
    Selection, TargetFiles, UpdateResult,
};
pub use utils::EditorError;

// 常量定义
/// 属性在实例中不存在时的显示值（只读单元格）
pub const NOT_APPLICABLE: &str = "N/A";
/// 默认块文件扩展名
pub const SUPPORTED_EXTENSIONS: &[&str] = &["json"];
