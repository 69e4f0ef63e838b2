/// IO 抽象层模块
///
/// 该模块提供了块文件扫描与写回的抽象接口，遵循依赖倒置原则。
/// 支持依赖注入、测试 mock 和替换 IO 实现（如专有图纸格式、内存 IO 等）。
///
/// # 架构设计
///
/// - **traits**: 定义 Scanner/Writer/LockProbe trait 接口
/// - **json_io**: JSON 块文件的默认实现
///
/// # 使用示例
///
/// ```rust,ignore
/// use block_attr_editor::io::{BlockScanner, DefaultBlockScanner};
///
/// let scanner = DefaultBlockScanner;
/// let instances = scanner.scan(Path::new("drawing.json"))?;
/// ```
pub mod traits;
pub mod json_io;

// === 导出 trait 定义 ===
pub use traits::{BlockScanner, BlockWriter, LockProbe, PendingChange};

// === 导出默认实现 ===
pub use json_io::{BlockFile, DefaultBlockScanner, DefaultBlockWriter, DefaultLockProbe, StoredBlock};
