/// IO 抽象层 - trait 定义
///
/// 该模块定义了块文件扫描、锁检测与写回的抽象接口，支持依赖注入和测试 mock。
/// 核心引擎只依赖这些 trait，不理解具体的文件格式。

use std::path::Path;
use serde::Serialize;
use crate::block::BlockInstance;
use crate::editor::ChangeKey;

/// 一条待写入的变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    /// 变更键（文件、实例、块名、标签）
    pub key: ChangeKey,
    /// 新值
    pub value: String,
}

/// 块文件扫描 trait
///
/// # 职责
/// - 将源文件扫描为 `BlockInstance` 列表（基线数据）
/// - 允许失败，调用方将失败视为"该文件没有实例"
///
/// # 实现示例
/// ```rust,ignore
/// pub struct MyScanner;
/// impl BlockScanner for MyScanner {
///     fn scan(&self, path: &Path) -> Result<Vec<BlockInstance>, Box<dyn std::error::Error>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait BlockScanner {
    /// 扫描文件中的所有块实例
    ///
    /// # 参数
    /// * `path` - 源文件路径
    fn scan(&self, path: &Path) -> Result<Vec<BlockInstance>, Box<dyn std::error::Error>>;
}

/// 外部锁检测 trait
///
/// # 职责
/// - 写入前检查文件是否被其他程序打开
pub trait LockProbe {
    /// 文件是否被外部锁定
    fn is_locked_externally(&self, path: &Path) -> bool;
}

/// 块文件写回 trait
///
/// # 职责
/// - 将一个文件的全部变更作为一个整体写入并保存
/// - 必须原子化：失败时源文件保持不变
/// - 必须保留文件原有的格式版本
pub trait BlockWriter {
    /// 写入变更并保存文件
    ///
    /// # 参数
    /// * `path` - 目标文件路径
    /// * `changes` - 该文件的所有已解析变更
    fn write_and_save(
        &self,
        path: &Path,
        changes: &[PendingChange],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
