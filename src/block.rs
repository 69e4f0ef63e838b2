use serde::{Serialize, Deserialize};
use crate::utils::eq_ignore_case;

/// 单个属性（标签 + 值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// 属性标签
    pub tag: String,
    /// 属性值
    pub value: String,
}

/// 块实例
///
/// 文件中一个可寻址的记录，由扫描产生：
/// - 扫描后不可变，重新加载时整体替换
/// - `instance_id` 在单个文件内唯一（例如句柄字符串），跨文件不唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInstance {
    /// 所属文件路径
    pub file_path: String,
    /// 逻辑分组（如布局/页面）
    pub container_name: String,
    /// 块名称
    pub block_name: String,
    /// 实例标识符
    pub instance_id: String,
    /// 属性列表（保持扫描顺序）
    pub attributes: Vec<Attribute>,
}

impl BlockInstance {
    /// 创建新的块实例
    pub fn new(
        file_path: impl Into<String>,
        container_name: impl Into<String>,
        block_name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        BlockInstance {
            file_path: file_path.into(),
            container_name: container_name.into(),
            block_name: block_name.into(),
            instance_id: instance_id.into(),
            attributes: Vec::new(),
        }
    }

    /// 追加属性（构建辅助）
    pub fn with_attribute(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            tag: tag.into(),
            value: value.into(),
        });
        self
    }

    /// 获取属性值（标签大小写不敏感）
    ///
    /// 返回 `None` 表示该实例没有此属性，与空字符串不同
    pub fn get_attribute(&self, tag: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| eq_ignore_case(&attr.tag, tag))
            .map(|attr| attr.value.as_str())
    }

    /// 检查是否包含指定属性
    pub fn has_attribute(&self, tag: &str) -> bool {
        self.get_attribute(tag).is_some()
    }

    /// 检查块名是否匹配（大小写不敏感）
    pub fn is_block(&self, block_name: &str) -> bool {
        eq_ignore_case(&self.block_name, block_name)
    }
}
