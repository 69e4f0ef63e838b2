/// 基线缓存模块
///
/// 按文件惰性保存扫描得到的 `BlockInstance` 列表。只有显式重新加载才会失效。

use std::collections::HashMap;
use std::path::Path;
use crate::block::BlockInstance;
use crate::io::BlockScanner;
use crate::utils::{eq_ignore_case, fold_case};

/// 扫描状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// 已在缓存中，未扫描
    Cached,
    /// 扫描成功，包含实例数量
    Scanned(usize),
    /// 扫描失败，缓存为空列表
    Failed(String),
}

/// 基线缓存
///
/// 文件路径大小写不敏感
#[derive(Debug, Default, Clone)]
pub struct BaselineCache {
    entries: HashMap<String, Vec<BlockInstance>>,
    failures: HashMap<String, String>,
}

impl BaselineCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 确保文件已加载
    ///
    /// # 参数
    /// * `file_path` - 文件路径
    /// * `force_reload` - 是否强制重新扫描
    /// * `scanner` - 扫描器
    ///
    /// # 返回
    /// 扫描失败不会返回错误，而是缓存空列表并记录失败原因
    pub fn ensure(
        &mut self,
        file_path: &str,
        force_reload: bool,
        scanner: &dyn BlockScanner,
    ) -> ScanStatus {
        let key = fold_case(file_path);
        if !force_reload && self.entries.contains_key(&key) {
            return ScanStatus::Cached;
        }

        match scanner.scan(Path::new(file_path)) {
            Ok(instances) => {
                let count = instances.len();
                log::debug!("扫描 {} 得到 {} 个块实例", file_path, count);
                self.failures.remove(&key);
                self.entries.insert(key, instances);
                ScanStatus::Scanned(count)
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("扫描失败 {}: {}", file_path, message);
                self.entries.insert(key.clone(), Vec::new());
                self.failures.insert(key, message.clone());
                ScanStatus::Failed(message)
            }
        }
    }

    /// 获取文件的全部实例（未加载时为空）
    pub fn get(&self, file_path: &str) -> &[BlockInstance] {
        self.entries
            .get(&fold_case(file_path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 按实例标识查找（取第一个匹配）
    pub fn instance(&self, file_path: &str, instance_id: &str) -> Option<&BlockInstance> {
        self.get(file_path)
            .iter()
            .find(|instance| eq_ignore_case(&instance.instance_id, instance_id))
    }

    /// 获取基线值
    ///
    /// 实例或标签不存在时返回 `None`，与空字符串区分
    pub fn original_value(&self, file_path: &str, instance_id: &str, tag: &str) -> Option<&str> {
        self.instance(file_path, instance_id)
            .and_then(|instance| instance.get_attribute(tag))
    }

    /// 文件是否已在缓存中
    pub fn contains(&self, file_path: &str) -> bool {
        self.entries.contains_key(&fold_case(file_path))
    }

    /// 最近一次扫描的失败原因
    pub fn failure(&self, file_path: &str) -> Option<&str> {
        self.failures.get(&fold_case(file_path)).map(String::as_str)
    }

    /// 移除文件的缓存
    pub fn evict(&mut self, file_path: &str) {
        let key = fold_case(file_path);
        self.entries.remove(&key);
        self.failures.remove(&key);
    }

    /// 缓存的实例总数
    pub fn instance_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 内存扫描器，记录扫描次数
    #[derive(Default)]
    pub(crate) struct MemoryScanner {
        pub files: RefCell<HashMap<String, Vec<BlockInstance>>>,
        pub scans: RefCell<usize>,
    }

    impl MemoryScanner {
        pub fn with_file(self, path: &str, instances: Vec<BlockInstance>) -> Self {
            self.files.borrow_mut().insert(path.to_string(), instances);
            self
        }
    }

    impl BlockScanner for MemoryScanner {
        fn scan(&self, path: &Path) -> Result<Vec<BlockInstance>, Box<dyn std::error::Error>> {
            *self.scans.borrow_mut() += 1;
            self.files
                .borrow()
                .get(path.to_string_lossy().as_ref())
                .cloned()
                .ok_or_else(|| format!("cannot open {}", path.display()).into())
        }
    }

    fn door(file: &str, id: &str, width: &str) -> BlockInstance {
        BlockInstance::new(file, "Model", "DOOR", id).with_attribute("WIDTH", width)
    }

    #[test]
    fn test_ensure_scans_once() {
        let scanner = MemoryScanner::default().with_file("F1", vec![door("F1", "3A", "30")]);
        let mut cache = BaselineCache::new();

        assert_eq!(cache.ensure("F1", false, &scanner), ScanStatus::Scanned(1));
        assert_eq!(cache.ensure("f1", false, &scanner), ScanStatus::Cached);
        assert_eq!(*scanner.scans.borrow(), 1);

        assert_eq!(cache.ensure("F1", true, &scanner), ScanStatus::Scanned(1));
        assert_eq!(*scanner.scans.borrow(), 2);
    }

    #[test]
    fn test_scan_failure_yields_empty_list() {
        let scanner = MemoryScanner::default();
        let mut cache = BaselineCache::new();

        let status = cache.ensure("missing", false, &scanner);
        assert!(matches!(status, ScanStatus::Failed(_)));
        assert!(cache.contains("missing"));
        assert!(cache.get("missing").is_empty());
        assert!(cache.failure("missing").unwrap().contains("cannot open"));
    }

    #[test]
    fn test_original_value_distinguishes_absent_from_empty() {
        let scanner = MemoryScanner::default().with_file(
            "F1",
            vec![BlockInstance::new("F1", "Model", "TITLE", "3A").with_attribute("REV", "")],
        );
        let mut cache = BaselineCache::new();
        cache.ensure("F1", false, &scanner);

        assert_eq!(cache.original_value("F1", "3a", "rev"), Some(""));
        assert_eq!(cache.original_value("F1", "3A", "DATE"), None);
        assert_eq!(cache.original_value("F1", "99", "REV"), None);
    }

    #[test]
    fn test_evict() {
        let scanner = MemoryScanner::default().with_file("F1", vec![door("F1", "3A", "30")]);
        let mut cache = BaselineCache::new();
        cache.ensure("F1", false, &scanner);
        assert_eq!(cache.instance_count(), 1);

        cache.evict("F1");
        assert!(!cache.contains("F1"));
        assert_eq!(cache.instance_count(), 0);
    }
}
