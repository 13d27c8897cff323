//! 持久化键值存储
//!
//! 相当于浏览器的 localStorage：字符串键、字符串值。
//! 缓存镜像、登录凭证、最近浏览的股票、回测草稿都存放在这里。

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// 持久化存储接口
pub trait PersistentStore: Send + Sync {
    /// 读取键值
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// 写入键值
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// 删除键
    fn remove_item(&self, key: &str) -> Result<()>;
    /// 列出全部键
    fn keys(&self) -> Result<Vec<String>>;
    /// 等待尚未落盘的写入完成
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// 内存存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        Ok(items.keys().cloned().collect())
    }
}

/// JSON 文件存储
///
/// 整个存储是一个 JSON 对象文件，每次写入整体落盘。
/// 在 tokio 运行时内落盘交给阻塞线程池，不占用请求线程；
/// 较早的快照晚于较新的快照到达时直接丢弃。
/// 打开时文件不存在视为空存储；文件损坏时记录警告并从空存储开始。
#[derive(Debug)]
pub struct JsonFileStore {
    items: Mutex<BTreeMap<String, String>>,
    version: AtomicU64,
    writer: Arc<SnapshotWriter>,
}

/// 按版本号顺序写入快照
#[derive(Debug)]
struct SnapshotWriter {
    path: PathBuf,
    /// 已落盘的版本
    written: Mutex<u64>,
}

impl SnapshotWriter {
    fn write(&self, version: u64, content: &str) -> Result<()> {
        let mut written = self.written.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        if version <= *written {
            return Ok(());
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).with_context(|| format!("写入 {} 失败", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("替换 {} 失败", self.path.display()))?;
        *written = version;
        Ok(())
    }
}

impl JsonFileStore {
    /// 打开（或创建）存储文件
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("读取存储文件 {} 失败", path.display()))?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(items) => items,
                Err(e) => {
                    log::warn!("存储文件 {} 已损坏，重新初始化: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("创建目录 {} 失败", parent.display()))?;
            }
        }

        log::info!("持久化存储: {} ({} 项)", path.display(), items.len());
        Ok(Self {
            items: Mutex::new(items),
            version: AtomicU64::new(0),
            writer: Arc::new(SnapshotWriter {
                path,
                written: Mutex::new(0),
            }),
        })
    }

    /// 在持有 `items` 锁时调用，保证版本号与快照内容一致
    fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string(items)?;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let writer = self.writer.clone();
                handle.spawn_blocking(move || {
                    if let Err(e) = writer.write(version, &content) {
                        log::error!("存储落盘失败: {:#}", e);
                    }
                });
                Ok(())
            }
            Err(_) => self.writer.write(version, &content),
        }
    }
}

impl PersistentStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
        Ok(items.keys().cloned().collect())
    }

    /// 同步写入最新快照，之后到达的旧快照会被丢弃
    fn flush(&self) -> Result<()> {
        let (version, content) = {
            let items = self.items.lock().map_err(|_| anyhow::anyhow!("存储锁已损坏"))?;
            (self.version.load(Ordering::SeqCst), serde_json::to_string(&*items)?)
        };
        self.writer.write(version, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试文件存储重新打开后数据仍在
    #[test]
    fn test_json_file_store_reopen() {
        println!("\n========== 测试文件存储持久化 ==========");
        let dir = std::env::temp_dir().join(format!(
            "quant_dashboard_store_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set_item("access_token", "abc").unwrap();
            store.set_item("cache_k", "{}").unwrap();
            store.remove_item("cache_k").unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_item("access_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get_item("cache_k").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["access_token".to_string()]);

        let _ = fs::remove_dir_all(&dir);
        println!("✅ 文件存储持久化测试通过！");
    }

    /// 测试损坏的存储文件
    #[test]
    fn test_json_file_store_corrupted() {
        let dir = std::env::temp_dir().join(format!("quant_dashboard_corrupt_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    fn temp_path(name: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "quant_dashboard_{}_{}_{}",
            name,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("store.json");
        (dir, path)
    }

    /// 运行时内写入由阻塞线程池落盘，flush 后文件为最新内容
    #[actix_web::test]
    async fn test_json_file_store_background_write() {
        println!("\n========== 测试后台落盘 ==========");
        let (dir, path) = temp_path("background");
        let store = JsonFileStore::open(&path).unwrap();
        for i in 0..20 {
            store.set_item("counter", &i.to_string()).unwrap();
        }
        store.remove_item("missing").unwrap();
        store.flush().unwrap();

        // 排队中的旧快照不会覆盖最新内容
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("counter").unwrap().as_deref(), Some("19"));

        let _ = fs::remove_dir_all(&dir);
        println!("✅ 后台落盘测试通过！");
    }

    /// 较旧版本的快照不会写入
    #[test]
    fn test_snapshot_writer_skips_stale() {
        let (dir, path) = temp_path("stale");
        fs::create_dir_all(&dir).unwrap();
        let writer = SnapshotWriter {
            path: path.clone(),
            written: Mutex::new(0),
        };
        writer.write(2, r#"{"k":"new"}"#).unwrap();
        writer.write(1, r#"{"k":"old"}"#).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"k":"new"}"#);
        let _ = fs::remove_dir_all(&dir);
    }
}
