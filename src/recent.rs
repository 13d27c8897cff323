//! 最近浏览的股票
//!
//! 最多保留 5 只，按代码去重，最近的排在最前，保存在持久化存储的 `recentStocks` 键下。

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::cache::PersistentStore;
use crate::models::StockCodeInfo;

/// 存储键
pub const RECENT_STOCKS_KEY: &str = "recentStocks";
/// 最多保留数量
pub const MAX_RECENT: usize = 5;

/// 最近浏览列表
pub struct RecentStocks {
    store: Arc<dyn PersistentStore>,
    // 串行化读改写
    write_lock: Mutex<()>,
}

impl RecentStocks {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// 读取列表，数据损坏时返回空列表
    pub fn list(&self) -> Vec<StockCodeInfo> {
        let raw = match self.store.get_item(RECENT_STOCKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("读取最近浏览失败: {}", e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("最近浏览数据已损坏: {}", e);
            Vec::new()
        })
    }

    /// 记录一次浏览，返回更新后的列表
    pub fn add(&self, stock: StockCodeInfo) -> Result<Vec<StockCodeInfo>> {
        let _guard = self.write_lock.lock().map_err(|_| anyhow::anyhow!("最近浏览锁已损坏"))?;

        let mut stocks = self.list();
        stocks.retain(|s| s.code != stock.code);
        stocks.insert(0, stock);
        stocks.truncate(MAX_RECENT);

        self.store
            .set_item(RECENT_STOCKS_KEY, &serde_json::to_string(&stocks)?)?;
        Ok(stocks)
    }

    /// 清空列表
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(RECENT_STOCKS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn stock(code: &str) -> StockCodeInfo {
        serde_json::from_value(serde_json::json!({ "code": code, "name": format!("股票{}", code) }))
            .unwrap()
    }

    #[test]
    fn test_recent_dedup_and_limit() {
        println!("\n========== 测试最近浏览 ==========");
        let store = Arc::new(MemoryStore::new());
        let recent = RecentStocks::new(store.clone());

        for code in ["600000", "600001", "600002", "600003", "600004", "600005"] {
            recent.add(stock(code)).unwrap();
        }
        let codes: Vec<String> = recent.list().into_iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!["600005", "600004", "600003", "600002", "600001"]);

        // 重复浏览移到最前
        let list = recent.add(stock("600002")).unwrap();
        let codes: Vec<&str> = list.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["600002", "600005", "600004", "600003", "600001"]);

        // 重新创建后仍可读取
        let reopened = RecentStocks::new(store);
        assert_eq!(reopened.list().len(), MAX_RECENT);
        println!("✅ 最近浏览测试通过！");
    }

    #[test]
    fn test_corrupted_recent_list() {
        let store = Arc::new(MemoryStore::new());
        store.set_item(RECENT_STOCKS_KEY, "not json").unwrap();
        let recent = RecentStocks::new(store);
        assert!(recent.list().is_empty());
        assert_eq!(recent.add(stock("600519")).unwrap().len(), 1);
        recent.clear().unwrap();
        assert!(recent.list().is_empty());
    }
}
