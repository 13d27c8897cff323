//! TTL 缓存
//!
//! 两级缓存：内存 Map（快速路径）+ 持久化存储（重启后恢复）。
//!
//! - 读：先查内存，未命中再查持久化存储，命中后回填内存
//! - 写：同时写内存与持久化存储；持久化失败只记录警告，内存缓存仍然有效
//! - 过期：读取时惰性删除，启动时调用 `clear_expired` 批量清理
//! - 除 TTL 外没有淘汰策略，键的数量由调用方控制

pub mod clock;
pub mod store;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use store::{JsonFileStore, MemoryStore, PersistentStore};

/// 持久化存储中缓存键的前缀
pub const CACHE_PREFIX: &str = "cache_";

/// 缓存条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    /// 缓存数据
    pub data: T,
    /// 写入时间（毫秒）
    pub timestamp: i64,
    /// 有效期（毫秒）
    #[serde(rename = "expireTime")]
    pub expire_time: i64,
}

impl<T> CacheEntry<T> {
    /// 在 `now` 时刻是否仍然有效
    pub fn is_valid_at(&self, now: i64) -> bool {
        now - self.timestamp < self.expire_time
    }

    /// 剩余有效时间（毫秒）
    pub fn remaining_ms(&self, now: i64) -> i64 {
        self.timestamp + self.expire_time - now
    }
}

/// 缓存统计
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_count: usize,
    pub persistent_count: usize,
}

/// TTL 缓存服务
pub struct TtlCache {
    memory: Mutex<HashMap<String, CacheEntry<Value>>>,
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
}

fn persistent_key(key: &str) -> String {
    format!("{}{}", CACHE_PREFIX, key)
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl TtlCache {
    /// 使用系统时钟创建缓存
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// 指定时钟创建缓存
    pub fn with_clock(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            store,
            clock,
        }
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 读取缓存
    ///
    /// 条目在自身有效期内且年龄小于 `max_age` 时返回数据。
    /// 已过期的条目会被删除；无法解析的持久化条目按未命中处理并删除。
    pub fn get<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Option<T> {
        let now = self.clock.now_ms();
        let max_age_ms = duration_ms(max_age);

        // 内存缓存
        let memory_hit = {
            let mut memory = self.memory();
            match memory.get(key) {
                Some(entry) if entry.is_valid_at(now) => Some(entry.clone()),
                Some(_) => {
                    log::debug!("[缓存过期] {} (内存缓存)", key);
                    memory.remove(key);
                    None
                }
                None => None,
            }
        };

        if let Some(entry) = memory_hit {
            if now - entry.timestamp >= max_age_ms {
                return None;
            }
            let remaining_ms = entry.remaining_ms(now);
            return match serde_json::from_value::<T>(entry.data) {
                Ok(data) => {
                    log::debug!("[缓存命中] {} (内存缓存，剩余 {}秒)", key, remaining_ms / 1000);
                    Some(data)
                }
                Err(e) => {
                    log::warn!("缓存数据类型不匹配，已删除: {} ({})", key, e);
                    self.delete(key);
                    None
                }
            };
        }

        // 持久化缓存
        let pkey = persistent_key(key);
        let raw = match self.store.get_item(&pkey) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("读取持久化缓存失败: {} ({})", key, e);
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("持久化缓存已损坏，已删除: {} ({})", key, e);
                self.remove_persistent(&pkey);
                return None;
            }
        };

        if !entry.is_valid_at(now) {
            log::debug!("[缓存过期] {} (持久化缓存)", key);
            self.remove_persistent(&pkey);
            return None;
        }
        if now - entry.timestamp >= max_age_ms {
            return None;
        }

        match serde_json::from_value::<T>(entry.data.clone()) {
            Ok(data) => {
                log::debug!(
                    "[缓存命中] {} (持久化缓存，剩余 {}秒)",
                    key,
                    entry.remaining_ms(now) / 1000
                );
                self.memory().insert(key.to_string(), entry);
                Some(data)
            }
            Err(e) => {
                log::warn!("持久化缓存类型不匹配，已删除: {} ({})", key, e);
                self.remove_persistent(&pkey);
                None
            }
        }
    }

    /// 写入缓存
    pub fn set<T: Serialize>(&self, key: &str, data: &T, max_age: Duration) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("缓存数据序列化失败: {} ({})", key, e);
                return;
            }
        };

        let entry = CacheEntry {
            data: value,
            timestamp: self.clock.now_ms(),
            expire_time: duration_ms(max_age),
        };

        let serialized = serde_json::to_string(&entry);
        self.memory().insert(key.to_string(), entry);

        let result = serialized
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.store.set_item(&persistent_key(key), &raw));
        match result {
            Ok(()) => log::debug!("[缓存已保存] {} (有效期 {}秒)", key, max_age.as_secs()),
            Err(e) => log::warn!("保存持久化缓存失败: {} ({})", key, e),
        }
    }

    /// 删除指定缓存
    pub fn delete(&self, key: &str) {
        self.memory().remove(key);
        self.remove_persistent(&persistent_key(key));
    }

    /// 删除所有以 `prefix` 开头的缓存键
    pub fn delete_prefix(&self, prefix: &str) {
        self.memory().retain(|key, _| !key.starts_with(prefix));
        let full_prefix = persistent_key(prefix);
        match self.store.keys() {
            Ok(keys) => keys
                .iter()
                .filter(|k| k.starts_with(&full_prefix))
                .for_each(|k| self.remove_persistent(k)),
            Err(e) => log::warn!("列出持久化缓存失败: {}", e),
        }
    }

    /// 清除所有缓存（只影响缓存键，不触碰存储中的其他数据）
    pub fn clear(&self) {
        self.memory().clear();
        match self.store.keys() {
            Ok(keys) => keys
                .iter()
                .filter(|k| k.starts_with(CACHE_PREFIX))
                .for_each(|k| self.remove_persistent(k)),
            Err(e) => log::warn!("清除持久化缓存失败: {}", e),
        }
    }

    /// 清除过期缓存
    ///
    /// 返回删除的持久化条目数量
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.memory().retain(|_, entry| entry.is_valid_at(now));

        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("清除过期缓存失败: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            let expired = match self.store.get_item(key) {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry<Value>>(&raw)
                    .map(|entry| !entry.is_valid_at(now))
                    // 解析失败直接删除
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    log::warn!("读取持久化缓存失败: {} ({})", key, e);
                    false
                }
            };
            if expired {
                self.remove_persistent(key);
                removed += 1;
            }
        }
        removed
    }

    /// 缓存统计
    pub fn stats(&self) -> CacheStats {
        let persistent_count = match self.store.keys() {
            Ok(keys) => keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)).count(),
            Err(e) => {
                log::warn!("获取持久化缓存统计失败: {}", e);
                0
            }
        };
        CacheStats {
            memory_count: self.memory().len(),
            persistent_count,
        }
    }

    fn remove_persistent(&self, pkey: &str) {
        if let Err(e) = self.store.remove_item(pkey) {
            log::warn!("删除持久化缓存失败: {} ({})", pkey, e);
        }
    }
}
