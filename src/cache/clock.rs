//! 时钟抽象
//!
//! 缓存过期判断依赖当前时间，测试中用 `ManualClock` 模拟时间流逝

use chrono::Utc;
#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};

/// 毫秒级时钟
pub trait Clock: Send + Sync {
    /// 当前 Unix 时间戳（毫秒）
    fn now_ms(&self) -> i64;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// 手动推进的时钟
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    /// 前进指定毫秒
    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
