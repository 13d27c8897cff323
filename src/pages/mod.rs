//! 页面视图模型
//!
//! 组合多个服务调用，产出页面需要的完整数据（含 ECharts option）。
//! 每个数据块有独立的加载状态，一个依赖失败不会让整页空白。

pub mod backtest_report;
pub mod kline_dashboard;
pub mod stock_detail;

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::Serialize;

use crate::client::ApiError;
use crate::models::get_beijing_time;

pub use backtest_report::BacktestReportPage;
pub use kline_dashboard::KLineDashboard;
pub use stock_detail::{QuotePoller, StockDetailPage};

/// 数据块加载状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum LoadState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadState::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LoadState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ApiError>> for LoadState<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(v) => LoadState::Success(v),
            Err(e) => LoadState::Error(e.to_string()),
        }
    }
}

/// 截至今天（北京时间）的最近 `days` 天，返回 `(start, end)`
pub fn recent_range(days: i64) -> (String, String) {
    let today = get_beijing_time().date_naive();
    range_ending(today, days)
}

fn range_ending(end: NaiveDate, days: i64) -> (String, String) {
    let start = end - ChronoDuration::days(days);
    (
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}
