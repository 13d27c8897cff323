//! 前端路由
//!
//! 浏览器端页面路径的解析与生成。401 跳转、侧边栏导航都通过 `Route` 表达。

use serde::{Serialize, Serializer};
use std::fmt;

/// 页面路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// 仪表盘（`/` 重定向至此）
    Dashboard,
    /// 行情
    Market,
    /// 个股详情 `/stock/:code`
    StockDetail(String),
    /// 策略管理
    Strategies,
    /// 数据下载
    DataDownload,
    /// K 线看板
    KLineDashboard,
    /// 回测报告
    BacktestReport,
    /// 登录
    Login,
}

impl Route {
    /// 解析页面路径，未知路径返回 None
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        let route = match trimmed {
            "" | "/dashboard" => Route::Dashboard,
            "/market" => Route::Market,
            "/strategies" => Route::Strategies,
            "/data-download" => Route::DataDownload,
            "/kline" => Route::KLineDashboard,
            "/backtest-report" => Route::BacktestReport,
            "/login" => Route::Login,
            other => {
                let code = other.strip_prefix("/stock/")?;
                if code.is_empty() || code.contains('/') {
                    return None;
                }
                Route::StockDetail(code.to_string())
            }
        };
        Some(route)
    }

    /// 生成页面路径
    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/dashboard".to_string(),
            Route::Market => "/market".to_string(),
            Route::StockDetail(code) => format!("/stock/{}", code),
            Route::Strategies => "/strategies".to_string(),
            Route::DataDownload => "/data-download".to_string(),
            Route::KLineDashboard => "/kline".to_string(),
            Route::BacktestReport => "/backtest-report".to_string(),
            Route::Login => "/login".to_string(),
        }
    }

    /// 侧边栏标题
    pub fn title(&self) -> &'static str {
        match self {
            Route::Dashboard => "仪表盘",
            Route::Market => "行情中心",
            Route::StockDetail(_) => "股票详情",
            Route::Strategies => "策略管理",
            Route::DataDownload => "数据下载",
            Route::KLineDashboard => "K线看板",
            Route::BacktestReport => "回测报告",
            Route::Login => "登录",
        }
    }

    /// 侧边栏菜单项
    pub fn menu() -> Vec<Route> {
        vec![
            Route::Dashboard,
            Route::Market,
            Route::Strategies,
            Route::DataDownload,
            Route::KLineDashboard,
        ]
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}
