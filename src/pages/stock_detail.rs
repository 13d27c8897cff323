//! 股票详情页
//!
//! 股票信息、实时行情、最近 90 天日 K 线三路并发加载，各自独立成败。
//! 页面打开期间每 5 秒刷新一次行情，关闭时取消进行中的请求。

use futures::future::AbortHandle;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;

use super::{recent_range, LoadState};
use crate::charts::{build_kline_option, KLineChartState};
use crate::client::{abortable, ApiError};
use crate::formatters::{color_class, format_date, format_number, format_percent, format_time, trend_color};
use crate::models::{Frequency, KLineDataItem, Quote, Stock};
use crate::services::market::daily_query;
use crate::services::stock::normalize_code;
use crate::services::{MarketService, Services, StockService};

/// K 线默认天数
pub const KLINE_DAYS: i64 = 90;
/// 行情刷新间隔
pub const QUOTE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// 后端返回空 K 线时的提示
pub const EMPTY_KLINE_MESSAGE: &str = "API返回空数据，该股票可能没有K线数据";

/// K 线数据与对应的图表配置
#[derive(Debug, Clone, Serialize)]
pub struct KLinePanel {
    pub bars: Vec<KLineDataItem>,
    pub option: Value,
}

/// 行情卡片上显示的文字与配色
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSummary {
    pub price: String,
    pub change: String,
    pub change_pct: String,
    pub volume: String,
    pub amount: String,
    pub updated_at: String,
    pub time: String,
    pub color: &'static str,
    pub class_name: &'static str,
}

impl QuoteSummary {
    pub fn from_quote(quote: &Quote) -> Self {
        let (updated_at, time) = if quote.timestamp.is_empty() {
            ("-".to_string(), "-".to_string())
        } else {
            (
                format_date(&quote.timestamp, "YYYY-MM-DD HH:mm:ss"),
                format_time(&quote.timestamp),
            )
        };
        Self {
            price: format!("{:.2}", quote.price),
            change: format!("{:+.2}", quote.change),
            change_pct: format_percent(quote.change_pct, 2),
            volume: format_number(quote.volume),
            amount: quote.amount.map(format_number).unwrap_or_else(|| "-".to_string()),
            updated_at,
            time,
            color: trend_color(quote.change),
            class_name: color_class(quote.change),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDetailView {
    pub code: String,
    pub start_date: String,
    pub end_date: String,
    pub stock: LoadState<Stock>,
    pub quote: LoadState<Quote>,
    pub quote_summary: Option<QuoteSummary>,
    pub kline: LoadState<KLinePanel>,
}

pub struct StockDetailPage {
    stock: StockService,
    market: MarketService,
}

impl StockDetailPage {
    pub fn new(services: &Services) -> Self {
        Self {
            stock: services.stock.clone(),
            market: services.market.clone(),
        }
    }

    /// 加载最近 90 天
    pub async fn load(&self, code: &str, chart: KLineChartState) -> StockDetailView {
        let (start, end) = recent_range(KLINE_DAYS);
        self.load_range(code, &start, &end, chart).await
    }

    /// 加载指定区间
    pub async fn load_range(
        &self,
        code: &str,
        start_date: &str,
        end_date: &str,
        mut chart: KLineChartState,
    ) -> StockDetailView {
        let code = normalize_code(code);
        let query = daily_query(&code, start_date, end_date);

        let (stock, quote, bars) = tokio::join!(
            self.stock.get_stock(&code),
            self.market.get_quote(&code),
            self.market.get_kline_data(&query),
        );

        if let Err(e) = &stock {
            log::warn!("加载股票信息失败 {}: {}", code, e);
        }
        if let Err(e) = &quote {
            log::warn!("加载实时行情失败 {}: {}", code, e);
        }

        if let Ok(Stock { name: Some(name), .. }) = &stock {
            chart.title = format!("{} ({})", name, code);
        }
        if chart.subtitle.is_empty() {
            chart.subtitle = Frequency::Daily.label().to_string();
        }

        let kline = match bars {
            Ok(bars) if bars.is_empty() => LoadState::Error(EMPTY_KLINE_MESSAGE.to_string()),
            Ok(bars) => {
                let option = build_kline_option(&bars, None, &chart);
                LoadState::Success(KLinePanel { bars, option })
            }
            Err(e) => {
                log::warn!("加载K线失败 {}: {}", code, e);
                LoadState::Error(e.to_string())
            }
        };

        let quote: LoadState<Quote> = quote.into();
        StockDetailView {
            quote_summary: quote.value().map(QuoteSummary::from_quote),
            code,
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            stock: stock.into(),
            quote,
            kline,
        }
    }
}

// ==================== 行情轮询 ====================

/// 定时刷新行情
///
/// drop 时中止后台任务，进行中的请求一并取消。
pub struct QuotePoller {
    abort: AbortHandle,
    latest: watch::Receiver<LoadState<Quote>>,
}

impl QuotePoller {
    pub fn start(market: MarketService, code: &str, interval: Duration) -> Self {
        let code = normalize_code(code);
        let (abort, registration) = AbortHandle::new_pair();
        let (tx, latest) = watch::channel(LoadState::Loading);

        let task = async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let state = match market.get_quote(&code).await {
                    Ok(quote) => LoadState::Success(quote),
                    Err(e) => {
                        log::warn!("刷新行情失败 {}: {}", code, e);
                        LoadState::Error(e.to_string())
                    }
                };
                // 刷新失败时保留上一次成功的数据
                let keep_last = matches!(state, LoadState::Error(_)) && tx.borrow().is_success();
                if !keep_last && tx.send(state).is_err() {
                    return Ok::<_, ApiError>(());
                }
            }
        };

        tokio::spawn(async move {
            match abortable(task, registration).await {
                Err(ApiError::Cancelled) => log::debug!("行情轮询已停止"),
                Err(e) => log::warn!("行情轮询异常结束: {}", e),
                Ok(()) => log::debug!("行情无订阅者，轮询结束"),
            }
        });

        Self { abort, latest }
    }

    /// 订阅结果变化
    pub fn subscribe(&self) -> watch::Receiver<LoadState<Quote>> {
        self.latest.clone()
    }
}

impl Drop for QuotePoller {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, TtlCache};
    use crate::client::test_support::spawn_backend;
    use crate::client::{ApiClient, ClientOptions, NO_RESPONSE_MESSAGE};
    use actix_web::{web, HttpResponse};
    use std::sync::Arc;

    fn services(base_url: String) -> Services {
        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let client = ApiClient::new(&options, store.clone()).unwrap();
        Services::new(client, Arc::new(TtlCache::new(store.clone())), store)
    }

    fn quote_route(cfg: &mut web::ServiceConfig) {
        cfg.route(
            "/api/v1/market/quote/{code}",
            web::get().to(|path: web::Path<String>| async move {
                HttpResponse::Ok().json(serde_json::json!({
                    "stock_code": path.into_inner(), "price": 1688.0, "change_pct": 1.2
                }))
            }),
        );
    }

    /// 股票信息接口失败时，行情与 K 线照常显示
    #[actix_web::test]
    async fn test_partial_failure() {
        println!("\n========== 测试详情页部分失败 ==========");
        let (base_url, handle) = spawn_backend(|cfg| {
            quote_route(cfg);
            cfg.route(
                "/api/v1/stocks/{code}",
                web::get().to(|| async {
                    HttpResponse::NotFound().json(serde_json::json!({ "detail": "股票不存在" }))
                }),
            )
            .route(
                "/api/v1/market/kline/{code}",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({ "data": [
                        { "timestamp": "2025-01-02T00:00:00", "open": 10.0, "high": 10.5, "low": 9.9, "close": 10.2, "volume": 100.0 },
                        { "timestamp": "2025-01-03T00:00:00", "open": 10.2, "high": 10.6, "low": 10.1, "close": 10.4, "volume": 120.0 }
                    ]}))
                }),
            );
        });

        let page = StockDetailPage::new(&services(base_url));
        let view = page
            .load_range("600519", "2025-01-01", "2025-01-31", KLineChartState::default())
            .await;

        assert_eq!(view.stock.error(), Some("股票不存在"));
        assert_eq!(view.quote.value().unwrap().price, 1688.0);
        let panel = view.kline.value().unwrap();
        assert_eq!(panel.bars.len(), 2);
        assert_eq!(panel.option["series"][0]["type"], "candlestick");
        assert_eq!(panel.option["title"]["subtext"], "日线");

        handle.stop(true).await;
        println!("✅ 详情页部分失败测试通过！");
    }

    #[actix_web::test]
    async fn test_empty_kline_is_error() {
        let (base_url, handle) = spawn_backend(|cfg| {
            quote_route(cfg);
            cfg.route(
                "/api/v1/stocks/{code}",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({
                        "code": 200, "message": "ok", "data": { "code": "600519", "name": "贵州茅台" }
                    }))
                }),
            )
            .route(
                "/api/v1/market/kline/{code}",
                web::get().to(|| async { HttpResponse::Ok().json(serde_json::json!({ "data": [] })) }),
            );
        });

        let page = StockDetailPage::new(&services(base_url));
        let view = page
            .load_range("600519", "2025-01-01", "2025-01-31", KLineChartState::default())
            .await;
        assert_eq!(view.kline.error(), Some(EMPTY_KLINE_MESSAGE));
        assert_eq!(view.stock.value().unwrap().name.as_deref(), Some("贵州茅台"));

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_backend_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let page = StockDetailPage::new(&services(format!("http://127.0.0.1:{}/api/v1", port)));
        let view = page
            .load_range("600519", "2025-01-01", "2025-01-31", KLineChartState::default())
            .await;
        assert_eq!(view.stock.error(), Some(NO_RESPONSE_MESSAGE));
        assert_eq!(view.quote.error(), Some(NO_RESPONSE_MESSAGE));
        assert_eq!(view.kline.error(), Some(NO_RESPONSE_MESSAGE));
    }

    #[test]
    fn test_quote_summary() {
        let quote: Quote = serde_json::from_value(serde_json::json!({
            "stock_code": "600519", "price": 1688.0, "change": -12.5, "change_pct": -0.74,
            "volume": 3_520_000.0, "amount": 5_940_000_000.0, "timestamp": "2025-01-02T06:30:05Z"
        }))
        .unwrap();
        let summary = QuoteSummary::from_quote(&quote);
        assert_eq!(summary.price, "1688.00");
        assert_eq!(summary.change, "-12.50");
        assert_eq!(summary.change_pct, "-0.74%");
        assert_eq!(summary.volume, "352.00万");
        assert_eq!(summary.amount, "59.40亿");
        assert_eq!(summary.updated_at, "2025-01-02 14:30:05");
        assert_eq!(summary.time, "14:30:05");
        assert_eq!(summary.color, crate::formatters::theme::DOWN);
        assert_eq!(summary.class_name, "text-green-500");
    }

    /// 轮询得到行情；drop 后后台任务结束
    #[actix_web::test]
    async fn test_quote_poller_stop() {
        let (base_url, handle) = spawn_backend(quote_route);
        let svc = services(base_url);

        let poller = QuotePoller::start(svc.market.clone(), "600519", Duration::from_millis(20));
        let mut rx = poller.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !rx.borrow().is_success() {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert_eq!(rx.borrow().value().unwrap().stock_code, "600519");

        drop(poller);
        // 任务中止后发送端被释放
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());

        handle.stop(true).await;
    }
}
