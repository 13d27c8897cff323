//! 业务服务模块
//!
//! 每个服务持有共享的 `ApiClient`，需要缓存的读接口再持有 `TtlCache`。
//! 写操作一律绕过缓存。

pub mod ai;
pub mod auth;
pub mod backtest_report;
pub mod data_download;
pub mod market;
pub mod optimization;
pub mod sector;
pub mod stock;
pub mod stock_code;
pub mod strategy;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{PersistentStore, TtlCache};
use crate::client::{ApiClient, ApiError};

pub use ai::AiService;
pub use auth::AuthService;
pub use backtest_report::BacktestReportService;
pub use data_download::DataDownloadService;
pub use market::MarketService;
pub use optimization::OptimizationService;
pub use sector::SectorService;
pub use stock::StockService;
pub use stock_code::StockCodeService;
pub use strategy::StrategyService;

/// 慢接口（K 线、指标、股票详情）的请求超时
pub const SLOW_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 全部服务
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub stock: StockService,
    pub market: MarketService,
    pub sector: SectorService,
    pub strategy: StrategyService,
    pub optimization: OptimizationService,
    pub ai: AiService,
    pub data: DataDownloadService,
    pub stock_code: StockCodeService,
    pub reports: BacktestReportService,
}

impl Services {
    pub fn new(client: ApiClient, cache: Arc<TtlCache>, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            auth: AuthService::new(client.clone()),
            stock: StockService::new(client.clone(), cache.clone()),
            market: MarketService::new(client.clone(), cache.clone()),
            sector: SectorService::new(client.clone()),
            strategy: StrategyService::new(client.clone()),
            optimization: OptimizationService::new(client.clone()),
            ai: AiService::new(client.clone()),
            data: DataDownloadService::new(client.clone(), cache.clone()),
            stock_code: StockCodeService::new(client.clone(), cache.clone()),
            reports: BacktestReportService::new(client, store),
        }
    }
}

/// 先查缓存，未命中时请求后端并写回缓存
///
/// 只缓存成功结果。
pub(crate) async fn cached<T, F, Fut>(
    cache: &TtlCache,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if let Some(hit) = cache.get::<T>(key, ttl) {
        return Ok(hit);
    }
    log::debug!("[请求后端] {}", key);
    let data = fetch().await?;
    cache.set(key, &data, ttl);
    Ok(data)
}

/// 路径参数编码
pub(crate) fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
