//! 股票服务
//!
//! - 股票列表：默认读取后端本地已下载数据，不缓存；远程数据缓存 5 分钟
//! - 股票详情：缓存 10 分钟
//! - 股票搜索：缓存 5 分钟

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{cached, segment, SLOW_REQUEST_TIMEOUT};
use crate::cache::TtlCache;
use crate::client::{unwrap_envelope, ApiClient, ApiError};
use crate::models::{MaybeEnveloped, PaginatedResponse, Stock, StockListQuery};

pub const STOCK_LIST_TTL: Duration = Duration::from_secs(5 * 60);
pub const STOCK_DETAIL_TTL: Duration = Duration::from_secs(10 * 60);
pub const STOCK_SEARCH_TTL: Duration = Duration::from_secs(5 * 60);
/// 搜索默认条数
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct StockService {
    client: ApiClient,
    cache: Arc<TtlCache>,
}

impl StockService {
    pub fn new(client: ApiClient, cache: Arc<TtlCache>) -> Self {
        Self { client, cache }
    }

    /// 股票列表
    ///
    /// `use_local` 未指定时视为 true。
    pub async fn get_stock_list(
        &self,
        params: &StockListQuery,
    ) -> Result<PaginatedResponse<Stock>, ApiError> {
        let mut params = params.clone();
        let use_local = *params.use_local.get_or_insert(true);

        if use_local {
            log::info!("[股票列表] 请求API (不缓存): {:?}", params);
            return self.client.get_enveloped("/stocks", &params).await;
        }

        let key = format!(
            "stock_list_{}",
            serde_json::to_string(&params).unwrap_or_default()
        );
        cached(&self.cache, &key, STOCK_LIST_TTL, || {
            self.client.get_enveloped("/stocks", &params)
        })
        .await
    }

    /// 股票详情
    pub async fn get_stock(&self, code: &str) -> Result<Stock, ApiError> {
        let code = normalize_code(code);
        let key = format!("stock_detail_{}", code);
        cached(&self.cache, &key, STOCK_DETAIL_TTL, || async {
            let body: MaybeEnveloped<Stock> = self
                .client
                .get_with_timeout(
                    &format!("/stocks/{}", segment(&code)),
                    crate::client::NO_QUERY,
                    SLOW_REQUEST_TIMEOUT,
                )
                .await?;
            unwrap_envelope(body)
        })
        .await
    }

    /// 按关键字搜索股票
    pub async fn search_stocks(&self, keyword: &str, limit: Option<u32>) -> Result<Vec<Stock>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let key = format!("stock_search_{}_{}", keyword, limit);
        cached(&self.cache, &key, STOCK_SEARCH_TTL, || async {
            let body: MaybeEnveloped<Vec<Stock>> = self
                .client
                .get_with_timeout(
                    &format!("/stocks/search/{}", segment(keyword)),
                    &[("limit", limit)],
                    SLOW_REQUEST_TIMEOUT,
                )
                .await?;
            unwrap_envelope(body)
        })
        .await
    }
}

fn code_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^(?:sh|sz|bj)?(\d{6})(?:\.(?:sh|sz|bj))?$").ok())
        .as_ref()
}

fn index_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^(?:sh000|sz399)\d{3}$").ok())
        .as_ref()
}

/// 统一股票代码：`sh600519`、`600519.SH` → `600519`，其他输入原样返回
///
/// 带市场前缀的指数代码（`SH000001`）去掉前缀会与个股冲突，只转大写
pub fn normalize_code(raw: &str) -> String {
    let raw = raw.trim();
    if index_pattern().is_some_and(|re| re.is_match(raw)) {
        return raw.to_uppercase();
    }
    code_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::test_support::spawn_backend;
    use crate::client::ClientOptions;
    use actix_web::{web, HttpResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(base_url: String) -> StockService {
        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let client = ApiClient::new(&options, store.clone()).unwrap();
        StockService::new(client, Arc::new(TtlCache::new(store)))
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("sh600519"), "600519");
        assert_eq!(normalize_code("600519.SH"), "600519");
        assert_eq!(normalize_code(" 000001 "), "000001");
        assert_eq!(normalize_code("AAPL"), "AAPL");
        assert_eq!(normalize_code("sh000001"), "SH000001");
        assert_eq!(normalize_code("SZ399006"), "SZ399006");
    }

    /// 详情走缓存，第二次不再请求后端
    #[actix_web::test]
    async fn test_stock_detail_cached() {
        println!("\n========== 测试股票详情缓存 ==========");
        let hits = web::Data::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let (base_url, handle) = spawn_backend(move |cfg| {
            cfg.app_data(counter.clone()).route(
                "/api/v1/stocks/{code}",
                web::get().to(
                    |path: web::Path<String>, hits: web::Data<AtomicUsize>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        HttpResponse::Ok().json(serde_json::json!({
                            "code": 200,
                            "message": "ok",
                            "data": { "code": path.into_inner(), "name": "贵州茅台" }
                        }))
                    },
                ),
            );
        });

        let svc = service(base_url);
        let first = svc.get_stock("sh600519").await.unwrap();
        let second = svc.get_stock("600519").await.unwrap();
        assert_eq!(first.name.as_deref(), Some("贵州茅台"));
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        handle.stop(true).await;
        println!("✅ 股票详情缓存测试通过！");
    }

    /// 本地列表不缓存，远程列表缓存
    #[actix_web::test]
    async fn test_stock_list_cache_modes() {
        let hits = web::Data::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let (base_url, handle) = spawn_backend(move |cfg| {
            cfg.app_data(counter.clone()).route(
                "/api/v1/stocks",
                web::get().to(|hits: web::Data<AtomicUsize>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    HttpResponse::Ok().json(serde_json::json!({
                        "items": [{ "code": "600519", "name": "贵州茅台" }],
                        "total": 1, "page": 1, "page_size": 20
                    }))
                }),
            );
        });

        let svc = service(base_url);
        let local = StockListQuery::default();
        svc.get_stock_list(&local).await.unwrap();
        svc.get_stock_list(&local).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let remote = StockListQuery {
            use_local: Some(false),
            ..Default::default()
        };
        let page = svc.get_stock_list(&remote).await.unwrap();
        svc.get_stock_list(&remote).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(page.total, 1);

        handle.stop(true).await;
    }
}
