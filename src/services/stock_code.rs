//! 股票代码库服务：代码表下载、多种方式搜索、市场统计

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::segment;
use crate::cache::TtlCache;
use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::{SearchType, StockCodeInfo, StockCodeStatistics, StockSearchResult};

/// 搜索默认条数
pub const DEFAULT_LIMIT: u32 = 10;
/// 按市场列出的默认条数
pub const DEFAULT_MARKET_LIMIT: u32 = 100;

/// 前缀搜索的字段
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    Name,
    Code,
}

/// `{success, data}` 形式的回执
#[derive(Debug, Deserialize)]
struct SuccessReply<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> SuccessReply<T> {
    fn into_data(self, fallback: &str) -> Result<T, ApiError> {
        match self.data {
            Some(data) if self.success => Ok(data),
            _ => Err(ApiError::Server {
                status: 200,
                message: self.message.unwrap_or_else(|| fallback.to_string()),
            }),
        }
    }
}

#[derive(Clone)]
pub struct StockCodeService {
    client: ApiClient,
    cache: Arc<TtlCache>,
}

impl StockCodeService {
    pub fn new(client: ApiClient, cache: Arc<TtlCache>) -> Self {
        Self { client, cache }
    }

    /// 代码表变化后，已缓存的列表与搜索结果作废
    fn invalidate_listings(&self) {
        self.cache.delete_prefix("stock_list_");
        self.cache.delete_prefix("stock_search_");
    }

    /// 从数据源下载代码表
    pub async fn download_list(&self, page: Option<u32>, page_size: Option<u32>) -> Result<Value, ApiError> {
        let query = [
            ("page", page.unwrap_or(1)),
            ("page_size", page_size.unwrap_or(5000)),
        ];
        let resp = self.client.post_query("/stock-code/download", &query).await?;
        self.invalidate_listings();
        Ok(resp)
    }

    pub async fn search(
        &self,
        keyword: &str,
        search_type: SearchType,
        limit: Option<u32>,
    ) -> Result<StockSearchResult, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).to_string();
        let query = [
            ("keyword", keyword),
            ("search_type", search_type.as_str()),
            ("limit", limit.as_str()),
        ];
        self.client.get("/stock-code/search", &query).await
    }

    pub async fn search_by_name(&self, name: &str, limit: Option<u32>) -> Result<StockSearchResult, ApiError> {
        self.client
            .get(
                &format!("/stock-code/name/{}", segment(name)),
                &[("limit", limit.unwrap_or(DEFAULT_LIMIT))],
            )
            .await
    }

    pub async fn search_by_code(&self, code: &str, limit: Option<u32>) -> Result<StockSearchResult, ApiError> {
        self.client
            .get(
                &format!("/stock-code/code/{}", segment(code)),
                &[("limit", limit.unwrap_or(DEFAULT_LIMIT))],
            )
            .await
    }

    pub async fn search_by_prefix(
        &self,
        prefix: &str,
        field: SearchField,
        limit: Option<u32>,
    ) -> Result<StockSearchResult, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).to_string();
        let field = match field {
            SearchField::Name => "name",
            SearchField::Code => "code",
        };
        let query = [
            ("prefix", prefix),
            ("search_field", field),
            ("limit", limit.as_str()),
        ];
        self.client.get("/stock-code/prefix", &query).await
    }

    /// 单只股票的代码库信息
    pub async fn info(&self, code: &str) -> Result<StockCodeInfo, ApiError> {
        let reply: SuccessReply<StockCodeInfo> = self
            .client
            .get(&format!("/stock-code/info/{}", segment(code)), NO_QUERY)
            .await?;
        reply.into_data("未找到股票信息")
    }

    pub async fn by_market(&self, market: &str, limit: Option<u32>) -> Result<StockSearchResult, ApiError> {
        self.client
            .get(
                &format!("/stock-code/market/{}", segment(market)),
                &[("limit", limit.unwrap_or(DEFAULT_MARKET_LIMIT))],
            )
            .await
    }

    pub async fn statistics(&self) -> Result<StockCodeStatistics, ApiError> {
        let reply: SuccessReply<StockCodeStatistics> =
            self.client.get("/stock-code/statistics", NO_QUERY).await?;
        reply.into_data("获取统计信息失败")
    }

    /// 刷新代码表
    pub async fn refresh(&self) -> Result<Value, ApiError> {
        let resp = self.client.post_query("/stock-code/refresh", NO_QUERY).await?;
        self.invalidate_listings();
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::test_support::spawn_backend;
    use crate::client::ClientOptions;
    use actix_web::{web, HttpResponse};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_search_and_info() {
        println!("\n========== 测试股票代码搜索 ==========");
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/stock-code/search",
                web::get().to(|query: web::Query<HashMap<String, String>>| async move {
                    HttpResponse::Ok().json(serde_json::json!({
                        "success": true,
                        "keyword": query["keyword"],
                        "search_type": query["search_type"],
                        "total": 1,
                        "results": [{ "code": "600519", "name": "贵州茅台", "price": 1688.0 }]
                    }))
                }),
            )
            .route(
                "/api/v1/stock-code/info/{code}",
                web::get().to(|path: web::Path<String>| async move {
                    let code = path.into_inner();
                    if code == "000000" {
                        return HttpResponse::Ok()
                            .json(serde_json::json!({ "success": false, "message": "股票不存在" }));
                    }
                    HttpResponse::Ok().json(serde_json::json!({
                        "success": true,
                        "data": { "code": code, "name": "贵州茅台", "market": "SH" }
                    }))
                }),
            );
        });

        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new());
        let client = ApiClient::new(&options, store.clone()).unwrap();
        let svc = StockCodeService::new(client, Arc::new(TtlCache::new(store)));

        let result = svc.search("茅台", SearchType::Fuzzy, None).await.unwrap();
        assert_eq!(result.keyword, "茅台");
        assert_eq!(result.search_type, "fuzzy");
        assert_eq!(result.results[0].code, "600519");

        let info = svc.info("600519").await.unwrap();
        assert_eq!(info.market, "SH");

        let err = svc.info("000000").await.unwrap_err();
        assert_eq!(err.to_string(), "股票不存在");

        handle.stop(true).await;
        println!("✅ 股票代码搜索测试通过！");
    }

    /// 刷新代码表后清除列表和搜索缓存，其他缓存保留
    #[actix_web::test]
    async fn test_refresh_invalidates_listings() {
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/stock-code/refresh",
                web::post().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({ "success": true, "count": 5000 }))
                }),
            );
        });
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new());
        let client = ApiClient::new(&options, store.clone()).unwrap();
        let cache = Arc::new(TtlCache::new(store));
        let svc = StockCodeService::new(client, cache.clone());

        let ttl = std::time::Duration::from_secs(300);
        cache.set("stock_list_{}", &vec!["600519"], ttl);
        cache.set("stock_search_茅台_10", &vec!["600519"], ttl);
        cache.set("market_quote_600519", &1688.0, ttl);

        let resp = svc.refresh().await.unwrap();
        assert_eq!(resp["count"], 5000);
        assert!(cache.get::<Vec<String>>("stock_list_{}", ttl).is_none());
        assert!(cache.get::<Vec<String>>("stock_search_茅台_10", ttl).is_none());
        assert_eq!(cache.get::<f64>("market_quote_600519", ttl), Some(1688.0));

        handle.stop(true).await;
    }
}
