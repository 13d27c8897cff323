//! 历史数据下载管理服务

use serde::Serialize;
use std::sync::Arc;

use super::stock::normalize_code;
use crate::cache::TtlCache;
use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::{
    BatchDownloadRequest, BatchDownloadResponse, CheckDataResponse, DownloadListQuery,
    DownloadRequest, DownloadResponse, DownloadStatistics, DownloadedListResponse, Frequency,
    StatusMessage,
};

#[derive(Debug, Serialize)]
struct CheckQuery<'a> {
    stock_code: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    frequency: &'a str,
}

#[derive(Clone)]
pub struct DataDownloadService {
    client: ApiClient,
    cache: Arc<TtlCache>,
}

impl DataDownloadService {
    pub fn new(client: ApiClient, cache: Arc<TtlCache>) -> Self {
        Self { client, cache }
    }

    /// 新数据落库后，该股票已缓存的 K 线和指标不再完整
    fn invalidate_market_data(&self, code: &str) {
        let code = normalize_code(code);
        self.cache.delete_prefix(&format!("market_kline_{}_", code));
        self.cache.delete_prefix(&format!("market_indicators_{}_", code));
    }

    /// 下载单只股票的历史数据
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadResponse, ApiError> {
        log::info!(
            "下载历史数据: {} {}~{}",
            request.stock_code,
            request.start_date,
            request.end_date
        );
        let resp = self.client.post("/data/download", request).await?;
        self.invalidate_market_data(&request.stock_code);
        Ok(resp)
    }

    pub async fn batch_download(&self, request: &BatchDownloadRequest) -> Result<BatchDownloadResponse, ApiError> {
        log::info!("批量下载历史数据: {} 只股票", request.stock_codes.len());
        let resp = self.client.post("/data/batch-download", request).await?;
        for code in &request.stock_codes {
            self.invalidate_market_data(code);
        }
        Ok(resp)
    }

    /// 检查本地是否已有该区间的数据
    pub async fn check_availability(
        &self,
        stock_code: &str,
        start_date: &str,
        end_date: &str,
        frequency: Option<Frequency>,
    ) -> Result<CheckDataResponse, ApiError> {
        let query = CheckQuery {
            stock_code,
            start_date,
            end_date,
            frequency: frequency.unwrap_or_default().as_str(),
        };
        self.client.get("/data/check", &query).await
    }

    pub async fn list_downloads(&self, query: &DownloadListQuery) -> Result<DownloadedListResponse, ApiError> {
        self.client.get("/data/downloads", query).await
    }

    pub async fn delete_download(&self, record_id: i64) -> Result<StatusMessage, ApiError> {
        self.client
            .delete(&format!("/data/downloads/{}", record_id))
            .await
    }

    pub async fn statistics(&self) -> Result<DownloadStatistics, ApiError> {
        self.client.get("/data/statistics", NO_QUERY).await
    }

    /// 下载任务状态
    pub async fn status(&self, download_id: &str) -> Result<DownloadResponse, ApiError> {
        self.client
            .get(
                &format!("/data/status/{}", super::segment(download_id)),
                NO_QUERY,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::test_support::spawn_backend;
    use crate::client::ClientOptions;
    use crate::models::{DownloadStatus, OverlapType};
    use actix_web::{web, HttpResponse};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_check_and_list_queries() {
        println!("\n========== 测试数据下载查询 ==========");
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/data/check",
                web::get().to(|query: web::Query<HashMap<String, String>>| async move {
                    assert_eq!(query["frequency"], "daily");
                    HttpResponse::Ok().json(serde_json::json!({
                        "available": true, "overlap_type": "partial"
                    }))
                }),
            )
            .route(
                "/api/v1/data/downloads",
                web::get().to(|query: web::Query<HashMap<String, String>>| async move {
                    // 未指定代码时不带 stock_code
                    assert!(!query.contains_key("stock_code"));
                    assert_eq!(query["limit"], "100");
                    assert_eq!(query["offset"], "0");
                    HttpResponse::Ok().json(serde_json::json!({ "downloads": [], "total": 0 }))
                }),
            )
            .route(
                "/api/v1/data/download",
                web::post().to(|body: web::Json<serde_json::Value>| async move {
                    HttpResponse::Ok().json(serde_json::json!({
                        "status": "exists",
                        "message": "数据已存在",
                        "download_id": "d-1",
                        "stock_code": body["stock_code"]
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
        let cache = Arc::new(TtlCache::new(store));
        let svc = DataDownloadService::new(client, cache.clone());
        let ttl = std::time::Duration::from_secs(600);
        cache.set("market_kline_600519_daily_2024-01-01_2024-03-31", &vec![1, 2], ttl);
        cache.set("market_indicators_600519_{}", &vec![3], ttl);
        cache.set("market_kline_000001_daily_2024-01-01_2024-03-31", &vec![4], ttl);

        let check = svc
            .check_availability("600519", "2024-01-01", "2024-06-30", None)
            .await
            .unwrap();
        assert!(check.available);
        assert_eq!(check.overlap_type, Some(OverlapType::Partial));

        let list = svc.list_downloads(&DownloadListQuery::default()).await.unwrap();
        assert_eq!(list.total, 0);

        let resp = svc
            .download(&DownloadRequest {
                stock_code: "600519".into(),
                start_date: "2024-01-01".into(),
                end_date: "2024-06-30".into(),
                frequency: None,
                source: None,
                force_download: None,
            })
            .await
            .unwrap();
        assert_eq!(resp.status, DownloadStatus::Exists);
        assert_eq!(resp.stock_code, "600519");
        // 下载后只清除该股票的行情缓存
        assert!(cache
            .get::<Vec<i32>>("market_kline_600519_daily_2024-01-01_2024-03-31", ttl)
            .is_none());
        assert!(cache.get::<Vec<i32>>("market_indicators_600519_{}", ttl).is_none());
        assert_eq!(
            cache.get::<Vec<i32>>("market_kline_000001_daily_2024-01-01_2024-03-31", ttl),
            Some(vec![4])
        );

        handle.stop(true).await;
        println!("✅ 数据下载查询测试通过！");
    }
}
