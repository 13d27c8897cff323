use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use super::AppState;
use crate::cache::CacheStats;
use crate::models::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub authenticated: bool,
    pub cache: CacheStats,
}

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let response = ApiResponse::success(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        authenticated: state.client.tokens().is_authenticated(),
        cache: state.cache.stats(),
    });
    Ok(HttpResponse::Ok().json(response))
}

pub async fn cache_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.cache.stats())))
}

/// 清理过期缓存，返回清理条数
pub async fn clear_expired(state: web::Data<AppState>) -> Result<HttpResponse> {
    let removed = state.cache.clear_expired();
    log::info!("清理过期缓存 {} 条", removed);
    Ok(HttpResponse::Ok().json(ApiResponse::success(removed)))
}

pub async fn clear_cache(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.cache.clear();
    Ok(HttpResponse::Ok().json(ApiResponse::success("缓存已清空")))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/cache/stats", web::get().to(cache_stats))
        .route("/cache/expired", web::delete().to(clear_expired))
        .route("/cache", web::delete().to(clear_cache));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use actix_web::{test, App};
    use std::time::Duration;

    #[actix_web::test]
    async fn test_health_reports_cache() {
        let (state, _store) = test_support::state("http://127.0.0.1:9/api/v1".into());
        state.cache.set("k", &1, Duration::from_secs(60));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["authenticated"], false);
        assert_eq!(body["data"]["cache"]["memory_count"], 1);

        let req = test::TestRequest::delete().uri("/cache").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(state.cache.stats().memory_count, 0);
    }
}
