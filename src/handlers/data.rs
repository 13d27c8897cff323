//! 历史数据下载管理

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use super::{error_response, AppState};
use crate::models::{ApiResponse, BatchDownloadRequest, DownloadListQuery, DownloadRequest, Frequency};

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    pub frequency: Option<Frequency>,
}

pub async fn download(
    state: web::Data<AppState>,
    body: web::Json<DownloadRequest>,
) -> Result<HttpResponse> {
    match state.services.data.download(&body).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn batch_download(
    state: web::Data<AppState>,
    body: web::Json<BatchDownloadRequest>,
) -> Result<HttpResponse> {
    match state.services.data.batch_download(&body).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn check(state: web::Data<AppState>, query: web::Query<CheckParams>) -> Result<HttpResponse> {
    match state
        .services
        .data
        .check_availability(&query.stock_code, &query.start_date, &query.end_date, query.frequency)
        .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_downloads(
    state: web::Data<AppState>,
    query: web::Query<DownloadListQuery>,
) -> Result<HttpResponse> {
    match state.services.data.list_downloads(&query).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_download(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.services.data.delete_download(path.into_inner()).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn statistics(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.data.statistics().await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn status(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.data.status(&path).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/data")
            .route("/download", web::post().to(download))
            .route("/batch-download", web::post().to(batch_download))
            .route("/check", web::get().to(check))
            .route("/downloads", web::get().to(list_downloads))
            .route("/downloads/{id}", web::delete().to(delete_download))
            .route("/statistics", web::get().to(statistics))
            .route("/status/{id}", web::get().to(status)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::spawn_backend;
    use crate::handlers::test_support;
    use actix_web::{test, App};

    /// 后端错误信息透传给调用方
    #[actix_web::test]
    async fn test_delete_not_found() {
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/data/downloads/{id}",
                web::delete().to(|| async {
                    HttpResponse::NotFound().json(serde_json::json!({ "detail": "记录不存在" }))
                }),
            );
        });
        let (state, _store) = test_support::state(base_url);
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::delete().uri("/data/downloads/42").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "记录不存在");
        assert_eq!(body["success"], false);

        handle.stop(true).await;
    }
}
