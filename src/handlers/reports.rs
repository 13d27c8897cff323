//! 回测报告存取与草稿

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::Value;

use super::{error_response, AppState};
use crate::models::{ApiResponse, BacktestResult};

#[derive(Debug, Deserialize)]
pub struct SaveReportBody {
    pub data: Value,
    #[serde(default)]
    pub strategy_name: Option<String>,
}

pub async fn list_reports(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.reports.list().await {
        Ok(reports) => Ok(HttpResponse::Ok().json(ApiResponse::success(reports))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn save_report(
    state: web::Data<AppState>,
    body: web::Json<SaveReportBody>,
) -> Result<HttpResponse> {
    match state
        .services
        .reports
        .save(&body.data, body.strategy_name.as_deref())
        .await
    {
        Ok(saved) => Ok(HttpResponse::Ok().json(ApiResponse::success(saved))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn load_report(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.reports.load(&path).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_report(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.reports.delete(&path).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success("删除成功"))),
        Err(e) => Ok(error_response(&e)),
    }
}

// ==================== 草稿 ====================

pub async fn get_draft(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.services.reports.load_draft())))
}

pub async fn put_draft(
    state: web::Data<AppState>,
    body: web::Json<BacktestResult>,
) -> Result<HttpResponse> {
    match state.services.reports.save_draft(&body) {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success("草稿已保存"))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string()))),
    }
}

pub async fn delete_draft(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.services.reports.clear_draft();
    Ok(HttpResponse::Ok().json(ApiResponse::success("草稿已清除")))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/backtest-reports")
            .route("", web::get().to(list_reports))
            .route("", web::post().to(save_report))
            .route("/draft", web::get().to(get_draft))
            .route("/draft", web::put().to(put_draft))
            .route("/draft", web::delete().to(delete_draft))
            .route("/{filename}", web::get().to(load_report))
            .route("/{filename}", web::delete().to(delete_report)),
    );
}
