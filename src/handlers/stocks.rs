//! 股票列表、详情、搜索、代码库与最近浏览

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use super::{error_response, AppState};
use crate::models::{ApiResponse, SearchType, StockCodeInfo, StockListQuery};
use crate::services::stock_code::SearchField;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub limit: Option<u32>,
    #[serde(default)]
    pub search_type: SearchType,
}

#[derive(Debug, Deserialize)]
pub struct PrefixQuery {
    pub prefix: String,
    #[serde(default)]
    pub search_field: SearchField,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ==================== 股票 ====================

pub async fn list_stocks(
    state: web::Data<AppState>,
    query: web::Query<StockListQuery>,
) -> Result<HttpResponse> {
    match state.services.stock.get_stock_list(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_stock(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.stock.get_stock(&path).await {
        Ok(stock) => Ok(HttpResponse::Ok().json(ApiResponse::success(stock))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn search_stocks(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    match state.services.stock.search_stocks(&query.keyword, query.limit).await {
        Ok(stocks) => Ok(HttpResponse::Ok().json(ApiResponse::success(stocks))),
        Err(e) => Ok(error_response(&e)),
    }
}

// ==================== 代码库 ====================

pub async fn code_search(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    match state
        .services
        .stock_code
        .search(&query.keyword, query.search_type, query.limit)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_by_name(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    match state.services.stock_code.search_by_name(&path, query.limit).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_by_code(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    match state.services.stock_code.search_by_code(&path, query.limit).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_by_prefix(
    state: web::Data<AppState>,
    query: web::Query<PrefixQuery>,
) -> Result<HttpResponse> {
    match state
        .services
        .stock_code
        .search_by_prefix(&query.prefix, query.search_field, query.limit)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_info(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.stock_code.info(&path).await {
        Ok(info) => Ok(HttpResponse::Ok().json(ApiResponse::success(info))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_by_market(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    match state.services.stock_code.by_market(&path, query.limit).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_statistics(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.stock_code.statistics().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_download(
    state: web::Data<AppState>,
    query: web::Query<DownloadListParams>,
) -> Result<HttpResponse> {
    match state
        .services
        .stock_code
        .download_list(query.page, query.page_size)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn code_refresh(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.stock_code.refresh().await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

// ==================== 最近浏览 ====================

pub async fn recent_list(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.recent.list())))
}

pub async fn recent_add(
    state: web::Data<AppState>,
    body: web::Json<StockCodeInfo>,
) -> Result<HttpResponse> {
    match state.recent.add(body.into_inner()) {
        Ok(stocks) => Ok(HttpResponse::Ok().json(ApiResponse::success(stocks))),
        Err(e) => Ok(HttpResponse::InternalServerError()
            .json(ApiResponse::<Vec<StockCodeInfo>>::error(e.to_string()))),
    }
}

pub async fn recent_clear(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.recent.clear() {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(Vec::<StockCodeInfo>::new()))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string()))),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("", web::get().to(list_stocks))
            .route("/search", web::get().to(search_stocks))
            .route("/{code}", web::get().to(get_stock)),
    )
    .service(
        web::scope("/stock-code")
            .route("/search", web::get().to(code_search))
            .route("/prefix", web::get().to(code_by_prefix))
            .route("/statistics", web::get().to(code_statistics))
            .route("/download", web::post().to(code_download))
            .route("/refresh", web::post().to(code_refresh))
            .route("/name/{name}", web::get().to(code_by_name))
            .route("/code/{code}", web::get().to(code_by_code))
            .route("/info/{code}", web::get().to(code_info))
            .route("/market/{market}", web::get().to(code_by_market)),
    )
    .service(
        web::scope("/recent-stocks")
            .route("", web::get().to(recent_list))
            .route("", web::post().to(recent_add))
            .route("", web::delete().to(recent_clear)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use actix_web::{test, App};

    /// 最近浏览：去重、最新在前
    #[actix_web::test]
    async fn test_recent_stocks_endpoints() {
        println!("\n========== 测试最近浏览接口 ==========");
        let (state, _store) = test_support::state("http://127.0.0.1:9/api/v1".into());
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        for code in ["600519", "000001", "600519"] {
            let req = test::TestRequest::post()
                .uri("/recent-stocks")
                .set_json(serde_json::json!({ "code": code, "name": "测试" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 200);
        }

        let req = test::TestRequest::get().uri("/recent-stocks").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["code"], "600519");

        let req = test::TestRequest::delete().uri("/recent-stocks").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], serde_json::json!([]));
        println!("✅ 最近浏览接口测试通过！");
    }
}
