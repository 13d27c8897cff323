//! 行情、K 线、指标与板块接口

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use super::{error_response, AppState};
use crate::models::{ApiResponse, Frequency, IndicatorQuery, KLineQuery};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub freq: Frequency,
    pub start_date: String,
    pub end_date: String,
    /// 逗号分隔的指标名
    #[serde(default)]
    pub indicators: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub codes: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn get_quote(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    match state.services.market.get_quote(&path).await {
        Ok(quote) => Ok(HttpResponse::Ok().json(ApiResponse::success(quote))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_kline(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let kline_query = KLineQuery {
        code: path.into_inner(),
        freq: query.freq,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    match state.services.market.get_kline_data(&kline_query).await {
        Ok(bars) => Ok(HttpResponse::Ok().json(ApiResponse::success(bars))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_indicators(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let indicator_query = IndicatorQuery {
        code: path.into_inner(),
        freq: query.freq,
        start_date: query.start_date,
        end_date: query.end_date,
        indicators: query
            .indicators
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    };
    match state.services.market.get_indicators(&indicator_query).await {
        Ok(indicators) => Ok(HttpResponse::Ok().json(ApiResponse::success(indicators))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_batch_quotes(
    state: web::Data<AppState>,
    query: web::Query<BatchQuery>,
) -> Result<HttpResponse> {
    match state.services.market.get_batch_quotes(&query.codes).await {
        Ok(quotes) => Ok(HttpResponse::Ok().json(ApiResponse::success(quotes))),
        Err(e) => Ok(error_response(&e)),
    }
}

// ==================== 板块 ====================

pub async fn list_sectors(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.sector.get_sector_list().await {
        Ok(sectors) => Ok(HttpResponse::Ok().json(ApiResponse::success(sectors))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn sector_stocks(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    match state
        .services
        .sector
        .get_stocks_by_sector(&path, query.page, query.page_size)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/market")
            .route("/quote/{code}", web::get().to(get_quote))
            .route("/kline/{code}", web::get().to(get_kline))
            .route("/indicators/{code}", web::get().to(get_indicators))
            .route("/batch", web::get().to(get_batch_quotes)),
    )
    .service(
        web::scope("/sectors")
            .route("", web::get().to(list_sectors))
            .route("/{code}/stocks", web::get().to(sector_stocks)),
    );
}
