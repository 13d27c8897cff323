//! 图表配置接口：传入数据，返回 ECharts option

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::charts::backtest::build_report_option;
use crate::charts::{build_backtest_option, build_kline_option, consecutive_trend, KLineChartState};
use crate::indicators::IndicatorSet;
use crate::models::{ApiResponse, BacktestResult, EquityPoint, KLineDataItem};

#[derive(Debug, Deserialize)]
pub struct KLineChartBody {
    pub bars: Vec<KLineDataItem>,
    #[serde(default)]
    pub state: KLineChartState,
    /// 缺省时按 K 线本地计算
    #[serde(default)]
    pub indicators: Option<IndicatorSet>,
}

#[derive(Debug, Deserialize)]
pub struct BarsBody {
    pub bars: Vec<KLineDataItem>,
}

#[derive(Debug, Deserialize)]
pub struct EquityBody {
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Deserialize)]
pub struct ReportChartBody {
    pub result: BacktestResult,
    #[serde(default)]
    pub show_trend_numbers: bool,
}

pub async fn kline_option(body: web::Json<KLineChartBody>) -> Result<HttpResponse> {
    let option = build_kline_option(&body.bars, body.indicators.as_ref(), &body.state);
    Ok(HttpResponse::Ok().json(ApiResponse::success(option)))
}

pub async fn indicators(body: web::Json<BarsBody>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(IndicatorSet::compute(&body.bars))))
}

pub async fn equity_option(body: web::Json<EquityBody>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(build_backtest_option(&body.equity_curve))))
}

pub async fn trend(body: web::Json<EquityBody>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(consecutive_trend(&body.equity_curve))))
}

pub async fn report_option(body: web::Json<ReportChartBody>) -> Result<HttpResponse> {
    let option = build_report_option(&body.result, body.show_trend_numbers);
    Ok(HttpResponse::Ok().json(ApiResponse::success(option)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/charts")
            .route("/kline", web::post().to(kline_option))
            .route("/indicators", web::post().to(indicators))
            .route("/equity", web::post().to(equity_option))
            .route("/trend", web::post().to(trend))
            .route("/backtest-report", web::post().to(report_option)),
    );
}
