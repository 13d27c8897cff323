//! AI 分析与问答

use actix_web::{web, HttpResponse, Result};
use futures::StreamExt;

use super::{error_response, AppState};
use crate::models::ai::{
    AnalyzeRequest, ChatRequest, IndicatorAnalysisRequest, MarketAnalysisRequest,
    PortfolioAnalysisRequest, RiskAssessmentRequest, StrategyOptimizationRequest,
};
use crate::models::ApiResponse;
use crate::services::ai::TextStream;

/// 把后端的文本流原样转发
fn stream_response(stream: TextStream) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .streaming(stream.map(|chunk| chunk.map(web::Bytes::from)))
}

pub async fn analyze(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse> {
    if body.stream {
        return match state.services.ai.analyze_stream(&body).await {
            Ok(stream) => Ok(stream_response(stream)),
            Err(e) => Ok(error_response(&e)),
        };
    }
    match state.services.ai.analyze(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn analyze_portfolio(
    state: web::Data<AppState>,
    body: web::Json<PortfolioAnalysisRequest>,
) -> Result<HttpResponse> {
    match state.services.ai.analyze_portfolio(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn analyze_market(
    state: web::Data<AppState>,
    body: web::Json<MarketAnalysisRequest>,
) -> Result<HttpResponse> {
    match state.services.ai.analyze_market(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn analyze_indicators(
    state: web::Data<AppState>,
    body: web::Json<IndicatorAnalysisRequest>,
) -> Result<HttpResponse> {
    match state.services.ai.analyze_indicators(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn assess_risk(
    state: web::Data<AppState>,
    body: web::Json<RiskAssessmentRequest>,
) -> Result<HttpResponse> {
    match state.services.ai.assess_risk(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn optimize_strategy(
    state: web::Data<AppState>,
    body: web::Json<StrategyOptimizationRequest>,
) -> Result<HttpResponse> {
    match state.services.ai.optimize_strategy(&body).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(ApiResponse::success(analysis))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// 问答，`stream: true` 时以文本流返回
pub async fn chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> Result<HttpResponse> {
    if body.stream {
        return match state.services.ai.chat_stream(&body).await {
            Ok(stream) => Ok(stream_response(stream)),
            Err(e) => Ok(error_response(&e)),
        };
    }
    match state.services.ai.chat(&body).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(ApiResponse::success(answer))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn health(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.ai.health().await {
        Ok(health) => Ok(HttpResponse::Ok().json(ApiResponse::success(health))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn templates(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.ai.templates().await {
        Ok(templates) => Ok(HttpResponse::Ok().json(ApiResponse::success(templates))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn quick_questions(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.services.ai.quick_questions())))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ai")
            .route("/analyze", web::post().to(analyze))
            .route("/analyze/portfolio", web::post().to(analyze_portfolio))
            .route("/analyze/market", web::post().to(analyze_market))
            .route("/analyze/indicators", web::post().to(analyze_indicators))
            .route("/assess/risk", web::post().to(assess_risk))
            .route("/optimize/strategy", web::post().to(optimize_strategy))
            .route("/chat", web::post().to(chat))
            .route("/health", web::get().to(health))
            .route("/templates", web::get().to(templates))
            .route("/quick-questions", web::get().to(quick_questions)),
    );
}
