//! 策略管理、回测与参数优化

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::Value;

use super::{error_response, AppState};
use crate::models::{
    ApiResponse, BacktestRequest, CreateStrategyRequest, OptimizationRequest, OptimizationTask,
    StrategyOptimizeParams, UpdateStrategyRequest,
};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub strategy_id: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ParallelBody {
    pub tasks: Vec<OptimizationTask>,
}

// ==================== 策略 ====================

pub async fn list_strategies(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.services.strategy.list().await {
        Ok(strategies) => Ok(HttpResponse::Ok().json(ApiResponse::success(strategies))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn create_strategy(
    state: web::Data<AppState>,
    body: web::Json<CreateStrategyRequest>,
) -> Result<HttpResponse> {
    match state.services.strategy.create(&body).await {
        Ok(strategy) => Ok(HttpResponse::Ok().json(ApiResponse::success(strategy))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_strategy(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.services.strategy.get(path.into_inner()).await {
        Ok(strategy) => Ok(HttpResponse::Ok().json(ApiResponse::success(strategy))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn update_strategy(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateStrategyRequest>,
) -> Result<HttpResponse> {
    match state.services.strategy.update(path.into_inner(), &body).await {
        Ok(strategy) => Ok(HttpResponse::Ok().json(ApiResponse::success(strategy))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_strategy(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.services.strategy.delete(path.into_inner()).await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(status))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// 运行回测，成功后保存为回测报告草稿
pub async fn run_backtest(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<BacktestRequest>,
) -> Result<HttpResponse> {
    match state.services.strategy.run_backtest(path.into_inner(), &body).await {
        Ok(result) => {
            if let Err(e) = state.services.reports.save_draft(&result) {
                log::warn!("保存回测草稿失败: {}", e);
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn optimize_strategy(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<StrategyOptimizeParams>,
) -> Result<HttpResponse> {
    match state.services.strategy.optimize(path.into_inner(), &query).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

// ==================== 参数优化 ====================

/// 按请求中的 `optimization_method` 分派
pub async fn run_optimization(
    state: web::Data<AppState>,
    body: web::Json<OptimizationRequest>,
) -> Result<HttpResponse> {
    match state.services.optimization.optimize(&body).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn parallel_optimization(
    state: web::Data<AppState>,
    body: web::Json<ParallelBody>,
) -> Result<HttpResponse> {
    match state.services.optimization.parallel(&body.tasks).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn optimization_result(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.services.optimization.get_result(path.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn optimization_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryParams>,
) -> Result<HttpResponse> {
    match state
        .services
        .optimization
        .history(query.strategy_id, query.limit)
        .await
    {
        Ok(history) => Ok(HttpResponse::Ok().json(ApiResponse::success(history))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn save_optimization(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    match state.services.optimization.save(&body).await {
        Ok(saved) => Ok(HttpResponse::Ok().json(ApiResponse::success(saved))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/strategies")
            .route("", web::get().to(list_strategies))
            .route("", web::post().to(create_strategy))
            .route("/{id}", web::get().to(get_strategy))
            .route("/{id}", web::put().to(update_strategy))
            .route("/{id}", web::delete().to(delete_strategy))
            .route("/{id}/backtest", web::post().to(run_backtest))
            .route("/{id}/optimize", web::post().to(optimize_strategy)),
    )
    .service(
        web::scope("/optimization")
            .route("", web::post().to(run_optimization))
            .route("/parallel", web::post().to(parallel_optimization))
            .route("/history", web::get().to(optimization_history))
            .route("/save", web::post().to(save_optimization))
            .route("/results/{id}", web::get().to(optimization_result)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::spawn_backend;
    use crate::handlers::test_support;
    use actix_web::{test, App};

    /// 回测成功后草稿可以读回
    #[actix_web::test]
    async fn test_backtest_saves_draft() {
        println!("\n========== 测试回测草稿保存 ==========");
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/strategies/{id}/backtest",
                web::post().to(|body: web::Json<Value>| async move {
                    HttpResponse::Ok().json(serde_json::json!({
                        "code": 200, "message": "ok",
                        "data": {
                            "id": "bt-7",
                            "strategy_name": "双均线",
                            "stock_code": body["stock_code"],
                            "start_date": "2024-01-01",
                            "end_date": "2024-06-30",
                            "initial_capital": 100000.0,
                            "final_capital": 108000.0,
                            "metrics": {
                                "total_return": 0.08, "annual_return": 0.16, "max_drawdown": 0.05,
                                "sharpe_ratio": 1.1, "win_rate": 0.5, "trade_count": 4,
                                "profit_loss_ratio": 1.5, "volatility": 0.2, "calmar_ratio": 3.2
                            }
                        }
                    }))
                }),
            );
        });
        let (state, _store) = test_support::state(base_url);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/strategies/3/backtest")
            .set_json(serde_json::json!({
                "stock_code": "600519", "start_date": "2024-01-01", "end_date": "2024-06-30"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], "bt-7");

        let draft = state.services.reports.load_draft().unwrap();
        assert_eq!(draft.stock_code, "600519");
        assert_eq!(draft.metrics.trade_count, 4);

        handle.stop(true).await;
        println!("✅ 回测草稿保存测试通过！");
    }
}
