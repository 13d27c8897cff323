//! 参数优化服务
//!
//! 网格搜索、遗传算法、贝叶斯优化三种方法，以及并行任务与历史记录。

use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiClient, ApiError};
use crate::models::{
    OptimizationMethod, OptimizationRequest, OptimizationResult, OptimizationTask,
    ParallelOptimizationResponse, SaveOptimizationResponse,
};

/// 历史记录默认条数
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, Serialize)]
struct HistoryQuery {
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ParallelBody<'a> {
    tasks: &'a [OptimizationTask],
}

#[derive(Clone)]
pub struct OptimizationService {
    client: ApiClient,
}

impl OptimizationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn grid_search(&self, request: &OptimizationRequest) -> Result<OptimizationResult, ApiError> {
        self.client.post("/optimization/grid-search", request).await
    }

    pub async fn genetic(&self, request: &OptimizationRequest) -> Result<OptimizationResult, ApiError> {
        self.client.post("/optimization/genetic", request).await
    }

    pub async fn bayesian(&self, request: &OptimizationRequest) -> Result<OptimizationResult, ApiError> {
        self.client.post("/optimization/bayesian", request).await
    }

    /// 按请求中的方法分派
    pub async fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult, ApiError> {
        log::info!(
            "参数优化: {} {} {:?}",
            request.strategy_type,
            request.stock_code,
            request.optimization_method
        );
        match request.optimization_method {
            OptimizationMethod::GridSearch => self.grid_search(request).await,
            OptimizationMethod::Genetic => self.genetic(request).await,
            OptimizationMethod::Bayesian => self.bayesian(request).await,
        }
    }

    /// 并行执行多个优化任务
    pub async fn parallel(&self, tasks: &[OptimizationTask]) -> Result<ParallelOptimizationResponse, ApiError> {
        self.client
            .post("/optimization/parallel", &ParallelBody { tasks })
            .await
    }

    pub async fn get_result(&self, result_id: i64) -> Result<Value, ApiError> {
        self.client
            .get(&format!("/optimization/results/{}", result_id), crate::client::NO_QUERY)
            .await
    }

    /// 优化历史
    pub async fn history(&self, strategy_id: Option<i64>, limit: Option<u32>) -> Result<Value, ApiError> {
        let query = HistoryQuery {
            limit: limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            strategy_id,
        };
        self.client.get("/optimization/history", &query).await
    }

    pub async fn save(&self, data: &Value) -> Result<SaveOptimizationResponse, ApiError> {
        self.client.post("/optimization/save", data).await
    }
}
