//! 策略服务：策略增删改查、回测与参数优化

use crate::client::{unwrap_envelope, ApiClient, ApiError, NO_QUERY};
use crate::models::{
    BacktestRequest, BacktestResult, CreateStrategyRequest, MaybeEnveloped, StatusMessage,
    Strategy, StrategyOptimizeParams, UpdateStrategyRequest,
};
use serde_json::Value;

#[derive(Clone)]
pub struct StrategyService {
    client: ApiClient,
}

impl StrategyService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 策略列表
    pub async fn list(&self) -> Result<Vec<Strategy>, ApiError> {
        self.client.get_enveloped("/strategies", NO_QUERY).await
    }

    pub async fn create(&self, request: &CreateStrategyRequest) -> Result<Strategy, ApiError> {
        let body: MaybeEnveloped<Strategy> = self.client.post("/strategies", request).await?;
        unwrap_envelope(body)
    }

    pub async fn get(&self, id: i64) -> Result<Strategy, ApiError> {
        self.client
            .get_enveloped(&format!("/strategies/{}", id), NO_QUERY)
            .await
    }

    pub async fn update(&self, id: i64, request: &UpdateStrategyRequest) -> Result<Strategy, ApiError> {
        let body: MaybeEnveloped<Strategy> = self
            .client
            .put(&format!("/strategies/{}", id), request)
            .await?;
        unwrap_envelope(body)
    }

    pub async fn delete(&self, id: i64) -> Result<StatusMessage, ApiError> {
        self.client.delete(&format!("/strategies/{}", id)).await
    }

    /// 运行回测
    pub async fn run_backtest(&self, id: i64, request: &BacktestRequest) -> Result<BacktestResult, ApiError> {
        log::info!(
            "运行回测: 策略 {} 股票 {} {}~{}",
            id,
            request.stock_code,
            request.start_date,
            request.end_date
        );
        let body: MaybeEnveloped<BacktestResult> = self
            .client
            .post(&format!("/strategies/{}/backtest", id), request)
            .await?;
        unwrap_envelope(body)
    }

    /// 参数优化，参数放在查询串中
    pub async fn optimize(&self, id: i64, params: &StrategyOptimizeParams) -> Result<Value, ApiError> {
        self.client
            .post_query(&format!("/strategies/{}/optimize", id), params)
            .await
    }
}
