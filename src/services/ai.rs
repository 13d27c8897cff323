//! AI 分析与问答服务
//!
//! 普通接口的回执为 `{..., data: {...}}`，只取 `data`。
//! 流式接口按块返回文本，块边界可能落在多字节字符中间，解码时保留不完整的尾部字节。

use futures::stream::{BoxStream, StreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::ai::{
    AiHealth, AnalyzeRequest, ChatAnswer, ChatRequest, IndicatorAnalysisRequest,
    MarketAnalysisRequest, PortfolioAnalysisRequest, QuickQuestion, RiskAssessmentRequest,
    StrategyOptimizationRequest, QUICK_QUESTIONS,
};

/// 分析结果，结构由提示模板决定
pub type Analysis = Map<String, Value>;

/// 流式文本
pub type TextStream = BoxStream<'static, Result<String, ApiError>>;

#[derive(Debug, Deserialize)]
struct DataReply<T> {
    data: T,
}

#[derive(Clone)]
pub struct AiService {
    client: ApiClient,
}

impl AiService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn post_data<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let reply: DataReply<T> = self.client.post(path, body).await?;
        Ok(reply.data)
    }

    // ==================== 分析 ====================

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/analyze", request).await
    }

    pub async fn analyze_portfolio(&self, request: &PortfolioAnalysisRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/analyze/portfolio", request).await
    }

    pub async fn analyze_market(&self, request: &MarketAnalysisRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/analyze/market", request).await
    }

    pub async fn analyze_indicators(&self, request: &IndicatorAnalysisRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/analyze/indicators", request).await
    }

    pub async fn assess_risk(&self, request: &RiskAssessmentRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/assess/risk", request).await
    }

    pub async fn optimize_strategy(&self, request: &StrategyOptimizationRequest) -> Result<Analysis, ApiError> {
        self.post_data("/ai/optimize/strategy", request).await
    }

    // ==================== 问答 ====================

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatAnswer, ApiError> {
        self.post_data("/ai/chat", request).await
    }

    /// 流式问答
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<TextStream, ApiError> {
        let request = ChatRequest {
            stream: true,
            ..request.clone()
        };
        self.stream_text("/ai/chat", &request).await
    }

    /// 流式分析
    pub async fn analyze_stream(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<TextStream, ApiError> {
        let request = AnalyzeRequest {
            stream: true,
            ..request.clone()
        };
        self.stream_text("/ai/analyze", &request).await
    }

    async fn stream_text<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TextStream, ApiError> {
        // 生成长回答可能超过普通请求的超时
        let builder = self
            .client
            .request(Method::POST, path)?
            .json(body)
            .timeout(self.client.stream_timeout());
        let response = self.client.send(builder).await?;

        let mut pending = Vec::new();
        let stream = response.bytes_stream().filter_map(move |chunk| {
            let item = match chunk {
                Ok(bytes) => {
                    let text = decode_utf8_chunk(&mut pending, &bytes);
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(ApiError::from_transport(e))),
            };
            futures::future::ready(item)
        });
        Ok(stream.boxed())
    }

    // ==================== 辅助 ====================

    pub async fn health(&self) -> Result<AiHealth, ApiError> {
        let reply: DataReply<AiHealth> = self.client.get("/ai/health", NO_QUERY).await?;
        Ok(reply.data)
    }

    /// 提示模板
    pub async fn templates(&self) -> Result<BTreeMap<String, String>, ApiError> {
        let reply: DataReply<BTreeMap<String, String>> =
            self.client.get("/ai/templates", NO_QUERY).await?;
        Ok(reply.data)
    }

    pub fn quick_questions(&self) -> &'static [QuickQuestion] {
        &QUICK_QUESTIONS
    }
}

/// 把新到的字节接在未完成的尾部后解码，不完整的多字节字符留到下一块
pub fn decode_utf8_chunk(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) => match e.error_len() {
            // 尾部不完整，等待后续字节
            None => e.valid_up_to(),
            // 非法字节，整块有损解码
            Some(_) => pending.len(),
        },
    };
    let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
    pending.drain(..valid);
    text
}
