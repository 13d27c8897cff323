//! 回测报告服务
//!
//! 报告文件由后端保存；正在查看的报告另存一份草稿到本地持久化存储，重启后可恢复。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::segment;
use crate::cache::PersistentStore;
use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::{BacktestReportData, BacktestReportMetadata, BacktestResult, SavedReport};

/// 本地草稿的存储键
pub const REPORT_DRAFT_KEY: &str = "backtestReportState";

#[derive(Debug, Serialize)]
struct SaveBody<'a> {
    data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy_name: Option<&'a str>,
}

/// 报告接口的回执 `{code, message, data?, metadata?}`
#[derive(Debug, Deserialize)]
struct ReportReply<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
    #[serde(default)]
    metadata: Option<BacktestReportMetadata>,
}

impl<T> ReportReply<T> {
    fn check(&self, fallback: &str) -> Result<(), ApiError> {
        if self.code == 200 {
            return Ok(());
        }
        Err(ApiError::Server {
            status: u16::try_from(self.code).unwrap_or(500),
            message: if self.message.is_empty() {
                fallback.to_string()
            } else {
                self.message.clone()
            },
        })
    }
}

#[derive(Clone)]
pub struct BacktestReportService {
    client: ApiClient,
    store: Arc<dyn PersistentStore>,
}

impl BacktestReportService {
    pub fn new(client: ApiClient, store: Arc<dyn PersistentStore>) -> Self {
        Self { client, store }
    }

    /// 报告列表，后端返回非数组时视为空
    pub async fn list(&self) -> Result<Vec<BacktestReportMetadata>, ApiError> {
        let body: Value = self.client.get("/backtest-reports/list", NO_QUERY).await?;
        match body {
            Value::Array(_) => {
                serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
            }
            _ => Ok(Vec::new()),
        }
    }

    /// 保存报告
    pub async fn save(&self, data: &Value, strategy_name: Option<&str>) -> Result<SavedReport, ApiError> {
        let reply: ReportReply<SavedReport> = self
            .client
            .post("/backtest-reports/save", &SaveBody { data, strategy_name })
            .await?;
        reply.check("保存回测报告失败")?;
        reply
            .data
            .ok_or_else(|| ApiError::Decode("保存回测报告的回执缺少 data".to_string()))
    }

    /// 加载报告
    pub async fn load(&self, filename: &str) -> Result<BacktestReportData, ApiError> {
        let reply: ReportReply<Value> = self
            .client
            .get(&format!("/backtest-reports/load/{}", segment(filename)), NO_QUERY)
            .await?;
        reply.check("加载回测报告失败")?;
        Ok(BacktestReportData {
            metadata: reply.metadata,
            data: reply.data.unwrap_or(Value::Null),
        })
    }

    /// 删除报告
    pub async fn delete(&self, filename: &str) -> Result<(), ApiError> {
        let reply: ReportReply<Value> = self
            .client
            .delete(&format!("/backtest-reports/{}", segment(filename)))
            .await?;
        reply.check("删除回测报告失败")
    }

    // ==================== 本地草稿 ====================

    pub fn save_draft(&self, result: &BacktestResult) -> anyhow::Result<()> {
        self.store
            .set_item(REPORT_DRAFT_KEY, &serde_json::to_string(result)?)
    }

    /// 读取草稿，损坏时删除并返回 None
    pub fn load_draft(&self) -> Option<BacktestResult> {
        let raw = self.store.get_item(REPORT_DRAFT_KEY).ok()??;
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("回测报告草稿已损坏，已删除: {}", e);
                self.clear_draft();
                None
            }
        }
    }

    pub fn clear_draft(&self) {
        if let Err(e) = self.store.remove_item(REPORT_DRAFT_KEY) {
            log::warn!("删除回测报告草稿失败: {}", e);
        }
    }
}
