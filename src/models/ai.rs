//! AI 分析与问答模型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 通用分析类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeType {
    Portfolio,
    Market,
    Indicators,
    Risk,
    Strategy,
}

/// 通用分析请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalyzeRequest {
    #[serde(rename = "type")]
    pub analyze_type: AnalyzeType,
    pub context: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
}

/// 问答请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default)]
    pub stream: bool,
}

/// 问答结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
}

/// 持仓
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PositionInput {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: f64,
    pub cost_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
}

/// 持仓分析请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PortfolioAnalysisRequest {
    pub positions: Vec<PositionInput>,
    pub market_data: Map<String, Value>,
    pub indicators: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
}

/// 市场分析中的 K 线
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// 市场分析请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketAnalysisRequest {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub kline_data: Vec<AnalysisBar>,
    pub indicators: Map<String, Value>,
    pub volume_info: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
}

/// 指标分析请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorAnalysisRequest {
    pub indicators: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
}

/// 风险评估请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskAssessmentRequest {
    pub portfolio_info: Map<String, Value>,
    pub risk_metrics: Map<String, Value>,
    pub market_environment: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
}

/// 策略优化建议请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StrategyOptimizationRequest {
    pub strategy_type: String,
    pub strategy_params: Map<String, Value>,
    pub backtest_results: Map<String, Value>,
    pub trades_summary: String,
    #[serde(default)]
    pub stream: bool,
}

/// AI 服务健康状态
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AiHealthStatus {
    Healthy,
    Warning,
    Error,
}

/// AI 健康检查结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AiHealth {
    pub status: AiHealthStatus,
    pub message: String,
    pub configured: bool,
    #[serde(default)]
    pub model: Option<String>,
}

/// 快速提问模板
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QuickQuestion {
    pub id: u32,
    pub question: &'static str,
    pub category: &'static str,
}

/// 内置快速提问
pub const QUICK_QUESTIONS: [QuickQuestion; 6] = [
    QuickQuestion { id: 1, question: "什么是移动平均线？", category: "技术指标" },
    QuickQuestion { id: 2, question: "如何判断买入信号？", category: "交易策略" },
    QuickQuestion { id: 3, question: "什么是MACD指标？", category: "技术指标" },
    QuickQuestion { id: 4, question: "如何控制投资风险？", category: "风险管理" },
    QuickQuestion { id: 5, question: "什么是RSI指标？", category: "技术指标" },
    QuickQuestion { id: 6, question: "如何设置止损？", category: "风险管理" },
];
