//! 策略与回测数据模型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 策略类型
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StrategyType {
    #[serde(rename = "MA")]
    Ma,
    #[serde(rename = "EMA")]
    Ema,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "BOLL")]
    Boll,
    #[serde(rename = "KDJ")]
    Kdj,
    DualThrust,
    Grid,
    MeanReversion,
    TrendFollowing,
    WilliamsR,
}

impl StrategyType {
    /// 全部策略类型及显示名称
    pub const ALL: [(StrategyType, &'static str); 11] = [
        (StrategyType::Ma, "双均线(MA)"),
        (StrategyType::Ema, "EMA"),
        (StrategyType::Rsi, "RSI"),
        (StrategyType::Macd, "MACD"),
        (StrategyType::Boll, "布林带(BOLL)"),
        (StrategyType::Kdj, "KDJ"),
        (StrategyType::DualThrust, "Dual Thrust"),
        (StrategyType::Grid, "网格"),
        (StrategyType::MeanReversion, "均值回归"),
        (StrategyType::TrendFollowing, "趋势跟随"),
        (StrategyType::WilliamsR, "Williams R"),
    ];
}

/// 策略绩效摘要
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StrategyPerformance {
    pub total_return: f64,
    pub sharpe_ratio: f64,
}

/// 策略信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Strategy {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub performance: Option<StrategyPerformance>,
    #[serde(default)]
    pub created_at: String,
}

/// 创建策略请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateStrategyRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub params: Map<String, Value>,
}

/// 更新策略请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UpdateStrategyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// 回测请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BacktestRequest {
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_capital: Option<f64>,
}

/// 策略内参数优化请求（query 参数）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StrategyOptimizeParams {
    pub method: String,
    pub stock_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_ranges: Option<String>,
}

/// 回测指标
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BacktestMetric {
    /// 总收益率（小数）
    pub total_return: f64,
    /// 年化收益率
    pub annual_return: f64,
    /// 最大回撤
    pub max_drawdown: f64,
    /// 夏普比率
    pub sharpe_ratio: f64,
    /// 胜率
    pub win_rate: f64,
    /// 交易次数
    pub trade_count: u32,
    /// 盈亏比
    pub profit_loss_ratio: f64,
    /// 波动率
    pub volatility: f64,
    /// 卡尔马比率
    pub calmar_ratio: f64,
    /// 单笔最大盈利
    #[serde(default)]
    pub max_single_profit: f64,
}

/// 成交记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TradeRecord {
    pub id: String,
    pub open_date: String,
    #[serde(default)]
    pub close_date: String,
    /// 买入 / 卖出 / 多 / 空
    #[serde(rename = "type")]
    pub trade_type: String,
    pub open_price: f64,
    #[serde(default)]
    pub close_price: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub profit_pct: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: String,
}

/// 净值曲线上的一个点
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EquityPoint {
    pub date: String,
    /// 策略净值
    #[serde(alias = "total_value")]
    pub strategy_value: f64,
    /// 基准净值
    #[serde(default)]
    pub benchmark_value: f64,
    /// 当前回撤（小数）
    #[serde(default)]
    pub drawdown: f64,
    /// 累计收益率（小数）
    #[serde(default)]
    pub cumulative_return: Option<f64>,
    #[serde(default)]
    pub indicator: Option<f64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
}

/// 回测结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BacktestResult {
    pub id: String,
    #[serde(default)]
    pub strategy_name: String,
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub frequency: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub metrics: BacktestMetric,
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
    #[serde(default)]
    pub equity_curve: Vec<EquityPoint>,
}

/// 回测报告元数据
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BacktestReportMetadata {
    pub filename: String,
    pub strategy_name: String,
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    pub create_time: String,
    pub file_path: String,
}

/// 已加载的回测报告
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BacktestReportData {
    #[serde(default)]
    pub metadata: Option<BacktestReportMetadata>,
    pub data: Value,
}

/// 保存回测报告的回执
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedReport {
    pub filename: String,
    pub file_path: String,
}
