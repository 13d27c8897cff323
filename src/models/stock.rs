//! 股票数据模型
//!
//! 定义股票、实时行情、K线等数据结构

use serde::{Deserialize, Serialize};

/// 股票基本信息
///
/// 后端部分接口使用中文字段名（代码/名称），这里通过 alias 兼容
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Stock {
    /// 股票代码
    #[serde(default, alias = "代码")]
    pub code: Option<String>,
    /// 股票名称
    #[serde(default, alias = "名称")]
    pub name: Option<String>,
    /// 市场
    #[serde(default)]
    pub market: Option<String>,
    /// 板块
    #[serde(default)]
    pub sector: Option<String>,
    /// 行业
    #[serde(default)]
    pub industry: Option<String>,
    /// 上市日期
    #[serde(default)]
    pub list_date: Option<String>,
}

/// 实时行情
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Quote {
    /// 股票代码
    #[serde(alias = "code")]
    pub stock_code: String,
    /// 股票名称
    #[serde(default)]
    pub name: Option<String>,
    /// 最新价
    pub price: f64,
    /// 涨跌额
    #[serde(default)]
    pub change: f64,
    /// 涨跌幅（百分比）
    #[serde(default, alias = "change_percent")]
    pub change_pct: f64,
    /// 开盘价
    #[serde(default)]
    pub open: f64,
    /// 最高价
    #[serde(default)]
    pub high: f64,
    /// 最低价
    #[serde(default)]
    pub low: f64,
    /// 昨收价
    #[serde(default)]
    pub pre_close: Option<f64>,
    /// 成交量
    #[serde(default)]
    pub volume: f64,
    /// 成交额
    #[serde(default)]
    pub amount: Option<f64>,
    /// 行情时间
    #[serde(default)]
    pub timestamp: String,
}

/// 后端返回的原始 K 线
///
/// 后端使用 `timestamp` 字段（ISO 8601），部分数据源直接给 `date`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RawKLineBar {
    #[serde(alias = "date")]
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// 单根 K 线
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KLineDataItem {
    /// 日期（YYYY-MM-DD，分钟线保留时间部分）
    pub date: String,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: f64,
    /// 成交额
    #[serde(default)]
    pub amount: Option<f64>,
}

impl KLineDataItem {
    /// OHLC 是否自洽：最高价不低于开收，最低价不高于开收
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }

    /// 是否收阳（收盘不低于开盘）
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

impl From<RawKLineBar> for KLineDataItem {
    fn from(raw: RawKLineBar) -> Self {
        // 日线从时间戳中取日期部分
        let date = match raw.timestamp.split_once('T') {
            Some((day, time)) if time.starts_with("00:00:00") || time.is_empty() => day.to_string(),
            Some((day, time)) => format!("{} {}", day, time.get(..5).unwrap_or(time)),
            None => raw.timestamp.clone(),
        };
        let amount = raw.amount.or(Some(raw.volume * raw.close));
        Self {
            date,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            amount,
        }
    }
}

/// 股票列表查询参数
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StockListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// 是否使用本地已下载数据（缺省为 true）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_local: Option<bool>,
}

/// K 线周期
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "5min")]
    Min5,
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "60min")]
    Min60,
    #[default]
    #[serde(rename = "daily")]
    Daily,
}

impl Frequency {
    /// 接口参数值
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Min1 => "1min",
            Frequency::Min5 => "5min",
            Frequency::Min15 => "15min",
            Frequency::Min30 => "30min",
            Frequency::Min60 => "60min",
            Frequency::Daily => "daily",
        }
    }

    /// 界面显示名称
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Min1 => "1分钟",
            Frequency::Min5 => "5分钟",
            Frequency::Min15 => "15分钟",
            Frequency::Min30 => "30分钟",
            Frequency::Min60 => "60分钟",
            Frequency::Daily => "日线",
        }
    }
}

/// K 线查询参数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KLineQuery {
    pub code: String,
    #[serde(default)]
    pub freq: Frequency,
    pub start_date: String,
    pub end_date: String,
}

/// 技术指标查询参数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorQuery {
    pub code: String,
    #[serde(default)]
    pub freq: Frequency,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indicators: Vec<String>,
}

/// 股票代码库中的股票行情信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockCodeInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_pct: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub pre_close: f64,
    #[serde(default)]
    pub update_time: String,
}

/// 股票代码搜索结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockSearchResult {
    pub success: bool,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub search_type: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub results: Vec<StockCodeInfo>,
}

/// 股票代码库统计
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockCodeStatistics {
    pub total: u64,
    #[serde(default)]
    pub by_market: std::collections::BTreeMap<String, u64>,
}

/// 搜索方式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Fuzzy,
    Exact,
    Prefix,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Fuzzy => "fuzzy",
            SearchType::Exact => "exact",
            SearchType::Prefix => "prefix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试后端 K 线转换
    #[test]
    fn test_raw_bar_conversion() {
        println!("\n========== 测试K线格式转换 ==========");
        let raw: RawKLineBar = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-01-02T00:00:00",
            "open": 10.0, "high": 10.5, "low": 9.8, "close": 10.2, "volume": 1000.0
        }))
        .unwrap();
        let bar = KLineDataItem::from(raw);
        assert_eq!(bar.date, "2025-01-02");
        assert_eq!(bar.amount, Some(1000.0 * 10.2));
        assert!(bar.is_consistent());
        assert!(bar.is_up());

        let minute: RawKLineBar = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-01-02T09:35:00",
            "open": 10.0, "high": 10.5, "low": 9.8, "close": 9.9, "volume": 10.0, "amount": 99.0
        }))
        .unwrap();
        let bar = KLineDataItem::from(minute);
        assert_eq!(bar.date, "2025-01-02 09:35");
        assert_eq!(bar.amount, Some(99.0));
        println!("✅ K线格式转换测试通过！");
    }

    /// 时间部分含多字节字符或长度不足时保留原样
    #[test]
    fn test_raw_bar_non_ascii_time() {
        let raw = |timestamp: &str| RawKLineBar {
            timestamp: timestamp.to_string(),
            open: 10.0,
            high: 10.5,
            low: 9.8,
            close: 10.2,
            volume: 1.0,
            amount: None,
        };
        assert_eq!(KLineDataItem::from(raw("2025-01-02T时间")).date, "2025-01-02 时间");
        assert_eq!(KLineDataItem::from(raw("2025-01-02T9:3")).date, "2025-01-02 9:3");
        assert_eq!(KLineDataItem::from(raw("2025-01-02T上午09:30")).date, "2025-01-02 上午09:30");
    }

    /// 测试中文字段别名
    #[test]
    fn test_stock_chinese_alias() {
        let stock: Stock =
            serde_json::from_str(r#"{"代码":"600519","名称":"贵州茅台"}"#).unwrap();
        assert_eq!(stock.code.as_deref(), Some("600519"));
        assert_eq!(stock.name.as_deref(), Some("贵州茅台"));
    }

    #[test]
    fn test_frequency_serde() {
        assert_eq!(serde_json::to_string(&Frequency::Daily).unwrap(), "\"daily\"");
        let f: Frequency = serde_json::from_str("\"5min\"").unwrap();
        assert_eq!(f, Frequency::Min5);
        assert_eq!(f.label(), "5分钟");
    }
}
