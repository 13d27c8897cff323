//! 行情扩展数据模型
//!
//! 后端技术指标接口的返回结构。指标数组中缺失值可能是 `"-"`、空串或 null，
//! 统一解析为 `None`。

use serde::{Deserialize, Deserializer, Serialize};

/// 指标序列（与 K 线逐根对齐，缺失位置为 None）
pub type Series = Vec<Option<f64>>;

/// 解析 `(number | string | null)[]`
fn de_series<'de, D>(deserializer: D) -> Result<Series, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().map(value_to_f64).collect())
}

fn de_opt_series<'de, D>(deserializer: D) -> Result<Option<Series>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| v.iter().map(value_to_f64).collect()))
}

fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// 后端均线指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BackendMa {
    #[serde(rename = "MA5", default, deserialize_with = "de_opt_series")]
    pub ma5: Option<Series>,
    #[serde(rename = "MA10", default, deserialize_with = "de_opt_series")]
    pub ma10: Option<Series>,
    #[serde(rename = "MA20", default, deserialize_with = "de_opt_series")]
    pub ma20: Option<Series>,
    #[serde(rename = "MA30", default, deserialize_with = "de_opt_series")]
    pub ma30: Option<Series>,
    #[serde(rename = "MA60", default, deserialize_with = "de_opt_series")]
    pub ma60: Option<Series>,
}

/// 后端布林带指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendBoll {
    #[serde(deserialize_with = "de_series")]
    pub upper: Series,
    #[serde(deserialize_with = "de_series")]
    pub middle: Series,
    #[serde(deserialize_with = "de_series")]
    pub lower: Series,
}

/// 后端 MACD 指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendMacd {
    #[serde(rename = "DIF", deserialize_with = "de_series")]
    pub dif: Series,
    #[serde(rename = "DEA", deserialize_with = "de_series")]
    pub dea: Series,
    #[serde(rename = "MACD", deserialize_with = "de_series")]
    pub macd: Series,
}

/// 后端技术指标响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Indicators {
    #[serde(rename = "MA", default)]
    pub ma: Option<BackendMa>,
    #[serde(rename = "BOLL", default)]
    pub boll: Option<BackendBoll>,
    #[serde(rename = "RSI", default, deserialize_with = "de_opt_series")]
    pub rsi: Option<Series>,
    #[serde(rename = "MACD", default)]
    pub macd: Option<BackendMacd>,
}

/// 板块信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sector {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
