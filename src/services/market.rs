//! 行情服务
//!
//! 实时行情缓存 30 秒，K 线与技术指标缓存 10 分钟，批量行情缓存 30 秒。
//! K 线在写入缓存前统一整理：按日期排序，丢弃高低价不自洽的数据。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::stock::normalize_code;
use super::{cached, segment, SLOW_REQUEST_TIMEOUT};
use crate::cache::TtlCache;
use crate::client::{unwrap_envelope, ApiClient, ApiError, NO_QUERY};
use crate::models::{
    Frequency, IndicatorQuery, Indicators, KLineDataItem, KLineQuery, MaybeEnveloped, Quote,
    RawKLineBar,
};

pub const QUOTE_TTL: Duration = Duration::from_secs(30);
pub const KLINE_TTL: Duration = Duration::from_secs(10 * 60);
pub const INDICATORS_TTL: Duration = Duration::from_secs(10 * 60);
pub const BATCH_QUOTES_TTL: Duration = Duration::from_secs(30);

/// K 线接口的两种返回形态
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KLineBody {
    Object { data: Vec<RawKLineBar> },
    List(Vec<RawKLineBar>),
}

/// 指标接口除代码外的查询参数，同时用作缓存键
#[derive(Debug, Serialize)]
struct IndicatorParams<'a> {
    freq: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    indicators: Option<String>,
}

#[derive(Clone)]
pub struct MarketService {
    client: ApiClient,
    cache: Arc<TtlCache>,
}

impl MarketService {
    pub fn new(client: ApiClient, cache: Arc<TtlCache>) -> Self {
        Self { client, cache }
    }

    /// 实时行情
    pub async fn get_quote(&self, code: &str) -> Result<Quote, ApiError> {
        let code = normalize_code(code);
        let key = format!("market_quote_{}", code);
        let path = format!("/market/quote/{}", segment(&code));
        cached(&self.cache, &key, QUOTE_TTL, || {
            self.client.get_enveloped(&path, NO_QUERY)
        })
        .await
    }

    /// K 线数据
    pub async fn get_kline_data(&self, query: &KLineQuery) -> Result<Vec<KLineDataItem>, ApiError> {
        let code = normalize_code(&query.code);
        let freq = query.freq.as_str();
        let key = format!(
            "market_kline_{}_{}_{}_{}",
            code, freq, query.start_date, query.end_date
        );
        cached(&self.cache, &key, KLINE_TTL, || async {
            log::info!(
                "[K线数据] 请求API: {} {} {}-{}",
                code,
                freq,
                query.start_date,
                query.end_date
            );
            let body: KLineBody = self
                .client
                .get_with_timeout(
                    &format!("/market/kline/{}", segment(&code)),
                    &[
                        ("freq", freq),
                        ("start_date", query.start_date.as_str()),
                        ("end_date", query.end_date.as_str()),
                    ],
                    SLOW_REQUEST_TIMEOUT,
                )
                .await?;
            let raw = match body {
                KLineBody::Object { data } | KLineBody::List(data) => data,
            };
            Ok(normalize_bars(&code, raw))
        })
        .await
    }

    /// 后端技术指标
    pub async fn get_indicators(&self, query: &IndicatorQuery) -> Result<Indicators, ApiError> {
        let code = normalize_code(&query.code);
        let params = IndicatorParams {
            freq: query.freq.as_str(),
            start_date: &query.start_date,
            end_date: &query.end_date,
            indicators: (!query.indicators.is_empty()).then(|| query.indicators.join(",")),
        };
        let key = format!(
            "market_indicators_{}_{}",
            code,
            serde_json::to_string(&params).unwrap_or_default()
        );
        cached(&self.cache, &key, INDICATORS_TTL, || async {
            let body: MaybeEnveloped<Indicators> = self
                .client
                .get_with_timeout(
                    &format!("/market/indicators/{}", segment(&code)),
                    &params,
                    SLOW_REQUEST_TIMEOUT,
                )
                .await?;
            unwrap_envelope(body)
        })
        .await
    }

    /// 批量行情，`codes` 为逗号分隔的代码串
    pub async fn get_batch_quotes(&self, codes: &str) -> Result<Vec<Quote>, ApiError> {
        let key = format!("market_batch_{}", codes);
        cached(&self.cache, &key, BATCH_QUOTES_TTL, || async {
            let body: MaybeEnveloped<Vec<Quote>> = self
                .client
                .get_with_timeout("/market/batch", &[("codes", codes)], SLOW_REQUEST_TIMEOUT)
                .await?;
            unwrap_envelope(body)
        })
        .await
    }
}

/// 整理后端 K 线：转换格式、按日期排序、剔除不自洽数据
pub fn normalize_bars(code: &str, raw: Vec<RawKLineBar>) -> Vec<KLineDataItem> {
    let mut bars: Vec<KLineDataItem> = raw.into_iter().map(KLineDataItem::from).collect();
    bars.sort_by(|a, b| a.date.cmp(&b.date));

    let before = bars.len();
    bars.retain(KLineDataItem::is_consistent);
    if bars.len() < before {
        log::warn!(
            "[K线数据] {} 丢弃 {} 条高低价不自洽的数据",
            code,
            before - bars.len()
        );
    }
    bars
}

/// 默认频率的 K 线查询
pub fn daily_query(code: &str, start_date: &str, end_date: &str) -> KLineQuery {
    KLineQuery {
        code: code.to_string(),
        freq: Frequency::Daily,
        start_date: start_date.to_string(),
        end_date: end_date.to_string(),
    }
}
