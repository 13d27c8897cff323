//! K 线看板
//!
//! 指数 / 个股 K 线、可切换的指标副图、区间行情统计和板块列表。

use serde::{Deserialize, Serialize};

use super::stock_detail::KLinePanel;
use super::{recent_range, LoadState};
use crate::charts::{build_kline_option, ActiveIndicator, KLineChartState, ZoomRange, ZoomStep};
use crate::indicators::IndicatorSet;
use crate::models::{Frequency, IndicatorQuery, KLineDataItem, KLineQuery, Sector};
use crate::services::{MarketService, SectorService, Services};

/// 默认天数
pub const DASHBOARD_DAYS: i64 = 90;

/// 看板可选的市场指数
pub const MARKET_INDICES: [(&str, &str); 6] = [
    ("SH000001", "上证指数"),
    ("SZ399001", "深证成指"),
    ("SZ399006", "创业板指"),
    ("SH000300", "沪深300"),
    ("SH000016", "上证50"),
    ("SZ399905", "中证500"),
];

/// 看板查询参数，缺省为上证指数最近 90 天日线
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub freq: Frequency,
    #[serde(default)]
    pub indicator: ActiveIndicator,
    #[serde(default = "default_true")]
    pub show_volume: bool,
    #[serde(default)]
    pub zoom_start: Option<f64>,
    #[serde(default)]
    pub zoom_end: Option<f64>,
    /// 在当前范围上放大或缩小一级
    #[serde(default)]
    pub zoom: Option<ZoomStep>,
    /// 只切换指数时不重新加载板块
    #[serde(default)]
    pub skip_sectors: bool,
}

fn default_true() -> bool {
    true
}

/// 区间行情统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// 相对前一根收盘的涨跌
    pub change: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub turnover: f64,
}

/// 指数选项
#[derive(Debug, Clone, Serialize)]
pub struct IndexOption {
    pub code: &'static str,
    pub name: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KLineDashboardView {
    pub code: String,
    pub name: String,
    pub freq: Frequency,
    pub start_date: String,
    pub end_date: String,
    pub indices: Vec<IndexOption>,
    pub kline: LoadState<KLinePanel>,
    pub stats: Option<MarketStats>,
    pub sectors: LoadState<Vec<Sector>>,
}

pub struct KLineDashboard {
    market: MarketService,
    sector: SectorService,
}

impl KLineDashboard {
    pub fn new(services: &Services) -> Self {
        Self {
            market: services.market.clone(),
            sector: services.sector.clone(),
        }
    }

    pub async fn load(&self, code: &str, query: &DashboardQuery) -> KLineDashboardView {
        let (default_start, default_end) = recent_range(DASHBOARD_DAYS);
        let start_date = query.start_date.clone().unwrap_or(default_start);
        let end_date = query.end_date.clone().unwrap_or(default_end);
        let code = code.trim().to_uppercase();
        let name = index_name(&code)
            .map(str::to_string)
            .unwrap_or_else(|| code.clone());

        let kline_query = KLineQuery {
            code: code.clone(),
            freq: query.freq,
            start_date: start_date.clone(),
            end_date: end_date.clone(),
        };
        let indicator_query = IndicatorQuery {
            code: code.clone(),
            freq: query.freq,
            start_date: start_date.clone(),
            end_date: end_date.clone(),
            indicators: Vec::new(),
        };

        let (bars, backend, sectors) = tokio::join!(
            self.market.get_kline_data(&kline_query),
            self.market.get_indicators(&indicator_query),
            async {
                if query.skip_sectors {
                    None
                } else {
                    Some(self.sector.get_sector_list().await)
                }
            },
        );

        let mut chart = KLineChartState {
            title: name.clone(),
            subtitle: query.freq.label().to_string(),
            show_volume: query.show_volume,
            active_indicator: query.indicator,
            zoom: match (query.zoom_start, query.zoom_end) {
                (Some(start), Some(end)) => Some(ZoomRange { start, end }),
                _ => None,
            },
            ..Default::default()
        };

        let (kline, stats) = match bars {
            Ok(bars) if bars.is_empty() => (LoadState::Error("暂无K线数据".to_string()), None),
            Ok(bars) => {
                if let Some(step) = query.zoom {
                    let current = chart.zoom.unwrap_or_else(|| ZoomRange::latest(bars.len()));
                    chart.zoom = Some(current.step(step));
                }
                // 后端指标不可用时按 K 线本地计算
                let indicators = match &backend {
                    Ok(ind) => IndicatorSet::merge_backend(&bars, ind),
                    Err(e) => {
                        log::debug!("后端指标不可用 {}: {}", code, e);
                        IndicatorSet::compute(&bars)
                    }
                };
                let option = build_kline_option(&bars, Some(&indicators), &chart);
                let stats = market_stats(&bars);
                (LoadState::Success(KLinePanel { bars, option }), stats)
            }
            Err(e) => {
                log::warn!("加载看板K线失败 {}: {}", code, e);
                (LoadState::Error(e.to_string()), None)
            }
        };

        KLineDashboardView {
            indices: MARKET_INDICES
                .iter()
                .map(|(c, n)| IndexOption {
                    code: c,
                    name: n,
                    selected: *c == code,
                })
                .collect(),
            code,
            name,
            freq: query.freq,
            start_date,
            end_date,
            kline,
            stats,
            sectors: match sectors {
                Some(result) => result.into(),
                None => LoadState::Idle,
            },
        }
    }
}

pub fn index_name(code: &str) -> Option<&'static str> {
    MARKET_INDICES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, n)| *n)
}

/// 最后一根 K 线的统计，涨跌相对前一根收盘；只有一根时相对自身
pub fn market_stats(bars: &[KLineDataItem]) -> Option<MarketStats> {
    let last = bars.last()?;
    let prev = if bars.len() >= 2 { &bars[bars.len() - 2] } else { &bars[0] };
    let change = last.close - prev.close;
    let change_pct = if prev.close != 0.0 {
        change / prev.close * 100.0
    } else {
        0.0
    };
    Some(MarketStats {
        open: last.open,
        high: last.high,
        low: last.low,
        close: last.close,
        change,
        change_pct,
        volume: last.volume,
        turnover: last.amount.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, TtlCache};
    use crate::client::test_support::spawn_backend;
    use crate::client::{ApiClient, ClientOptions};
    use actix_web::{web, HttpResponse};
    use std::sync::Arc;

    fn bar(date: &str, open: f64, close: f64) -> KLineDataItem {
        KLineDataItem {
            date: date.to_string(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1000.0,
            amount: Some(5000.0),
        }
    }

    #[test]
    fn test_market_stats() {
        println!("\n========== 测试区间行情统计 ==========");
        let bars = vec![bar("2025-01-02", 3000.0, 3100.0), bar("2025-01-03", 3100.0, 3038.0)];
        let stats = market_stats(&bars).unwrap();
        assert_eq!(stats.close, 3038.0);
        assert_eq!(stats.change, -62.0);
        assert!((stats.change_pct - (-2.0)).abs() < 1e-9);
        assert_eq!(stats.turnover, 5000.0);

        let single = market_stats(&bars[..1]).unwrap();
        assert_eq!(single.change, 0.0);
        assert!(market_stats(&[]).is_none());
        println!("✅ 区间行情统计测试通过！");
    }

    #[test]
    fn test_index_name() {
        assert_eq!(index_name("sh000300"), Some("沪深300"));
        assert_eq!(index_name("600519"), None);
    }

    /// 后端指标接口失败时仍能出图，MACD 副图生效
    #[actix_web::test]
    async fn test_dashboard_indicator_fallback() {
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/market/kline/{code}",
                web::get().to(|| async {
                    let bars: Vec<serde_json::Value> = (1..=30)
                        .map(|d| {
                            let c = 3000.0 + d as f64;
                            serde_json::json!({
                                "timestamp": format!("2025-01-{:02}T00:00:00", d),
                                "open": c - 1.0, "high": c + 2.0, "low": c - 2.0,
                                "close": c, "volume": 100.0
                            })
                        })
                        .collect();
                    HttpResponse::Ok().json(serde_json::json!({ "data": bars }))
                }),
            )
            .route(
                "/api/v1/market/indicators/{code}",
                web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
            )
            .route(
                "/api/v1/sector/list",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({
                        "code": 200, "message": "ok",
                        "data": [{ "code": "BK0001", "name": "白酒" }]
                    }))
                }),
            );
        });

        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let client = ApiClient::new(&options, store.clone()).unwrap();
        let services = Services::new(client, Arc::new(TtlCache::new(store.clone())), store);

        let query = DashboardQuery {
            start_date: Some("2025-01-01".into()),
            end_date: Some("2025-01-31".into()),
            indicator: ActiveIndicator::Macd,
            show_volume: true,
            ..Default::default()
        };
        let view = KLineDashboard::new(&services).load("sh000001", &query).await;

        assert_eq!(view.code, "SH000001");
        assert_eq!(view.name, "上证指数");
        assert!(view.indices[0].selected);
        let panel = view.kline.value().unwrap();
        assert_eq!(panel.bars.len(), 30);
        assert_eq!(panel.option["grid"].as_array().unwrap().len(), 3);
        assert_eq!(view.stats.unwrap().close, 3030.0);
        assert_eq!(view.sectors.value().unwrap()[0].name, "白酒");

        handle.stop(true).await;
    }

    /// 放大一级后可见范围从 0-100 收窄到 20-100；跳过板块时板块为 Idle
    #[actix_web::test]
    async fn test_dashboard_zoom_step() {
        let (base_url, handle) = spawn_backend(|cfg| {
            cfg.route(
                "/api/v1/market/kline/{code}",
                web::get().to(|| async {
                    let bars: Vec<serde_json::Value> = (1..=30)
                        .map(|d| {
                            serde_json::json!({
                                "timestamp": format!("2025-01-{:02}T00:00:00", d),
                                "open": 10.0, "high": 11.0, "low": 9.0,
                                "close": 10.5, "volume": 100.0
                            })
                        })
                        .collect();
                    HttpResponse::Ok().json(serde_json::json!({ "data": bars }))
                }),
            );
        });

        let store = Arc::new(MemoryStore::new());
        let options = ClientOptions {
            base_url,
            ..Default::default()
        };
        let client = ApiClient::new(&options, store.clone()).unwrap();
        let services = Services::new(client, Arc::new(TtlCache::new(store.clone())), store);

        let query = DashboardQuery {
            start_date: Some("2025-01-01".into()),
            end_date: Some("2025-01-31".into()),
            zoom: Some(ZoomStep::In),
            skip_sectors: true,
            ..Default::default()
        };
        let view = KLineDashboard::new(&services).load("SZ399001", &query).await;

        let option = &view.kline.value().unwrap().option;
        assert_eq!(option["dataZoom"][0]["start"], serde_json::json!(20.0));
        assert_eq!(option["dataZoom"][0]["end"], serde_json::json!(100.0));
        assert_eq!(view.sectors, LoadState::Idle);

        handle.stop(true).await;
    }
}
