//! 回测图表配置
//!
//! - `build_backtest_option`：净值、累计收益率、回撤三条曲线
//! - `build_report_option`：回测报告的组合图（股价 K 线、策略净值、单笔盈亏、回撤）
//! - `consecutive_trend`：连涨连跌统计

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::round2;
use crate::models::{BacktestResult, EquityPoint};

pub const EQUITY_COLOR: &str = "#1890ff";
pub const RETURN_COLOR: &str = "#52c41a";
pub const DRAWDOWN_COLOR: &str = "#f5222d";
pub const TREND_UP_COLOR: &str = "#16a34a";
pub const TREND_DOWN_COLOR: &str = "#dc2626";

/// 组合图只标注达到该天数的连涨连跌
pub const TREND_LABEL_MIN_RUN: u32 = 3;

// ==================== 连涨连跌 ====================

/// 涨跌方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// 连涨连跌点：截至 `date` 已连续 `value` 天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: u32,
    #[serde(rename = "type")]
    pub direction: TrendDirection,
}

/// 统计连涨连跌
///
/// 逐日比较收盘价，只记录连续超过 1 天的位置。
/// 收盘价持平按下跌计；缺少收盘价的点跳过，不打断计数。
pub fn consecutive_trend(curve: &[EquityPoint]) -> Vec<TrendPoint> {
    let mut points = Vec::new();
    let (mut up, mut down) = (0u32, 0u32);

    for pair in curve.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);
        let (Some(prev_close), Some(close)) = (prev.close, current.close) else {
            continue;
        };

        if close > prev_close {
            up += 1;
            down = 0;
        } else {
            down += 1;
            up = 0;
        }

        if up > 1 {
            points.push(TrendPoint {
                date: current.date.clone(),
                value: up,
                direction: TrendDirection::Up,
            });
        } else if down > 1 {
            points.push(TrendPoint {
                date: current.date.clone(),
                value: down,
                direction: TrendDirection::Down,
            });
        }
    }
    points
}

// ==================== 净值曲线 ====================

/// 累计收益率：优先使用后端给出的值，否则按首个净值计算
fn cumulative_returns(curve: &[EquityPoint]) -> Vec<f64> {
    let base = curve.first().map(|p| p.strategy_value).filter(|v| *v != 0.0);
    curve
        .iter()
        .map(|p| match (p.cumulative_return, base) {
            (Some(r), _) => r,
            (None, Some(base)) => p.strategy_value / base - 1.0,
            (None, None) => 0.0,
        })
        .collect()
}

/// 生成回测净值图 option
pub fn build_backtest_option(curve: &[EquityPoint]) -> Value {
    let dates: Vec<&str> = curve.iter().map(|p| p.date.as_str()).collect();
    let values: Vec<f64> = curve.iter().map(|p| p.strategy_value).collect();
    let returns: Vec<f64> = cumulative_returns(curve)
        .into_iter()
        .map(|r| round2(r * 100.0))
        .collect();
    let drawdowns: Vec<f64> = curve.iter().map(|p| round2(p.drawdown * 100.0)).collect();

    json!({
        "title": { "text": "回测结果分析", "left": "center" },
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "cross" } },
        "legend": { "data": ["净值曲线", "累计收益率", "回撤"], "top": 30 },
        "grid": [{ "left": "10%", "right": "10%", "top": "80", "height": "60%" }],
        "xAxis": [{
            "type": "category",
            "data": dates,
            "boundaryGap": false,
            "axisLine": { "onZero": false },
            "splitLine": { "show": false },
            "axisLabel": { "rotate": 45, "interval": "auto" }
        }],
        "yAxis": [
            { "name": "净值 (¥)", "type": "value", "position": "left", "splitArea": { "show": true } },
            {
                "name": "收益 / 回撤 (%)",
                "type": "value",
                "position": "right",
                "splitLine": { "show": false },
                "axisLabel": { "formatter": "{value}%" }
            }
        ],
        "dataZoom": [
            { "type": "inside", "xAxisIndex": [0], "start": 70, "end": 100 },
            { "type": "slider", "xAxisIndex": [0], "top": "95%", "start": 70, "end": 100 }
        ],
        "series": [
            {
                "name": "净值曲线",
                "type": "line",
                "data": values,
                "smooth": true,
                "symbol": "none",
                "lineStyle": { "width": 2, "color": EQUITY_COLOR },
                "areaStyle": { "color": "rgba(24, 144, 255, 0.15)" }
            },
            {
                "name": "累计收益率",
                "type": "line",
                "yAxisIndex": 1,
                "data": returns,
                "smooth": true,
                "symbol": "none",
                "lineStyle": { "width": 1.5, "color": RETURN_COLOR },
                "itemStyle": { "color": RETURN_COLOR }
            },
            {
                "name": "回撤",
                "type": "line",
                "yAxisIndex": 1,
                "data": drawdowns,
                "smooth": true,
                "symbol": "none",
                "lineStyle": { "width": 1, "color": DRAWDOWN_COLOR },
                "areaStyle": { "color": "rgba(245, 34, 45, 0.15)" }
            }
        ]
    })
}

// ==================== 回测报告组合图 ====================

/// 生成回测报告组合图 option
///
/// 四个网格：股价 K 线（含买卖点与连涨连跌标注）、策略净值、单笔盈亏、回撤
pub fn build_report_option(result: &BacktestResult, show_trend_numbers: bool) -> Value {
    let curve = &result.equity_curve;
    let dates: Vec<&str> = curve.iter().map(|p| p.date.as_str()).collect();

    let candles: Vec<Value> = curve
        .iter()
        .map(|p| json!([p.open, p.close, p.low, p.high]))
        .collect();

    let trade_marks: Vec<Value> = result
        .trades
        .iter()
        .map(|t| {
            let is_long = is_long_trade(&t.trade_type);
            json!({
                "name": t.trade_type,
                "value": if is_long { "B" } else { "S" },
                "xAxis": t.open_date,
                "yAxis": t.open_price,
                "symbol": "triangle",
                "symbolRotate": if is_long { 180 } else { 0 },
                "itemStyle": { "color": if is_long { "#3b82f6" } else { "#8b5cf6" } }
            })
        })
        .collect();

    let trend_marks: Vec<Value> = consecutive_trend(curve)
        .into_iter()
        .filter(|t| t.value >= TREND_LABEL_MIN_RUN)
        .filter_map(|t| {
            let index = dates.iter().position(|d| *d == t.date)?;
            let high = curve[index].high.unwrap_or_default();
            let color = match t.direction {
                TrendDirection::Up => TREND_UP_COLOR,
                TrendDirection::Down => TREND_DOWN_COLOR,
            };
            Some(json!({
                "name": t.value.to_string(),
                "value": [index, high],
                "itemStyle": { "color": color, "borderColor": color },
                "label": {
                    "show": show_trend_numbers,
                    "color": color,
                    "formatter": t.value.to_string(),
                    "position": "top"
                }
            }))
        })
        .collect();

    // 单笔盈亏（%）：按开仓日期对齐
    let pnl: Vec<Value> = curve
        .iter()
        .map(|p| {
            let pct = result
                .trades
                .iter()
                .find(|t| t.open_date == p.date)
                .map(|t| round2(t.profit_pct * 100.0))
                .unwrap_or(0.0);
            json!({
                "value": pct,
                "itemStyle": { "color": if pct > 0.0 { TREND_UP_COLOR } else { TREND_DOWN_COLOR } }
            })
        })
        .collect();

    let x_axis: Vec<Value> = (0..4)
        .map(|i| {
            json!({
                "type": "category",
                "data": dates,
                "gridIndex": i,
                "axisLabel": { "show": i == 3 },
                "axisTick": { "show": false }
            })
        })
        .collect();

    json!({
        "legend": {
            "data": ["股价K线", "策略净值", "连涨连跌"],
            "top": 0,
            "selected": { "连涨连跌": show_trend_numbers }
        },
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "cross" } },
        "axisPointer": { "link": [{ "xAxisIndex": "all" }] },
        "grid": [
            { "left": 50, "right": 50, "top": 60, "height": "40%" },
            { "left": 50, "right": 50, "top": "52%", "height": "15%" },
            { "left": 50, "right": 50, "top": "70%", "height": "10%" },
            { "left": 50, "right": 50, "top": "84%", "height": "8%" }
        ],
        "xAxis": x_axis,
        "yAxis": [
            { "scale": true, "gridIndex": 0, "name": "价格" },
            { "scale": true, "gridIndex": 1, "name": "净值" },
            { "gridIndex": 2, "name": "盈亏(%)" },
            { "gridIndex": 3, "name": "回撤", "axisLabel": { "show": false } }
        ],
        "series": [
            {
                "name": "股价K线",
                "type": "candlestick",
                "data": candles,
                "xAxisIndex": 0,
                "yAxisIndex": 0,
                "itemStyle": {
                    "color": super::CANDLE_UP_COLOR,
                    "color0": super::CANDLE_DOWN_COLOR,
                    "borderColor": super::CANDLE_UP_COLOR,
                    "borderColor0": super::CANDLE_DOWN_COLOR
                },
                "markPoint": { "symbolSize": 10, "data": trade_marks }
            },
            {
                "name": "连涨连跌",
                "type": "scatter",
                "data": trend_marks,
                "xAxisIndex": 0,
                "yAxisIndex": 0,
                "symbolSize": 8
            },
            {
                "name": "策略净值",
                "type": "line",
                "data": curve.iter().map(|p| p.strategy_value).collect::<Vec<_>>(),
                "xAxisIndex": 1,
                "yAxisIndex": 1,
                "smooth": true,
                "showSymbol": false,
                "lineStyle": { "width": 2, "color": "#3b82f6" }
            },
            {
                "name": "单笔盈亏",
                "type": "bar",
                "data": pnl,
                "xAxisIndex": 2,
                "yAxisIndex": 2
            },
            {
                "name": "回撤",
                "type": "line",
                "data": curve.iter().map(|p| p.drawdown).collect::<Vec<_>>(),
                "xAxisIndex": 3,
                "yAxisIndex": 3,
                "showSymbol": false,
                "lineStyle": { "width": 1, "color": "#ef4444" }
            }
        ],
        "dataZoom": [
            { "type": "inside", "xAxisIndex": [0, 1, 2, 3], "start": 0, "end": 100 },
            { "type": "slider", "xAxisIndex": [0, 1, 2, 3], "bottom": 10, "height": 20 }
        ]
    })
}

/// 买入 / 多 视为多头
pub fn is_long_trade(trade_type: &str) -> bool {
    matches!(trade_type, "买入" | "多" | "buy" | "long")
}
