//! K 线图配置
//!
//! 三个网格：主图（K 线 + 均线 / 布林带）、成交量、副图（MACD / KDJ）。
//! 三个 x 轴共用同一组日期，并由 dataZoom 联动。

use serde_json::{json, Value};

use super::{
    series_values, ActiveIndicator, KLineChartState, VolumeColoring, ZoomRange, BOLL_COLOR,
    CANDLE_DOWN_COLOR, CANDLE_UP_COLOR, DEA_COLOR, DIF_COLOR, KDJ_COLORS, MA_COLORS,
};
use crate::indicators::IndicatorSet;
use crate::models::KLineDataItem;

/// 生成 K 线图 option
///
/// `indicators` 为 None 时按 K 线本地计算
pub fn build_kline_option(
    bars: &[KLineDataItem],
    indicators: Option<&IndicatorSet>,
    state: &KLineChartState,
) -> Value {
    let computed;
    let indicators = match indicators {
        Some(set) => set,
        None => {
            computed = IndicatorSet::compute(bars);
            &computed
        }
    };

    let dates: Vec<&str> = bars.iter().map(|b| b.date.as_str()).collect();
    let zoom = state.zoom.unwrap_or_else(|| ZoomRange::latest(bars.len()));
    let sub_pane = state.active_indicator.uses_sub_pane();

    // ==================== 系列 ====================

    let candles: Vec<[f64; 4]> = bars.iter().map(|b| [b.open, b.close, b.low, b.high]).collect();
    let mut series = vec![json!({
        "type": "candlestick",
        "name": "日K",
        "data": candles,
        "itemStyle": {
            "color": CANDLE_UP_COLOR,
            "color0": CANDLE_DOWN_COLOR,
            "borderColor": CANDLE_UP_COLOR,
            "borderColor0": CANDLE_DOWN_COLOR
        }
    })];
    let mut legend = vec!["日K".to_string()];

    match state.active_indicator {
        ActiveIndicator::Ma => {
            let ma = [
                &indicators.ma5,
                &indicators.ma10,
                &indicators.ma20,
                &indicators.ma30,
            ];
            for ((name, color), data) in MA_COLORS.iter().zip(ma) {
                series.push(line_series(name, color, series_values(data), 0));
                legend.push(name.to_string());
            }
        }
        ActiveIndicator::Boll => {
            let boll = &indicators.boll;
            for (name, data) in [
                ("BOLL上轨", &boll.upper),
                ("BOLL中轨", &boll.middle),
                ("BOLL下轨", &boll.lower),
            ] {
                let mut line = line_series(name, BOLL_COLOR, series_values(data), 0);
                line["lineStyle"]["type"] = json!("dashed");
                series.push(line);
                legend.push(name.to_string());
            }
        }
        ActiveIndicator::Macd => {
            let macd = &indicators.macd;
            // MACD 数值较小，不做两位小数截断
            let wrap = |v: &[f64]| -> Vec<Value> { v.iter().map(|x| Value::from(*x)).collect() };
            series.push(line_series("DIF", DIF_COLOR, wrap(&macd.dif), 2));
            series.push(line_series("DEA", DEA_COLOR, wrap(&macd.dea), 2));
            let bars_data: Vec<Value> = macd
                .macd
                .iter()
                .map(|v| {
                    json!({
                        "value": v,
                        "itemStyle": {
                            "color": if *v >= 0.0 { CANDLE_UP_COLOR } else { CANDLE_DOWN_COLOR }
                        }
                    })
                })
                .collect();
            series.push(json!({
                "name": "MACD",
                "type": "bar",
                "data": bars_data,
                "xAxisIndex": 2,
                "yAxisIndex": 2
            }));
            legend.extend(["DIF", "DEA", "MACD"].map(String::from));
        }
        ActiveIndicator::Kdj => {
            let kdj = &indicators.kdj;
            for ((name, color), data) in KDJ_COLORS.iter().zip([&kdj.k, &kdj.d, &kdj.j]) {
                series.push(line_series(name, color, series_values(data), 2));
                legend.push(name.to_string());
            }
        }
    }

    if state.show_volume {
        let volumes: Vec<Value> = bars
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let up = is_volume_up(bars, i, state.volume_coloring);
                json!({
                    "value": b.volume,
                    "itemStyle": { "color": if up { CANDLE_UP_COLOR } else { CANDLE_DOWN_COLOR } }
                })
            })
            .collect();
        series.push(json!({
            "name": "成交量",
            "type": "bar",
            "data": volumes,
            "xAxisIndex": 1,
            "yAxisIndex": 1
        }));
    }

    // ==================== 坐标系 ====================

    let grid = json!([
        {
            "left": "10%", "right": "10%",
            "top": if state.show_volume { "100" } else { "90" },
            "height": if state.show_volume { "50%" } else { "60%" }
        },
        {
            "left": "10%", "right": "10%",
            "top": if state.show_volume { "70%" } else { "85%" },
            "height": if state.show_volume { "15%" } else { "0%" },
            "show": state.show_volume
        },
        {
            "left": "10%", "right": "10%",
            "top": if sub_pane { "65%" } else { "0%" },
            "height": if sub_pane { "15%" } else { "0%" },
            "show": sub_pane
        }
    ]);

    let x_axis: Vec<Value> = (0..3)
        .map(|i| {
            let show = match i {
                0 => true,
                1 => state.show_volume,
                _ => sub_pane,
            };
            let mut axis = json!({
                "type": "category",
                "data": dates,
                "boundaryGap": false,
                "axisLine": { "onZero": false },
                "splitLine": { "show": false },
                "min": "dataMin",
                "max": "dataMax",
                "show": show
            });
            if i > 0 {
                axis["gridIndex"] = json!(i);
                axis["axisTick"] = json!({ "show": false });
                axis["axisLabel"] = json!({ "show": false });
            }
            axis
        })
        .collect();

    let y_axis = json!([
        { "scale": true, "splitArea": { "show": true } },
        {
            "scale": true, "gridIndex": 1, "splitNumber": 2,
            "axisLabel": { "show": state.show_volume },
            "axisLine": { "show": false }, "axisTick": { "show": false },
            "splitLine": { "show": false }, "show": state.show_volume
        },
        {
            "scale": true, "gridIndex": 2, "splitNumber": 2,
            "axisLabel": { "show": false },
            "axisLine": { "show": false }, "axisTick": { "show": false },
            "splitLine": { "show": false }, "show": sub_pane
        }
    ]);

    json!({
        "title": {
            "text": state.title,
            "subtext": state.subtitle,
            "left": "center"
        },
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "cross" } },
        "legend": { "data": legend, "top": 60 },
        "animation": true,
        "grid": grid,
        "xAxis": x_axis,
        "yAxis": y_axis,
        "dataZoom": [
            {
                "type": "inside",
                "xAxisIndex": [0, 1, 2],
                "start": zoom.start,
                "end": zoom.end,
                "zoomOnMouseWheel": true,
                "moveOnMouseMove": true
            },
            {
                "type": "slider",
                "xAxisIndex": [0, 1, 2],
                "top": if state.show_volume { "92%" } else { "95%" },
                "start": zoom.start,
                "end": zoom.end,
                "height": 25
            }
        ],
        "series": series
    })
}

/// 折线系列；`pane` 为 0 时画在主图，否则画在副图
fn line_series(name: &str, color: &str, data: Vec<Value>, pane: usize) -> Value {
    let mut line = json!({
        "name": name,
        "type": "line",
        "data": data,
        "smooth": true,
        "symbol": "none",
        "showSymbol": false,
        "itemStyle": { "color": color },
        "lineStyle": { "color": color, "width": 1.5 }
    });
    if pane > 0 {
        line["xAxisIndex"] = json!(pane);
        line["yAxisIndex"] = json!(pane);
    }
    line
}

/// 成交量柱是否按上涨着色
pub fn is_volume_up(bars: &[KLineDataItem], i: usize, coloring: VolumeColoring) -> bool {
    let bar = &bars[i];
    match coloring {
        VolumeColoring::SameBar => bar.close > bar.open,
        VolumeColoring::PrevClose => match i.checked_sub(1).and_then(|p| bars.get(p)) {
            Some(prev) => bar.close > prev.close,
            None => bar.close > bar.open,
        },
    }
}
