//! ECharts 配置生成
//!
//! 纯函数：K 线、指标、净值曲线 → ECharts `option` JSON。
//! 缩放范围等交互状态只存在于调用方，不做持久化。

pub mod backtest;
pub mod kline;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use backtest::{build_backtest_option, consecutive_trend, TrendPoint};
pub use kline::build_kline_option;

// ==================== 配色 ====================

/// K 线阳线颜色
pub const CANDLE_UP_COLOR: &str = "#ef5350";
/// K 线阴线颜色
pub const CANDLE_DOWN_COLOR: &str = "#26a69a";
/// 均线颜色：MA5 / MA10 / MA20 / MA30
pub const MA_COLORS: [(&str, &str); 4] = [
    ("MA5", "#f39c12"),
    ("MA10", "#e74c3c"),
    ("MA20", "#9b59b6"),
    ("MA30", "#3498db"),
];
pub const DIF_COLOR: &str = "#ffffff";
pub const DEA_COLOR: &str = "#ffd700";
pub const BOLL_COLOR: &str = "#7f8c8d";
pub const KDJ_COLORS: [(&str, &str); 3] = [("K", "#f39c12"), ("D", "#3498db"), ("J", "#9b59b6")];

/// 缺失值在图表数据中的占位符
pub const MISSING: &str = "-";

// ==================== 交互状态 ====================

/// 成交量柱着色规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeColoring {
    /// 当根收盘高于开盘为涨
    #[default]
    SameBar,
    /// 收盘高于前一根收盘为涨（第一根按当根开收判断）
    PrevClose,
}

/// 副图指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveIndicator {
    #[default]
    Ma,
    Macd,
    Boll,
    Kdj,
}

impl ActiveIndicator {
    /// 是否需要第三个网格（副图）
    pub fn uses_sub_pane(&self) -> bool {
        matches!(self, ActiveIndicator::Macd | ActiveIndicator::Kdj)
    }
}

/// 缩放范围（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub start: f64,
    pub end: f64,
}

impl ZoomRange {
    /// 默认显示最近约 60 根
    pub fn latest(len: usize) -> Self {
        let start = if len == 0 {
            0.0
        } else {
            (100.0 - (100.0 / len as f64) * 60.0).max(0.0)
        };
        Self { start, end: 100.0 }
    }

    /// 放大（缩小可见范围）
    pub fn zoom_in(&self) -> Self {
        let span = (self.end - self.start) * 0.8;
        Self {
            start: (self.end - span).clamp(0.0, 100.0),
            end: self.end,
        }
    }

    /// 缩小（扩大可见范围）
    pub fn zoom_out(&self) -> Self {
        let span = ((self.end - self.start) * 1.25).min(100.0);
        Self {
            start: (self.end - span).max(0.0),
            end: self.end,
        }
    }

    pub fn step(&self, step: ZoomStep) -> Self {
        match step {
            ZoomStep::In => self.zoom_in(),
            ZoomStep::Out => self.zoom_out(),
        }
    }
}

/// 缩放按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomStep {
    In,
    Out,
}

/// K 线图选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KLineChartState {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default = "default_true")]
    pub show_volume: bool,
    #[serde(default)]
    pub active_indicator: ActiveIndicator,
    #[serde(default)]
    pub volume_coloring: VolumeColoring,
    #[serde(default)]
    pub zoom: Option<ZoomRange>,
}

fn default_title() -> String {
    "K线图".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for KLineChartState {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: String::new(),
            show_volume: true,
            active_indicator: ActiveIndicator::default(),
            volume_coloring: VolumeColoring::default(),
            zoom: None,
        }
    }
}

// ==================== 辅助函数 ====================

/// 保留两位小数
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 指标值转图表数据：保留两位小数，缺失为 "-"
pub fn series_value(v: Option<f64>) -> Value {
    match v {
        Some(v) if v.is_finite() => Value::from(round2(v)),
        _ => Value::from(MISSING),
    }
}

/// 整条指标序列转图表数据
pub fn series_values(series: &[Option<f64>]) -> Vec<Value> {
    series.iter().map(|v| series_value(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_zoom_window() {
        println!("\n========== 测试默认缩放范围 ==========");
        let z = ZoomRange::latest(120);
        assert!((z.start - 50.0).abs() < 1e-9);
        assert_eq!(z.end, 100.0);
        // 不足 60 根时全部显示
        assert_eq!(ZoomRange::latest(40).start, 0.0);
        assert_eq!(ZoomRange::latest(0).start, 0.0);
        println!("✅ 默认缩放范围测试通过！");
    }

    #[test]
    fn test_zoom_in_out() {
        let z = ZoomRange { start: 50.0, end: 100.0 };
        let zin = z.zoom_in();
        assert!((zin.start - 60.0).abs() < 1e-9);
        let zout = ZoomRange { start: 10.0, end: 100.0 }.zoom_out();
        assert_eq!(zout.start, 0.0);
    }

    #[test]
    fn test_series_value() {
        assert_eq!(series_value(Some(10.126)), serde_json::json!(10.13));
        assert_eq!(series_value(None), serde_json::json!("-"));
        assert_eq!(series_value(Some(f64::NAN)), serde_json::json!("-"));
    }

    #[test]
    fn test_state_defaults_from_json() {
        let state: KLineChartState =
            serde_json::from_str(r#"{"active_indicator":"macd"}"#).unwrap();
        assert_eq!(state.title, "K线图");
        assert!(state.show_volume);
        assert_eq!(state.active_indicator, ActiveIndicator::Macd);
        assert_eq!(state.volume_coloring, VolumeColoring::SameBar);
    }
}
