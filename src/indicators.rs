//! 技术指标计算
//!
//! 所有图表共用的指标算法。输出序列与输入逐个对齐，
//! 回看窗口不足的位置为 `None`。
//!
//! - MA：收盘价简单移动平均
//! - EMA：以第一个值为种子，平滑系数 2/(N+1)
//! - MACD：DIF = EMA12 - EMA26，DEA = EMA9(DIF)（以第一个 DIF 为种子），柱 = 2 × (DIF - DEA)
//! - BOLL：中轨为 N 日均线，上下轨为中轨 ± k 倍总体标准差
//! - KDJ：RSV 平滑，K/D 初值 50，J = 3K - 2D
//! - RSI：Wilder 平滑

use serde::{Deserialize, Serialize};

use crate::models::{Indicators, KLineDataItem, Series};

// ==================== 参数常量 ====================

/// 默认均线周期
pub const MA_PERIODS: [usize; 4] = [5, 10, 20, 30];
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLL_PERIOD: usize = 20;
pub const BOLL_MULTIPLIER: f64 = 2.0;
pub const KDJ_PERIOD: usize = 9;
pub const KDJ_K_SMOOTH: usize = 3;
pub const KDJ_D_SMOOTH: usize = 3;
pub const RSI_PERIOD: usize = 14;

// ==================== 结果类型 ====================

/// MACD 结果（每个位置都有值）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub macd: Vec<f64>,
}

/// 布林带结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BollSeries {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// KDJ 结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KdjSeries {
    pub k: Series,
    pub d: Series,
    pub j: Series,
}

// ==================== 基础算法 ====================

/// 简单移动平均
///
/// 前 `window - 1` 个位置为 None，其余为最近 `window` 个值的算术平均
pub fn moving_average(values: &[f64], window: usize) -> Series {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            result.push(Some(sum / window as f64));
        } else {
            result.push(None);
        }
    }
    result
}

/// 指数移动平均，以第一个值为种子
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut result: Vec<f64> = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        let ema = if i == 0 {
            *v
        } else {
            v * alpha + result[i - 1] * (1.0 - alpha)
        };
        result.push(ema);
    }
    result
}

/// MACD
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema_series(closes, fast);
    let ema_slow = ema_series(closes, slow);
    let dif: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let dea = ema_series(&dif, signal);
    let macd = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();
    MacdSeries { dif, dea, macd }
}

/// 布林带（总体标准差）
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollSeries {
    let middle = moving_average(closes, period);
    let mut upper = Vec::with_capacity(closes.len());
    let mut lower = Vec::with_capacity(closes.len());

    for (i, mid) in middle.iter().enumerate() {
        match mid {
            Some(ma) => {
                let window = &closes[i + 1 - period..=i];
                let variance =
                    window.iter().map(|c| (c - ma).powi(2)).sum::<f64>() / period as f64;
                let std = variance.sqrt();
                upper.push(Some(ma + multiplier * std));
                lower.push(Some(ma - multiplier * std));
            }
            None => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollSeries {
        upper,
        middle,
        lower,
    }
}

/// KDJ
pub fn kdj(bars: &[KLineDataItem], period: usize, k_smooth: usize, d_smooth: usize) -> KdjSeries {
    let len = bars.len();
    let mut out = KdjSeries {
        k: vec![None; len],
        d: vec![None; len],
        j: vec![None; len],
    };
    if period == 0 || k_smooth == 0 || d_smooth == 0 {
        return out;
    }

    let (mut k_prev, mut d_prev) = (50.0, 50.0);
    for i in (period - 1)..len {
        let window = &bars[i + 1 - period..=i];
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let rsv = if high > low {
            (bars[i].close - low) / (high - low) * 100.0
        } else {
            50.0
        };

        let k = (k_prev * (k_smooth as f64 - 1.0) + rsv) / k_smooth as f64;
        let d = (d_prev * (d_smooth as f64 - 1.0) + k) / d_smooth as f64;
        out.k[i] = Some(k);
        out.d[i] = Some(d);
        out.j[i] = Some(3.0 * k - 2.0 * d);
        k_prev = k;
        d_prev = d;
    }
    out
}

/// RSI（Wilder 平滑）
///
/// 第一个值出现在下标 `period` 处
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let mut avg_gain = changes[..period].iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss =
        changes[..period].iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    for (i, change) in changes.iter().enumerate().skip(period) {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        result[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

// ==================== 指标集合 ====================

/// 一组 K 线对应的全部指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IndicatorSet {
    pub ma5: Series,
    pub ma10: Series,
    pub ma20: Series,
    pub ma30: Series,
    pub macd: MacdSeries,
    pub boll: BollSeries,
    pub kdj: KdjSeries,
    pub rsi: Series,
}

impl IndicatorSet {
    /// 从 K 线计算全部指标
    pub fn compute(bars: &[KLineDataItem]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        Self {
            ma5: moving_average(&closes, MA_PERIODS[0]),
            ma10: moving_average(&closes, MA_PERIODS[1]),
            ma20: moving_average(&closes, MA_PERIODS[2]),
            ma30: moving_average(&closes, MA_PERIODS[3]),
            macd: macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
            boll: bollinger(&closes, BOLL_PERIOD, BOLL_MULTIPLIER),
            kdj: kdj(bars, KDJ_PERIOD, KDJ_K_SMOOTH, KDJ_D_SMOOTH),
            rsi: rsi(&closes, RSI_PERIOD),
        }
    }

    /// 优先使用后端给出的指标，长度不匹配或缺失的部分本地计算
    pub fn merge_backend(bars: &[KLineDataItem], backend: &Indicators) -> Self {
        let mut set = Self::compute(bars);
        let len = bars.len();
        let aligned = |s: &Option<Series>| s.as_ref().filter(|s| s.len() == len).cloned();

        if let Some(ma) = &backend.ma {
            if let Some(s) = aligned(&ma.ma5) {
                set.ma5 = s;
            }
            if let Some(s) = aligned(&ma.ma10) {
                set.ma10 = s;
            }
            if let Some(s) = aligned(&ma.ma20) {
                set.ma20 = s;
            }
            if let Some(s) = aligned(&ma.ma30) {
                set.ma30 = s;
            }
        }

        if let Some(boll) = &backend.boll {
            if [&boll.upper, &boll.middle, &boll.lower].iter().all(|s| s.len() == len) {
                set.boll = BollSeries {
                    upper: boll.upper.clone(),
                    middle: boll.middle.clone(),
                    lower: boll.lower.clone(),
                };
            }
        }

        if let Some(s) = aligned(&backend.rsi) {
            set.rsi = s;
        }

        // 后端 MACD 含缺失值时无法保证柱值恒等式，只在完整时采用
        if let Some(m) = &backend.macd {
            let complete = |s: &Series| s.len() == len && s.iter().all(Option::is_some);
            if complete(&m.dif) && complete(&m.dea) && complete(&m.macd) {
                let flat = |s: &Series| -> Vec<f64> { s.iter().map(|v| v.unwrap_or_default()).collect() };
                set.macd = MacdSeries {
                    dif: flat(&m.dif),
                    dea: flat(&m.dea),
                    macd: flat(&m.macd),
                };
            }
        }

        set
    }
}
