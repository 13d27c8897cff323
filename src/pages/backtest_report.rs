//! 回测报告页
//!
//! 指标卡片、交易明细表、净值曲线与组合图、连续涨跌标注。

use serde::Serialize;
use serde_json::Value;

use crate::charts::backtest::{build_report_option, is_long_trade};
use crate::charts::{build_backtest_option, consecutive_trend, TrendPoint};
use crate::formatters::{format_grouped, format_money, format_percent, format_ratio_percent};
use crate::models::{BacktestMetric, BacktestResult, TradeRecord};

/// 指标卡片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricLabel {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// 交易明细行，缺失值显示为 "-"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRow {
    pub index: usize,
    pub open_date: String,
    pub close_date: String,
    pub trade_type: String,
    pub is_long: bool,
    pub open_price: String,
    pub close_price: String,
    pub profit: String,
    pub profit_pct: String,
    /// 盈亏方向：1 盈利，-1 亏损，0 无
    pub profit_sign: i8,
    pub amount: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReportView {
    pub title: String,
    pub strategy_name: String,
    pub stock_code: String,
    pub period: String,
    pub capital: String,
    /// 顶部的主要指标
    pub headline: Vec<MetricLabel>,
    /// 详细指标
    pub details: Vec<MetricLabel>,
    pub trades: Vec<TradeRow>,
    pub equity_option: Value,
    pub report_option: Value,
    pub trend: Vec<TrendPoint>,
}

pub struct BacktestReportPage;

impl BacktestReportPage {
    pub fn build(result: &BacktestResult, show_trend_numbers: bool) -> BacktestReportView {
        let m = &result.metrics;
        BacktestReportView {
            title: format!("{} 回测报告", result.strategy_name),
            strategy_name: result.strategy_name.clone(),
            stock_code: result.stock_code.clone(),
            period: format!("{} ~ {}", result.start_date, result.end_date),
            capital: format!(
                "{} → {}",
                money(result.initial_capital),
                money(result.final_capital)
            ),
            headline: headline_metrics(m),
            details: detail_metrics(result),
            trades: result
                .trades
                .iter()
                .enumerate()
                .map(|(i, t)| trade_row(i + 1, t))
                .collect(),
            equity_option: build_backtest_option(&result.equity_curve),
            report_option: build_report_option(result, show_trend_numbers),
            trend: consecutive_trend(&result.equity_curve),
        }
    }
}

fn money(v: f64) -> String {
    format!("¥{}", format_grouped(v))
}

fn price(v: f64) -> String {
    format!("¥{}", format_money(v, 2))
}

fn metric(key: &'static str, label: &'static str, value: String) -> MetricLabel {
    MetricLabel { key, label, value }
}

pub fn headline_metrics(m: &BacktestMetric) -> Vec<MetricLabel> {
    vec![
        metric("total_return", "总收益率", format_ratio_percent(m.total_return)),
        metric("win_rate", "胜率", format_ratio_percent(m.win_rate)),
        metric("max_drawdown", "最大回撤", format_ratio_percent(m.max_drawdown)),
        metric("sharpe_ratio", "夏普比率", format!("{:.2}", m.sharpe_ratio)),
        metric("trade_count", "交易次数", m.trade_count.to_string()),
    ]
}

fn detail_metrics(result: &BacktestResult) -> Vec<MetricLabel> {
    let m = &result.metrics;
    vec![
        metric("annual_return", "年化收益率", format_ratio_percent(m.annual_return)),
        metric("volatility", "波动率", format_ratio_percent(m.volatility)),
        metric("profit_loss_ratio", "盈亏比", format!("{:.2}", m.profit_loss_ratio)),
        metric("calmar_ratio", "卡尔马比率", format!("{:.2}", m.calmar_ratio)),
        metric("max_single_profit", "单笔最大盈利", format_ratio_percent(m.max_single_profit)),
        metric("initial_capital", "初始资金", money(result.initial_capital)),
        metric("final_capital", "最终资金", money(result.final_capital)),
        metric("start_date", "回测开始日期", result.start_date.clone()),
        metric("end_date", "回测结束日期", result.end_date.clone()),
    ]
}

fn trade_row(index: usize, t: &TradeRecord) -> TradeRow {
    let profit_sign = if t.profit_pct > 0.0 {
        1
    } else if t.profit_pct < 0.0 {
        -1
    } else {
        0
    };
    TradeRow {
        index,
        open_date: t.open_date.clone(),
        close_date: if t.close_date.is_empty() {
            "-".to_string()
        } else {
            t.close_date.clone()
        },
        trade_type: t.trade_type.clone(),
        is_long: is_long_trade(&t.trade_type),
        open_price: price(t.open_price),
        close_price: if t.close_price > 0.0 {
            price(t.close_price)
        } else {
            "-".to_string()
        },
        profit: if t.profit != 0.0 {
            price(t.profit)
        } else {
            "-".to_string()
        },
        profit_pct: if t.profit_pct != 0.0 {
            format_percent(t.profit_pct * 100.0, 2)
        } else {
            "-".to_string()
        },
        profit_sign,
        amount: money(t.amount),
        status: t.status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EquityPoint;

    fn result() -> BacktestResult {
        let closes = [10.0, 10.2, 10.4, 10.6, 10.5, 10.3];
        let equity_curve = closes
            .iter()
            .enumerate()
            .map(|(i, c)| EquityPoint {
                date: format!("2024-01-{:02}", i + 2),
                strategy_value: 100000.0 * c / 10.0,
                close: Some(*c),
                ..Default::default()
            })
            .collect();
        BacktestResult {
            id: "bt-1".into(),
            strategy_name: "双均线".into(),
            stock_code: "600519".into(),
            start_date: "2024-01-02".into(),
            end_date: "2024-01-07".into(),
            create_time: String::new(),
            frequency: "daily".into(),
            initial_capital: 100000.0,
            final_capital: 115000.0,
            metrics: BacktestMetric {
                total_return: 0.15,
                win_rate: 0.6,
                max_drawdown: 0.0523,
                sharpe_ratio: 1.234,
                trade_count: 2,
                ..Default::default()
            },
            trades: vec![
                TradeRecord {
                    id: "t1".into(),
                    open_date: "2024-01-02".into(),
                    close_date: "2024-01-05".into(),
                    trade_type: "多".into(),
                    open_price: 10.0,
                    close_price: 10.6,
                    profit: 6000.0,
                    profit_pct: 0.06,
                    amount: 100000.0,
                    status: "已平仓".into(),
                },
                TradeRecord {
                    id: "t2".into(),
                    open_date: "2024-01-06".into(),
                    close_date: String::new(),
                    trade_type: "多".into(),
                    open_price: 10.5,
                    close_price: 0.0,
                    profit: 0.0,
                    profit_pct: 0.0,
                    amount: 105000.0,
                    status: "持仓中".into(),
                },
            ],
            equity_curve,
        }
    }

    /// 0.15 显示为 15.00%
    #[test]
    fn test_metric_labels() {
        println!("\n========== 测试回测指标格式化 ==========");
        let view = BacktestReportPage::build(&result(), true);
        let total = view.headline.iter().find(|m| m.key == "total_return").unwrap();
        assert_eq!(total.value, "15.00%");
        assert_eq!(total.label, "总收益率");
        let drawdown = view.headline.iter().find(|m| m.key == "max_drawdown").unwrap();
        assert_eq!(drawdown.value, "5.23%");
        let sharpe = view.headline.iter().find(|m| m.key == "sharpe_ratio").unwrap();
        assert_eq!(sharpe.value, "1.23");
        assert_eq!(view.capital, "¥100,000 → ¥115,000");
        println!("✅ 回测指标格式化测试通过！");
    }

    #[test]
    fn test_trade_rows() {
        let view = BacktestReportPage::build(&result(), false);
        let closed = &view.trades[0];
        assert_eq!(closed.index, 1);
        assert_eq!(closed.close_price, "¥10.60");
        assert_eq!(closed.profit, "¥6,000.00");
        assert_eq!(closed.profit_pct, "+6.00%");
        assert_eq!(closed.profit_sign, 1);

        let open = &view.trades[1];
        assert_eq!(open.close_date, "-");
        assert_eq!(open.close_price, "-");
        assert_eq!(open.profit, "-");
        assert_eq!(open.profit_pct, "-");
        assert_eq!(open.amount, "¥105,000");
    }

    #[test]
    fn test_charts_present() {
        let view = BacktestReportPage::build(&result(), true);
        assert!(view.equity_option["series"].is_array());
        assert!(view.report_option["grid"].is_array());
        assert!(!view.trend.is_empty());
    }
}
