//! 数值与日期格式化
//!
//! 涨跌配色遵循 A 股习惯：红涨绿跌

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Datelike};
use chrono_tz::Asia::Shanghai;

/// 主题颜色
pub mod theme {
    /// 涨 - 红色
    pub const UP: &str = "#f5222d";
    /// 跌 - 绿色
    pub const DOWN: &str = "#52c41a";
    /// 平
    pub const FLAT: &str = "#8c8c8c";
}

/// 带符号百分比：`1.5 -> "+1.50%"`，`-0.3 -> "-0.30%"`
pub fn format_percent(value: f64, decimals: usize) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.*}%", sign, decimals, value)
}

/// 小数比率转百分比：`0.15 -> "15.00%"`
pub fn format_ratio_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// 千分位金额：`1234567.5 -> "1,234,567.50"`
pub fn format_money(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = String::new();
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 数量：超过一亿用“亿”，超过一万用“万”
pub fn format_number(value: f64) -> String {
    if value >= 100_000_000.0 {
        format!("{:.2}亿", value / 100_000_000.0)
    } else if value >= 10_000.0 {
        format!("{:.2}万", value / 10_000.0)
    } else {
        format_grouped(value)
    }
}

/// 千分位，最多保留三位小数并去掉末尾的 0：`1234.5 -> "1,234.5"`
pub fn format_grouped(value: f64) -> String {
    let s = format_money(value, 3);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// 解析后端常见的日期时间格式，统一到北京时间
fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Shanghai).naive_local());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// 按 `YYYY-MM-DD HH:mm:ss` 风格的模板格式化日期，无法解析时原样返回
pub fn format_date(input: &str, template: &str) -> String {
    let Some(dt) = parse_datetime(input) else {
        return input.to_string();
    };
    template
        .replace("YYYY", &format!("{:04}", dt.year()))
        .replace("MM", &format!("{:02}", dt.month()))
        .replace("DD", &format!("{:02}", dt.day()))
        .replace("HH", &format!("{:02}", dt.hour()))
        .replace("mm", &format!("{:02}", dt.minute()))
        .replace("ss", &format!("{:02}", dt.second()))
}

/// 只取时间部分
pub fn format_time(input: &str) -> String {
    format_date(input, "HH:mm:ss")
}

/// 涨跌颜色
pub fn trend_color(value: f64) -> &'static str {
    if value > 0.0 {
        theme::UP
    } else if value < 0.0 {
        theme::DOWN
    } else {
        theme::FLAT
    }
}

/// 涨跌样式类名
pub fn color_class(value: f64) -> &'static str {
    if value > 0.0 {
        "text-red-500"
    } else if value < 0.0 {
        "text-green-500"
    } else {
        "text-gray-500"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_formats() {
        println!("\n========== 测试百分比格式化 ==========");
        assert_eq!(format_ratio_percent(0.15), "15.00%");
        assert_eq!(format_ratio_percent(-0.0523), "-5.23%");
        assert_eq!(format_percent(1.5, 2), "+1.50%");
        assert_eq!(format_percent(0.0, 2), "+0.00%");
        assert_eq!(format_percent(-0.3, 2), "-0.30%");
        assert_eq!(format_percent(2.0, 1), "+2.0%");
        println!("✅ 百分比格式化测试通过！");
    }

    #[test]
    fn test_money_and_number() {
        assert_eq!(format_money(1234567.5, 2), "1,234,567.50");
        assert_eq!(format_money(100000.0, 2), "100,000.00");
        assert_eq!(format_money(-1234.0, 0), "-1,234");
        assert_eq!(format_money(12.0, 2), "12.00");

        assert_eq!(format_number(250_000_000.0), "2.50亿");
        assert_eq!(format_number(35_000.0), "3.50万");
        assert_eq!(format_number(9999.0), "9,999");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_grouped(115000.0), "115,000");
        assert_eq!(format_grouped(1234.5), "1,234.5");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-01-02T09:30:05", "YYYY-MM-DD"), "2025-01-02");
        assert_eq!(format_date("2025-01-02 09:30:05", "HH:mm:ss"), "09:30:05");
        assert_eq!(format_time("2025-01-02T01:30:05Z"), "09:30:05");
        assert_eq!(format_date("2025-03-01", "YYYY/MM/DD"), "2025/03/01");
        assert_eq!(format_date("bad", "YYYY"), "bad");
    }

    #[test]
    fn test_trend_helpers() {
        assert_eq!(trend_color(1.0), theme::UP);
        assert_eq!(trend_color(-1.0), theme::DOWN);
        assert_eq!(trend_color(0.0), theme::FLAT);
        assert_eq!(color_class(0.0), "text-gray-500");
        assert_eq!(color_class(2.0), "text-red-500");
    }
}
