// ==========================================
// 毛利表生成系统 - 数值解析与格式化
// ==========================================
// 约定:
// - 解析失败一律返回 None，不抛错
// - 非有限值（inf / NaN）视为解析失败
// - 金额统一两位小数
// ==========================================

/// 解析数值（去除首尾空白）
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// 解析金额（允许千分位逗号）
pub fn parse_amount(value: &str) -> Option<f64> {
    parse_number(&value.replace(',', ""))
}

/// 可选字段解析
pub fn parse_optional(value: Option<&str>) -> Option<f64> {
    value.and_then(parse_number)
}

/// 两位小数
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// 两位小数百分比
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// 金额字段格式化，缺失或无法解析时为 0.00
pub fn format_optional_amount(value: Option<&str>) -> String {
    format_amount(parse_optional(value).unwrap_or(0.0))
}

/// 值非空（去除空白后）
pub fn is_present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}
