// ==========================================
// 毛利表生成系统 - 领域类型定义
// ==========================================
// 职责: 透视格式、分桶、匹配方式、新毛利率等枚举
// ==========================================

use crate::domain::columns;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 透视格式 (Pivot Format)
// ==========================================
// 尺寸项多于速别项时使用尺寸格式，否则默认速别格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PivotFormat {
    #[default]
    SpeedBased, // 速别格式
    SizeBased,  // 尺寸格式
}

impl PivotFormat {
    /// 透视列的列名
    pub fn pivot_column(&self) -> &'static str {
        match self {
            PivotFormat::SpeedBased => columns::SPEED,
            PivotFormat::SizeBased => columns::SIZE,
        }
    }

    /// 毛利表列顺序
    pub fn columns(&self) -> [&'static str; 8] {
        [
            columns::LABEL,
            self.pivot_column(),
            columns::SHORT_NAME,
            columns::PRICE,
            columns::COST,
            columns::HANDLING_FEE,
            columns::TABLE_PROFIT,
            columns::PROFIT_RATE,
        ]
    }
}

impl fmt::Display for PivotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotFormat::SpeedBased => write!(f, "速别格式"),
            PivotFormat::SizeBased => write!(f, "尺寸格式"),
        }
    }
}

// ==========================================
// 毛利表分桶 (Row Bucket)
// ==========================================
// 输出顺序固定: MissingSize → UnknownConfiguration → Configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowBucket {
    MissingSize,          // 缺少尺寸信息
    UnknownConfiguration, // 未知配置
    Configured,           // 有配置
}

// ==========================================
// 改价匹配方式 (Match Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    Exact,              // 直接匹配
    ExactBare,          // 直接匹配(无速别)
    SizeNormalized,     // 尺寸规范化匹配
    SizeNormalizedBare, // 尺寸规范化匹配(无速别)
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Exact => write!(f, "直接匹配"),
            MatchMethod::ExactBare => write!(f, "直接匹配(无速别)"),
            MatchMethod::SizeNormalized => write!(f, "尺寸规范化匹配"),
            MatchMethod::SizeNormalizedBare => write!(f, "尺寸规范化匹配(无速别)"),
        }
    }
}

// ==========================================
// 新毛利率 (New Profit Rate)
// ==========================================
// 计算永不失败: 非数值输入 → CalculationError，缺少价格/成本 → CannotCalculate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewProfitRate {
    Rate(f64),        // 百分数值（已乘 100）
    CalculationError, // 计算错误
    CannotCalculate,  // 无法计算
}

pub const CALCULATION_ERROR_MARKER: &str = "计算错误";
pub const CANNOT_CALCULATE_MARKER: &str = "无法计算";

impl fmt::Display for NewProfitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewProfitRate::Rate(v) => write!(f, "{:.2}%", v),
            NewProfitRate::CalculationError => write!(f, "{}", CALCULATION_ERROR_MARKER),
            NewProfitRate::CannotCalculate => write!(f, "{}", CANNOT_CALCULATE_MARKER),
        }
    }
}
