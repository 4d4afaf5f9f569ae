// ==========================================
// 毛利表生成系统 - 毛利表领域模型
// ==========================================
// 职责: 毛利表行 / 格式分析结果 / 毛利表
// 红线: 毛利表行创建后不可修改
// ==========================================

use crate::domain::types::{PivotFormat, RowBucket};
use serde::{Deserialize, Serialize};

// ==========================================
// FormatAnalysis - 格式分析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormatAnalysis {
    pub size_count: usize,
    pub speed_count: usize,
    pub unique_sizes: Vec<String>,  // 按首次出现顺序
    pub unique_speeds: Vec<String>, // 按首次出现顺序
    pub format: PivotFormat,
}

impl FormatAnalysis {
    pub fn is_size_based(&self) -> bool {
        self.format == PivotFormat::SizeBased
    }
}

// ==========================================
// ProfitTableRow - 毛利表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitTableRow {
    pub label: String,        // 配置（可能拼接颜色/速别）
    pub pivot_value: String,  // 速别 或 尺寸（取决于透视格式）
    pub name: String,         // 简称
    pub price: String,        // 价格（两位小数）
    pub cost: String,         // 成本（两位小数）
    pub handling_fee: String, // 快递（固定值）
    pub profit: String,       // 毛利润
    pub profit_rate: String,  // 毛利率（带 %）
    pub bucket: RowBucket,
}

impl ProfitTableRow {
    /// 按毛利表列顺序输出单元格
    pub fn values(&self) -> [&str; 8] {
        [
            &self.label,
            &self.pivot_value,
            &self.name,
            &self.price,
            &self.cost,
            &self.handling_fee,
            &self.profit,
            &self.profit_rate,
        ]
    }
}

// ==========================================
// ProfitTable - 毛利表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitTable {
    pub format: PivotFormat,
    pub analysis: FormatAnalysis,
    pub rows: Vec<ProfitTableRow>,
}

impl ProfitTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> [&'static str; 8] {
        self.format.columns()
    }

    /// 指定分桶的行
    pub fn rows_in(&self, bucket: RowBucket) -> impl Iterator<Item = &ProfitTableRow> {
        self.rows.iter().filter(move |row| row.bucket == bucket)
    }
}
