// ==========================================
// 毛利表生成系统 - 表格格式分析器
// ==========================================
// 职责: 统计尺寸/速别种类数，决定毛利表透视格式
// 规则: 尺寸种类 > 速别种类 → 尺寸格式；否则速别格式（默认）
// ==========================================

use crate::domain::{ExtractedProduct, FormatAnalysis, PivotFormat};
use crate::engine::reporter::{PipelineReporter, PipelineStage};
use std::sync::Arc;

pub struct FormatAnalyzer {
    reporter: Arc<dyn PipelineReporter>,
}

impl FormatAnalyzer {
    pub fn new(reporter: Arc<dyn PipelineReporter>) -> Self {
        Self { reporter }
    }

    /// 分析数据特征
    pub fn analyze(&self, products: &[ExtractedProduct]) -> FormatAnalysis {
        let unique_sizes = distinct_non_empty(products.iter().map(|p| p.size()));
        let unique_speeds = distinct_non_empty(products.iter().map(|p| p.speed()));

        let size_count = unique_sizes.len();
        let speed_count = unique_speeds.len();

        let format = if size_count > speed_count {
            self.reporter.info(
                PipelineStage::FormatAnalysis,
                format!(
                    "检测到尺寸项({})多于速别项({})，使用尺寸格式",
                    size_count, speed_count
                ),
            );
            PivotFormat::SizeBased
        } else {
            self.reporter.info(
                PipelineStage::FormatAnalysis,
                format!(
                    "使用默认速别格式: 尺寸项({})，速别项({})",
                    size_count, speed_count
                ),
            );
            PivotFormat::SpeedBased
        };

        FormatAnalysis {
            size_count,
            speed_count,
            unique_sizes,
            unique_speeds,
            format,
        }
    }

    /// 格式对应的列顺序
    pub fn format_columns(&self, format: PivotFormat) -> [&'static str; 8] {
        format.columns()
    }

    /// 配置名拼接速别（已包含时不重复）
    pub fn label_with_speed(&self, label: &str, speed: &str) -> String {
        let speed = speed.trim();
        if speed.is_empty() || label.contains(speed) {
            label.to_string()
        } else {
            format!("{}{}", label, speed)
        }
    }
}

/// 去空白后非空的去重值（保持首次出现顺序）
fn distinct_non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !distinct.iter().any(|v| v == trimmed) {
            distinct.push(trimmed.to_string());
        }
    }
    distinct
}
