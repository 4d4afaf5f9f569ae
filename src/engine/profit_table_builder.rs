// ==========================================
// 毛利表生成系统 - 毛利表生成引擎
// ==========================================
// 职责: 分桶 → 标签 → 派生字段 → 排序
// 输入: 筛选后的商品行
// 输出: ProfitTable
// 分桶顺序（固定）:
// 1) 缺少尺寸信息（简称不含 寸）
// 2) 未知配置（配置为空但有尺寸）
// 3) 有配置（按标签最高价升序）
// 红线: 本阶段失败为致命错误，向调用方传播
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{ExtractedProduct, PivotFormat, ProfitTable, ProfitTableRow, RowBucket};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::format_analyzer::FormatAnalyzer;
use crate::engine::numeric::{
    format_amount, format_optional_amount, format_percent, parse_amount, parse_number,
};
use crate::engine::reporter::{PipelineReporter, PipelineStage};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

/// 尺寸无法解析时的排序值（排在最后）
const UNPARSEABLE_SIZE_ORDER: f64 = 999.0;

// ==========================================
// ProfitTableBuilder - 毛利表生成引擎
// ==========================================
pub struct ProfitTableBuilder {
    size_marker: String,
    gradient_marker: String,
    missing_size_label: String,
    unknown_configuration_label: String,
    handling_fee: String,
    max_rows: usize,
    size_number: Regex,
    analyzer: FormatAnalyzer,
    reporter: Arc<dyn PipelineReporter>,
}

impl ProfitTableBuilder {
    pub fn new(config: &PipelineConfig, reporter: Arc<dyn PipelineReporter>) -> EngineResult<Self> {
        let size_number = Regex::new(r"(\d+(?:\.\d+)?)")
            .map_err(|e| EngineError::Other(anyhow::anyhow!("尺寸排序模式无效: {}", e)))?;

        Ok(Self {
            size_marker: config.size_marker.clone(),
            gradient_marker: config.gradient_marker.clone(),
            missing_size_label: config.missing_size_label.clone(),
            unknown_configuration_label: config.unknown_configuration_label.clone(),
            handling_fee: config.handling_fee_display(),
            max_rows: config.max_rows_per_sheet,
            size_number,
            analyzer: FormatAnalyzer::new(reporter.clone()),
            reporter,
        })
    }

    /// 生成毛利表
    ///
    /// # 错误
    /// - 行数超过单表上限 → TableGeneration
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub fn build(&self, products: &[ExtractedProduct]) -> EngineResult<ProfitTable> {
        let analysis = self.analyzer.analyze(products);
        let format = analysis.format;

        let mut missing_size = Vec::new();
        let mut unknown_configuration = Vec::new();
        let mut configured: Vec<&ExtractedProduct> = Vec::new();

        for product in products {
            match self.bucket_of(product) {
                RowBucket::MissingSize => {
                    let label = placeholder_or_name(product.short_name(), &self.missing_size_label);
                    missing_size.push(self.make_row(product, label, format, RowBucket::MissingSize));
                }
                RowBucket::UnknownConfiguration => {
                    let label =
                        placeholder_or_name(product.short_name(), &self.unknown_configuration_label);
                    unknown_configuration.push(self.make_row(
                        product,
                        label,
                        format,
                        RowBucket::UnknownConfiguration,
                    ));
                }
                RowBucket::Configured => configured.push(product),
            }
        }

        let configured_rows = self.sort_configured(self.build_configured(&configured, format), format);

        let mut rows = missing_size;
        rows.extend(unknown_configuration);
        rows.extend(configured_rows);

        if rows.len() > self.max_rows {
            return Err(EngineError::TableGeneration(format!(
                "毛利表共 {} 行，超过单表上限 {} 行",
                rows.len(),
                self.max_rows
            )));
        }

        self.reporter.info(
            PipelineStage::TableBuilding,
            format!("毛利表生成完成，共{}行（{}）", rows.len(), format),
        );

        Ok(ProfitTable {
            format,
            analysis,
            rows,
        })
    }

    /// 行所属分桶
    pub fn bucket_of(&self, product: &ExtractedProduct) -> RowBucket {
        if !product.short_name().contains(&self.size_marker) {
            RowBucket::MissingSize
        } else if product.configuration().is_empty() {
            RowBucket::UnknownConfiguration
        } else {
            RowBucket::Configured
        }
    }

    // ==========================================
    // 有配置分桶
    // ==========================================

    fn build_configured(&self, products: &[&ExtractedProduct], format: PivotFormat) -> Vec<ProfitTableRow> {
        // (配置, 颜色) 分组，保持首次出现顺序
        let mut groups: Vec<((&str, &str), Vec<&ExtractedProduct>)> = Vec::new();
        for &product in products {
            let key = product.variant_key();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(product),
                None => groups.push((key, vec![product])),
            }
        }

        let mut rows = Vec::new();
        for ((configuration, color), members) in &groups {
            match format {
                PivotFormat::SizeBased => {
                    let base = format!("{}{}", configuration, color);
                    let mut cells: Vec<(&str, &str)> = Vec::new();
                    for product in members {
                        let cell = (product.size(), product.speed());
                        if cell.0.is_empty() || cell.1.is_empty() || cells.contains(&cell) {
                            continue;
                        }
                        cells.push(cell);
                        let label = self.analyzer.label_with_speed(&base, product.speed());
                        rows.push(self.make_row(product, label, format, RowBucket::Configured));
                    }
                }
                PivotFormat::SpeedBased => {
                    let label = self.speed_label(configuration, color);
                    let mut speeds: Vec<&str> = Vec::new();
                    for product in members {
                        let speed = product.speed();
                        if speed.is_empty() || speeds.contains(&speed) {
                            continue;
                        }
                        speeds.push(speed);
                        rows.push(self.make_row(product, label.clone(), format, RowBucket::Configured));
                    }
                }
            }
        }
        rows
    }

    /// 速别格式标签: 配置 + 颜色（渐变色不拼接）
    fn speed_label(&self, configuration: &str, color: &str) -> String {
        let color = color.trim();
        if color.is_empty() || color.contains(&self.gradient_marker) {
            configuration.to_string()
        } else {
            format!("{}{}", configuration, color)
        }
    }

    // ==========================================
    // 排序
    // ==========================================

    /// 按标签分组 → 组内最高价升序 → 组内按速别/尺寸排序
    fn sort_configured(&self, rows: Vec<ProfitTableRow>, format: PivotFormat) -> Vec<ProfitTableRow> {
        let mut groups: Vec<(String, f64, Vec<ProfitTableRow>)> = Vec::new();
        for row in rows {
            let price = parse_amount(&row.price).unwrap_or(0.0);
            match groups.iter_mut().find(|(label, _, _)| *label == row.label) {
                Some((_, max_price, members)) => {
                    *max_price = max_price.max(price);
                    members.push(row);
                }
                None => groups.push((row.label.clone(), price.max(0.0), vec![row])),
            }
        }

        groups.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let mut sorted = Vec::new();
        for (_, _, mut members) in groups {
            match format {
                PivotFormat::SpeedBased => members.sort_by(|a, b| a.pivot_value.cmp(&b.pivot_value)),
                PivotFormat::SizeBased => members.sort_by(|a, b| {
                    self.size_order(&a.pivot_value)
                        .partial_cmp(&self.size_order(&b.pivot_value))
                        .unwrap_or(Ordering::Equal)
                }),
            }
            sorted.extend(members);
        }
        sorted
    }

    /// 尺寸中的数字（无法解析时 999）
    pub fn size_order(&self, size: &str) -> f64 {
        self.size_number
            .captures(size)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(UNPARSEABLE_SIZE_ORDER)
    }

    // ==========================================
    // 派生字段
    // ==========================================

    fn make_row(
        &self,
        product: &ExtractedProduct,
        label: String,
        format: PivotFormat,
        bucket: RowBucket,
    ) -> ProfitTableRow {
        let record = &product.record;

        let price = format_optional_amount(record.price.as_deref());
        let cost = format_optional_amount(record.cost.as_deref());
        let profit = derive_profit(record.profit.as_deref(), &price, &cost);
        let profit_rate = derive_profit_rate(record.profit_rate.as_deref(), &profit, &price);

        let pivot_value = match format {
            PivotFormat::SpeedBased => product.speed(),
            PivotFormat::SizeBased => product.size(),
        };

        ProfitTableRow {
            label,
            pivot_value: pivot_value.to_string(),
            name: product.short_name().to_string(),
            price,
            cost,
            handling_fee: self.handling_fee.clone(),
            profit,
            profit_rate,
            bucket,
        }
    }
}

fn placeholder_or_name(name: &str, placeholder: &str) -> String {
    if name.trim().is_empty() {
        placeholder.to_string()
    } else {
        name.to_string()
    }
}

/// 毛利润: 源值优先，否则 价格 - 成本
pub fn derive_profit(source: Option<&str>, price: &str, cost: &str) -> String {
    if let Some(value) = source.filter(|v| !v.trim().is_empty()) {
        return value.trim().to_string();
    }
    match (parse_number(price), parse_number(cost)) {
        (Some(p), Some(c)) => format_amount(p - c),
        _ => format_amount(0.0),
    }
}

/// 毛利率
///
/// - 源值 > 1 视为百分数，否则视为小数（乘 100）
/// - 源值无法解析 → 原样输出
/// - 无源值 → 毛利润 / 价格 × 100（价格为 0 或解析失败 → 0.00%）
pub fn derive_profit_rate(source: Option<&str>, profit: &str, price: &str) -> String {
    if let Some(value) = source.filter(|v| !v.trim().is_empty()) {
        return match parse_number(value) {
            Some(rate) if rate > 1.0 => format_percent(rate),
            Some(rate) => format_percent(rate * 100.0),
            None => value.trim().to_string(),
        };
    }

    match (parse_number(profit), parse_number(price)) {
        (Some(profit), Some(price)) if price > 0.0 => format_percent(profit / price * 100.0),
        _ => format_percent(0.0),
    }
}
