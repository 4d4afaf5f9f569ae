// ==========================================
// 毛利表生成系统 - 变体筛选引擎
// ==========================================
// 职责: 每个 (配置, 颜色) 组合只保留代表行
// 规则（顺序执行）:
// 1) 尺寸归并: 有 26寸 只留 26寸；否则取成本最高的尺寸
// 2) 价格最低: 按 (配置, 尺寸, 速别) 分组，保留价格最低行
// 降级: 筛选失败时返回未筛选数据并记录错误，不中断流水线
// 规则以 VariantRule 列表依次作用于每个分组
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::ExtractedProduct;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::numeric::parse_optional;
use crate::engine::reporter::{PipelineReporter, PipelineStage};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 筛选规则
// ==========================================

/// 分组内筛选规则
///
/// 输入为同一 (配置, 颜色) 分组的行号，返回保留的行号
pub trait VariantRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, rows: &[ExtractedProduct], members: &[usize]) -> EngineResult<Vec<usize>>;
}

/// 规则 1: 尺寸归并
pub struct SizeResolutionRule {
    default_size: String,
}

impl SizeResolutionRule {
    pub fn new(default_size: impl Into<String>) -> Self {
        Self {
            default_size: default_size.into(),
        }
    }
}

/// 规则 2: 每个 (配置, 尺寸, 速别) 保留价格最低行
pub struct CheapestPerSpeedRule;

/// 默认规则顺序
pub fn default_rules(config: &PipelineConfig) -> Vec<Box<dyn VariantRule>> {
    vec![
        Box::new(SizeResolutionRule::new(config.default_size.clone())),
        Box::new(CheapestPerSpeedRule),
    ]
}

// ==========================================
// VariantFilter - 变体筛选引擎
// ==========================================
pub struct VariantFilter {
    default_size: String,
    promotional_marker: String,
    rules: Vec<Box<dyn VariantRule>>,
    reporter: Arc<dyn PipelineReporter>,
}

impl VariantFilter {
    pub fn new(config: &PipelineConfig, reporter: Arc<dyn PipelineReporter>) -> Self {
        Self {
            default_size: config.default_size.clone(),
            promotional_marker: config.promotional_marker.clone(),
            rules: default_rules(config),
            reporter,
        }
    }

    /// 替换筛选规则
    pub fn with_rules(mut self, rules: Vec<Box<dyn VariantRule>>) -> Self {
        self.rules = rules;
        self
    }

    /// 筛选（降级版本）
    ///
    /// 失败时返回输入本身，并通过报告器记录错误
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub fn filter(&self, products: Vec<ExtractedProduct>) -> Vec<ExtractedProduct> {
        match self.try_filter(&products) {
            Ok(filtered) => {
                self.reporter.info(
                    PipelineStage::Filtering,
                    format!("变体筛选完成: {} → {} 行", products.len(), filtered.len()),
                );
                filtered
            }
            Err(e) => {
                self.reporter.error(
                    PipelineStage::Filtering,
                    format!("应用数据筛选规则时出错，返回未筛选数据: {}", e),
                );
                products
            }
        }
    }

    /// 筛选（严格版本）
    pub fn try_filter(&self, products: &[ExtractedProduct]) -> EngineResult<Vec<ExtractedProduct>> {
        // 促销款缺尺寸时补默认尺寸
        let prepared: Vec<ExtractedProduct> = products
            .iter()
            .map(|p| {
                if p.size().is_empty() && p.record.category.contains(&self.promotional_marker) {
                    p.with_size(&self.default_size)
                } else {
                    p.clone()
                }
            })
            .collect();

        // (配置, 颜色) 分组，保持首次出现顺序
        let mut group_order: Vec<(&str, &str)> = Vec::new();
        let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
        for (idx, product) in prepared.iter().enumerate() {
            let key = product.variant_key();
            if key.0.is_empty() && key.1.is_empty() {
                continue;
            }
            let members = groups.entry(key).or_default();
            if members.is_empty() {
                group_order.push(key);
            }
            members.push(idx);
        }

        let mut selected = Vec::new();
        for key in &group_order {
            let members = groups
                .get(key)
                .ok_or_else(|| EngineError::Filtering(format!("分组丢失: {}{}", key.0, key.1)))?;

            let mut kept = members.clone();
            for rule in &self.rules {
                kept = rule.apply(&prepared, &kept).map_err(|e| {
                    EngineError::Filtering(format!("规则 {} 失败: {}", rule.name(), e))
                })?;
            }
            selected.extend(kept);
        }

        if selected.is_empty() {
            return Ok(products.to_vec());
        }

        selected
            .into_iter()
            .map(|idx| {
                prepared
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| EngineError::Filtering(format!("行索引越界: {}", idx)))
            })
            .collect()
    }
}

// ==========================================
// 规则 1: 尺寸归并
// ==========================================
// 有默认尺寸只留默认尺寸；否则取最高成本所在尺寸

impl VariantRule for SizeResolutionRule {
    fn name(&self) -> &'static str {
        "尺寸归并"
    }

    fn apply(&self, rows: &[ExtractedProduct], members: &[usize]) -> EngineResult<Vec<usize>> {
        // 含默认尺寸 → 只留默认尺寸
        let mut default_sized = Vec::new();
        for &idx in members {
            if size_at(rows, idx)? == self.default_size {
                default_sized.push(idx);
            }
        }
        if !default_sized.is_empty() {
            return Ok(default_sized);
        }

        // 按尺寸求最高成本（尺寸按排序顺序遍历，并列取先者）
        let mut max_cost_by_size: BTreeMap<&str, Option<f64>> = BTreeMap::new();
        for &idx in members {
            let cost = rows
                .get(idx)
                .and_then(|p| parse_optional(p.record.cost.as_deref()));
            let entry = max_cost_by_size.entry(size_at(rows, idx)?).or_insert(None);
            if let Some(cost) = cost {
                *entry = Some(entry.map_or(cost, |current| current.max(cost)));
            }
        }

        let mut best: Option<(&str, f64)> = None;
        for (size, max_cost) in &max_cost_by_size {
            if let Some(cost) = max_cost {
                if best.map_or(true, |(_, current)| *cost > current) {
                    best = Some((*size, *cost));
                }
            }
        }

        let chosen = match best {
            Some((size, _)) => size,
            None => {
                // 无可解析成本 → 首个出现的尺寸；为空则不过滤
                let first = match members.first() {
                    Some(&idx) => size_at(rows, idx)?,
                    None => return Ok(Vec::new()),
                };
                if first.is_empty() {
                    return Ok(members.to_vec());
                }
                first
            }
        };

        let mut kept = Vec::new();
        for &idx in members {
            if size_at(rows, idx)? == chosen {
                kept.push(idx);
            }
        }
        Ok(kept)
    }
}

// ==========================================
// 规则 2: 价格最低
// ==========================================

impl VariantRule for CheapestPerSpeedRule {
    fn name(&self) -> &'static str {
        "价格最低"
    }

    fn apply(&self, rows: &[ExtractedProduct], members: &[usize]) -> EngineResult<Vec<usize>> {
        // (配置, 尺寸, 速别) 子分组，按键排序输出
        let mut sub_groups: BTreeMap<(&str, &str, &str), Vec<usize>> = BTreeMap::new();
        for &idx in members {
            let product = rows
                .get(idx)
                .ok_or_else(|| EngineError::Filtering(format!("行索引越界: {}", idx)))?;
            sub_groups
                .entry((product.configuration(), product.size(), product.speed()))
                .or_default()
                .push(idx);
        }

        let mut selected = Vec::with_capacity(sub_groups.len());
        for indices in sub_groups.values() {
            let mut cheapest: Option<(usize, f64)> = None;
            for &idx in indices {
                let price = rows
                    .get(idx)
                    .and_then(|p| parse_optional(p.record.price.as_deref()));
                if let Some(price) = price {
                    if cheapest.map_or(true, |(_, current)| price < current) {
                        cheapest = Some((idx, price));
                    }
                }
            }

            match (cheapest, indices.first()) {
                (Some((idx, _)), _) => selected.push(idx),
                (None, Some(&first)) => selected.push(first),
                (None, None) => {}
            }
        }

        Ok(selected)
    }
}

fn size_at(rows: &[ExtractedProduct], idx: usize) -> EngineResult<&str> {
    rows.get(idx)
        .map(|p| p.size())
        .ok_or_else(|| EngineError::Filtering(format!("行索引越界: {}", idx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExtractedAttributes, ProductRecord};
    use crate::engine::reporter::{MemoryReporter, NoOpReporter, ReportLevel};

    fn product(
        config: &str,
        color: &str,
        size: &str,
        speed: &str,
        price: &str,
        cost: &str,
    ) -> ExtractedProduct {
        ExtractedProduct::new(
            ProductRecord {
                short_name: format!("{}{}{}", config, size, speed),
                category: "山地车".to_string(),
                price: Some(price.to_string()),
                cost: Some(cost.to_string()),
                color: if color.is_empty() {
                    None
                } else {
                    Some(color.to_string())
                },
                ..Default::default()
            },
            ExtractedAttributes {
                size: size.to_string(),
                speed: speed.to_string(),
                configuration: config.to_string(),
            },
        )
    }

    fn filter() -> VariantFilter {
        VariantFilter::new(&PipelineConfig::default(), Arc::new(NoOpReporter))
    }

    #[test]
    fn test_prefers_default_size() {
        let rows = vec![
            product("经典", "", "24寸", "7速", "200", "120"),
            product("经典", "", "26寸", "7速", "220", "130"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].size(), "26寸");
    }

    #[test]
    fn test_highest_cost_size_without_default() {
        let rows = vec![
            product("经典", "", "24寸", "7速", "200", "120"),
            product("经典", "", "27.5寸", "7速", "260", "150"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].size(), "27.5寸");
    }

    #[test]
    fn test_non_numeric_costs_fall_back_to_first_size() {
        let rows = vec![
            product("经典", "", "27.5寸", "7速", "260", "待定"),
            product("经典", "", "24寸", "7速", "200", ""),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].size(), "27.5寸");
    }

    #[test]
    fn test_keeps_cheapest_per_speed() {
        let rows = vec![
            product("经典", "黑", "26寸", "7速", "230", "130"),
            product("经典", "黑", "26寸", "7速", "210", "130"),
            product("经典", "黑", "26寸", "21速", "260", "150"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 2);
        let seven = filtered.iter().find(|p| p.speed() == "7速").unwrap();
        assert_eq!(seven.record.price.as_deref(), Some("210"));
    }

    #[test]
    fn test_non_numeric_prices_keep_first_row() {
        let rows = vec![
            product("经典", "", "26寸", "7速", "询价", "130"),
            product("经典", "", "26寸", "7速", "面议", "130"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].record.price.as_deref(), Some("询价"));
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let rows = vec![
            product("豪华", "", "26寸", "7速", "300", "200"),
            product("经典", "", "26寸", "7速", "220", "130"),
            product("豪华", "", "26寸", "7速", "280", "200"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].configuration(), "豪华");
        assert_eq!(filtered[0].record.price.as_deref(), Some("280"));
        assert_eq!(filtered[1].configuration(), "经典");
    }

    #[test]
    fn test_promotional_rows_get_default_size() {
        let mut promo = product("特价", "", "", "单速", "99", "60");
        promo.record.category = "促销".to_string();
        let filtered = filter().try_filter(&[promo]).unwrap();
        assert_eq!(filtered[0].size(), "26寸");
    }

    #[test]
    fn test_drops_empty_configuration_and_color() {
        let rows = vec![
            product("", "", "26寸", "7速", "100", "50"),
            product("经典", "", "26寸", "7速", "220", "130"),
        ];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].configuration(), "经典");
    }

    #[test]
    fn test_nothing_selected_returns_input() {
        let rows = vec![product("", "", "26寸", "7速", "100", "50")];
        let filtered = filter().try_filter(&rows).unwrap();
        assert_eq!(filtered, rows);
    }

    #[test]
    fn test_filter_reports_summary() {
        let reporter = Arc::new(MemoryReporter::new());
        let filter = VariantFilter::new(&PipelineConfig::default(), reporter.clone());
        let rows = vec![
            product("经典", "", "24寸", "7速", "200", "120"),
            product("经典", "", "26寸", "7速", "220", "130"),
        ];
        assert_eq!(filter.filter(rows).len(), 1);
        assert_eq!(reporter.count(ReportLevel::Info), 1);
        assert_eq!(reporter.count(ReportLevel::Error), 0);
    }

    struct BrokenRule;

    impl VariantRule for BrokenRule {
        fn name(&self) -> &'static str {
            "损坏规则"
        }

        fn apply(&self, _rows: &[ExtractedProduct], _members: &[usize]) -> EngineResult<Vec<usize>> {
            Err(EngineError::Other(anyhow::anyhow!("成本列类型异常")))
        }
    }

    #[test]
    fn test_rule_failure_degrades_to_input() {
        let reporter = Arc::new(MemoryReporter::new());
        let filter = VariantFilter::new(&PipelineConfig::default(), reporter.clone())
            .with_rules(vec![Box::new(BrokenRule)]);
        let rows = vec![
            product("经典", "", "24寸", "7速", "200", "120"),
            product("经典", "", "26寸", "7速", "220", "130"),
        ];

        let err = filter.try_filter(&rows).unwrap_err();
        assert!(err.to_string().contains("损坏规则"));

        assert_eq!(filter.filter(rows.clone()), rows);
        assert_eq!(reporter.count(ReportLevel::Error), 1);
        assert_eq!(reporter.count(ReportLevel::Info), 0);
    }

    #[test]
    fn test_rules_run_in_order() {
        // 只保留价格最低规则: 尺寸不归并
        let filter = VariantFilter::new(&PipelineConfig::default(), Arc::new(NoOpReporter))
            .with_rules(vec![Box::new(CheapestPerSpeedRule)]);
        let rows = vec![
            product("经典", "", "24寸", "7速", "200", "120"),
            product("经典", "", "26寸", "7速", "220", "130"),
        ];
        assert_eq!(filter.try_filter(&rows).unwrap().len(), 2);
    }
}
