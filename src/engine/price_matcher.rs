// ==========================================
// 毛利表生成系统 - 改价回填引擎
// ==========================================
// 职责: 改价毛利表 → 价格映射 → 原始行匹配 → 新毛利率
// 匹配顺序（先命中者生效）:
// 1) 直接匹配: 简称|速别
// 2) 直接匹配(无速别): 简称（尺寸格式毛利表没有 速别 列）
// 3) 尺寸规范化匹配: 24寸/27.5寸 → 26寸 后的 简称|速别
// 4) 尺寸规范化匹配(无速别): 规范化简称
// 加价: 原始尺寸为 27.5寸 时，命中价格 +20
// 红线: 单行失败只标记该行，不中断整批
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{
    EditedPriceRow, MatchMethod, NewProfitRate, ProductRecord, ReconcileReport, UpdatedRecord,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::extractor::AttributeExtractor;
use crate::engine::numeric::{parse_amount, parse_number};
use crate::engine::reporter::{PipelineReporter, PipelineStage};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// 价格映射
// ==========================================

/// 映射值: 价格 + 毛利表行号（从 0 开始）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub price: f64,
    pub row_index: usize,
}

/// 价格映射（后出现的重复键覆盖先出现的）
#[derive(Debug, Clone, Default)]
pub struct PriceMapping {
    entries: HashMap<String, PriceEntry>,
    duplicate_keys: Vec<String>,
}

impl PriceMapping {
    pub fn get(&self, key: &str) -> Option<&PriceEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 被覆盖过的键（按首次重复顺序）
    pub fn duplicate_keys(&self) -> &[String] {
        &self.duplicate_keys
    }

    fn insert(&mut self, key: String, entry: PriceEntry) {
        if self.entries.insert(key.clone(), entry).is_some() && !self.duplicate_keys.contains(&key) {
            self.duplicate_keys.push(key);
        }
    }
}

/// 映射键: 简称|速别（速别为空时只用简称）
pub fn compose_key(name: &str, speed: &str) -> String {
    if speed.is_empty() {
        name.to_string()
    } else {
        format!("{}|{}", name, speed)
    }
}

// ==========================================
// 匹配策略
// ==========================================

/// 单行匹配输入
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub name: String,            // 简称（已去空白）
    pub speed: String,           // 速别（列值优先，否则提取）
    pub normalized_name: String, // 尺寸规范化后的简称
}

/// 命中结果
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub method: MatchMethod,
    pub key: String,
    pub entry: PriceEntry,
}

/// 匹配策略
///
/// 实现者: ExactKeyStrategy, ExactBareStrategy, SizeNormalizedStrategy, SizeNormalizedBareStrategy
///
/// `attempt` 返回 Err 时该行标记为出错，其余行继续匹配
pub trait MatchStrategy: Send + Sync {
    fn method(&self) -> MatchMethod;

    /// 本策略尝试的映射键
    fn candidate_key(&self, query: &MatchQuery) -> String;

    fn attempt(&self, query: &MatchQuery, mapping: &PriceMapping) -> EngineResult<Option<MatchHit>> {
        let key = self.candidate_key(query);
        Ok(mapping.get(&key).map(|entry| MatchHit {
            method: self.method(),
            key,
            entry: *entry,
        }))
    }
}

pub struct ExactKeyStrategy;

impl MatchStrategy for ExactKeyStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Exact
    }

    fn candidate_key(&self, query: &MatchQuery) -> String {
        compose_key(&query.name, &query.speed)
    }
}

pub struct ExactBareStrategy;

impl MatchStrategy for ExactBareStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::ExactBare
    }

    fn candidate_key(&self, query: &MatchQuery) -> String {
        query.name.clone()
    }
}

pub struct SizeNormalizedStrategy;

impl MatchStrategy for SizeNormalizedStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::SizeNormalized
    }

    fn candidate_key(&self, query: &MatchQuery) -> String {
        compose_key(&query.normalized_name, &query.speed)
    }
}

pub struct SizeNormalizedBareStrategy;

impl MatchStrategy for SizeNormalizedBareStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::SizeNormalizedBare
    }

    fn candidate_key(&self, query: &MatchQuery) -> String {
        query.normalized_name.clone()
    }
}

/// 默认策略顺序
pub fn default_strategies() -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(ExactKeyStrategy),
        Box::new(ExactBareStrategy),
        Box::new(SizeNormalizedStrategy),
        Box::new(SizeNormalizedBareStrategy),
    ]
}

// ==========================================
// PriceMatcher - 改价回填引擎
// ==========================================
pub struct PriceMatcher {
    extractor: AttributeExtractor,
    strategies: Vec<Box<dyn MatchStrategy>>,
    size_normalizer: Option<Regex>,
    normalization_target: String,
    surcharge_size: String,
    surcharge_amount: f64,
    handling_fee: f64,
    reporter: Arc<dyn PipelineReporter>,
}

impl PriceMatcher {
    pub fn new(config: &PipelineConfig, reporter: Arc<dyn PipelineReporter>) -> EngineResult<Self> {
        let alternatives: Vec<String> = config
            .normalized_sizes
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();
        let size_normalizer = if alternatives.is_empty() {
            None
        } else {
            Some(
                Regex::new(&alternatives.join("|"))
                    .map_err(|e| EngineError::Other(anyhow::anyhow!("尺寸规范化模式无效: {}", e)))?,
            )
        };

        Ok(Self {
            extractor: AttributeExtractor::new(config)?.with_reporter(reporter.clone()),
            strategies: default_strategies(),
            size_normalizer,
            normalization_target: config.normalization_target.clone(),
            surcharge_size: config.surcharge_size.clone(),
            surcharge_amount: config.surcharge_amount,
            handling_fee: config.handling_fee,
            reporter,
        })
    }

    /// 替换匹配策略
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// 当前策略顺序
    pub fn strategy_order(&self) -> Vec<MatchMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    // ==========================================
    // 价格映射
    // ==========================================

    /// 由改价毛利表构建价格映射
    ///
    /// 跳过: 简称为空 / 价格为空 / 价格无法解析
    pub fn build_price_mapping(&self, rows: &[EditedPriceRow]) -> PriceMapping {
        let mut mapping = PriceMapping::default();
        for row in rows {
            let name = row.name.trim();
            if name.is_empty() {
                continue;
            }
            let price = match row.price.as_deref().and_then(parse_amount) {
                Some(price) => price,
                None => continue,
            };
            mapping.insert(
                compose_key(name, row.speed.trim()),
                PriceEntry {
                    price,
                    row_index: row.row_index,
                },
            );
        }

        if !mapping.duplicate_keys().is_empty() {
            self.reporter.warn(
                PipelineStage::PriceMatching,
                format!(
                    "改价毛利表存在重复键（后行覆盖前行）: {}",
                    mapping.duplicate_keys().join(", ")
                ),
            );
        }
        mapping
    }

    // ==========================================
    // 回填
    // ==========================================

    /// 回填改价
    #[instrument(skip(self, originals, edited), fields(originals = originals.len(), edited = edited.len()))]
    pub fn reconcile(&self, originals: &[ProductRecord], edited: &[EditedPriceRow]) -> ReconcileReport {
        let run_id = Uuid::new_v4().to_string();
        let mapping = self.build_price_mapping(edited);

        self.reporter.info(
            PipelineStage::PriceMatching,
            format!("开始价格匹配: run_id={}, 映射键 {} 个", run_id, mapping.len()),
        );

        let mut records = Vec::with_capacity(originals.len());
        let mut errored_count = 0;
        for (idx, record) in originals.iter().enumerate() {
            let updated = match self.match_row(idx, record, &mapping) {
                Ok(updated) => updated,
                Err(e) => {
                    errored_count += 1;
                    self.reporter
                        .error(PipelineStage::PriceMatching, format!("处理原始数据时出错: {}", e));
                    UpdatedRecord::errored(record.clone(), e.to_string())
                }
            };
            records.push(updated);
        }

        // 新毛利率（全部行统一重算）
        for updated in &mut records {
            updated.new_profit_rate = self.compute_new_profit_rate(updated.post_edit_price, &updated.record);
        }

        let matched_count = records.iter().filter(|r| !r.unmatched).count();
        let unmatched_count = records.len() - matched_count;

        self.reporter.info(
            PipelineStage::PriceMatching,
            format!(
                "价格更新完成: 匹配成功 {} 行, 未匹配 {} 行（其中出错 {} 行）",
                matched_count, unmatched_count, errored_count
            ),
        );

        ReconcileReport {
            run_id,
            reconciled_at: chrono::Utc::now().naive_utc(),
            matched_count,
            unmatched_count,
            errored_count,
            duplicate_keys: mapping.duplicate_keys().to_vec(),
            records,
        }
    }

    /// 单行匹配
    fn match_row(
        &self,
        idx: usize,
        record: &ProductRecord,
        mapping: &PriceMapping,
    ) -> EngineResult<UpdatedRecord> {
        let name = record.short_name.trim();
        if name.is_empty() {
            self.reporter.warn(
                PipelineStage::PriceMatching,
                format!("原始数据第{}行: 简称为空，跳过匹配", idx + 1),
            );
            return Ok(UpdatedRecord::unmatched(record.clone()));
        }

        let query = self.query_for(record);
        let size = stored_or(record.size.as_deref(), || self.extractor.extract_size(name));

        let mut hit = None;
        for strategy in &self.strategies {
            hit = strategy.attempt(&query, mapping).map_err(|e| EngineError::RowMatch {
                row: idx + 1,
                message: format!("{}: {}", strategy.method(), e),
            })?;
            if hit.is_some() {
                break;
            }
        }

        let hit = match hit {
            Some(hit) => hit,
            None => {
                self.reporter.warn(
                    PipelineStage::PriceMatching,
                    format!(
                        "原始数据第{}行 [{}|{}|{}] 未找到匹配项",
                        idx + 1,
                        name,
                        query.speed,
                        size
                    ),
                );
                return Ok(UpdatedRecord::unmatched(record.clone()));
            }
        };

        let mut final_price = hit.entry.price;
        if size == self.surcharge_size {
            final_price += self.surcharge_amount;
        }

        self.reporter.debug(
            PipelineStage::PriceMatching,
            format!(
                "原始数据第{}行 [{}|{}|{}] -> 毛利表第{}行 [{}] 匹配方式: {}, 价格: {} -> {}",
                idx + 1,
                name,
                query.speed,
                size,
                hit.entry.row_index + 1,
                hit.key,
                hit.method,
                hit.entry.price,
                final_price
            ),
        );

        Ok(UpdatedRecord {
            record: record.clone(),
            post_edit_price: Some(final_price),
            unmatched: false,
            match_method: Some(hit.method),
            matched_key: Some(hit.key),
            source_row: Some(hit.entry.row_index),
            match_error: None,
            new_profit_rate: NewProfitRate::CannotCalculate,
        })
    }

    /// 构建匹配输入（速别列优先，否则从简称提取）
    pub fn query_for(&self, record: &ProductRecord) -> MatchQuery {
        let name = record.short_name.trim().to_string();
        let speed = stored_or(record.speed.as_deref(), || self.extractor.extract_speed(&name));
        let normalized_name = self.normalize_size(&name);
        MatchQuery {
            name,
            speed,
            normalized_name,
        }
    }

    /// 24寸 / 27.5寸 → 26寸
    pub fn normalize_size(&self, name: &str) -> String {
        match &self.size_normalizer {
            Some(re) => re
                .replace_all(name, regex::NoExpand(&self.normalization_target))
                .into_owned(),
            None => name.to_string(),
        }
    }

    // ==========================================
    // 新毛利率
    // ==========================================

    /// 新毛利率 = (售价 - 成本 - 快递费) / 售价 × 100
    ///
    /// - 售价: 修改后价格，缺失时用原价格
    /// - 售价或成本缺失 → 无法计算
    /// - 无法解析 → 计算错误
    /// - 售价 <= 0 → 0.00%
    pub fn compute_new_profit_rate(&self, post_edit_price: Option<f64>, record: &ProductRecord) -> NewProfitRate {
        let cost = match present(record.cost.as_deref()) {
            Some(cost) => cost,
            None => return NewProfitRate::CannotCalculate,
        };

        let price = match (post_edit_price, present(record.price.as_deref())) {
            (Some(price), _) => Some(price),
            (None, Some(raw)) => match parse_number(raw) {
                Some(price) => Some(price),
                None => return NewProfitRate::CalculationError,
            },
            (None, None) => None,
        };

        let price = match price {
            Some(price) => price,
            None => return NewProfitRate::CannotCalculate,
        };

        let cost = match parse_number(cost) {
            Some(cost) => cost,
            None => return NewProfitRate::CalculationError,
        };

        if price > 0.0 {
            NewProfitRate::Rate((price - cost - self.handling_fee) / price * 100.0)
        } else {
            NewProfitRate::Rate(0.0)
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn stored_or(stored: Option<&str>, derive: impl FnOnce() -> String) -> String {
    match present(stored) {
        Some(value) => value.to_string(),
        None => derive().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reporter::{MemoryReporter, NoOpReporter, ReportLevel};

    fn matcher() -> PriceMatcher {
        PriceMatcher::new(&PipelineConfig::default(), Arc::new(NoOpReporter)).unwrap()
    }

    fn edited(row_index: usize, name: &str, speed: &str, price: &str) -> EditedPriceRow {
        EditedPriceRow {
            row_index,
            name: name.to_string(),
            speed: speed.to_string(),
            price: Some(price.to_string()),
        }
    }

    fn original(name: &str, price: &str, cost: &str) -> ProductRecord {
        ProductRecord {
            short_name: name.to_string(),
            category: "山地车".to_string(),
            price: Some(price.to_string()),
            cost: Some(cost.to_string()),
            ..Default::default()
        }
    }

    // ===== 映射 =====

    #[test]
    fn test_build_price_mapping() {
        let mapping = matcher().build_price_mapping(&[
            edited(0, "山地车经典26寸7速", "7速", "1,200"),
            edited(1, "儿童车", "", "99"),
            edited(2, "", "7速", "100"),
            edited(3, "滑板车", "单速", "面议"),
        ]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("山地车经典26寸7速|7速").unwrap().price, 1200.0);
        assert_eq!(mapping.get("儿童车").unwrap().row_index, 1);
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let reporter = Arc::new(MemoryReporter::new());
        let m = PriceMatcher::new(&PipelineConfig::default(), reporter.clone()).unwrap();
        let mapping = m.build_price_mapping(&[
            edited(0, "A", "7速", "100"),
            edited(1, "A", "7速", "110"),
        ]);
        assert_eq!(mapping.get("A|7速").unwrap().price, 110.0);
        assert_eq!(mapping.duplicate_keys(), ["A|7速".to_string()]);
        assert_eq!(reporter.count(ReportLevel::Warn), 1);
    }

    // ===== 策略 =====

    #[test]
    fn test_strategy_order() {
        assert_eq!(
            matcher().strategy_order(),
            vec![
                MatchMethod::Exact,
                MatchMethod::ExactBare,
                MatchMethod::SizeNormalized,
                MatchMethod::SizeNormalizedBare
            ]
        );
    }

    #[test]
    fn test_normalize_size() {
        let m = matcher();
        assert_eq!(m.normalize_size("山地车27.5寸21速"), "山地车26寸21速");
        assert_eq!(m.normalize_size("山地车24寸"), "山地车26寸");
        assert_eq!(m.normalize_size("山地车26寸"), "山地车26寸");
    }

    // ===== 回填 =====

    #[test]
    fn test_exact_match() {
        let report = matcher().reconcile(
            &[original("山地车经典26寸7速", "220", "130")],
            &[edited(0, "山地车经典26寸7速", "7速", "100")],
        );
        let r = &report.records[0];
        assert!(!r.unmatched);
        assert_eq!(r.post_edit_price, Some(100.0));
        assert_eq!(r.match_method, Some(MatchMethod::Exact));
        assert_eq!(r.source_row, Some(0));
        assert_eq!(report.matched_count, 1);
    }

    #[test]
    fn test_surcharge_for_large_size() {
        let report = matcher().reconcile(
            &[original("山地车经典27.5寸7速", "260", "150")],
            &[edited(0, "山地车经典26寸7速", "7速", "100")],
        );
        let r = &report.records[0];
        assert_eq!(r.post_edit_price, Some(120.0));
        assert_eq!(r.match_method, Some(MatchMethod::SizeNormalized));
        assert_eq!(r.matched_key.as_deref(), Some("山地车经典26寸7速|7速"));
    }

    #[test]
    fn test_bare_fallback_without_speed() {
        let report = matcher().reconcile(
            &[original("山地车经典24寸", "200", "120")],
            &[edited(0, "山地车经典26寸", "", "180")],
        );
        let r = &report.records[0];
        assert_eq!(r.post_edit_price, Some(180.0));
        assert_eq!(r.match_method, Some(MatchMethod::SizeNormalizedBare));
    }

    #[test]
    fn test_stored_speed_column_preferred() {
        let mut record = original("山地车经典26寸", "220", "130");
        record.speed = Some("21速".to_string());
        let report = matcher().reconcile(&[record], &[edited(0, "山地车经典26寸", "21速", "230")]);
        assert_eq!(report.records[0].match_method, Some(MatchMethod::Exact));
    }

    #[test]
    fn test_unmatched_and_empty_name() {
        let report = matcher().reconcile(
            &[original("公路车26寸", "300", "200"), original("  ", "1", "1")],
            &[edited(0, "山地车经典26寸7速", "7速", "100")],
        );
        assert_eq!(report.unmatched_count, 2);
        assert_eq!(report.unmatched_rows(), vec![0, 1]);
        assert!(report.records[0].post_edit_price.is_none());
        assert_eq!(report.errored_count, 0);
    }

    #[test]
    fn test_bare_name_matches_own_size_first() {
        // 尺寸格式毛利表: 键只有简称，24寸 行应命中自身价格而非 26寸 价格
        let report = matcher().reconcile(
            &[original("山地车甲24寸", "200", "120"), original("山地车甲26寸", "220", "130")],
            &[edited(0, "山地车甲24寸", "", "205"), edited(1, "山地车甲26寸", "", "225")],
        );
        assert_eq!(report.records[0].post_edit_price, Some(205.0));
        assert_eq!(report.records[0].match_method, Some(MatchMethod::ExactBare));
        assert_eq!(report.records[1].post_edit_price, Some(225.0));
        assert_eq!(report.unmatched_count, 0);
    }

    /// 对指定简称抛错的策略
    struct FailingStrategy(&'static str);

    impl MatchStrategy for FailingStrategy {
        fn method(&self) -> MatchMethod {
            MatchMethod::Exact
        }

        fn candidate_key(&self, query: &MatchQuery) -> String {
            compose_key(&query.name, &query.speed)
        }

        fn attempt(&self, query: &MatchQuery, mapping: &PriceMapping) -> EngineResult<Option<MatchHit>> {
            if query.name == self.0 {
                return Err(EngineError::Other(anyhow::anyhow!("映射读取失败")));
            }
            let key = self.candidate_key(query);
            Ok(mapping.get(&key).map(|entry| MatchHit {
                method: self.method(),
                key,
                entry: *entry,
            }))
        }
    }

    #[test]
    fn test_row_error_is_contained() {
        let reporter = Arc::new(MemoryReporter::new());
        let m = PriceMatcher::new(&PipelineConfig::default(), reporter.clone())
            .unwrap()
            .with_strategies(vec![Box::new(FailingStrategy("坏行7速"))]);

        let report = m.reconcile(
            &[
                original("好行7速", "220", "130"),
                original("坏行7速", "220", "130"),
                original("另一行7速", "200", "100"),
            ],
            &[edited(0, "好行7速", "7速", "230"), edited(1, "另一行7速", "7速", "210")],
        );

        assert_eq!(report.errored_count, 1);
        assert_eq!(report.matched_count, 2);
        assert_eq!(report.unmatched_rows(), vec![1]);

        let bad = &report.records[1];
        assert!(bad.unmatched);
        assert!(bad.post_edit_price.is_none());
        assert!(bad.match_error.as_deref().unwrap().contains("映射读取失败"));
        assert_eq!(report.records[0].post_edit_price, Some(230.0));
        assert_eq!(report.records[2].post_edit_price, Some(210.0));
        assert_eq!(reporter.count(ReportLevel::Error), 1);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let m = matcher();
        let a = m.reconcile(&[], &[]);
        let b = m.reconcile(&[], &[]);
        assert_ne!(a.run_id, b.run_id);
    }

    // ===== 新毛利率 =====

    #[test]
    fn test_new_profit_rate_with_post_edit_price() {
        let rate = matcher().compute_new_profit_rate(Some(200.0), &original("A", "180", "120"));
        assert_eq!(rate, NewProfitRate::Rate(25.0));
        assert_eq!(rate.to_string(), "25.00%");
    }

    #[test]
    fn test_new_profit_rate_falls_back_to_original_price() {
        let rate = matcher().compute_new_profit_rate(None, &original("A", "200", "120"));
        assert_eq!(rate.to_string(), "25.00%");
    }

    #[test]
    fn test_new_profit_rate_edge_cases() {
        let m = matcher();
        assert_eq!(
            m.compute_new_profit_rate(Some(0.0), &original("A", "0", "10")).to_string(),
            "0.00%"
        );
        assert_eq!(
            m.compute_new_profit_rate(None, &original("A", "询价", "10")),
            NewProfitRate::CalculationError
        );
        assert_eq!(
            m.compute_new_profit_rate(Some(100.0), &original("A", "100", "待定")),
            NewProfitRate::CalculationError
        );
        let mut no_cost = original("A", "100", "");
        no_cost.cost = None;
        assert_eq!(
            m.compute_new_profit_rate(Some(100.0), &no_cost),
            NewProfitRate::CannotCalculate
        );
        let mut no_price = original("A", "", "10");
        no_price.price = None;
        assert_eq!(
            m.compute_new_profit_rate(None, &no_price),
            NewProfitRate::CannotCalculate
        );
    }
}
