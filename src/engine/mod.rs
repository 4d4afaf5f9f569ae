// ==========================================
// 毛利表生成系统 - 引擎层
// ==========================================
// 职责: 简称解析 → 变体筛选 → 格式判定 → 毛利表生成；改价回填
// 红线: 引擎不读写文件，日志经注入的 PipelineReporter 输出
// ==========================================

pub mod error;
pub mod extractor;
pub mod format_analyzer;
pub mod numeric;
pub mod price_matcher;
pub mod profit_table_builder;
pub mod reporter;
pub mod variant_filter;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use extractor::AttributeExtractor;
pub use format_analyzer::FormatAnalyzer;
pub use price_matcher::{
    compose_key, default_strategies, ExactBareStrategy, ExactKeyStrategy, MatchHit, MatchQuery,
    MatchStrategy, PriceEntry, PriceMapping, PriceMatcher, SizeNormalizedBareStrategy,
    SizeNormalizedStrategy,
};
pub use profit_table_builder::ProfitTableBuilder;
pub use reporter::{
    default_reporter, MemoryReporter, NoOpReporter, PipelineEvent, PipelineReporter,
    PipelineStage, ReportLevel, TracingReporter,
};
pub use variant_filter::{
    default_rules, CheapestPerSpeedRule, SizeResolutionRule, VariantFilter, VariantRule,
};
