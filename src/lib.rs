// ==========================================
// 毛利表生成系统 - 核心库
// ==========================================
// 流程: 导入 → 简称解析 → 变体筛选 → 格式判定 → 毛利表生成 → 导出
//       导入改价毛利表 → 价格回填 → 导出改价后原始数据
// 系统定位: 批处理工具（同步、单线程，人工改价在表格中完成）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 流水线配置
pub mod config;

// 导入层 - 外部数据
pub mod importer;

// 引擎层 - 业务规则
pub mod engine;

// 导出层 - 表格输出
pub mod exporter;

// API 层 - 服务门面
pub mod api;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    EditedPriceRow, ExtractedAttributes, ExtractedProduct, FormatAnalysis, MatchMethod,
    NewProfitRate, PivotFormat, ProcessingResult, ProductRecord, ProfitTable, ProfitTableRow,
    ReconcileReport, RowBucket, UpdatedRecord,
};

// 配置
pub use config::PipelineConfig;

// 引擎
pub use engine::{
    AttributeExtractor, FormatAnalyzer, PipelineReporter, PriceMatcher, ProfitTableBuilder,
    VariantFilter,
};

// 导入 / 导出
pub use exporter::ExcelExporter;
pub use importer::ProductImporter;

// API
pub use api::{DataSummary, ProfitTableService};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "毛利表生成系统";
