// ==========================================
// 毛利表生成系统 - 毛利表服务
// ==========================================
// 职责: 串联 导入 → 解析 → 筛选 → 生成 → 导出 / 改价回填
// 状态: 持有当前运行的原始行、工作数据集、毛利表、回填结果
// 红线: 所有操作返回 ProcessingResult，不向调用方抛出错误
// 并发: 同一时间只允许一次回填运行（&mut self 保证）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::PipelineConfig;
use crate::domain::{ProcessingResult, ProductRecord, ProfitTable, ReconcileReport};
use crate::engine::{
    default_reporter, AttributeExtractor, PipelineReporter, PriceMatcher, ProfitTableBuilder,
    VariantFilter,
};
use crate::exporter::ExcelExporter;
use crate::importer::ProductImporter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// DataSummary - 数据摘要
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSummary {
    pub original_count: usize,
    pub processed_count: usize,
    pub profit_table_count: usize,
    pub updated_count: usize,
    pub unmatched_count: usize,
    pub has_original_data: bool,
    pub has_processed_data: bool,
    pub has_profit_table: bool,
    pub has_updated_data: bool,
}

/// 当前运行状态
#[derive(Debug, Default)]
struct RunState {
    originals: Option<Vec<ProductRecord>>,
    processed: Option<Vec<ProductRecord>>,
    profit_table: Option<ProfitTable>,
    updated: Option<ReconcileReport>,
}

// ==========================================
// ProfitTableService
// ==========================================
pub struct ProfitTableService {
    importer: ProductImporter,
    extractor: AttributeExtractor,
    filter: VariantFilter,
    builder: ProfitTableBuilder,
    matcher: PriceMatcher,
    exporter: ExcelExporter,
    state: RunState,
}

impl ProfitTableService {
    /// 创建服务（日志输出到 tracing）
    pub fn new(config: &PipelineConfig) -> ApiResult<Self> {
        Self::with_reporter(config, default_reporter())
    }

    /// 创建服务并注入流水线日志接口
    pub fn with_reporter(
        config: &PipelineConfig,
        reporter: Arc<dyn PipelineReporter>,
    ) -> ApiResult<Self> {
        Ok(Self {
            importer: ProductImporter::default(),
            extractor: AttributeExtractor::new(config)?.with_reporter(reporter.clone()),
            filter: VariantFilter::new(config, reporter.clone()),
            builder: ProfitTableBuilder::new(config, reporter.clone())?,
            matcher: PriceMatcher::new(config, reporter)?,
            exporter: ExcelExporter::new(config),
            state: RunState::default(),
        })
    }

    /// 导入商品数据
    ///
    /// 新导入会清空上一轮的毛利表与回填结果
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_data<P: AsRef<Path>>(&mut self, file_path: P) -> ProcessingResult<Vec<ProductRecord>> {
        let imported = match self.importer.import_products(file_path) {
            Ok(imported) => imported,
            Err(e) => return failed("导入数据失败", ApiError::from(e)),
        };

        let count = imported.originals.len();
        self.state = RunState {
            originals: Some(imported.originals.clone()),
            processed: Some(imported.processed),
            profit_table: None,
            updated: None,
        };

        ProcessingResult::ok(
            format!("数据导入成功，共{}行数据", count),
            imported.originals,
            count,
        )
    }

    /// 处理数据并生成毛利表
    #[instrument(skip(self))]
    pub fn process_and_generate(&mut self) -> ProcessingResult<ProfitTable> {
        match self.generate() {
            Ok(table) => {
                let count = table.len();
                self.state.profit_table = Some(table.clone());
                ProcessingResult::ok(format!("毛利表生成完成，共{}行", count), table, count)
            }
            Err(e) => failed("处理数据失败", e),
        }
    }

    /// 导出毛利表（附原始数据工作表）
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn export_profit_table<P: AsRef<Path>>(&self, file_path: P) -> ProcessingResult<()> {
        let table = match &self.state.profit_table {
            Some(table) => table,
            None => return ProcessingResult::failed("请先生成毛利表"),
        };

        match self.exporter.export_profit_table(
            file_path.as_ref(),
            table,
            self.state.originals.as_deref(),
        ) {
            Ok(rows) => ProcessingResult::done(
                format!("毛利表已导出到: {}", file_path.as_ref().display()),
                rows,
            ),
            Err(e) => failed("导出毛利表失败", ApiError::from(e)),
        }
    }

    /// 导入人工改价后的毛利表，并回填到原始数据
    ///
    /// 每次调用生成新的回填结果，覆盖上一轮结果
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_edited_table_and_reconcile<P: AsRef<Path>>(
        &mut self,
        file_path: P,
    ) -> ProcessingResult<ReconcileReport> {
        match self.reconcile(file_path.as_ref()) {
            Ok(report) => {
                let count = report.records.len();
                let message = format!(
                    "已成功导入更新后的毛利表并更新价格: 匹配 {} 行，未匹配 {} 行",
                    report.matched_count, report.unmatched_count
                );
                self.state.updated = Some(report.clone());
                ProcessingResult::ok(message, report, count)
            }
            Err(e) => failed("导入修改后毛利表失败", e),
        }
    }

    /// 导出改价后的原始数据
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn export_updated_data<P: AsRef<Path>>(&self, file_path: P) -> ProcessingResult<()> {
        let report = match &self.state.updated {
            Some(report) => report,
            None => return ProcessingResult::failed("没有可导出的数据，请先导入修改后的毛利表"),
        };

        match self.exporter.export_updated_data(file_path.as_ref(), report) {
            Ok(rows) => ProcessingResult::done(
                format!("改价后原始数据已导出到: {}", file_path.as_ref().display()),
                rows,
            ),
            Err(e) => failed("导出改价后原始数据失败", ApiError::from(e)),
        }
    }

    /// 数据摘要
    pub fn summary(&self) -> DataSummary {
        let state = &self.state;
        DataSummary {
            original_count: state.originals.as_ref().map_or(0, Vec::len),
            processed_count: state.processed.as_ref().map_or(0, Vec::len),
            profit_table_count: state.profit_table.as_ref().map_or(0, ProfitTable::len),
            updated_count: state.updated.as_ref().map_or(0, |r| r.records.len()),
            unmatched_count: state.updated.as_ref().map_or(0, |r| r.unmatched_count),
            has_original_data: state.originals.is_some(),
            has_processed_data: state.processed.is_some(),
            has_profit_table: state.profit_table.is_some(),
            has_updated_data: state.updated.is_some(),
        }
    }

    pub fn profit_table(&self) -> Option<&ProfitTable> {
        self.state.profit_table.as_ref()
    }

    pub fn updated_report(&self) -> Option<&ReconcileReport> {
        self.state.updated.as_ref()
    }

    // ==========================================
    // 内部流程
    // ==========================================

    fn generate(&self) -> ApiResult<ProfitTable> {
        let processed = self
            .state
            .processed
            .as_ref()
            .ok_or_else(|| ApiError::Precondition("请先导入数据".to_string()))?;

        let extracted = self.extractor.extract_all(processed.clone());
        let filtered = self.filter.filter(extracted);
        let table = self.builder.build(&filtered)?;

        info!(
            format = %table.format,
            rows = table.len(),
            "毛利表生成完成"
        );
        Ok(table)
    }

    fn reconcile(&self, file_path: &Path) -> ApiResult<ReconcileReport> {
        let originals = self
            .state
            .originals
            .as_ref()
            .ok_or_else(|| ApiError::Precondition("请先导入原始数据".to_string()))?;

        let edited = self.importer.import_edited_table(file_path)?;
        Ok(self.matcher.reconcile(originals, &edited))
    }
}

/// 记录错误并转换为失败结果
fn failed<T>(action: &str, err: ApiError) -> ProcessingResult<T> {
    error!(error = %err, "{}", action);
    match err {
        ApiError::Precondition(message) => ProcessingResult::failed(message),
        other => ProcessingResult::failed(format!("{}: {}", action, other)),
    }
}
