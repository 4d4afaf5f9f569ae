// ==========================================
// 毛利表生成系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、列名
// 红线: 不含文件读写逻辑，不含引擎逻辑
// ==========================================

pub mod columns;
pub mod product;
pub mod profit_table;
pub mod reconcile;
pub mod result;
pub mod types;

// 重导出核心类型
pub use product::{EditedPriceRow, ExtractedAttributes, ExtractedProduct, ProductRecord};
pub use profit_table::{FormatAnalysis, ProfitTable, ProfitTableRow};
pub use reconcile::{ReconcileReport, UpdatedRecord};
pub use result::ProcessingResult;
pub use types::{MatchMethod, NewProfitRate, PivotFormat, RowBucket};
