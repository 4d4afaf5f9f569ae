// ==========================================
// 毛利表生成系统 - 导出层
// ==========================================
// 职责: 毛利表 / 改价后原始数据写出为 xlsx
// 红线: 呈现提示（合并、高亮、公式）在 presentation 纯计算，
//       excel_exporter 只负责样式与落盘
// ==========================================

pub mod error;
pub mod excel_exporter;
pub mod presentation;

// 重导出
pub use error::{ExportError, ExportResult};
pub use excel_exporter::ExcelExporter;
pub use presentation::{
    column_letter, export_values, HeaderGroup, MergeRange, PresentationPlan, RowFormulas,
};
