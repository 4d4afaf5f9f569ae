// ==========================================
// 毛利表生成系统 - API 层
// ==========================================
// 职责: 提供面向调用方的服务门面（CLI / 上层界面）
// ==========================================

pub mod error;
pub mod profit_service;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use profit_service::{DataSummary, ProfitTableService};
