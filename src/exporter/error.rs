// ==========================================
// 毛利表生成系统 - 导出模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 级别: 导出错误为致命错误，向调用方传播
// ==========================================

use thiserror::Error;

/// 导出模块错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("没有可导出的数据: {0}")]
    NothingToExport(String),

    #[error("工作簿写入失败: {0}")]
    WorkbookError(String),

    #[error("文件保存失败 ({path}): {message}")]
    SaveError { path: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::WorkbookError(err.to_string())
    }
}

/// Result 类型别名
pub type ExportResult<T> = Result<T, ExportError>;
