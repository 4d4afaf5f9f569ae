// ==========================================
// 毛利表生成系统 - API层错误类型
// ==========================================
// 职责: 统一导入/引擎/导出/配置错误，转换为用户可读消息
// 红线: 调用方只看到 ProcessingResult 中的消息，不暴露错误栈
// ==========================================

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::exporter::ExportError;
use crate::importer::ImportError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 前置条件 =====
    /// 操作顺序错误（如未导入就生成毛利表）
    #[error("{0}")]
    Precondition(String),

    // ===== 分层错误 =====
    #[error("导入失败: {0}")]
    Import(#[from] ImportError),

    #[error("处理失败: {0}")]
    Engine(#[from] EngineError),

    #[error("导出失败: {0}")]
    Export(#[from] ExportError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
