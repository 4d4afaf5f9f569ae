// ==========================================
// 毛利表生成系统 - 引擎层错误类型
// ==========================================
// 分级:
// - Filtering: 筛选阶段降级（返回未筛选数据，不中断）
// - TableGeneration: 毛利表生成失败（致命，向上传播）
// - RowMatch: 单行匹配失败（行内收敛，标记未匹配）
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("变体筛选失败: {0}")]
    Filtering(String),

    #[error("毛利表生成失败: {0}")]
    TableGeneration(String),

    #[error("第 {row} 行价格匹配失败: {message}")]
    RowMatch { row: usize, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::TableGeneration("行数超出上限".to_string());
        assert_eq!(err.to_string(), "毛利表生成失败: 行数超出上限");

        let err = EngineError::RowMatch {
            row: 3,
            message: "价格无效".to_string(),
        };
        assert_eq!(err.to_string(), "第 3 行价格匹配失败: 价格无效");
    }
}
