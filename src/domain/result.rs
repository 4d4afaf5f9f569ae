// ==========================================
// 毛利表生成系统 - 处理结果
// ==========================================
// 职责: 面向调用方的统一结果对象
// 红线: 调用方只拿到 成功标志 + 可读消息 + 数据，不暴露内部错误栈
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub row_count: usize,
}

impl<T> ProcessingResult<T> {
    pub fn ok(message: impl Into<String>, data: T, row_count: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            row_count,
        }
    }

    /// 成功但无数据返回（如导出）
    pub fn done(message: impl Into<String>, row_count: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            row_count,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            row_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_has_no_data() {
        let result: ProcessingResult<Vec<u8>> = ProcessingResult::failed("导入失败");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn test_ok_result() {
        let result = ProcessingResult::ok("完成", vec![1, 2, 3], 3);
        assert!(result.success);
        assert_eq!(result.row_count, 3);
    }
}
