// ==========================================
// 毛利表生成系统 - 配置层
// ==========================================
// 职责: 流水线配置加载与校验
// 存储: JSON 配置文件（可选）
// ==========================================

pub mod pipeline_config;

// 重导出核心配置
pub use pipeline_config::{default_config_path, ConfigError, PipelineConfig, CONFIG_ENV_VAR};
