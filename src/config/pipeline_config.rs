// ==========================================
// 毛利表生成系统 - 流水线配置
// ==========================================
// 职责: 尺寸/速别词表、标记词、费用常量、文件名等配置项
// 来源: 环境变量 PROFIT_TABLE_CONFIG 指定的 JSON 文件
//       → 用户配置目录 profit-table/config.json
//       → 内置默认值
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置文件路径环境变量
pub const CONFIG_ENV_VAR: &str = "PROFIT_TABLE_CONFIG";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件格式错误 ({path}): {message}")]
    ParseError { path: String, message: String },

    #[error("配置值无效 (key: {key}): {message}")]
    InvalidValue { key: String, message: String },
}

// ==========================================
// PipelineConfig - 流水线配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // ===== 尺寸 =====
    /// 可识别的尺寸词（列表顺序即优先级）
    pub size_tokens: Vec<String>,
    /// 尺寸标记字（毛利表"缺少尺寸信息"判定）
    pub size_marker: String,
    /// 默认尺寸（促销款补齐 + 筛选优先尺寸）
    pub default_size: String,

    // ===== 速别 =====
    /// 速别标记字
    pub speed_marker: String,
    /// 可作为速别前缀的数字汉字
    pub speed_numerals: String,
    /// 可作为速别前缀的修饰词（按顺序尝试，长词在前）
    pub speed_modifiers: Vec<String>,
    /// 缺省速别
    pub default_speed: String,

    // ===== 标记词 =====
    /// 分类中的促销标记
    pub promotional_marker: String,
    /// 颜色中的渐变标记
    pub gradient_marker: String,
    /// 缺少尺寸信息占位名
    pub missing_size_label: String,
    /// 未知配置占位名
    pub unknown_configuration_label: String,

    // ===== 费用与改价 =====
    /// 快递费（每件）
    pub handling_fee: f64,
    /// 改价匹配时统一替换为目标尺寸的尺寸词
    pub normalized_sizes: Vec<String>,
    /// 改价匹配的目标尺寸
    pub normalization_target: String,
    /// 需要加价的尺寸
    pub surcharge_size: String,
    /// 加价金额
    pub surcharge_amount: f64,

    // ===== 表格 =====
    /// 单个工作表最大行数
    pub max_rows_per_sheet: usize,
    pub profit_sheet_name: String,
    pub original_sheet_name: String,
    pub updated_sheet_name: String,

    // ===== 文件 =====
    pub input_file: String,
    pub output_file: String,
    pub updated_output_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size_tokens: vec!["24寸".into(), "26寸".into(), "27.5寸".into()],
            size_marker: "寸".into(),
            default_size: "26寸".into(),
            speed_marker: "速".into(),
            speed_numerals: "一二两三四五六七八九十百".into(),
            speed_modifiers: vec![
                "无级变".into(),
                "内变".into(),
                "变".into(),
                "单".into(),
                "多".into(),
            ],
            default_speed: "单速".into(),
            promotional_marker: "促销".into(),
            gradient_marker: "渐变".into(),
            missing_size_label: "缺少尺寸信息".into(),
            unknown_configuration_label: "未知配置".into(),
            handling_fee: 30.0,
            normalized_sizes: vec!["24寸".into(), "27.5寸".into()],
            normalization_target: "26寸".into(),
            surcharge_size: "27.5寸".into(),
            surcharge_amount: 20.0,
            max_rows_per_sheet: 1_000_000,
            profit_sheet_name: "毛利表".into(),
            original_sheet_name: "原始数据".into(),
            updated_sheet_name: "修改后原始数据".into(),
            input_file: "导入数据.xlsx".into(),
            output_file: "毛利表.xlsx".into(),
            updated_output_file: "改价后原始数据.xlsx".into(),
        }
    }
}

impl PipelineConfig {
    /// 加载配置（环境变量 → 用户配置目录 → 默认值）
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                tracing::info!("使用配置文件: {}", path);
                return Self::from_file(path.trim());
            }
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                tracing::info!("使用配置文件: {}", path.display());
                return Self::from_file(&path);
            }
        }

        tracing::debug!("未找到配置文件，使用内置默认配置");
        Ok(Self::default())
    }

    /// 从 JSON 文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// 从 JSON 字符串加载（缺省字段取默认值）
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置（在流水线入口执行一次）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_tokens.iter().all(|t| t.trim().is_empty()) {
            return Err(invalid("size_tokens", "尺寸词表不能为空"));
        }
        let required = [
            ("size_marker", &self.size_marker),
            ("speed_marker", &self.speed_marker),
            ("default_speed", &self.default_speed),
            ("default_size", &self.default_size),
            ("normalization_target", &self.normalization_target),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(key, "不能为空"));
            }
        }
        if !self.handling_fee.is_finite() || self.handling_fee < 0.0 {
            return Err(invalid("handling_fee", "快递费必须为非负数"));
        }
        if !self.surcharge_amount.is_finite() {
            return Err(invalid("surcharge_amount", "加价金额必须为有限数值"));
        }
        if self.max_rows_per_sheet == 0 {
            return Err(invalid("max_rows_per_sheet", "必须大于 0"));
        }
        Ok(())
    }

    /// 快递费的展示值（两位小数）
    pub fn handling_fee_display(&self) -> String {
        format!("{:.2}", self.handling_fee)
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// 默认配置文件路径: <config_dir>/profit-table/config.json
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("profit-table").join("config.json"))
}
