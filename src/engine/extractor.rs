// ==========================================
// 毛利表生成系统 - 简称属性提取引擎
// ==========================================
// 职责: 从商品简称中提取 尺寸 / 速别 / 配置
// 输入: 简称 + 分类
// 输出: ExtractedAttributes（颜色不提取，由源数据透传）
// 红线: 提取为纯函数，永不失败（缺失能力降级为空值/默认值）
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{ExtractedAttributes, ExtractedProduct, ProductRecord};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::reporter::{default_reporter, PipelineReporter, PipelineStage};
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

/// 命中片段（字节区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

// ==========================================
// AttributeExtractor - 简称属性提取引擎
// ==========================================
pub struct AttributeExtractor {
    size_tokens: Vec<String>, // 顺序即优先级
    speed_pattern: Regex,
    default_speed: String,
    reporter: Arc<dyn PipelineReporter>,
}

impl AttributeExtractor {
    /// 按配置构建提取器
    ///
    /// 速别模式: (修饰词|数字|中文数字)速
    pub fn new(config: &PipelineConfig) -> EngineResult<Self> {
        let mut prefixes: Vec<String> = config
            .speed_modifiers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| regex::escape(m))
            .collect();
        prefixes.push(r"\d+".to_string());
        if !config.speed_numerals.is_empty() {
            prefixes.push(format!("[{}]+", regex::escape(&config.speed_numerals)));
        }

        let pattern = format!(
            "(?:{}){}",
            prefixes.join("|"),
            regex::escape(&config.speed_marker)
        );
        let speed_pattern = Regex::new(&pattern)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("速别模式无效: {}", e)))?;

        Ok(Self {
            size_tokens: config.size_tokens.clone(),
            speed_pattern,
            default_speed: config.default_speed.clone(),
            reporter: default_reporter(),
        })
    }

    /// 注入报告器
    pub fn with_reporter(mut self, reporter: Arc<dyn PipelineReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    // ==========================================
    // 单项提取
    // ==========================================

    /// 提取尺寸（按声明顺序，先命中者优先；未命中为空）
    pub fn extract_size(&self, name: &str) -> String {
        self.find_size(name)
            .map(|(token, _)| token.to_string())
            .unwrap_or_default()
    }

    /// 提取速别（全函数，永不为空）
    ///
    /// - 无 速 字 → 单速
    /// - 有 速 字但前缀不合格 → 单速
    pub fn extract_speed(&self, name: &str) -> String {
        self.find_speed(name)
            .map(|span| name[span.start..span.end].to_string())
            .unwrap_or_else(|| self.default_speed.clone())
    }

    /// 提取全部属性
    pub fn extract(&self, name: &str, category: &str) -> ExtractedAttributes {
        if name.trim().is_empty() {
            return ExtractedAttributes {
                size: String::new(),
                speed: self.default_speed.clone(),
                configuration: String::new(),
            };
        }

        let size = self.find_size(name);
        let speed = self.find_speed(name);
        let category_span = name.find(category).map(|start| Span {
            start,
            end: start + category.len(),
        });

        let configuration = match size {
            Some((_, size_span)) => Self::configuration_with_size(name, category_span, size_span, speed),
            None => Self::configuration_without_size(name, category_span, speed),
        };

        ExtractedAttributes {
            size: size.map(|(token, _)| token.to_string()).unwrap_or_default(),
            speed: speed
                .map(|span| name[span.start..span.end].to_string())
                .unwrap_or_else(|| self.default_speed.clone()),
            configuration,
        }
    }

    /// 提取单行
    pub fn extract_record(&self, record: ProductRecord) -> ExtractedProduct {
        let attributes = self.extract(&record.short_name, &record.category);
        ExtractedProduct::new(record, attributes)
    }

    /// 批量提取
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub fn extract_all(&self, records: Vec<ProductRecord>) -> Vec<ExtractedProduct> {
        let extracted: Vec<ExtractedProduct> = records
            .into_iter()
            .map(|record| self.extract_record(record))
            .collect();

        let sized = extracted.iter().filter(|p| !p.size().is_empty()).count();
        let configured = extracted.iter().filter(|p| !p.configuration().is_empty()).count();
        self.reporter.info(
            PipelineStage::Extraction,
            format!(
                "简称解析完成: {} 行，含尺寸 {} 行，含配置 {} 行",
                extracted.len(),
                sized,
                configured
            ),
        );
        extracted
    }

    // ==========================================
    // 定位
    // ==========================================

    fn find_size<'a>(&'a self, name: &str) -> Option<(&'a str, Span)> {
        self.size_tokens
            .iter()
            .filter(|token| !token.is_empty())
            .find_map(|token| {
                name.find(token.as_str()).map(|start| {
                    (
                        token.as_str(),
                        Span {
                            start,
                            end: start + token.len(),
                        },
                    )
                })
            })
    }

    fn find_speed(&self, name: &str) -> Option<Span> {
        self.speed_pattern.find(name).map(|m| Span {
            start: m.start(),
            end: m.end(),
        })
    }

    // ==========================================
    // 配置拼接（按从左到右顺序，片段去空白后非空才拼接）
    // ==========================================

    fn configuration_with_size(
        name: &str,
        category: Option<Span>,
        size: Span,
        speed: Option<Span>,
    ) -> String {
        let mut parts = Vec::new();

        match category {
            Some(cat) => {
                // 分类前
                push_fragment(&mut parts, slice(name, 0, cat.start));
                // 分类后到尺寸前
                push_fragment(&mut parts, slice(name, cat.end, size.start));
            }
            // 尺寸前
            None => push_fragment(&mut parts, slice(name, 0, size.start)),
        }

        // 尺寸后（排除速别）
        if !slice(name, size.end, name.len()).trim().is_empty() {
            match speed {
                Some(sp) if sp.start >= size.end => {
                    push_fragment(&mut parts, slice(name, size.end, sp.start));
                    push_fragment(&mut parts, slice(name, sp.end, name.len()));
                }
                // 速别在尺寸前: 尺寸后整体保留，速别不从配置中剔除
                _ => push_fragment(&mut parts, slice(name, size.end, name.len())),
            }
        }

        parts.concat()
    }

    fn configuration_without_size(name: &str, category: Option<Span>, speed: Option<Span>) -> String {
        let mut parts = Vec::new();

        match (category, speed) {
            (Some(cat), Some(sp)) => {
                push_fragment(&mut parts, slice(name, 0, cat.start));
                if sp.start > cat.end {
                    push_fragment(&mut parts, slice(name, cat.end, sp.start));
                }
                push_fragment(&mut parts, slice(name, sp.end, name.len()));
            }
            (Some(cat), None) => {
                push_fragment(&mut parts, slice(name, 0, cat.start));
                push_fragment(&mut parts, slice(name, cat.end, name.len()));
            }
            (None, Some(sp)) => {
                push_fragment(&mut parts, slice(name, 0, sp.start));
                push_fragment(&mut parts, slice(name, sp.end, name.len()));
            }
            (None, None) => push_fragment(&mut parts, name),
        }

        parts.concat()
    }
}

/// 安全切片: 区间倒置时为空串
fn slice(name: &str, start: usize, end: usize) -> &str {
    if start >= end {
        ""
    } else {
        name.get(start..end).unwrap_or("")
    }
}

fn push_fragment<'a>(parts: &mut Vec<&'a str>, fragment: &'a str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
}
