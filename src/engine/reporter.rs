// ==========================================
// 毛利表生成系统 - 流水线报告器
// ==========================================
// 职责: 定义流水线日志/诊断报告 trait，由入口注入
// 说明: 引擎组件不直接依赖全局日志，默认实现转发到 tracing
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 报告事件
// ==========================================

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Extraction,
    Filtering,
    FormatAnalysis,
    TableBuilding,
    PriceMatching,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Extraction => "Extraction",
            PipelineStage::Filtering => "Filtering",
            PipelineStage::FormatAnalysis => "FormatAnalysis",
            PipelineStage::TableBuilding => "TableBuilding",
            PipelineStage::PriceMatching => "PriceMatching",
        }
    }
}

/// 报告级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// 报告事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub stage: PipelineStage,
    pub level: ReportLevel,
    pub message: String,
}

// ==========================================
// 报告器 Trait
// ==========================================

/// 流水线报告器
///
/// # 实现说明
/// - `TracingReporter`: 默认实现，转发到 tracing
/// - `NoOpReporter`: 丢弃全部事件
/// - `MemoryReporter`: 内存收集（诊断/测试）
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent);

    fn debug(&self, stage: PipelineStage, message: String) {
        self.report(PipelineEvent {
            stage,
            level: ReportLevel::Debug,
            message,
        });
    }

    fn info(&self, stage: PipelineStage, message: String) {
        self.report(PipelineEvent {
            stage,
            level: ReportLevel::Info,
            message,
        });
    }

    fn warn(&self, stage: PipelineStage, message: String) {
        self.report(PipelineEvent {
            stage,
            level: ReportLevel::Warn,
            message,
        });
    }

    fn error(&self, stage: PipelineStage, message: String) {
        self.report(PipelineEvent {
            stage,
            level: ReportLevel::Error,
            message,
        });
    }
}

/// 默认报告器（tracing）
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent) {
        let stage = event.stage.as_str();
        match event.level {
            ReportLevel::Debug => tracing::debug!(stage, "{}", event.message),
            ReportLevel::Info => tracing::info!(stage, "{}", event.message),
            ReportLevel::Warn => tracing::warn!(stage, "{}", event.message),
            ReportLevel::Error => tracing::error!(stage, "{}", event.message),
        }
    }
}

/// 空操作报告器
#[derive(Debug, Clone, Default)]
pub struct NoOpReporter;

impl PipelineReporter for NoOpReporter {
    fn report(&self, _event: PipelineEvent) {}
}

/// 内存报告器
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集事件的快照
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 指定级别的事件数
    pub fn count(&self, level: ReportLevel) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }
}

impl PipelineReporter for MemoryReporter {
    fn report(&self, event: PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// 默认报告器实例
pub fn default_reporter() -> Arc<dyn PipelineReporter> {
    Arc::new(TracingReporter)
}
