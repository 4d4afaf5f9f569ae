// ==========================================
// 毛利表生成系统 - 改价回填领域模型
// ==========================================
// 职责: 改价后原始行 / 回填报告
// 说明: 每次回填运行生成新结果，覆盖上一轮结果
// ==========================================

use crate::domain::product::ProductRecord;
use crate::domain::types::{MatchMethod, NewProfitRate};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// UpdatedRecord - 改价后的原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedRecord {
    pub record: ProductRecord,
    pub post_edit_price: Option<f64>,       // 修改后价格
    pub unmatched: bool,                    // 未匹配
    pub match_method: Option<MatchMethod>,  // 命中的匹配方式
    pub matched_key: Option<String>,        // 命中的映射键
    pub source_row: Option<usize>,          // 命中的毛利表行（从 0 开始）
    pub match_error: Option<String>,        // 行级错误（已隔离）
    pub new_profit_rate: NewProfitRate,     // 新毛利率
}

impl UpdatedRecord {
    /// 未匹配行
    pub fn unmatched(record: ProductRecord) -> Self {
        Self {
            record,
            post_edit_price: None,
            unmatched: true,
            match_method: None,
            matched_key: None,
            source_row: None,
            match_error: None,
            new_profit_rate: NewProfitRate::CannotCalculate,
        }
    }

    /// 行级错误（标记未匹配并记录原因）
    pub fn errored(record: ProductRecord, message: String) -> Self {
        Self {
            match_error: Some(message),
            ..Self::unmatched(record)
        }
    }
}

// ==========================================
// ReconcileReport - 回填报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub run_id: String,
    pub reconciled_at: NaiveDateTime, // 回填时间（UTC）
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub errored_count: usize,
    pub duplicate_keys: Vec<String>, // 改价表中被后行覆盖的键
    pub records: Vec<UpdatedRecord>,
}

impl ReconcileReport {
    pub fn unmatched_rows(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.unmatched)
            .map(|(i, _)| i)
            .collect()
    }
}
