// ==========================================
// 毛利表生成系统 - 数据清洗器实现
// ==========================================
// 职责: 删除标识列 / 去除完全重复行
// 说明: 原始行另行保存（改价回填使用未清洗数据）
// ==========================================

use crate::domain::ProductRecord;
use std::collections::HashSet;
use tracing::debug;

pub struct DataCleaner;

impl DataCleaner {
    /// 预处理工作数据集
    ///
    /// - 删除 货品ID / 规格ID 列
    /// - 完全重复的行只保留第一次出现
    pub fn preprocess(&self, records: &[ProductRecord]) -> Vec<ProductRecord> {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(records.len());

        for record in records {
            let key: Vec<(String, String)> = record
                .dedup_key()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();

            if seen.insert(key) {
                cleaned.push(record.without_id_columns());
            }
        }

        let removed = records.len() - cleaned.len();
        if removed > 0 {
            debug!(removed = removed, "删除重复行");
        }

        cleaned
    }
}
