// ==========================================
// 毛利表生成系统 - 导入 Trait
// ==========================================
// 职责: 定义文件解析 / 字段映射接口（不包含实现）
// ==========================================

use crate::domain::columns;
use crate::domain::{EditedPriceRow, ProductRecord};
use crate::importer::error::ImportResult;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// RawTable - 原始表格
// ==========================================
// 约定:
// - headers 保持源文件列顺序
// - records 为 列名 → 值 映射，值已 TRIM
// - 标识列（列名含 ID）保持字面文本，不做数值化
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<HashMap<String, String>>,
}

impl RawTable {
    /// 从网格构建（自动识别表头行）
    ///
    /// 导出的毛利表在真实表头上方有一行分组表头（费用/毛利），
    /// 此时前两行合并为表头: 第二行非空取第二行，否则取第一行。
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let headers = Self::combined_headers(&grid);
        let header_rows = Self::header_rows(&grid);

        let mut records = Vec::new();
        for row in grid.into_iter().skip(header_rows) {
            let mut row_map = HashMap::new();
            for (col_idx, value) in row.into_iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Self {
            headers: headers.into_iter().filter(|h| !h.is_empty()).collect(),
            records,
        }
    }

    /// 表头占用的行数（1 或 2）
    ///
    /// 两行表头: 首行含分组标题 费用 且第二行含 成本，或首行不含 简称 而第二行含 简称
    pub fn header_rows(grid: &[Vec<String>]) -> usize {
        let contains = |row: &Vec<String>, name: &str| row.iter().any(|c| clean_header(c) == name);
        match (grid.first(), grid.get(1)) {
            (Some(first), Some(second))
                if contains(first, columns::FEE_GROUP) && contains(second, columns::COST) =>
            {
                2
            }
            (Some(first), Some(second))
                if !contains(first, columns::SHORT_NAME) && contains(second, columns::SHORT_NAME) =>
            {
                2
            }
            _ => 1,
        }
    }

    /// 合并后的表头（列顺序与源文件一致，空列名保留为空串）
    pub fn combined_headers(grid: &[Vec<String>]) -> Vec<String> {
        let first: Vec<String> = grid
            .first()
            .map(|row| row.iter().map(|h| clean_header(h)).collect())
            .unwrap_or_default();
        if Self::header_rows(grid) < 2 {
            return first;
        }

        let second: Vec<String> = grid
            .get(1)
            .map(|row| row.iter().map(|h| clean_header(h)).collect())
            .unwrap_or_default();
        (0..first.len().max(second.len()))
            .map(|i| match second.get(i) {
                Some(h) if !h.is_empty() => h.clone(),
                _ => first.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 去除 BOM 与首尾空白
fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表格
    ///
    /// # 返回
    /// - Ok(RawTable): 表头 + 行记录
    /// - Err: 文件不存在、格式错误、读取失败
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将原始表格映射为商品行
    ///
    /// # 错误
    /// - 表头缺少 简称 列 → MissingColumn
    fn map_products(&self, table: &RawTable) -> ImportResult<Vec<ProductRecord>>;

    /// 将人工改价后的毛利表映射为改价行
    ///
    /// # 错误
    /// - 表头缺少 简称 或 价格 列 → MissingColumn
    fn map_edited_rows(&self, table: &RawTable) -> ImportResult<Vec<EditedPriceRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_from_grid_first_row_header() {
        let table = RawTable::from_grid(grid(&[
            &["简称", "价格"],
            &["山地车26寸21速", " 199 "],
        ]));
        assert_eq!(table.headers, vec!["简称", "价格"]);
        assert_eq!(table.records[0].get("价格"), Some(&"199".to_string()));
    }

    #[test]
    fn test_from_grid_detects_full_second_header() {
        let table = RawTable::from_grid(grid(&[
            &["", "", "", "费用", "", "毛利", "", ""],
            &["配置", "速别", "价格", "成本", "快递", "毛利润", "毛利率", "简称"],
            &["经典", "21速", "220.00", "130.00", "30.00", "60", "0.27", "山地车26寸21速"],
        ]));
        assert!(table.has_column("简称"));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.records[0].get("简称"),
            Some(&"山地车26寸21速".to_string())
        );
    }

    #[test]
    fn test_from_grid_merges_grouped_header() {
        // 合并单元格读回后，纵向合并列只有首行有值
        let table = RawTable::from_grid(grid(&[
            &["配置", "速别", "价格", "费用", "", "毛利", "", "简称"],
            &["", "", "", "成本", "快递", "毛利润", "毛利率", ""],
            &["经典", "21速", "220", "130", "30", "60", "0.27", "山地车26寸21速"],
        ]));
        assert_eq!(
            table.headers,
            vec!["配置", "速别", "价格", "成本", "快递", "毛利润", "毛利率", "简称"]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].get("价格"), Some(&"220".to_string()));
        assert_eq!(table.records[0].get("成本"), Some(&"130".to_string()));
    }

    #[test]
    fn test_header_rows() {
        assert_eq!(RawTable::header_rows(&grid(&[&["简称"], &["A"]])), 1);
        assert_eq!(RawTable::header_rows(&grid(&[&["简称"]])), 1);
        assert_eq!(RawTable::header_rows(&grid(&[&["费用", "简称"], &["成本", ""]])), 2);
    }

    #[test]
    fn test_from_grid_skips_blank_rows() {
        let table = RawTable::from_grid(grid(&[&["简称", "价格"], &["", " "], &["A", "1"]]));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_grid_empty() {
        let table = RawTable::from_grid(Vec::new());
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }
}
