// ==========================================
// 毛利表生成系统 - 字段映射器实现
// ==========================================
// 职责: 原始行 → ProductRecord / EditedPriceRow
// 说明: 可选列显式映射，空白单元格统一视为缺失
// ==========================================

use crate::domain::columns;
use crate::domain::{EditedPriceRow, ProductRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{FieldMapper as FieldMapperTrait, RawTable};
use std::collections::HashMap;

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_products(&self, table: &RawTable) -> ImportResult<Vec<ProductRecord>> {
        self.require_columns(table, &[columns::SHORT_NAME])?;

        Ok(table
            .records
            .iter()
            .enumerate()
            .map(|(idx, row)| self.map_product(&table.headers, row, idx + 1))
            .collect())
    }

    fn map_edited_rows(&self, table: &RawTable) -> ImportResult<Vec<EditedPriceRow>> {
        self.require_columns(table, &[columns::SHORT_NAME, columns::PRICE])?;

        Ok(table
            .records
            .iter()
            .enumerate()
            .map(|(row_index, row)| EditedPriceRow {
                row_index,
                name: self.get_text(row, columns::SHORT_NAME),
                speed: self.get_text(row, columns::SPEED),
                price: self.get_string(row, columns::PRICE),
            })
            .collect())
    }
}

impl FieldMapper {
    /// 单行映射
    fn map_product(
        &self,
        headers: &[String],
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ProductRecord {
        ProductRecord {
            row_number,

            short_name: self.get_text(row, columns::SHORT_NAME),
            category: self.get_text(row, columns::CATEGORY),

            price: self.get_string(row, columns::PRICE),
            cost: self.get_string(row, columns::COST),
            profit: self.get_string(row, columns::PROFIT),
            profit_rate: self.get_string(row, columns::PROFIT_RATE),

            size: self.get_string(row, columns::SIZE),
            speed: self.get_string(row, columns::SPEED),
            color: self.get_string(row, columns::COLOR),

            cells: headers
                .iter()
                .map(|h| (h.clone(), row.get(h).cloned().unwrap_or_default()))
                .collect(),
        }
    }

    fn require_columns(&self, table: &RawTable, required: &[&str]) -> ImportResult<()> {
        match required.iter().find(|c| !table.has_column(c)) {
            Some(missing) => Err(ImportError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// 提取字符串字段（空白视为 None）
    fn get_string(&self, row: &HashMap<String, String>, key: &str) -> Option<String> {
        row.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// 提取文本字段（缺失为空串）
    fn get_text(&self, row: &HashMap<String, String>, key: &str) -> String {
        self.get_string(row, key).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut grid = vec![headers.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        grid.extend(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        );
        RawTable::from_grid(grid)
    }

    #[test]
    fn test_map_products_basic() {
        let table = table(
            &["货品ID", "简称", "分类", "价格", "成本"],
            &[&["1001", "山地车26寸21速", "山地车", "199", "120"]],
        );

        let records = FieldMapper.map_products(&table).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.row_number, 1);
        assert_eq!(record.short_name, "山地车26寸21速");
        assert_eq!(record.category, "山地车");
        assert_eq!(record.price.as_deref(), Some("199"));
        assert_eq!(record.profit, None);
        assert_eq!(record.cell("货品ID"), Some("1001"));
        assert_eq!(record.cells[0].0, "货品ID");
    }

    #[test]
    fn test_map_products_empty_as_none() {
        let table = table(&["简称", "颜色", "成本"], &[&["公路车", "  ", ""]]);
        let records = FieldMapper.map_products(&table).unwrap();
        assert_eq!(records[0].color, None);
        assert_eq!(records[0].cost, None);
    }

    #[test]
    fn test_map_products_missing_name_column() {
        let table = table(&["分类", "价格"], &[&["山地车", "1"]]);
        let result = FieldMapper.map_products(&table);
        assert!(matches!(result, Err(ImportError::MissingColumn(c)) if c == "简称"));
    }

    #[test]
    fn test_map_edited_rows() {
        let table = table(
            &["配置", "速别", "简称", "价格"],
            &[
                &["经典", "21速", "山地车经典26寸21速", "210"],
                &["经典", "", "山地车经典24寸", ""],
            ],
        );

        let rows = FieldMapper.map_edited_rows(&table).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 0);
        assert_eq!(rows[0].speed, "21速");
        assert_eq!(rows[0].price.as_deref(), Some("210"));
        assert_eq!(rows[1].speed, "");
        assert_eq!(rows[1].price, None);
    }

    #[test]
    fn test_map_edited_rows_requires_price() {
        let table = table(&["简称"], &[&["A"]]);
        let result = FieldMapper.map_edited_rows(&table);
        assert!(matches!(result, Err(ImportError::MissingColumn(c)) if c == "价格"));
    }
}
