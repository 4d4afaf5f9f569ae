// ==========================================
// 毛利表生成系统 - 商品领域模型
// ==========================================
// 职责: 原始商品行 / 提取属性 / 改价表行
// 红线: 简称为唯一事实来源，提取后不可修改
// ==========================================

use crate::domain::columns;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductRecord - 原始商品行
// ==========================================
// 用途: 导入层写入，引擎层只读
// 说明: 可选列显式建模，缺失即 None（不再按列名临时探测）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProductRecord {
    pub row_number: usize, // 源表行号（从 1 开始，不含表头）

    // ===== 必填字段 =====
    pub short_name: String, // 简称
    pub category: String,   // 分类

    // ===== 数值字段（原样保存的字符串）=====
    pub price: Option<String>,       // 价格
    pub cost: Option<String>,        // 成本
    pub profit: Option<String>,      // 毛利
    pub profit_rate: Option<String>, // 毛利率

    // ===== 可选属性列 =====
    pub size: Option<String>,  // 尺寸（已存储时优先于提取结果）
    pub speed: Option<String>, // 速别（已存储时优先于提取结果）
    pub color: Option<String>, // 颜色（仅透传，不从简称提取）

    // ===== 原始单元格（按表头顺序，含标识列）=====
    pub cells: Vec<(String, String)>,
}

impl ProductRecord {
    /// 按列名读取原始单元格
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// 颜色（缺失时为空串）
    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or("")
    }

    /// 去重键: 去掉标识列后的全部单元格
    pub fn dedup_key(&self) -> Vec<(&str, &str)> {
        self.cells
            .iter()
            .filter(|(name, _)| !columns::DROPPED_ID_COLUMNS.iter().any(|id| name.contains(id)))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }

    /// 删除 货品ID / 规格ID 列后的副本
    pub fn without_id_columns(&self) -> ProductRecord {
        let mut record = self.clone();
        record
            .cells
            .retain(|(name, _)| !columns::DROPPED_ID_COLUMNS.iter().any(|id| name.contains(id)));
        record
    }
}

// ==========================================
// ExtractedAttributes - 简称提取结果
// ==========================================
// 不变量:
// - speed 永不为空（缺省为 单速）
// - configuration 不包含命中的尺寸/速别子串
// - 分类为简称子串时，configuration 不包含分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtractedAttributes {
    pub size: String,          // 尺寸（未命中为空）
    pub speed: String,         // 速别
    pub configuration: String, // 配置（剩余描述文字）
}

// ==========================================
// ExtractedProduct - 带提取属性的商品行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub record: ProductRecord,
    pub attributes: ExtractedAttributes,
}

impl ExtractedProduct {
    pub fn new(record: ProductRecord, attributes: ExtractedAttributes) -> Self {
        Self { record, attributes }
    }

    pub fn short_name(&self) -> &str {
        &self.record.short_name
    }

    pub fn configuration(&self) -> &str {
        &self.attributes.configuration
    }

    pub fn size(&self) -> &str {
        &self.attributes.size
    }

    pub fn speed(&self) -> &str {
        &self.attributes.speed
    }

    pub fn color(&self) -> &str {
        self.record.color()
    }

    /// 配置+颜色 分组键
    pub fn variant_key(&self) -> (&str, &str) {
        (self.configuration(), self.color())
    }

    /// 替换尺寸后的新行（原行不变）
    pub fn with_size(&self, size: &str) -> ExtractedProduct {
        let mut product = self.clone();
        product.attributes.size = size.to_string();
        product
    }
}

// ==========================================
// EditedPriceRow - 人工改价后的毛利表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedPriceRow {
    pub row_index: usize,      // 毛利表数据行序号（从 0 开始）
    pub name: String,          // 简称
    pub speed: String,         // 速别（尺寸格式的毛利表无此列，为空）
    pub price: Option<String>, // 价格（原样字符串）
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_cells(cells: &[(&str, &str)]) -> ProductRecord {
        ProductRecord {
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cell_lookup() {
        let record = record_with_cells(&[("货品ID", "100200300400500"), ("简称", "山地车26寸")]);
        assert_eq!(record.cell("货品ID"), Some("100200300400500"));
        assert_eq!(record.cell("不存在"), None);
    }

    #[test]
    fn test_dedup_key_ignores_id_columns() {
        let a = record_with_cells(&[("货品ID", "1"), ("简称", "山地车26寸")]);
        let b = record_with_cells(&[("货品ID", "2"), ("简称", "山地车26寸")]);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_without_id_columns() {
        let record = record_with_cells(&[("货品ID", "1"), ("规格ID", "2"), ("简称", "x")]);
        let stripped = record.without_id_columns();
        assert_eq!(stripped.cells.len(), 1);
        assert_eq!(stripped.cells[0].0, "简称");
    }

    #[test]
    fn test_with_size_keeps_original() {
        let product = ExtractedProduct::new(ProductRecord::default(), ExtractedAttributes::default());
        let resized = product.with_size("26寸");
        assert_eq!(resized.size(), "26寸");
        assert_eq!(product.size(), "");
    }
}
