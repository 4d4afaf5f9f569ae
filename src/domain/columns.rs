// ==========================================
// 毛利表生成系统 - 列名常量
// ==========================================
// 职责: 源数据 / 毛利表 / 改价结果的列名定义
// 说明: 列名与业务表格保持一致（中文表头）
// ==========================================

// ===== 源数据列 =====
pub const SHORT_NAME: &str = "简称";
pub const CATEGORY: &str = "分类";
pub const PRICE: &str = "价格";
pub const COST: &str = "成本";
pub const PROFIT: &str = "毛利";
pub const PROFIT_RATE: &str = "毛利率";
pub const SIZE: &str = "尺寸";
pub const SPEED: &str = "速别";
pub const COLOR: &str = "颜色";

/// 预处理阶段从工作数据集中删除的标识列（原始数据保留）
pub const DROPPED_ID_COLUMNS: &[&str] = &["货品ID", "规格ID"];

// ===== 毛利表列 =====
pub const LABEL: &str = "配置";
pub const HANDLING_FEE: &str = "快递";
pub const TABLE_PROFIT: &str = "毛利润";

// ===== 毛利表分组表头 =====
pub const FEE_GROUP: &str = "费用";
pub const PROFIT_GROUP: &str = "毛利";

// ===== 改价结果列 =====
pub const POST_EDIT_PRICE: &str = "修改后价格";
pub const NEW_PROFIT_RATE: &str = "新毛利率";
pub const UNMATCHED: &str = "未匹配";

/// 判断列名是否为标识列（列名包含 ID/id）
///
/// 标识列按原样保留为文本，避免数值化造成精度丢失
pub fn is_identifier_column(name: &str) -> bool {
    name.contains("ID") || name.contains("id")
}
