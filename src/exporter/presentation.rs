// ==========================================
// 毛利表生成系统 - 导出呈现计划
// ==========================================
// 职责: 计算导出时的呈现提示（纯计算，不写文件）
// 内容: 导出列顺序 / 分组表头 / 配置列合并区间 / 未匹配行 / 行公式
// 说明: 表头占 2 行，数据从 Excel 第 3 行开始
// ==========================================

use crate::domain::columns;
use crate::domain::{ProfitTable, ProfitTableRow, ReconcileReport};

/// 表头行数（分组表头 + 列名）
pub const HEADER_ROWS: usize = 2;

/// 毛利表导出列顺序（相对 ProfitTableRow::values 的下标，简称移至最右）
const PROFIT_EXPORT_ORDER: [usize; 8] = [0, 1, 3, 4, 5, 6, 7, 2];

/// 分组表头（第 1 行跨列合并）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderGroup {
    pub title: &'static str,
    pub first_col: usize,
    pub last_col: usize,
}

/// 数据行合并区间（闭区间，数据行下标从 0 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub first_row: usize,
    pub last_row: usize,
}

/// 单行公式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormulas {
    pub profit: String,
    pub profit_rate: String,
}

// ==========================================
// PresentationPlan - 呈现计划
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationPlan {
    /// 导出列顺序
    pub headers: Vec<String>,
    /// 分组表头；为空时只有单行表头
    pub header_groups: Vec<HeaderGroup>,
    /// 配置列中连续相同标签的合并区间（长度 > 1）
    pub label_merges: Vec<MergeRange>,
    /// 需要高亮的未匹配行
    pub unmatched_rows: Vec<usize>,
    /// 每行的 毛利润/毛利率 公式（与数据行一一对应）
    pub formulas: Vec<RowFormulas>,
}

impl PresentationPlan {
    /// 毛利表呈现计划
    pub fn for_profit_table(table: &ProfitTable) -> Self {
        let source_headers = table.headers();
        let headers: Vec<String> = PROFIT_EXPORT_ORDER
            .iter()
            .map(|&i| source_headers[i].to_string())
            .collect();

        let header_groups = grouped_headers(&headers);

        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        let label_merges = contiguous_runs(&labels);

        let formulas = match formula_columns(&headers) {
            Some(cols) => (0..table.rows.len())
                .map(|i| cols.formulas_for(data_row_number(i)))
                .collect(),
            None => Vec::new(),
        };

        Self {
            headers,
            header_groups,
            label_merges,
            unmatched_rows: Vec::new(),
            formulas,
        }
    }

    /// 改价后原始数据呈现计划
    pub fn for_updated_records(report: &ReconcileReport) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for updated in &report.records {
            for (name, _) in &updated.record.cells {
                if !headers.iter().any(|h| h == name) {
                    headers.push(name.clone());
                }
            }
        }
        headers.push(columns::POST_EDIT_PRICE.to_string());
        headers.push(columns::NEW_PROFIT_RATE.to_string());

        Self {
            headers,
            unmatched_rows: report.unmatched_rows(),
            ..Self::default()
        }
    }

    /// 是否使用两行分组表头
    pub fn has_grouped_header(&self) -> bool {
        !self.header_groups.is_empty()
    }

    /// 表头占用的行数
    pub fn header_rows(&self) -> usize {
        if self.has_grouped_header() {
            HEADER_ROWS
        } else {
            1
        }
    }

    /// 列所在的分组
    pub fn group_of(&self, col: usize) -> Option<&HeaderGroup> {
        self.header_groups
            .iter()
            .find(|g| (g.first_col..=g.last_col).contains(&col))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 标识列下标（按文本写出）
    pub fn identifier_columns(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| columns::is_identifier_column(h))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_unmatched(&self, row: usize) -> bool {
        self.unmatched_rows.binary_search(&row).is_ok()
    }
}

/// 毛利表行按导出列顺序输出
pub fn export_values(row: &ProfitTableRow) -> [&str; 8] {
    let values = row.values();
    PROFIT_EXPORT_ORDER.map(|i| values[i])
}

/// 列下标转 Excel 列字母（0 → A, 25 → Z, 26 → AA）
pub fn column_letter(mut index: usize) -> String {
    let mut name = String::new();
    loop {
        name.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.chars().rev().collect()
}

/// 数据行下标对应的 Excel 行号（从 1 开始）
fn data_row_number(index: usize) -> usize {
    index + HEADER_ROWS + 1
}

/// 费用组（成本..快递）与毛利组（毛利润..毛利率）
fn grouped_headers(headers: &[String]) -> Vec<HeaderGroup> {
    let spans = [
        (columns::FEE_GROUP, columns::COST, columns::HANDLING_FEE),
        (
            columns::PROFIT_GROUP,
            columns::TABLE_PROFIT,
            columns::PROFIT_RATE,
        ),
    ];

    spans
        .iter()
        .filter_map(|&(title, first, last)| {
            let first_col = headers.iter().position(|h| h == first)?;
            let last_col = headers.iter().position(|h| h == last)?;
            (first_col <= last_col).then_some(HeaderGroup {
                title,
                first_col,
                last_col,
            })
        })
        .collect()
}

/// 连续相同且非空的值区间（长度 > 1）
fn contiguous_runs(values: &[&str]) -> Vec<MergeRange> {
    let mut runs = Vec::new();
    let mut start = 0;

    for i in 1..=values.len() {
        if i < values.len() && values[i] == values[start] {
            continue;
        }
        if i - start > 1 && !values[start].is_empty() {
            runs.push(MergeRange {
                first_row: start,
                last_row: i - 1,
            });
        }
        start = i;
    }
    runs
}

struct FormulaColumns {
    price: String,
    cost: String,
    fee: String,
    profit: String,
}

impl FormulaColumns {
    fn formulas_for(&self, row: usize) -> RowFormulas {
        RowFormulas {
            profit: format!(
                "={p}{r}-{c}{r}-{f}{r}",
                p = self.price,
                c = self.cost,
                f = self.fee,
                r = row
            ),
            profit_rate: format!(
                "=IF({p}{r}=0,0,{g}{r}/{p}{r})",
                p = self.price,
                g = self.profit,
                r = row
            ),
        }
    }
}

fn formula_columns(headers: &[String]) -> Option<FormulaColumns> {
    let letter_of = |name: &str| headers.iter().position(|h| h == name).map(column_letter);
    Some(FormulaColumns {
        price: letter_of(columns::PRICE)?,
        cost: letter_of(columns::COST)?,
        fee: letter_of(columns::HANDLING_FEE)?,
        profit: letter_of(columns::TABLE_PROFIT)?,
    })
}
