// ==========================================
// 毛利表生成系统 - Excel 导出器
// ==========================================
// 职责: 将毛利表 / 改价后原始数据写出为 xlsx
// 工具: rust_xlsxwriter
// 说明: 呈现提示来自 PresentationPlan，本模块只负责落盘与样式
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::columns;
use crate::domain::{ProductRecord, ProfitTable, ReconcileReport};
use crate::engine::numeric::parse_number;
use crate::exporter::error::{ExportError, ExportResult};
use crate::exporter::presentation::{export_values, PresentationPlan};
use rust_xlsxwriter::{
    Color, ColNum, Format, FormatAlign, FormatBorder, RowNum, Workbook, Worksheet,
};
use std::path::Path;
use tracing::{info, instrument};

// ===== 样式常量 =====
const HEADER_FONT: &str = "微软雅黑";
const PROFIT_RATE_FILL: u32 = 0xFFD700;
const UNMATCHED_FILL: u32 = 0xFFC7CE;
const MATCHED_FILL: u32 = 0xE6F3FF;
const NEW_RATE_FILL: u32 = 0xF0F8FF;
const PERCENT_FORMAT: &str = "0.00%";
const TEXT_FORMAT: &str = "@";

// ===== 列宽 =====
const LABEL_WIDTH: f64 = 25.0;
const SHORT_NAME_WIDTH: f64 = 45.0;
const UPDATED_SHORT_NAME_WIDTH: f64 = 35.0;
const IDENTIFIER_WIDTH: f64 = 25.0;
const CATEGORY_WIDTH: f64 = 18.0;
const DEFAULT_WIDTH: f64 = 15.0;

// ==========================================
// ExcelExporter
// ==========================================
pub struct ExcelExporter {
    profit_sheet_name: String,
    original_sheet_name: String,
    updated_sheet_name: String,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ExcelExporter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            profit_sheet_name: config.profit_sheet_name.clone(),
            original_sheet_name: config.original_sheet_name.clone(),
            updated_sheet_name: config.updated_sheet_name.clone(),
        }
    }

    /// 导出毛利表
    ///
    /// # 参数
    /// - originals: 提供时追加一张原始数据工作表
    ///
    /// # 返回
    /// 写出的毛利表行数
    #[instrument(skip(self, path, table, originals), fields(file = %path.as_ref().display(), rows = table.len()))]
    pub fn export_profit_table<P: AsRef<Path>>(
        &self,
        path: P,
        table: &ProfitTable,
        originals: Option<&[ProductRecord]>,
    ) -> ExportResult<usize> {
        let mut workbook = self.profit_table_workbook(table, originals)?;
        save(&mut workbook, path.as_ref())?;

        info!(rows = table.len(), "毛利表导出完成");
        Ok(table.len())
    }

    /// 导出改价后的原始数据
    ///
    /// # 返回
    /// 写出的数据行数
    #[instrument(skip(self, path, report), fields(file = %path.as_ref().display(), run_id = %report.run_id))]
    pub fn export_updated_data<P: AsRef<Path>>(
        &self,
        path: P,
        report: &ReconcileReport,
    ) -> ExportResult<usize> {
        let mut workbook = self.updated_data_workbook(report)?;
        save(&mut workbook, path.as_ref())?;

        info!(
            rows = report.records.len(),
            unmatched = report.unmatched_count,
            "改价后原始数据导出完成"
        );
        Ok(report.records.len())
    }

    /// 构建毛利表工作簿（不落盘）
    pub fn profit_table_workbook(
        &self,
        table: &ProfitTable,
        originals: Option<&[ProductRecord]>,
    ) -> ExportResult<Workbook> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.profit_sheet(table)?);

        if let Some(records) = originals {
            workbook.push_worksheet(self.original_sheet(records)?);
        }
        Ok(workbook)
    }

    /// 构建改价后原始数据工作簿（不落盘）
    pub fn updated_data_workbook(&self, report: &ReconcileReport) -> ExportResult<Workbook> {
        if report.records.is_empty() {
            return Err(ExportError::NothingToExport(self.updated_sheet_name.clone()));
        }

        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.updated_sheet(report)?);
        Ok(workbook)
    }

    // ==========================================
    // 毛利表工作表
    // ==========================================

    fn profit_sheet(&self, table: &ProfitTable) -> ExportResult<Worksheet> {
        let plan = PresentationPlan::for_profit_table(table);
        let mut sheet = Worksheet::new();
        sheet.set_name(&self.profit_sheet_name)?;

        self.write_grouped_header(&mut sheet, &plan)?;

        let header_rows = plan.header_rows();
        let label_col = plan.column_index(columns::LABEL);
        let profit_col = plan.column_index(columns::TABLE_PROFIT);
        let rate_col = plan.column_index(columns::PROFIT_RATE);

        let cell_format = Format::new().set_border(FormatBorder::Thin);
        let label_format = cell_format
            .clone()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let rate_format = cell_format
            .clone()
            .set_num_format(PERCENT_FORMAT)
            .set_background_color(Color::RGB(PROFIT_RATE_FILL));

        for (i, row) in table.rows.iter().enumerate() {
            let r = row_num(header_rows + i)?;
            let formulas = plan.formulas.get(i);

            for (col, value) in export_values(row).iter().enumerate() {
                let c = col_num(col)?;

                if Some(col) == label_col {
                    sheet.write_string_with_format(r, c, *value, &label_format)?;
                } else if let (Some(f), true) = (formulas, Some(col) == profit_col) {
                    sheet.write_formula_with_format(r, c, f.profit.as_str(), &cell_format)?;
                } else if let (Some(f), true) = (formulas, Some(col) == rate_col) {
                    sheet.write_formula_with_format(r, c, f.profit_rate.as_str(), &rate_format)?;
                } else {
                    write_value(&mut sheet, r, c, value, &cell_format)?;
                }
            }
        }

        // 配置列连续相同标签合并
        if let Some(col) = label_col {
            let c = col_num(col)?;
            for merge in &plan.label_merges {
                let label = &table.rows[merge.first_row].label;
                sheet.merge_range(
                    row_num(header_rows + merge.first_row)?,
                    c,
                    row_num(header_rows + merge.last_row)?,
                    c,
                    label,
                    &label_format,
                )?;
            }
        }

        for (col, header) in plan.headers.iter().enumerate() {
            let width = if header == columns::LABEL {
                LABEL_WIDTH
            } else if header == columns::SHORT_NAME {
                SHORT_NAME_WIDTH
            } else {
                DEFAULT_WIDTH
            };
            sheet.set_column_width(col_num(col)?, width)?;
        }

        Ok(sheet)
    }

    /// 两行表头: 分组标题横向合并，其余列纵向合并
    fn write_grouped_header(&self, sheet: &mut Worksheet, plan: &PresentationPlan) -> ExportResult<()> {
        let header_format = header_format();
        let rate_header_format = header_format
            .clone()
            .set_background_color(Color::RGB(PROFIT_RATE_FILL));

        for group in &plan.header_groups {
            sheet.merge_range(
                0,
                col_num(group.first_col)?,
                0,
                col_num(group.last_col)?,
                group.title,
                &header_format,
            )?;
        }

        for (col, header) in plan.headers.iter().enumerate() {
            let c = col_num(col)?;
            let format = if header == columns::PROFIT_RATE {
                &rate_header_format
            } else {
                &header_format
            };

            if plan.group_of(col).is_some() {
                sheet.write_string_with_format(1, c, header, format)?;
            } else {
                sheet.merge_range(0, c, 1, c, header, format)?;
            }
        }
        Ok(())
    }

    // ==========================================
    // 原始数据工作表
    // ==========================================

    fn original_sheet(&self, records: &[ProductRecord]) -> ExportResult<Worksheet> {
        let headers = record_headers(records.iter());
        let mut sheet = Worksheet::new();
        sheet.set_name(&self.original_sheet_name)?;

        let header_format = header_format();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col_num(col)?, header, &header_format)?;
        }

        let cell_format = Format::new();
        let text_format = Format::new().set_num_format(TEXT_FORMAT);
        for (i, record) in records.iter().enumerate() {
            let r = row_num(i + 1)?;
            for (col, header) in headers.iter().enumerate() {
                let value = record.cell(header).unwrap_or("");
                let c = col_num(col)?;
                if columns::is_identifier_column(header) {
                    sheet.write_string_with_format(r, c, value, &text_format)?;
                } else {
                    write_value(&mut sheet, r, c, value, &cell_format)?;
                }
            }
        }

        for (col, header) in headers.iter().enumerate() {
            sheet.set_column_width(col_num(col)?, updated_column_width(header))?;
        }
        Ok(sheet)
    }

    // ==========================================
    // 改价后原始数据工作表
    // ==========================================

    fn updated_sheet(&self, report: &ReconcileReport) -> ExportResult<Worksheet> {
        let plan = PresentationPlan::for_updated_records(report);
        let mut sheet = Worksheet::new();
        sheet.set_name(&self.updated_sheet_name)?;

        let header_format = header_format();
        for (col, header) in plan.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col_num(col)?, header, &header_format)?;
        }

        let identifier_cols = plan.identifier_columns();
        let price_col = plan
            .column_index(columns::POST_EDIT_PRICE)
            .ok_or_else(|| ExportError::WorkbookError(format!("缺少列: {}", columns::POST_EDIT_PRICE)))?;
        let rate_col = plan
            .column_index(columns::NEW_PROFIT_RATE)
            .ok_or_else(|| ExportError::WorkbookError(format!("缺少列: {}", columns::NEW_PROFIT_RATE)))?;

        let cell_format = Format::new().set_border(FormatBorder::Thin);
        let text_format = cell_format.clone().set_num_format(TEXT_FORMAT);
        let matched_format = cell_format
            .clone()
            .set_background_color(Color::RGB(MATCHED_FILL));
        let unmatched_format = cell_format
            .clone()
            .set_background_color(Color::RGB(UNMATCHED_FILL));
        let new_rate_format = cell_format
            .clone()
            .set_background_color(Color::RGB(NEW_RATE_FILL));

        for (i, updated) in report.records.iter().enumerate() {
            let r = row_num(i + 1)?;

            for (col, header) in plan.headers[..price_col].iter().enumerate() {
                let value = updated.record.cell(header).unwrap_or("");
                let c = col_num(col)?;
                if identifier_cols.contains(&col) {
                    sheet.write_string_with_format(r, c, value, &text_format)?;
                } else {
                    write_value(&mut sheet, r, c, value, &cell_format)?;
                }
            }

            let price_format = if plan.is_unmatched(i) {
                &unmatched_format
            } else {
                &matched_format
            };
            match updated.post_edit_price {
                Some(price) => sheet.write_number_with_format(r, col_num(price_col)?, price, price_format)?,
                None => sheet.write_blank(r, col_num(price_col)?, price_format)?,
            };

            let rate_text = updated.new_profit_rate.to_string();
            sheet.write_string_with_format(r, col_num(rate_col)?, &rate_text, &new_rate_format)?;
        }

        for (col, header) in plan.headers.iter().enumerate() {
            sheet.set_column_width(col_num(col)?, updated_column_width(header))?;
        }
        Ok(sheet)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_name(HEADER_FONT)
        .set_font_size(12)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

/// 数值按数字写出（公式可引用），其余按文本写出
fn write_value(
    sheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: &str,
    format: &Format,
) -> ExportResult<()> {
    match parse_number(value) {
        Some(number) => sheet.write_number_with_format(row, col, number, format)?,
        None => sheet.write_string_with_format(row, col, value, format)?,
    };
    Ok(())
}

fn updated_column_width(header: &str) -> f64 {
    if columns::is_identifier_column(header) {
        IDENTIFIER_WIDTH
    } else if header == columns::CATEGORY {
        CATEGORY_WIDTH
    } else if header == columns::SHORT_NAME {
        UPDATED_SHORT_NAME_WIDTH
    } else {
        DEFAULT_WIDTH
    }
}

/// 多条记录的列名并集（按首次出现顺序）
fn record_headers<'a>(records: impl Iterator<Item = &'a ProductRecord>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        for (name, _) in &record.cells {
            if !headers.iter().any(|h| h == name) {
                headers.push(name.clone());
            }
        }
    }
    headers
}

fn row_num(index: usize) -> ExportResult<RowNum> {
    RowNum::try_from(index).map_err(|_| ExportError::WorkbookError(format!("行号超出范围: {}", index)))
}

fn col_num(index: usize) -> ExportResult<ColNum> {
    ColNum::try_from(index).map_err(|_| ExportError::WorkbookError(format!("列号超出范围: {}", index)))
}

fn save(workbook: &mut Workbook, path: &Path) -> ExportResult<()> {
    workbook.save(path).map_err(|e| ExportError::SaveError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
