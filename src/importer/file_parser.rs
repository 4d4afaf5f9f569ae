// ==========================================
// 毛利表生成系统 - 文件解析器实现
// ==========================================
// 职责: 读取首个工作表 / CSV 为 RawTable
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::columns;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{FileParser, RawTable};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !ext.is_empty() && ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头行由 RawTable 识别
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(|v| v.to_string()).collect());
        }

        if grid.is_empty() {
            return Err(ImportError::EmptySheet(file_path.display().to_string()));
        }

        Ok(RawTable::from_grid(grid))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        let cells: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();

        if cells.is_empty() {
            return Err(ImportError::EmptySheet(sheet_name));
        }

        Ok(RawTable::from_grid(render_grid(&cells)))
    }
}

/// 单元格转文本
///
/// 标识列中的整数浮点按整数输出（避免 1.0e14 之类的科学计数/小数尾巴）
fn render_cell(cell: &Data, identifier: bool) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if identifier && f.fract() == 0.0 => format!("{:.0}", f),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 渲染整个网格；表头之后的行按列名判断是否为标识列
fn render_grid(cells: &[Vec<Data>]) -> Vec<Vec<String>> {
    let plain: Vec<Vec<String>> = cells
        .iter()
        .map(|row| row.iter().map(|c| render_cell(c, false)).collect())
        .collect();

    let header_rows = RawTable::header_rows(&plain);
    let identifier_cols: Vec<bool> = RawTable::combined_headers(&plain)
        .iter()
        .map(|h| columns::is_identifier_column(h))
        .collect();

    cells
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            row.iter()
                .enumerate()
                .map(|(col_idx, cell)| {
                    let identifier = row_idx >= header_rows
                        && identifier_cols.get(col_idx).copied().unwrap_or(false);
                    render_cell(cell, identifier)
                })
                .collect()
        })
        .collect()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        self.parse_to_raw_table(file_path.as_ref())
    }
}

impl FileParser for UniversalFileParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_raw_table(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_table(file_path),
            other => {
                ensure_exists(file_path)?;
                Err(ImportError::UnsupportedFormat(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "简称,分类,价格,成本",
            "山地车26寸21速,山地车,199,120",
            "公路车27.5寸变速,公路车,299,180",
        ]);

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers, vec!["简称", "分类", "价格", "成本"]);
        assert_eq!(
            table.records[0].get("简称"),
            Some(&"山地车26寸21速".to_string())
        );
        assert_eq!(table.records[1].get("价格"), Some(&"299".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_table(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["简称,价格", "A,1", ",", "B,2"]);
        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_csv_parser_grouped_header() {
        let temp_file = csv_file(&[
            "配置,速别,价格,费用,,毛利,,简称",
            "配置,速别,价格,成本,快递,毛利润,毛利率,简称",
            "经典,21速,220.00,130.00,30.00,60.00,0.27,山地车经典26寸21速",
        ]);
        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].get("速别"), Some(&"21速".to_string()));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_render_identifier_cell() {
        assert_eq!(render_cell(&Data::Float(100200300400500.0), true), "100200300400500");
        assert_eq!(render_cell(&Data::Float(12.5), true), "12.5");
        assert_eq!(render_cell(&Data::Empty, false), "");
    }

    #[test]
    fn test_render_grid_marks_id_columns() {
        let cells = vec![
            vec![Data::String("货品ID".into()), Data::String("简称".into())],
            vec![Data::Float(1234567890123.0), Data::String("A".into())],
        ];
        let grid = render_grid(&cells);
        assert_eq!(grid[1][0], "1234567890123");
    }
}
