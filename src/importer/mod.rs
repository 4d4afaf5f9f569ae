// ==========================================
// 毛利表生成系统 - 导入层
// ==========================================
// 职责: 外部表格导入，生成内部商品行
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod product_importer;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use product_importer::{ImportedProducts, ProductImporter};

// 重导出 Trait 接口
pub use importer_trait::{FieldMapper, FileParser, RawTable};
