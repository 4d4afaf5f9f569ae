// ==========================================
// 毛利表生成系统 - 商品数据导入器
// ==========================================
// 职责: 整合导入流程，从文件到内存数据集
// 流程: 解析 → 映射 → 清洗
// ==========================================

use crate::domain::{EditedPriceRow, ProductRecord};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{FieldMapper, FileParser};
use std::path::Path;
use tracing::{debug, info, instrument};

// ==========================================
// ImportedProducts - 导入结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportedProducts {
    /// 原始行（保留标识列与重复行，改价回填使用）
    pub originals: Vec<ProductRecord>,
    /// 工作数据集（删除标识列并去重）
    pub processed: Vec<ProductRecord>,
}

// ==========================================
// ProductImporter
// ==========================================
pub struct ProductImporter {
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    data_cleaner: DataCleaner,
}

impl Default for ProductImporter {
    fn default() -> Self {
        Self::new(Box::new(UniversalFileParser), Box::new(FieldMapperImpl))
    }
}

impl ProductImporter {
    pub fn new(file_parser: Box<dyn FileParser>, field_mapper: Box<dyn FieldMapper>) -> Self {
        Self {
            file_parser,
            field_mapper,
            data_cleaner: DataCleaner,
        }
    }

    /// 导入商品数据
    ///
    /// # 返回
    /// - Ok(ImportedProducts): 原始行 + 工作数据集
    /// - Err: 文件不可读 / 缺少 简称 列
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_products<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ImportedProducts> {
        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let table = self.file_parser.parse_to_raw_table(file_path.as_ref())?;

        // === 步骤 2: 字段映射 ===
        debug!("步骤 2: 字段映射");
        let originals = self.field_mapper.map_products(&table)?;

        // === 步骤 3: 清洗 ===
        debug!("步骤 3: 删除标识列并去重");
        let processed = self.data_cleaner.preprocess(&originals);

        info!(
            total_rows = originals.len(),
            processed_rows = processed.len(),
            "商品数据导入完成"
        );

        Ok(ImportedProducts {
            originals,
            processed,
        })
    }

    /// 导入人工改价后的毛利表
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_edited_table<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> ImportResult<Vec<EditedPriceRow>> {
        let table = self.file_parser.parse_to_raw_table(file_path.as_ref())?;
        let rows = self.field_mapper.map_edited_rows(&table)?;
        info!(rows = rows.len(), "改价毛利表导入完成");
        Ok(rows)
    }
}
