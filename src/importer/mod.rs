// ==========================================
// 主数据 ETL - 抽取层
// ==========================================
// 职责: 读取源文件为主宽表，补齐实体 ID，投影实体表
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod extractor;
pub mod file_parser;

// 重导出核心类型
pub use error::{ExtractError, ExtractResult};
pub use extractor::{
    assign_entity_ids, entity_id, project_entity, resolve_breakpoint_parts, ExtractOutput,
    ExtractReport, Extractor,
};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
