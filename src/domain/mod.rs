// ==========================================
// 主数据 ETL - 领域模型层
// ==========================================
// 职责: 表格模型、实体目录、固定取值域、包装编号
// 红线: 不含数据访问逻辑，不含转换/装载逻辑
// ==========================================

pub mod entity;
pub mod packaging;
pub mod table;
pub mod table_set;
pub mod types;

// 重导出核心类型
pub use entity::{transformed_key, EntityKind, MAIN_TABLE};
pub use packaging::{packaging_number, packaging_number_from_values};
pub use table::{Column, Table, TableError, Value};
pub use table_set::TableSet;
pub use types::{
    DomainEnum, LocalizationFlag, ModelCode, ModelName, PackagingType, WorkshopCode, WorkshopName,
};
