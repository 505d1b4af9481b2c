// ==========================================
// 主数据 ETL - 转换引擎模块
// ==========================================
// 职责: 列分类、类型强制转换、文本清洗、批量应用
// 红线: 不感知数据库结构
// ==========================================

pub mod coercion;
pub mod engine;
pub mod error;
pub mod registry;
pub mod text_cleaner;

// 重导出核心类型
pub use coercion::{round2, Coerced, CoercionStats};
pub use engine::{BatchOutcome, TransformEngine, TransformOutput, TransformReport};
pub use error::{CleanError, TransformError, TransformResult};
pub use registry::{ColumnPlan, ColumnRegistry, Transformation};
pub use text_cleaner::{CleanOutcome, TextCleaner};
