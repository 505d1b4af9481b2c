// ==========================================
// 主数据 ETL - 装载引擎模块
// ==========================================
// 职责: 实体写入、联结/断点派生写入、约束管理、装载后校验
// 红线: 不关心表是如何转换得到的，只接受形状正确的表集合
// ==========================================

pub mod breakpoint;
pub mod constraint;
pub mod engine;
pub mod entity_loader;
pub mod error;
pub mod junction_loader;
pub mod phase;
pub mod repository;
pub mod schema;
pub mod sqlite_repo;
pub mod verify;

// 重导出核心类型
pub use breakpoint::{derive_breakpoints, BreakpointRows};
pub use constraint::{ConstraintManager, ConstraintReport};
pub use engine::{LoadEngine, LoadResult, LoadState, StepResults};
pub use entity_loader::prepare_entity_rows;
pub use error::{ErrorKind, LoadError, LoaderResult};
pub use junction_loader::derive_junction_rows;
pub use phase::PhaseOutcome;
pub use repository::LoadRepository;
pub use sqlite_repo::SqliteLoadRepository;
