// ==========================================
// 汽车制造主数据 ETL - 核心库
// ==========================================
// 流程: 宽表抽取 -> 列转换/清洗 -> 关系型装载 -> 校验
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 表格模型与实体目录
pub mod domain;

// 抽取层 - 源文件读取与实体投影
pub mod importer;

// 转换层 - 列分类、强制转换、文本清洗
pub mod transform;

// 装载层 - 实体/联结/断点写入与校验
pub mod loader;

// 运行报告通道
pub mod report;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// 流水线编排
pub mod pipeline;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::EtlConfig;
pub use domain::{EntityKind, Table, TableSet, Value};
pub use importer::{Extractor, ExtractError};
pub use loader::{LoadEngine, LoadError, LoadResult, LoadState};
pub use pipeline::{run, PipelineReport};
pub use report::{ReportEvent, ReportSink};
pub use transform::{TransformEngine, TransformError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "汽车制造主数据 ETL";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
