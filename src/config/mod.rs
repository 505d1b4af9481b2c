// ==========================================
// 主数据 ETL - 配置层
// ==========================================
// 职责: 运行配置加载与校验
// 来源: 环境变量 + 默认值，命令行可覆写
// ==========================================

pub mod etl_config;

// 重导出核心配置类型
pub use etl_config::{default_db_path, ConfigError, EtlConfig};
