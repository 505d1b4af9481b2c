// ==========================================
// 主数据 ETL - 转换模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 配置错误启动即失败；列级错误可恢复（保留原值）
// ==========================================

use crate::domain::TableError;
use thiserror::Error;

/// 转换模块错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    // ===== 配置错误（致命） =====
    #[error("列模式配置无效 (pattern: {pattern}): {message}")]
    InvalidPattern { pattern: String, message: String },

    // ===== 列级错误（可恢复） =====
    #[error("列类型不匹配 (列 {column}): {message}")]
    ColumnTypeMismatch { column: String, message: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// 单值清洗错误（降级为基础清洗）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CleanError {
    #[error("文本过长: {len} 字符（上限 {max}）")]
    InputTooLong { len: usize, max: usize },
}

/// Result 类型别名
pub type TransformResult<T> = Result<T, TransformError>;
