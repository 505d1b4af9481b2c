// ==========================================
// 主数据 ETL - 装载模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 校验 / 连接 / 约束 / 数据库 / 意外，映射到 ErrorKind
// ==========================================

use crate::domain::table::TableError;
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 装载模块错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    // ===== 校验错误 =====
    #[error("缺少必需的表: {0}")]
    MissingTable(String),

    #[error("表为空: {0}")]
    EmptyTable(String),

    #[error("缺少必需的列 (表 {table}): {column}")]
    MissingColumn { table: String, column: String },

    #[error("主键存在空值 (表 {table}, 列 {column}): {count} 行")]
    NullPrimaryKey {
        table: String,
        column: String,
        count: usize,
    },

    #[error("未知的目标表: {0}")]
    UnknownTable(String),

    // ===== 连接错误 =====
    #[error("数据库连接失败: {0}")]
    Connection(String),

    #[error("数据库锁获取失败: {0}")]
    Lock(String),

    // ===== 数据库错误 =====
    #[error("数据库查询失败: {0}")]
    Query(String),

    #[error("唯一约束违反: {0}")]
    UniqueViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("CHECK 约束违反: {0}")]
    CheckViolation(String),

    // ===== 约束管理错误 =====
    #[error("约束操作失败: {0}")]
    Constraint(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误分类（写入装载结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connection,
    Constraint,
    Database,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Connection => "connection",
            ErrorKind::Constraint => "constraint",
            ErrorKind::Database => "database",
            ErrorKind::Unexpected => "unexpected",
        };
        write!(f, "{}", s)
    }
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::MissingTable(_)
            | LoadError::EmptyTable(_)
            | LoadError::MissingColumn { .. }
            | LoadError::NullPrimaryKey { .. }
            | LoadError::UnknownTable(_) => ErrorKind::Validation,
            LoadError::Connection(_) | LoadError::Lock(_) => ErrorKind::Connection,
            LoadError::Query(_)
            | LoadError::UniqueViolation(_)
            | LoadError::ForeignKeyViolation(_)
            | LoadError::CheckViolation(_) => ErrorKind::Database,
            LoadError::Constraint(_) => ErrorKind::Constraint,
            LoadError::Internal(_) => ErrorKind::Unexpected,
        }
    }

    /// 连接类错误会中止当前阶段
    pub fn aborts_phase(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for LoadError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let msg = msg.unwrap_or_else(|| code.to_string());
                match code.code {
                    ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked => LoadError::Connection(msg),
                    _ if msg.contains("UNIQUE") => LoadError::UniqueViolation(msg),
                    _ if msg.contains("FOREIGN KEY") => LoadError::ForeignKeyViolation(msg),
                    _ if msg.contains("CHECK") => LoadError::CheckViolation(msg),
                    _ => LoadError::Query(msg),
                }
            }
            _ => LoadError::Query(err.to_string()),
        }
    }
}

// 表形状错误只会来自装载内部的列替换
impl From<TableError> for LoadError {
    fn from(err: TableError) -> Self {
        LoadError::Internal(err.to_string())
    }
}

/// Result 类型别名
pub type LoaderResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LoadError::EmptyTable("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(LoadError::Lock("x".into()).kind(), ErrorKind::Connection);
        assert!(LoadError::Connection("x".into()).aborts_phase());
        assert!(!LoadError::Query("x".into()).aborts_phase());
    }

    #[test]
    fn test_from_sqlite_unique() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: LoadError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, LoadError::UniqueViolation(_)));
    }

    #[test]
    fn test_from_table_error_is_unexpected() {
        let err: LoadError = TableError::ShapeMismatch {
            column: "BOX_ID".to_string(),
            expected: 3,
            actual: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.to_string().contains("BOX_ID"));
    }
}
