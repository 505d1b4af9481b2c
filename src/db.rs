// ==========================================
// 主数据 ETL - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键开启 + busy_timeout）
// - 有上限的重试连接，固定间隔，耗尽即永久失败
// - 13 张目标表幂等建表
// ==========================================

use crate::config::EtlConfig;
use crate::loader::schema::create_table_statements;
use rusqlite::Connection;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("数据库连接重试耗尽 ({attempts} 次): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("无法创建数据库目录 {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("建表失败 ({table}): {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys 与 busy_timeout 都需要“每个连接”单独设置
pub fn configure_sqlite_connection(
    conn: &Connection,
    busy_timeout_ms: u64,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    open_sqlite_connection_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS)
}

pub fn open_sqlite_connection_with_timeout(
    db_path: &str,
    busy_timeout_ms: u64,
) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn, busy_timeout_ms)?;
    Ok(conn)
}

/// 健康检查: SELECT 1
pub fn health_check(conn: &Connection) -> rusqlite::Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}

/// 幂等建表（CREATE TABLE IF NOT EXISTS，父表在前）
pub fn ensure_schema(conn: &Connection) -> Result<(), DbError> {
    for (table, ddl) in create_table_statements() {
        conn.execute_batch(&ddl).map_err(|source| DbError::Schema {
            table: table.to_string(),
            source,
        })?;
        debug!(table, "目标表就绪");
    }
    Ok(())
}

/// 带重试的连接
///
/// # 规则
/// - 最多尝试 max_retries 次，两次之间固定间隔 retry_delay_ms
/// - 每次打开后执行健康检查，检查失败视为本次失败
pub async fn connect_with_retry(config: &EtlConfig) -> Result<Connection, DbError> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    let db_path = config.db_path_str();
    let attempts = config.max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let opened = open_sqlite_connection_with_timeout(&db_path, config.busy_timeout_ms)
            .and_then(|conn| health_check(&conn).map(|_| conn));
        match opened {
            Ok(conn) => {
                info!(db_path = %db_path, attempt, "数据库连接成功");
                return Ok(conn);
            }
            Err(e) => {
                warn!(db_path = %db_path, attempt, attempts, error = %e, "数据库连接失败");
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
                }
            }
        }
    }

    Err(DbError::RetriesExhausted {
        attempts,
        last_error,
    })
}
