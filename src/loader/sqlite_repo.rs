// ==========================================
// 主数据 ETL - SQLite 装载仓储实现
// ==========================================
// 依据: Arc<Mutex<Connection>>，每次操作加锁，作用域结束即释放
// 说明: 外键开关是连接级 PRAGMA，relax/restore 必须落在同一连接
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::table::Table;
use crate::loader::error::{LoadError, LoaderResult};
use crate::loader::repository::LoadRepository;
use crate::loader::schema::{cascade_order, is_known_table};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

// ==========================================
// SqliteLoadRepository
// ==========================================
pub struct SqliteLoadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLoadRepository {
    /// 打开数据库文件创建仓储
    pub fn new(db_path: &str) -> LoaderResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| LoadError::Connection(format!("{}: {}", db_path, e)))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 复用已有连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> LoaderResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LoadError::Lock(format!("锁获取失败: {}", e)))
    }

    fn ensure_known(table: &str) -> LoaderResult<()> {
        if is_known_table(table) {
            Ok(())
        } else {
            Err(LoadError::UnknownTable(table.to_string()))
        }
    }

    fn table_exists(conn: &Connection, table: &str) -> LoaderResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1",
                [table],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    /// 目标表的列名（PRAGMA table_info）
    fn table_columns(conn: &Connection, table: &str) -> LoaderResult<Vec<String>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn foreign_keys_enabled(conn: &Connection) -> LoaderResult<bool> {
        let flag: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(flag == 1)
    }
}

#[async_trait]
impl LoadRepository for SqliteLoadRepository {
    async fn relax_constraints(&self) -> LoaderResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        if Self::foreign_keys_enabled(&conn)? {
            return Err(LoadError::Constraint(
                "外键约束未能关闭（连接处于事务中）".to_string(),
            ));
        }
        info!("外键约束已关闭");
        Ok(())
    }

    async fn restore_constraints(&self) -> LoaderResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| LoadError::Constraint(e.to_string()))?;
        if !Self::foreign_keys_enabled(&conn)? {
            return Err(LoadError::Constraint("外键约束未能恢复".to_string()));
        }
        info!("外键约束已恢复");
        Ok(())
    }

    async fn truncate_cascade(&self, table: &str) -> LoaderResult<Vec<String>> {
        Self::ensure_known(table)?;
        let conn = self.lock()?;

        if !Self::table_exists(&conn, table)? {
            warn!(table, "目标表不存在，跳过清空");
            return Ok(Vec::new());
        }

        let tx = conn.unchecked_transaction()?;
        let mut cleared = Vec::new();
        for target in cascade_order(table) {
            if Self::table_exists(&tx, target)? {
                tx.execute(&format!("DELETE FROM \"{}\"", target), [])?;
                cleared.push(target.to_string());
            }
        }
        tx.commit()?;

        info!(table, cleared = ?cleared, "已清空表（含依赖表）");
        Ok(cleared)
    }

    async fn insert_rows(&self, table: &str, rows: &Table) -> LoaderResult<usize> {
        Self::ensure_known(table)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let target_columns = Self::table_columns(&conn, table)?;
        if target_columns.is_empty() {
            return Err(LoadError::Query(format!("表不存在: {}", table)));
        }

        // 源列 -> 目标列（大小写不敏感），目标表没有的列忽略
        let mapped: Vec<(&str, usize)> = target_columns
            .iter()
            .filter_map(|target| {
                rows.column_index(target)
                    .map(|idx| (target.as_str(), idx))
            })
            .collect();
        if mapped.is_empty() {
            return Err(LoadError::MissingColumn {
                table: table.to_string(),
                column: target_columns.join(","),
            });
        }

        let column_list = mapped
            .iter()
            .map(|(name, _)| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=mapped.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table, column_list, placeholders
        );

        let columns = rows.columns();
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in 0..rows.row_count() {
                let values = mapped.iter().map(|(_, idx)| &columns[*idx].values[row]);
                stmt.execute(params_from_iter(values))?;
                count += 1;
            }
        }
        tx.commit()?;

        debug!(table, count, "批量插入完成");
        Ok(count)
    }

    async fn count_rows(&self, table: &str) -> LoaderResult<usize> {
        Self::ensure_known(table)?;
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn foreign_key_violations(&self) -> LoaderResult<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        let mut count = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}
