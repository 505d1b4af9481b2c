// ==========================================
// 主数据 ETL - 装载仓储接口
// ==========================================
// 职责: 装载引擎与数据库之间的接缝
// 约定: 每个方法是一次独立的数据库操作（获取连接 -> 执行 -> 释放）
// ==========================================

use crate::domain::table::Table;
use crate::loader::error::LoaderResult;
use async_trait::async_trait;

/// 装载仓储 Trait
#[async_trait]
pub trait LoadRepository: Send + Sync {
    /// 关闭外键约束（会话级）
    async fn relax_constraints(&self) -> LoaderResult<()>;

    /// 恢复外键约束
    async fn restore_constraints(&self) -> LoaderResult<()>;

    /// 清空表及其依赖表，返回实际清空的表（子表在前）
    async fn truncate_cascade(&self, table: &str) -> LoaderResult<Vec<String>>;

    /// 单事务批量插入，仅写入目标表中存在的列，返回插入行数
    async fn insert_rows(&self, table: &str, rows: &Table) -> LoaderResult<usize>;

    /// 统计表行数
    async fn count_rows(&self, table: &str) -> LoaderResult<usize>;

    /// 悬空外键引用数量
    async fn foreign_key_violations(&self) -> LoaderResult<usize>;
}
