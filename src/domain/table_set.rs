// ==========================================
// 主数据 ETL - 表集合
// ==========================================
// 职责: 以 `transformed_<name>` 为键的具名表集合
// 说明: 转换引擎的输出、装载引擎的输入
// ==========================================

use crate::domain::entity::{transformed_key, EntityKind, MAIN_TABLE};
use crate::domain::table::Table;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: BTreeMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, table: Table) {
        self.tables.insert(key.into(), table);
    }

    pub fn get(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Table> {
        self.tables.remove(key)
    }

    /// 主宽表（`transformed_main`）
    pub fn main(&self) -> Option<&Table> {
        self.tables.get(&transformed_key(MAIN_TABLE))
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&Table> {
        self.tables.get(&kind.table_key())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<(String, Table)> for TableSet {
    fn from_iter<I: IntoIterator<Item = (String, Table)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}
