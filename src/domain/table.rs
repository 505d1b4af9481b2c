// ==========================================
// 主数据 ETL - 列式表格模型
// ==========================================
// 职责: 定义 Value / Column / Table
// 说明: 抽取、转换、装载三段之间传递的唯一数据形态
// 约定: 列名按大小写不敏感匹配
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// 日期时间的文本格式（写库与展示共用）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NULL_VALUE: Value = Value::Null;

// ==========================================
// 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// 值类型名（日志与错误信息使用）
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::DateTime(_) => "datetime",
        }
    }

    /// 转为文本表示；Null 保持 None，不产生 "null"/"None" 字面量
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::Text(s) => Some(s.clone()),
            Value::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
        }
    }

    /// 去重键: 带类型标签，避免 Int(1) 与 Text("1") 被视为同一键
    pub fn key_repr(&self) -> String {
        match self {
            Value::Null => "n:".to_string(),
            Value::Bool(b) => format!("b:{}", b),
            Value::Int(i) => format!("i:{}", i),
            Value::Float(f) => format!("f:{}", f),
            Value::Text(s) => format!("s:{}", s),
            Value::DateTime(dt) => format!("d:{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

/// 浮点数文本化: 整值保留一位小数（12 -> "12.0"）
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::DateTime(dt) => {
                ToSqlOutput::Owned(SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()))
            }
        })
    }
}

// ==========================================
// 表格错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("列长度不一致 (列 {column}): 期望 {expected} 行，实际 {actual} 行")]
    ShapeMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("缺少列: {0:?}")]
    MissingColumns(Vec<String>),
}

// ==========================================
// 列
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

// ==========================================
// 表
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// 创建只有表头、没有数据行的空表
    pub fn with_headers(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: headers
                .iter()
                .map(|h| Column::new(*h, Vec::new()))
                .collect(),
        }
    }

    /// 由行数据构建表；短行以 Null 补齐，超长部分丢弃
    pub fn from_rows(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(cells.next().unwrap_or(Value::Null));
            }
        }

        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        match self.column_index(name) {
            Some(idx) => Some(&mut self.columns[idx]),
            None => None,
        }
    }

    /// 返回 `required` 中本表缺失的列名
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// 新增或替换一列；长度必须与现有行数一致（空表除外）
    pub fn set_column(&mut self, column: Column) -> Result<(), TableError> {
        let actual = column.len();
        if !self.columns.is_empty() && actual != self.row_count() {
            return Err(TableError::ShapeMismatch {
                column: column.name,
                expected: self.row_count(),
                actual,
            });
        }

        match self.column_index(&column.name) {
            Some(idx) => self.columns[idx].values = column.values,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// 读取单元格；越界或列不存在时返回 Null
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.column(column)
            .and_then(|c| c.values.get(row))
            .unwrap_or(&NULL_VALUE)
    }

    /// 投影出指定列（按给定列名命名结果列）
    pub fn select(&self, name: impl Into<String>, columns: &[&str]) -> Result<Table, TableError> {
        let missing = self.missing_columns(columns);
        if !missing.is_empty() {
            return Err(TableError::MissingColumns(missing));
        }

        let selected = columns
            .iter()
            .filter_map(|col| {
                self.column(col)
                    .map(|c| Column::new(*col, c.values.clone()))
            })
            .collect();

        Ok(Table {
            name: name.into(),
            columns: selected,
        })
    }

    /// 按布尔掩码保留行
    pub fn filter_rows(&self, keep: &[bool]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .zip(keep.iter())
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();

        Table {
            name: self.name.clone(),
            columns,
        }
    }

    /// 删除键列中任一为 Null 的行
    pub fn drop_nulls(&self, key_columns: &[&str]) -> Table {
        let keys: Vec<&Column> = key_columns.iter().filter_map(|k| self.column(k)).collect();
        let keep: Vec<bool> = (0..self.row_count())
            .map(|row| keys.iter().all(|c| !c.values[row].is_null()))
            .collect();
        self.filter_rows(&keep)
    }

    /// 按键列组合去重，保留首次出现
    pub fn unique_by(&self, key_columns: &[&str]) -> Table {
        let keys: Vec<&Column> = key_columns.iter().filter_map(|k| self.column(k)).collect();
        let mut seen = HashSet::new();
        let keep: Vec<bool> = (0..self.row_count())
            .map(|row| {
                let key: Vec<String> = keys.iter().map(|c| c.values[row].key_repr()).collect();
                seen.insert(key)
            })
            .collect();
        self.filter_rows(&keep)
    }

    /// 逐行迭代（每行为按列顺序排列的值引用）
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).map(move |row| self.columns.iter().map(|c| &c.values[row]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "main",
            vec!["PART_ID".to_string(), "BOX_ID".to_string()],
            vec![
                vec![Value::from("P1"), Value::from("B1")],
                vec![Value::from("P1"), Value::from("B1")],
                vec![Value::from("P2"), Value::Null],
                vec![Value::from("P3")],
            ],
        )
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = sample();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.value(3, "BOX_ID"), &Value::Null);
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = sample();
        assert!(table.has_column("part_id"));
        assert_eq!(table.value(0, "box_id"), &Value::from("B1"));
    }

    #[test]
    fn test_unique_by_keeps_first() {
        let table = sample().drop_nulls(&["PART_ID", "BOX_ID"]).unique_by(&["PART_ID", "BOX_ID"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_key_repr_distinguishes_types() {
        assert_ne!(Value::Int(1).key_repr(), Value::from("1").key_repr());
    }

    #[test]
    fn test_set_column_rejects_wrong_length() {
        let mut table = sample();
        let err = table
            .set_column(Column::new("X", vec![Value::Null]))
            .unwrap_err();
        assert_eq!(
            err,
            TableError::ShapeMismatch {
                column: "X".to_string(),
                expected: 4,
                actual: 1,
            }
        );
        assert!(!table.has_column("X"));
    }

    #[test]
    fn test_set_column_replaces_existing() {
        let mut table = sample();
        table
            .set_column(Column::new("box_id", vec![Value::from("B9"); 4]))
            .unwrap();
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.value(2, "BOX_ID"), &Value::from("B9"));
    }

    #[test]
    fn test_select_reports_missing_columns() {
        let err = sample().select("part", &["PART_ID", "PART_NAME"]).unwrap_err();
        assert_eq!(err, TableError::MissingColumns(vec!["PART_NAME".to_string()]));
    }

    #[test]
    fn test_to_text_keeps_null() {
        assert_eq!(Value::Null.to_text(), None);
        assert_eq!(Value::Float(12.0).to_text(), Some("12.0".to_string()));
    }
}
