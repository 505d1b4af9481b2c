// ==========================================
// 主数据 ETL - 主宽表抽取
// ==========================================
// 职责:
// - 读取源文件为主宽表
// - 源表缺少实体 ID 时由自然键派生确定性 ID（UUID v5）
// - 断点新旧零件号解析为零件 ID
// - 按实体列清单投影七张实体表
// ==========================================

use crate::domain::entity::{EntityKind, MAIN_TABLE};
use crate::domain::table::{Column, Table, Value};
use crate::importer::error::{ExtractError, ExtractResult};
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 断点零件号列 -> 零件 ID 列
pub const PART_NUMBER_REFS: [(&str, &str); 2] = [
    ("OLD_PART_NUMBER", "OLD_PART_ID"),
    ("NEW_PART_NUMBER", "NEW_PART_ID"),
];

/// 抽取报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractReport {
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    /// 由自然键派生的 ID 列
    pub derived_ids: Vec<String>,
    /// 由零件号解析的断点列
    pub resolved_refs: Vec<String>,
    /// 实体 -> 投影行数
    pub entities: BTreeMap<String, usize>,
    /// 实体 -> 缺失列（该实体未投影）
    pub missing: BTreeMap<String, Vec<String>>,
}

/// 抽取输出: 主表在前，随后是成功投影的实体表
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    pub tables: Vec<Table>,
    pub report: ExtractReport,
}

// ==========================================
// 确定性 ID
// ==========================================

/// 自然键分量的规范文本（整值浮点按整数处理，文本去首尾空白）
fn canonical(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => (*f as i64).to_string(),
        Value::Text(s) => s.trim().to_string(),
        other => other.to_text().unwrap_or_default(),
    }
}

/// 由自然键派生实体 ID: `<前缀><8 位大写十六进制>`
///
/// 自然键全部为空时返回 None
pub fn entity_id(kind: EntityKind, key: &[&Value]) -> Option<String> {
    if key.iter().all(|v| v.is_null() || canonical(v).is_empty()) {
        return None;
    }
    let name = std::iter::once(kind.name().to_string())
        .chain(key.iter().map(|v| canonical(v)))
        .collect::<Vec<_>>()
        .join("|");
    let hex = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string();
    Some(format!("{}{}", kind.id_prefix(), hex[..8].to_uppercase()))
}

/// 为缺少 ID 列的实体补充 ID 列，返回新增的列名
///
/// 源表已有 ID 列时保持原样；自然键列一个都没有时不派生
pub fn assign_entity_ids(main: &mut Table) -> ExtractResult<Vec<String>> {
    let mut derived = Vec::new();
    for kind in EntityKind::ALL {
        let pk = kind.primary_key();
        if main.has_column(pk) {
            continue;
        }
        let key_columns = kind.natural_key();
        if key_columns.iter().all(|c| !main.has_column(c)) {
            continue;
        }

        let ids: Vec<Value> = (0..main.row_count())
            .map(|row| {
                let key: Vec<&Value> = key_columns.iter().map(|c| main.value(row, c)).collect();
                entity_id(kind, &key).map(Value::Text).unwrap_or(Value::Null)
            })
            .collect();
        main.set_column(Column::new(pk, ids))?;
        derived.push(pk.to_string());
    }
    Ok(derived)
}

/// 断点零件号解析为零件 ID（按零件号首次出现的 PART_ID），返回新增的列名
pub fn resolve_breakpoint_parts(main: &mut Table) -> ExtractResult<Vec<String>> {
    let mut resolved = Vec::new();
    let pending: Vec<(&str, &str)> = PART_NUMBER_REFS
        .iter()
        .copied()
        .filter(|(number_col, id_col)| main.has_column(number_col) && !main.has_column(id_col))
        .collect();
    if pending.is_empty() {
        return Ok(resolved);
    }

    let mut part_ids: HashMap<String, Value> = HashMap::new();
    for row in 0..main.row_count() {
        let number = canonical(main.value(row, "PART_NUMBER"));
        let id = main.value(row, "PART_ID");
        if !number.is_empty() && !id.is_null() {
            part_ids.entry(number).or_insert_with(|| id.clone());
        }
    }

    for (number_col, id_col) in pending {
        let mut unresolved = 0usize;
        let ids: Vec<Value> = (0..main.row_count())
            .map(|row| {
                let number = canonical(main.value(row, number_col));
                if number.is_empty() {
                    return Value::Null;
                }
                part_ids.get(&number).cloned().unwrap_or_else(|| {
                    unresolved += 1;
                    Value::Null
                })
            })
            .collect();
        if unresolved > 0 {
            warn!(column = number_col, unresolved, "断点零件号未在零件列中找到");
        }
        main.set_column(Column::new(id_col, ids))?;
        resolved.push(id_col.to_string());
    }
    Ok(resolved)
}

// ==========================================
// 实体投影
// ==========================================

/// 按实体列清单投影
///
/// # 规则
/// - 主表为空: 返回只有表头的空表
/// - 缺少必需列: MissingColumns（仅影响该实体）
/// - 可选列存在时一并投影
pub fn project_entity(main: &Table, kind: EntityKind) -> ExtractResult<Table> {
    if main.is_empty() {
        return Ok(Table::with_headers(kind.name(), kind.columns()));
    }

    let missing = main.missing_columns(kind.columns());
    if !missing.is_empty() {
        return Err(ExtractError::MissingColumns {
            entity: kind.name().to_string(),
            columns: missing,
        });
    }

    let mut columns: Vec<&str> = kind.columns().to_vec();
    columns.extend(
        kind.optional_columns()
            .iter()
            .copied()
            .filter(|c| main.has_column(c)),
    );
    let table = main.select(kind.name(), &columns)?;
    info!(
        entity = kind.name(),
        rows = table.row_count(),
        columns = table.column_count(),
        "实体投影完成"
    );
    Ok(table)
}

// ==========================================
// Extractor
// ==========================================

pub struct Extractor {
    parser: Box<dyn FileParser>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            parser: Box::new(UniversalFileParser),
        }
    }

    pub fn with_parser(parser: Box<dyn FileParser>) -> Self {
        Self { parser }
    }

    /// 读取源文件并生成主表与实体表
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> ExtractResult<ExtractOutput> {
        let main = self.parser.parse_table(path, MAIN_TABLE)?;
        let mut output = self.extract_from_table(main)?;
        output.report.source = path.display().to_string();
        Ok(output)
    }

    /// 由已读取的主表生成主表与实体表
    pub fn extract_from_table(&self, mut main: Table) -> ExtractResult<ExtractOutput> {
        main.name = MAIN_TABLE.to_string();
        let mut report = ExtractReport {
            rows: main.row_count(),
            ..ExtractReport::default()
        };

        report.derived_ids = assign_entity_ids(&mut main)?;
        report.resolved_refs = resolve_breakpoint_parts(&mut main)?;
        report.columns = main.column_count();
        info!(
            rows = report.rows,
            columns = report.columns,
            derived_ids = ?report.derived_ids,
            "主表读取完成"
        );

        let mut tables = Vec::with_capacity(EntityKind::ALL.len() + 1);
        for kind in EntityKind::ALL {
            match project_entity(&main, kind) {
                Ok(table) => {
                    report.entities.insert(kind.name().to_string(), table.row_count());
                    tables.push(table);
                }
                Err(ExtractError::MissingColumns { entity, columns }) => {
                    warn!(entity = %entity, missing = ?columns, "实体缺少列，跳过投影");
                    report.missing.insert(entity, columns);
                }
                Err(e) => return Err(e),
            }
        }

        tables.insert(0, main);
        Ok(ExtractOutput { tables, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Table {
        Table::from_rows(
            "sheet1",
            vec![
                "SUPPLIER_NAME".to_string(),
                "PART_NUMBER".to_string(),
                "BOX_TYPE".to_string(),
                "BOX_LENGTH_MM".to_string(),
                "BOX_WIDTH_MM".to_string(),
                "BOX_HEIGHT_MM".to_string(),
                "OLD_PART_NUMBER".to_string(),
                "NEW_PART_NUMBER".to_string(),
            ],
            vec![
                vec![
                    Value::from("Acme"),
                    Value::from("100-01"),
                    Value::from("returnable"),
                    Value::Int(600),
                    Value::Int(400),
                    Value::Int(300),
                    Value::from("100-01"),
                    Value::from("100-02"),
                ],
                vec![
                    Value::from(" Acme "),
                    Value::from("100-02"),
                    Value::from("returnable"),
                    Value::Float(600.0),
                    Value::Int(400),
                    Value::Int(300),
                    Value::Null,
                    Value::Null,
                ],
            ],
        )
    }

    #[test]
    fn test_entity_id_is_deterministic() {
        let a = entity_id(EntityKind::Supplier, &[&Value::from("Acme")]).unwrap();
        let b = entity_id(EntityKind::Supplier, &[&Value::from("Acme ")]).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("SUP_"));
        assert_eq!(a.len(), "SUP_".len() + 8);
        assert!(entity_id(EntityKind::Part, &[&Value::Null]).is_none());

        // 不同实体的同名自然键不冲突
        let part = entity_id(EntityKind::Part, &[&Value::from("Acme")]).unwrap();
        assert_ne!(part[4..], a[4..]);
    }

    #[test]
    fn test_assign_ids_equal_keys_equal_ids() {
        let mut main = sheet();
        let derived = assign_entity_ids(&mut main).unwrap();
        assert!(derived.contains(&"SUPPLIER_ID".to_string()));
        assert!(derived.contains(&"BOX_ID".to_string()));
        assert!(!derived.contains(&"MODEL_ID".to_string()));

        assert_eq!(main.value(0, "SUPPLIER_ID"), main.value(1, "SUPPLIER_ID"));
        assert_eq!(main.value(0, "BOX_ID"), main.value(1, "BOX_ID"));
        assert_ne!(main.value(0, "PART_ID"), main.value(1, "PART_ID"));
    }

    #[test]
    fn test_existing_id_column_is_kept() {
        let mut main = Table::from_rows(
            "main",
            vec!["PART_ID".to_string(), "PART_NUMBER".to_string()],
            vec![vec![Value::from("P-1"), Value::from("100-01")]],
        );
        let derived = assign_entity_ids(&mut main).unwrap();
        assert!(!derived.contains(&"PART_ID".to_string()));
        assert_eq!(main.value(0, "PART_ID"), &Value::from("P-1"));
    }

    #[test]
    fn test_resolve_breakpoint_parts() {
        let mut main = sheet();
        assign_entity_ids(&mut main).unwrap();
        let resolved = resolve_breakpoint_parts(&mut main).unwrap();
        assert_eq!(resolved, vec!["OLD_PART_ID", "NEW_PART_ID"]);
        assert_eq!(main.value(0, "OLD_PART_ID"), main.value(0, "PART_ID"));
        assert_eq!(main.value(0, "NEW_PART_ID"), main.value(1, "PART_ID"));
        assert_eq!(main.value(1, "OLD_PART_ID"), &Value::Null);
    }

    #[test]
    fn test_project_entity_missing_columns() {
        let mut main = sheet();
        assign_entity_ids(&mut main).unwrap();
        let err = project_entity(&main, EntityKind::Supplier).unwrap_err();
        match err {
            ExtractError::MissingColumns { entity, columns } => {
                assert_eq!(entity, "supplier");
                assert!(columns.contains(&"CITY".to_string()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_project_entity_on_empty_main() {
        let main = Table::with_headers("main", &["PART_ID"]);
        let table = project_entity(&main, EntityKind::Part).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), EntityKind::Part.columns().len());
    }

    #[test]
    fn test_extract_from_table_reports_missing_entities() {
        let output = Extractor::new().extract_from_table(sheet()).unwrap();
        assert_eq!(output.tables[0].name, "main");
        assert_eq!(output.report.rows, 2);
        assert!(output.report.missing.contains_key("supplier"));
        assert!(output.report.missing.contains_key("part"));
        assert!(output.tables.iter().all(|t| t.name != "supplier"));
    }
}
