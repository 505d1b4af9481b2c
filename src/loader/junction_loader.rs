// ==========================================
// 主数据 ETL - 联结表派生与装载
// ==========================================
// 步骤: 从主宽表投影键列（+ 存在的属性列）-> 删除键含空值的行
//       -> 按键组合去重保留首行 -> 键列一致化 -> 再删空值、再去重 -> 写入
// 说明: 缺少键列的联结表跳过（告警，计 0），不是错误
// ==========================================

use crate::domain::table::{Column, Table, Value};
use crate::loader::error::LoaderResult;
use crate::loader::phase::PhaseOutcome;
use crate::loader::repository::LoadRepository;
use crate::loader::schema::{JunctionDef, KeyKind, JUNCTIONS};
use crate::report::ReportSink;
use crate::transform::coercion::coerce_int;
use tracing::{debug, warn};

pub const PHASE: &str = "junction_tables";

/// 键列一致化
pub fn normalize_key(value: &Value, kind: KeyKind) -> Value {
    match kind {
        KeyKind::Text => match value {
            // 整值浮点来自表格数字单元格，按整数文本化
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Value::Text(format!("{}", *f as i64))
            }
            other => other.to_text().map(Value::Text).unwrap_or(Value::Null),
        },
        KeyKind::Integer => coerce_int(value).into_value(),
    }
}

/// 派生联结行；缺少键列时返回 Ok(None)
pub fn derive_junction_rows(main: &Table, def: &JunctionDef) -> LoaderResult<Option<Table>> {
    let keys = def.key_names();
    let missing = main.missing_columns(&keys);
    if !missing.is_empty() {
        warn!(table = def.table, missing = ?missing, "主表缺少联结键列，跳过");
        return Ok(None);
    }

    let mut columns: Vec<&str> = keys.clone();
    columns.extend(def.attributes.iter().copied().filter(|a| main.has_column(a)));

    let mut rows = main
        .select(def.table, &columns)?
        .drop_nulls(&keys)
        .unique_by(&keys);
    normalize_key_columns(&mut rows, def)?;

    // 一致化后可能出现新的空值或重复键
    Ok(Some(rows.drop_nulls(&keys).unique_by(&keys)))
}

fn normalize_key_columns(rows: &mut Table, def: &JunctionDef) -> LoaderResult<()> {
    for (key, kind) in def.keys {
        let Some(column) = rows.column(key) else {
            continue;
        };
        let values: Vec<Value> = column
            .values
            .iter()
            .map(|v| normalize_key(v, *kind))
            .collect();
        rows.set_column(Column::new(*key, values))?;
    }
    Ok(())
}

/// 装载单张联结表
pub async fn load_junction_table(
    repo: &dyn LoadRepository,
    main: &Table,
    def: &JunctionDef,
    truncate: bool,
) -> LoaderResult<usize> {
    let Some(rows) = derive_junction_rows(main, def)? else {
        return Ok(0);
    };

    if rows.is_empty() {
        warn!(table = def.table, "联结表无数据");
        return Ok(0);
    }

    if truncate {
        repo.truncate_cascade(def.table).await?;
    }

    let count = repo.insert_rows(def.table, &rows).await?;
    debug!(table = def.table, count, "联结表写入完成");
    Ok(count)
}

/// 写入全部联结表
pub async fn load_all_junction_tables(
    repo: &dyn LoadRepository,
    main: &Table,
    truncate: bool,
    sink: &dyn ReportSink,
) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::new();

    for def in JUNCTIONS.iter() {
        match load_junction_table(repo, main, def, truncate).await {
            Ok(count) => outcome.record_loaded(sink, PHASE, def.table, count),
            Err(e) => {
                outcome.record_failed(sink, PHASE, def.table, e);
                if outcome.is_aborted() {
                    break;
                }
            }
        }
    }

    outcome
}
