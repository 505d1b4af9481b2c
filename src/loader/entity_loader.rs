// ==========================================
// 主数据 ETL - 实体表装载
// ==========================================
// 步骤: 非空校验 -> 主键校验（缺列 / 空值均为致命）-> 按主键去重保留首行
//       -> 可选级联清空 -> 单事务批量插入
// 说明: 包装编号在写入时由类型与尺寸重新计算
// ==========================================

use crate::domain::entity::EntityKind;
use crate::domain::packaging::packaging_number_from_values;
use crate::domain::table::{Column, Table, Value};
use crate::domain::table_set::TableSet;
use crate::loader::error::{LoadError, LoaderResult};
use crate::loader::phase::PhaseOutcome;
use crate::loader::repository::LoadRepository;
use crate::report::ReportSink;
use tracing::{info, warn};

pub const PHASE: &str = "entity_tables";

/// 校验主键并去重，补齐包装编号
pub fn prepare_entity_rows(kind: EntityKind, table: &Table) -> LoaderResult<Table> {
    let pk = kind.primary_key();
    let column = table.column(pk).ok_or_else(|| LoadError::MissingColumn {
        table: kind.table_name().to_string(),
        column: pk.to_string(),
    })?;

    let nulls = column.null_count();
    if nulls > 0 {
        return Err(LoadError::NullPrimaryKey {
            table: kind.table_name().to_string(),
            column: pk.to_string(),
            count: nulls,
        });
    }

    let rows = table.unique_by(&[pk]);
    if rows.row_count() < table.row_count() {
        info!(
            table = kind.table_name(),
            removed = table.row_count() - rows.row_count(),
            "按主键去重"
        );
    }

    with_packaging_numbers(kind, rows)
}

fn with_packaging_numbers(kind: EntityKind, mut rows: Table) -> LoaderResult<Table> {
    let prefix = match kind {
        EntityKind::Box => "BOX",
        EntityKind::Pallet => "PALLET",
        _ => return Ok(rows),
    };

    let number_col = format!("{}_NUMBER", prefix);
    let kind_col = format!("{}_TYPE", prefix);
    let length_col = format!("{}_LENGTH_MM", prefix);
    let width_col = format!("{}_WIDTH_MM", prefix);
    let height_col = format!("{}_HEIGHT_MM", prefix);

    let numbers: Vec<Value> = (0..rows.row_count())
        .map(|row| {
            packaging_number_from_values(
                rows.value(row, &kind_col),
                rows.value(row, &length_col),
                rows.value(row, &width_col),
                rows.value(row, &height_col),
            )
            .map(Value::Text)
            .unwrap_or_else(|| rows.value(row, &number_col).clone())
        })
        .collect();

    rows.set_column(Column::new(number_col, numbers))?;
    Ok(rows)
}

/// 装载单张实体表
pub async fn load_entity_table(
    repo: &dyn LoadRepository,
    kind: EntityKind,
    table: &Table,
    truncate: bool,
) -> LoaderResult<usize> {
    if table.is_empty() {
        warn!(table = kind.table_name(), "输入表为空，跳过");
        return Ok(0);
    }

    let rows = prepare_entity_rows(kind, table)?;

    if truncate {
        repo.truncate_cascade(kind.table_name()).await?;
    }

    repo.insert_rows(kind.table_name(), &rows).await
}

/// 按装载顺序写入全部实体表
///
/// 缺失的输入表计 0；表级错误计 0 并继续；连接类错误中止本阶段
pub async fn load_all_entity_tables(
    repo: &dyn LoadRepository,
    tables: &TableSet,
    truncate: bool,
    sink: &dyn ReportSink,
) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::new();

    for kind in EntityKind::ALL {
        let table_name = kind.table_name();
        let Some(table) = tables.entity(kind) else {
            warn!(table = table_name, key = %kind.table_key(), "输入缺少实体表，计为 0");
            outcome.record_loaded(sink, PHASE, table_name, 0);
            continue;
        };

        match load_entity_table(repo, kind, table, truncate).await {
            Ok(count) => outcome.record_loaded(sink, PHASE, table_name, count),
            Err(e) => {
                outcome.record_failed(sink, PHASE, table_name, e);
                if outcome.is_aborted() {
                    break;
                }
            }
        }
    }

    outcome
}
