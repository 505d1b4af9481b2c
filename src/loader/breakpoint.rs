// ==========================================
// 主数据 ETL - 断点（零件切换）派生
// ==========================================
// 来源: 主宽表中的 (BREAKPOINT_DATE, OLD_PART_ID, NEW_PART_ID)
// 规则:
// - 三元组去重保留首次出现，按出现顺序分配从 1 开始的序号
// - 每个三元组产出 1 条断点 + 2 条零件-断点关联
//   旧零件: 切换前有效 / 切换后无效；新零件: 切换前无效 / 切换后有效
// - 两条关联都携带旧零件的切换前快照
// - 三列任一缺失时输出为空，不是错误
// ==========================================

use crate::domain::table::{Table, Value};
use crate::loader::error::LoaderResult;
use crate::loader::junction_loader::normalize_key;
use crate::loader::phase::PhaseOutcome;
use crate::loader::repository::LoadRepository;
use crate::loader::schema::{KeyKind, BREAKPOINT_TABLE, PART_TO_BREAKPOINT_TABLE};
use crate::report::ReportSink;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const PHASE: &str = "breakpoint_data";

/// 断点三元组列
pub const TRIPLE_COLUMNS: [&str; 3] = ["BREAKPOINT_DATE", "OLD_PART_ID", "NEW_PART_ID"];

const BREAKPOINT_HEADERS: [&str; 3] = ["BREAKPOINT_ID", "BREAKPOINT_NUMBER", "BREAKPOINT_DATE"];

const LINK_HEADERS: [&str; 8] = [
    "PART_ID",
    "BREAKPOINT_ID",
    "IS_ACTIVE_BEFORE",
    "IS_ACTIVE_AFTER",
    "PART_NUMBER_BEFORE_CHANGE",
    "SUPPLIER_NAME_BEFORE_CHANGE",
    "LOCALIZATION_BEFORE_CHANGE",
    "LINE_NAME_BEFORE_CHANGE",
];

/// 快照字段: 主表列
const SNAPSHOT_SOURCES: [&str; 4] = ["PART_NUMBER", "SUPPLIER_NAME", "LOCALIZATION", "LINE_NAME"];

/// 派生结果
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointRows {
    pub breakpoints: Table,
    pub part_links: Table,
}

impl BreakpointRows {
    fn empty() -> Self {
        Self {
            breakpoints: Table::with_headers(BREAKPOINT_TABLE, &BREAKPOINT_HEADERS),
            part_links: Table::with_headers(PART_TO_BREAKPOINT_TABLE, &LINK_HEADERS),
        }
    }
}

/// 零件切换前快照（按 PART_ID 首次出现行）
struct SnapshotIndex<'a> {
    main: &'a Table,
    rows_by_part: HashMap<String, usize>,
}

impl<'a> SnapshotIndex<'a> {
    fn build(main: &'a Table) -> Self {
        let mut rows_by_part = HashMap::new();
        if let Some(column) = main.column("PART_ID") {
            for (row, value) in column.values.iter().enumerate() {
                if let Value::Text(id) = normalize_key(value, KeyKind::Text) {
                    rows_by_part.entry(id).or_insert(row);
                }
            }
        }
        Self { main, rows_by_part }
    }

    fn snapshot(&self, part_id: &str) -> Vec<Value> {
        match self.rows_by_part.get(part_id) {
            Some(row) => SNAPSHOT_SOURCES
                .iter()
                .map(|col| self.main.value(*row, col).clone())
                .collect(),
            None => vec![Value::Null; SNAPSHOT_SOURCES.len()],
        }
    }
}

/// 从主表派生断点与零件-断点关联
pub fn derive_breakpoints(main: &Table) -> BreakpointRows {
    let missing = main.missing_columns(&TRIPLE_COLUMNS);
    if !missing.is_empty() {
        debug!(missing = ?missing, "主表无断点列，跳过断点派生");
        return BreakpointRows::empty();
    }

    let snapshots = SnapshotIndex::build(main);
    let has_number = main.has_column("BREAKPOINT_NUMBER");
    let mut seen = HashSet::new();
    let mut breakpoints = Vec::new();
    let mut links = Vec::new();

    for row in 0..main.row_count() {
        let date = main.value(row, "BREAKPOINT_DATE");
        let old = normalize_key(main.value(row, "OLD_PART_ID"), KeyKind::Text);
        let new = normalize_key(main.value(row, "NEW_PART_ID"), KeyKind::Text);
        let (Value::Text(old_id), Value::Text(new_id)) = (&old, &new) else {
            continue;
        };
        if date.is_null() {
            continue;
        }
        if !seen.insert((date.key_repr(), old_id.clone(), new_id.clone())) {
            continue;
        }
        if old_id == new_id {
            warn!(part_id = %old_id, "断点新旧零件相同，忽略");
            continue;
        }

        let id = breakpoints.len() as i64 + 1;
        let number = if has_number {
            main.value(row, "BREAKPOINT_NUMBER").to_text()
        } else {
            None
        }
        .unwrap_or_else(|| format!("BP-{:04}", id));

        breakpoints.push(vec![Value::Int(id), Value::Text(number), date.clone()]);

        let snapshot = snapshots.snapshot(old_id);
        for (part, before, after) in [(old.clone(), 1, 0), (new.clone(), 0, 1)] {
            let mut link = vec![part, Value::Int(id), Value::Int(before), Value::Int(after)];
            link.extend(snapshot.iter().cloned());
            links.push(link);
        }
    }

    BreakpointRows {
        breakpoints: Table::from_rows(
            BREAKPOINT_TABLE,
            BREAKPOINT_HEADERS.iter().map(|h| h.to_string()).collect(),
            breakpoints,
        ),
        part_links: Table::from_rows(
            PART_TO_BREAKPOINT_TABLE,
            LINK_HEADERS.iter().map(|h| h.to_string()).collect(),
            links,
        ),
    }
}

async fn write(
    repo: &dyn LoadRepository,
    table: &str,
    rows: &Table,
    truncate: bool,
) -> LoaderResult<usize> {
    if truncate {
        repo.truncate_cascade(table).await?;
    }
    repo.insert_rows(table, rows).await
}

/// 写入断点与零件-断点关联
pub async fn load_breakpoint_data(
    repo: &dyn LoadRepository,
    main: &Table,
    truncate: bool,
    sink: &dyn ReportSink,
) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::new();
    let rows = derive_breakpoints(main);

    if rows.breakpoints.is_empty() {
        info!("无断点数据");
        outcome.record_loaded(sink, PHASE, BREAKPOINT_TABLE, 0);
        outcome.record_loaded(sink, PHASE, PART_TO_BREAKPOINT_TABLE, 0);
        return outcome;
    }

    // 清空断点表时级联清空关联表
    match write(repo, BREAKPOINT_TABLE, &rows.breakpoints, truncate).await {
        Ok(count) => outcome.record_loaded(sink, PHASE, BREAKPOINT_TABLE, count),
        Err(e) => {
            outcome.record_failed(sink, PHASE, BREAKPOINT_TABLE, e);
            outcome.record_loaded(sink, PHASE, PART_TO_BREAKPOINT_TABLE, 0);
            return outcome;
        }
    }

    match write(repo, PART_TO_BREAKPOINT_TABLE, &rows.part_links, truncate).await {
        Ok(count) => outcome.record_loaded(sink, PHASE, PART_TO_BREAKPOINT_TABLE, count),
        Err(e) => outcome.record_failed(sink, PHASE, PART_TO_BREAKPOINT_TABLE, e),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_table() -> Table {
        Table::from_rows(
            "main",
            vec![
                "PART_ID".to_string(),
                "PART_NUMBER".to_string(),
                "SUPPLIER_NAME".to_string(),
                "BREAKPOINT_DATE".to_string(),
                "OLD_PART_ID".to_string(),
                "NEW_PART_ID".to_string(),
            ],
            vec![
                vec![
                    Value::from("PRT_A"),
                    Value::from("100-01"),
                    Value::from("Acme"),
                    Value::from("2024-05-01"),
                    Value::from("PRT_A"),
                    Value::from("PRT_B"),
                ],
                vec![
                    Value::from("PRT_B"),
                    Value::from("100-02"),
                    Value::from("Beta"),
                    Value::from("2024-05-01"),
                    Value::from("PRT_A"),
                    Value::from("PRT_B"),
                ],
                vec![
                    Value::from("PRT_C"),
                    Value::from("200-01"),
                    Value::from("Gamma"),
                    Value::from("2024-06-01"),
                    Value::from("PRT_C"),
                    Value::from("PRT_C"),
                ],
                vec![
                    Value::from("PRT_D"),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::from("PRT_D"),
                    Value::from("PRT_E"),
                ],
            ],
        )
    }

    #[test]
    fn test_two_links_per_unique_triple() {
        let rows = derive_breakpoints(&main_table());
        assert_eq!(rows.breakpoints.row_count(), 1);
        assert_eq!(rows.part_links.row_count(), 2);

        assert_eq!(rows.breakpoints.value(0, "BREAKPOINT_ID"), &Value::Int(1));
        assert_eq!(rows.breakpoints.value(0, "BREAKPOINT_NUMBER"), &Value::from("BP-0001"));

        assert_eq!(rows.part_links.value(0, "PART_ID"), &Value::from("PRT_A"));
        assert_eq!(rows.part_links.value(0, "IS_ACTIVE_BEFORE"), &Value::Int(1));
        assert_eq!(rows.part_links.value(0, "IS_ACTIVE_AFTER"), &Value::Int(0));
        assert_eq!(rows.part_links.value(1, "PART_ID"), &Value::from("PRT_B"));
        assert_eq!(rows.part_links.value(1, "IS_ACTIVE_AFTER"), &Value::Int(1));
    }

    #[test]
    fn test_links_carry_old_part_snapshot() {
        let rows = derive_breakpoints(&main_table());
        for row in 0..2 {
            assert_eq!(
                rows.part_links.value(row, "PART_NUMBER_BEFORE_CHANGE"),
                &Value::from("100-01")
            );
            assert_eq!(
                rows.part_links.value(row, "SUPPLIER_NAME_BEFORE_CHANGE"),
                &Value::from("Acme")
            );
            assert_eq!(rows.part_links.value(row, "LINE_NAME_BEFORE_CHANGE"), &Value::Null);
        }
    }

    #[test]
    fn test_missing_columns_yield_empty() {
        let main = Table::from_rows(
            "main",
            vec!["PART_ID".to_string()],
            vec![vec![Value::from("P")]],
        );
        let rows = derive_breakpoints(&main);
        assert!(rows.breakpoints.is_empty());
        assert!(rows.part_links.is_empty());
        assert_eq!(rows.part_links.column_count(), LINK_HEADERS.len());
    }

    #[test]
    fn test_source_breakpoint_number_is_kept() {
        let main = Table::from_rows(
            "main",
            vec![
                "BREAKPOINT_DATE".to_string(),
                "OLD_PART_ID".to_string(),
                "NEW_PART_ID".to_string(),
                "BREAKPOINT_NUMBER".to_string(),
            ],
            vec![vec![
                Value::from("2024-01-01"),
                Value::from("P1"),
                Value::from("P2"),
                Value::from("ECN-17"),
            ]],
        );
        let rows = derive_breakpoints(&main);
        assert_eq!(rows.breakpoints.value(0, "BREAKPOINT_NUMBER"), &Value::from("ECN-17"));
    }
}
