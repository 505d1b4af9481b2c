// ==========================================
// 主数据 ETL - 转换引擎
// ==========================================
// 职责: 按列计划逐列转换，汇总 {applied, failed, skipped}
// 约束:
// - 计划中缺失的列跳过，不报错
// - 单列失败不影响其他列，且该列保留原值
// - 输出表以 `transformed_<name>` 为键，行数不变
// ==========================================

use crate::domain::entity::transformed_key;
use crate::domain::table::{Column, Table, Value};
use crate::domain::table_set::TableSet;
use crate::report::{ReportEvent, ReportSink};
use crate::transform::coercion::{
    coerce_date, coerce_flag, coerce_float, coerce_int, coerce_string,
    float_column_is_structurally_invalid, Coerced, CoercionStats,
};
use crate::transform::error::{TransformError, TransformResult};
use crate::transform::registry::{ColumnPlan, ColumnRegistry, Transformation};
use crate::transform::text_cleaner::{CleanOutcome, TextCleaner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 统计结构
// ==========================================

/// 批量转换统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchOutcome {
    fn merge(&mut self, other: &BatchOutcome) {
        self.applied += other.applied;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// 全部表的转换报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    /// 按输出键记录每表统计
    pub tables: BTreeMap<String, BatchOutcome>,
    pub total: BatchOutcome,
}

/// 转换输出
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub tables: TableSet,
    pub report: TransformReport,
}

/// 单列转换结果
struct ColumnResult {
    values: Vec<Value>,
    stats: CoercionStats,
    first_failure: Option<String>,
}

// ==========================================
// TransformEngine
// ==========================================
pub struct TransformEngine {
    registry: ColumnRegistry,
    cleaner: TextCleaner,
    sink: Arc<dyn ReportSink>,
}

impl TransformEngine {
    /// 使用标准注册表创建引擎
    ///
    /// # 错误
    /// - 模式配置无效时返回 InvalidPattern
    pub fn new(sink: Arc<dyn ReportSink>) -> TransformResult<Self> {
        Ok(Self::with_parts(
            ColumnRegistry::standard()?,
            TextCleaner::new()?,
            sink,
        ))
    }

    pub fn with_parts(
        registry: ColumnRegistry,
        cleaner: TextCleaner,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            registry,
            cleaner,
            sink,
        }
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    /// 转换全部输入表（主表 + 实体投影）
    #[instrument(skip(self, tables), fields(table_count = tables.len()))]
    pub fn transform_tables(&self, tables: Vec<Table>) -> TransformOutput {
        let mut output = TransformOutput::default();

        for table in tables {
            let key = transformed_key(&table.name);
            let (transformed, outcome) = self.transform_table(table);
            output.report.total.merge(&outcome);
            output.report.tables.insert(key.clone(), outcome);
            output.tables.insert(key, transformed);
        }

        info!(
            tables = output.tables.len(),
            applied = output.report.total.applied,
            failed = output.report.total.failed,
            skipped = output.report.total.skipped,
            "转换完成"
        );
        output
    }

    /// 按注册表分类结果转换单表
    pub fn transform_table(&self, mut table: Table) -> (Table, BatchOutcome) {
        let plan = self.registry.plan_for(&table);
        let outcome = self.apply_transformations(&mut table, &plan);
        (table, outcome)
    }

    /// 按给定计划逐列转换
    pub fn apply_transformations(&self, table: &mut Table, plan: &[ColumnPlan]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let table_name = table.name.clone();

        for step in plan {
            let Some(column) = table.column_mut(&step.column) else {
                debug!(table = %table_name, column = %step.column, "列不存在，跳过");
                self.sink.record(ReportEvent::ColumnSkipped {
                    table: table_name.clone(),
                    column: step.column.clone(),
                });
                outcome.skipped += 1;
                continue;
            };

            match self.apply_column(&table_name, column, step.transformation) {
                Ok(result) => {
                    if result.stats.failed > 0 {
                        warn!(
                            table = %table_name,
                            column = %column.name,
                            transformation = %step.transformation,
                            failed = result.stats.failed,
                            sample = result.first_failure.as_deref().unwrap_or(""),
                            "存在无法转换的值，已置空"
                        );
                    }
                    self.sink.record(ReportEvent::ColumnApplied {
                        table: table_name.clone(),
                        column: column.name.clone(),
                        transformation: step.transformation.to_string(),
                        converted: result.stats.converted,
                        defaulted: result.stats.defaulted,
                        failed: result.stats.failed,
                    });
                    column.values = result.values;
                    outcome.applied += 1;
                }
                Err(e) => {
                    warn!(
                        table = %table_name,
                        column = %column.name,
                        transformation = %step.transformation,
                        error = %e,
                        "列转换失败，保留原值"
                    );
                    self.sink.record(ReportEvent::ColumnFailed {
                        table: table_name.clone(),
                        column: column.name.clone(),
                        transformation: step.transformation.to_string(),
                        reason: e.to_string(),
                    });
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// 单列转换；返回 Err 时调用方保留原值
    fn apply_column(
        &self,
        table_name: &str,
        column: &Column,
        transformation: Transformation,
    ) -> TransformResult<ColumnResult> {
        match transformation {
            Transformation::Int => Ok(map_values(&column.values, coerce_int)),
            Transformation::Str => Ok(map_values(&column.values, coerce_string)),
            Transformation::Date => Ok(map_values(&column.values, coerce_date)),
            Transformation::Flag => Ok(map_values(&column.values, coerce_flag)),
            Transformation::Float => {
                if float_column_is_structurally_invalid(&column.values) {
                    // 整列无法转换: 全部置空，不保留部分结果
                    let failed = column.len() - column.null_count();
                    warn!(table = %table_name, column = %column.name, "整列浮点转换失败，列置空");
                    return Ok(ColumnResult {
                        values: vec![Value::Null; column.len()],
                        stats: CoercionStats {
                            converted: 0,
                            defaulted: column.null_count(),
                            failed,
                        },
                        first_failure: Some("列中含日期时间值".to_string()),
                    });
                }
                Ok(map_values(&column.values, coerce_float))
            }
            Transformation::CleanText => self.clean_column(table_name, column),
        }
    }

    fn clean_column(&self, table_name: &str, column: &Column) -> TransformResult<ColumnResult> {
        if let Some(bad) = column
            .values
            .iter()
            .find(|v| matches!(v, Value::Bool(_) | Value::DateTime(_)))
        {
            return Err(TransformError::ColumnTypeMismatch {
                column: column.name.clone(),
                message: format!("文本清洗不适用于 {} 值", bad.type_name()),
            });
        }

        let mut stats = CoercionStats::default();
        let mut values = Vec::with_capacity(column.len());
        for (row, value) in column.values.iter().enumerate() {
            let Some(text) = value.to_text() else {
                stats.defaulted += 1;
                values.push(Value::Null);
                continue;
            };

            match self.cleaner.clean(&text) {
                CleanOutcome::Cleaned(cleaned) => values.push(Value::Text(cleaned)),
                CleanOutcome::Degraded { value, reason } => {
                    self.sink.record(ReportEvent::ValueDegraded {
                        table: table_name.to_string(),
                        column: column.name.clone(),
                        row,
                        reason: reason.to_string(),
                    });
                    values.push(Value::Text(value));
                }
            }
            stats.converted += 1;
        }

        Ok(ColumnResult {
            values,
            stats,
            first_failure: None,
        })
    }
}

fn map_values(values: &[Value], f: fn(&Value) -> Coerced) -> ColumnResult {
    let mut stats = CoercionStats::default();
    let mut first_failure = None;
    let values = values
        .iter()
        .map(|v| {
            let outcome = f(v);
            stats.record(&outcome);
            if let Coerced::Failed(reason) = &outcome {
                first_failure.get_or_insert_with(|| reason.clone());
            }
            outcome.into_value()
        })
        .collect();

    ColumnResult {
        values,
        stats,
        first_failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReportSink;
    use chrono::NaiveDate;

    fn engine_with_sink() -> (TransformEngine, Arc<RecordingReportSink>) {
        let sink = Arc::new(RecordingReportSink::new());
        let engine = TransformEngine::new(sink.clone()).unwrap();
        (engine, sink)
    }

    fn table() -> Table {
        Table::from_rows(
            "box",
            vec![
                "BOX_WEIGHT_KG".to_string(),
                "SUPPLIER_NAME".to_string(),
                "BOX_LENGTH_MM".to_string(),
            ],
            vec![
                vec![Value::from("12.345"), Value::from("acmeParts"), Value::from("600")],
                vec![Value::from("abc"), Value::Null, Value::from(" 400 ")],
                vec![Value::Null, Value::from("ООО Деталь"), Value::from("x")],
            ],
        )
    }

    #[test]
    fn test_transform_table_counts() {
        let (engine, sink) = engine_with_sink();
        let (out, outcome) = engine.transform_table(table());

        assert_eq!(outcome, BatchOutcome { applied: 3, failed: 0, skipped: 0 });
        assert_eq!(
            out.column("BOX_WEIGHT_KG").unwrap().values,
            vec![Value::Float(12.35), Value::Null, Value::Null]
        );
        assert_eq!(
            out.column("BOX_LENGTH_MM").unwrap().values,
            vec![Value::Int(600), Value::Int(400), Value::Null]
        );
        assert_eq!(out.value(0, "SUPPLIER_NAME"), &Value::from("Acme Parts"));
        assert_eq!(out.value(1, "SUPPLIER_NAME"), &Value::Null);
        assert_eq!(
            sink.count_where(|e| matches!(e, ReportEvent::ColumnApplied { .. })),
            3
        );
    }

    #[test]
    fn test_missing_column_is_skipped() {
        let (engine, _) = engine_with_sink();
        let mut t = table();
        let plan = vec![
            ColumnPlan::new("BOX_WEIGHT_KG", Transformation::Float),
            ColumnPlan::new("PALLET_WEIGHT_KG", Transformation::Float),
        ];
        let outcome = engine.apply_transformations(&mut t, &plan);
        assert_eq!(outcome, BatchOutcome { applied: 1, failed: 0, skipped: 1 });
    }

    #[test]
    fn test_failed_column_keeps_prior_values() {
        let (engine, sink) = engine_with_sink();
        let when = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut t = Table::from_rows(
            "main",
            vec!["PART_NAME".to_string(), "PART_WEIGHT_KG".to_string()],
            vec![
                vec![Value::DateTime(when), Value::from("1.005")],
                vec![Value::from("gear"), Value::from("2")],
            ],
        );
        let plan = vec![
            ColumnPlan::new("PART_NAME", Transformation::CleanText),
            ColumnPlan::new("PART_WEIGHT_KG", Transformation::Float),
        ];

        let outcome = engine.apply_transformations(&mut t, &plan);

        assert_eq!(outcome, BatchOutcome { applied: 1, failed: 1, skipped: 0 });
        assert_eq!(t.value(0, "PART_NAME"), &Value::DateTime(when));
        assert_eq!(t.value(1, "PART_NAME"), &Value::from("gear"));
        assert_eq!(t.value(1, "PART_WEIGHT_KG"), &Value::Float(2.0));
        assert_eq!(
            sink.count_where(|e| matches!(e, ReportEvent::ColumnFailed { .. })),
            1
        );
    }

    #[test]
    fn test_structural_float_failure_nulls_column() {
        let (engine, _) = engine_with_sink();
        let when = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut t = Table::from_rows(
            "box",
            vec!["BOX_VOL_M3".to_string()],
            vec![vec![Value::from("0.5")], vec![Value::DateTime(when)]],
        );
        engine.apply_transformations(
            &mut t,
            &[ColumnPlan::new("BOX_VOL_M3", Transformation::Float)],
        );
        assert_eq!(
            t.column("BOX_VOL_M3").unwrap().values,
            vec![Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_transform_tables_uses_transformed_keys() {
        let (engine, _) = engine_with_sink();
        let output = engine.transform_tables(vec![table(), Table::new("main")]);
        assert!(output.tables.get("transformed_box").is_some());
        assert!(output.tables.get("transformed_main").is_some());
        assert_eq!(output.report.total.applied, 3);
        assert_eq!(output.tables.get("transformed_box").unwrap().row_count(), 3);
    }

    #[test]
    fn test_degraded_value_is_reported() {
        let sink = Arc::new(RecordingReportSink::new());
        let engine = TransformEngine::with_parts(
            ColumnRegistry::standard().unwrap(),
            TextCleaner::new().unwrap().with_max_chars(4),
            sink.clone(),
        );
        let (out, outcome) = engine.transform_table(Table::from_rows(
            "supplier",
            vec!["SUPPLIER_NAME".to_string()],
            vec![vec![Value::from("longName_x")]],
        ));
        assert_eq!(outcome.applied, 1);
        assert_eq!(out.value(0, "SUPPLIER_NAME"), &Value::from("Longname X"));
        assert_eq!(
            sink.count_where(|e| matches!(e, ReportEvent::ValueDegraded { .. })),
            1
        );
    }
}
