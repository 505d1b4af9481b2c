// ==========================================
// TransformEngine 集成测试
// ==========================================
// 测试目标: 抽取后的表集合经转换引擎后的类型与统计
// ==========================================


use chrono::NaiveDate;
use mft_etl::domain::{Table, Value};
use mft_etl::importer::Extractor;
use mft_etl::report::{ReportEvent, RecordingReportSink};
use mft_etl::transform::{BatchOutcome, ColumnPlan, TransformEngine, Transformation};
use std::sync::Arc;
use test_helpers::sample_main_table;

fn engine() -> (TransformEngine, Arc<RecordingReportSink>) {
    let sink = Arc::new(RecordingReportSink::new());
    (TransformEngine::new(sink.clone()).unwrap(), sink)
}

#[test]
fn test_transformed_keys_for_all_entities() {
    let (engine, _) = engine();
    let extracted = Extractor::new().extract_from_table(sample_main_table()).unwrap();

    let output = engine.transform_tables(extracted.tables);

    let keys: Vec<&str> = output.tables.keys().collect();
    for key in [
        "transformed_main",
        "transformed_supplier",
        "transformed_part",
        "transformed_box",
        "transformed_pallet",
        "transformed_model",
        "transformed_workshop",
        "transformed_line",
    ] {
        assert!(keys.contains(&key), "缺少 {}", key);
    }
    assert_eq!(output.report.total.failed, 0);
    assert_eq!(output.report.total.skipped, 0);
    assert_eq!(
        output.report.tables.get("transformed_supplier"),
        Some(&BatchOutcome { applied: 7, failed: 0, skipped: 0 })
    );
}

#[test]
fn test_sample_values_are_coerced() {
    let (engine, sink) = engine();
    let extracted = Extractor::new().extract_from_table(sample_main_table()).unwrap();
    let output = engine.transform_tables(extracted.tables);

    let supplier = output.tables.get("transformed_supplier").unwrap();
    assert_eq!(
        supplier.value(0, "SUPPLIER_NAME"),
        &Value::from("Beijing Auto Parts Youxiangongsi")
    );
    assert_eq!(supplier.value(0, "LOCALIZATION"), &Value::from("yes"));
    assert_eq!(supplier.value(2, "LOCALIZATION"), &Value::from("no"));
    assert_eq!(supplier.value(0, "BUILDING"), &Value::from("12"));

    let boxes = output.tables.get("transformed_box").unwrap();
    assert_eq!(boxes.value(0, "BOX_WEIGHT_KG"), &Value::Float(1.2));
    assert_eq!(boxes.value(0, "BOX_LENGTH_MM"), &Value::Int(600));
    assert_eq!(boxes.value(2, "BOX_STACKING"), &Value::Int(5));

    let part = output.tables.get("transformed_part").unwrap();
    assert_eq!(part.value(0, "PART_NAME"), &Value::from("Front Bumper"));
    assert_eq!(part.value(2, "PART_NAME"), &Value::from("Steering Wheel"));

    let main = output.tables.get("transformed_main").unwrap();
    let switch_day = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(main.value(0, "BREAKPOINT_DATE"), &Value::DateTime(switch_day));
    assert_eq!(main.value(1, "BREAKPOINT_DATE"), &Value::Null);

    assert!(sink.count_where(|e| matches!(e, ReportEvent::ColumnApplied { .. })) > 0);
    assert_eq!(
        sink.count_where(|e| matches!(e, ReportEvent::ColumnFailed { .. })),
        0
    );
}

#[test]
fn test_weight_scenario_rounds_and_nulls() {
    let (engine, sink) = engine();
    let table = Table::from_rows(
        "box",
        vec!["BOX_WEIGHT_KG".to_string()],
        vec![
            vec![Value::from("12.345")],
            vec![Value::from("abc")],
            vec![Value::Null],
        ],
    );

    let (out, outcome) = engine.transform_table(table);

    assert_eq!(outcome, BatchOutcome { applied: 1, failed: 0, skipped: 0 });
    assert_eq!(
        out.column("BOX_WEIGHT_KG").unwrap().values,
        vec![Value::Float(12.35), Value::Null, Value::Null]
    );
    let applied: Vec<ReportEvent> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, ReportEvent::ColumnApplied { .. }))
        .collect();
    assert_eq!(
        applied,
        vec![ReportEvent::ColumnApplied {
            table: "box".to_string(),
            column: "BOX_WEIGHT_KG".to_string(),
            transformation: "float".to_string(),
            converted: 1,
            defaulted: 1,
            failed: 1,
        }]
    );
}

#[test]
fn test_plan_with_absent_and_failing_columns() {
    let (engine, sink) = engine();
    let when = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();
    let mut table = Table::from_rows(
        "part",
        vec!["PART_NAME".to_string(), "PART_WEIGHT_KG".to_string()],
        vec![
            vec![Value::from("gearBox"), Value::from("1.005")],
            vec![Value::DateTime(when), Value::Int(3)],
        ],
    );
    let plan = vec![
        ColumnPlan::new("PART_NAME", Transformation::CleanText),
        ColumnPlan::new("PART_WEIGHT_KG", Transformation::Float),
        ColumnPlan::new("PALLET_STACKING", Transformation::Int),
    ];

    let outcome = engine.apply_transformations(&mut table, &plan);

    assert_eq!(outcome, BatchOutcome { applied: 1, failed: 1, skipped: 1 });
    // 失败列保留原值
    assert_eq!(table.value(0, "PART_NAME"), &Value::from("gearBox"));
    assert_eq!(table.value(1, "PART_NAME"), &Value::DateTime(when));
    assert_eq!(table.value(1, "PART_WEIGHT_KG"), &Value::Float(3.0));
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        sink.count_where(|e| matches!(
            e,
            ReportEvent::ColumnSkipped { column, .. } if column == "PALLET_STACKING"
        )),
        1
    );
}

#[test]
fn test_engine_is_deterministic_across_runs() {
    let (engine, _) = engine();
    let first = engine.transform_table(sample_main_table());
    let second = engine.transform_table(sample_main_table());
    assert_eq!(first, second);
}
