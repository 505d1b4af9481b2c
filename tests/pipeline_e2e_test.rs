// ==========================================
// 流水线端到端测试
// ==========================================
// 测试目标: CSV 源文件 -> 抽取 -> 转换 -> SQLite 装载
// ==========================================


use mft_etl::config::EtlConfig;
use mft_etl::loader::LoadState;
use mft_etl::pipeline::{self, RunLock};
use mft_etl::report::RecordingReportSink;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use test_helpers::{count_rows, write_sample_csv, EXPECTED_COUNTS};

fn config_in(dir: &Path) -> EtlConfig {
    EtlConfig {
        db_path: dir.join("db").join("mft.db"),
        max_retries: 1,
        retry_delay_ms: 10,
        ..EtlConfig::default()
    }
}

#[tokio::test]
async fn test_csv_to_sqlite() {
    let dir = tempdir().unwrap();
    let source = write_sample_csv(dir.path()).unwrap();
    let config = config_in(dir.path());

    let report = pipeline::run(&config, &source).await.unwrap();

    assert!(report.success(), "error: {:?}", report.load.error);
    assert_eq!(report.extract.rows, 3);
    assert_eq!(report.extract.entities.get("part"), Some(&3));
    assert!(report.extract.missing.is_empty());
    assert_eq!(report.transform.total.failed, 0);
    assert_eq!(report.load.states.last(), Some(&LoadState::Success));

    let db_path = config.db_path_str();
    for (table, expected) in EXPECTED_COUNTS {
        assert_eq!(count_rows(&db_path, table), expected as i64, "table {}", table);
    }

    // 运行结束后锁释放，源文件默认保留
    assert!(!config.lock_path().exists());
    assert!(source.exists());
    assert!(!report.source_removed);
}

#[tokio::test]
async fn test_cleanup_removes_source_after_success() {
    let dir = tempdir().unwrap();
    let source = write_sample_csv(dir.path()).unwrap();
    let config = EtlConfig {
        cleanup_source: true,
        ..config_in(dir.path())
    };

    let report = pipeline::run(&config, &source).await.unwrap();

    assert!(report.success());
    assert!(report.source_removed);
    assert!(!source.exists());
}

#[tokio::test]
async fn test_rerun_with_truncate_keeps_counts() {
    let dir = tempdir().unwrap();
    let source = write_sample_csv(dir.path()).unwrap();
    let config = config_in(dir.path());

    let first = pipeline::run(&config, &source).await.unwrap();
    let sink = Arc::new(RecordingReportSink::new());
    let second = pipeline::run_with_sink(&config, &source, sink.clone())
        .await
        .unwrap();

    assert_eq!(first.load.record_counts, second.load.record_counts);
    assert_eq!(sink.states().last().map(String::as_str), Some("success"));
}

#[tokio::test]
async fn test_held_lock_rejects_run() {
    let dir = tempdir().unwrap();
    let source = write_sample_csv(dir.path()).unwrap();
    let config = config_in(dir.path());

    let _held = RunLock::acquire(&config.lock_path()).unwrap();
    let err = pipeline::run(&config, &source).await.unwrap_err();

    assert!(err.to_string().contains("已有装载任务在运行"));
    assert!(!config.db_path.exists());
}

#[tokio::test]
async fn test_missing_source_is_an_error() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let result = pipeline::run(&config, &dir.path().join("absent.csv")).await;

    assert!(result.is_err());
    assert!(!config.lock_path().exists());
}

#[tokio::test]
async fn test_unsupported_extension_is_an_error() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("master_data.txt");
    std::fs::write(&source, "PART_NUMBER\n100-01\n").unwrap();

    let result = pipeline::run(&config_in(dir.path()), &source).await;

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("源文件抽取失败"));
}
