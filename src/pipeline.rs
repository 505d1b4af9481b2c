// ==========================================
// 主数据 ETL - 流水线编排
// ==========================================
// 流程: 抽取 -> 转换 -> 建库/连接 -> 装载 -> （可选）删除源文件
// 串行化: 同一数据库同时只允许一个运行（`<db>.lock` 排他创建）
// ==========================================

use crate::config::EtlConfig;
use crate::db::{connect_with_retry, ensure_schema};
use crate::importer::{ExtractReport, Extractor};
use crate::loader::{LoadEngine, LoadResult, SqliteLoadRepository};
use crate::report::{noop_sink, ReportSink};
use crate::transform::{TransformEngine, TransformReport};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ==========================================
// RunLock - 运行锁
// ==========================================

/// 运行锁文件，Drop 时删除
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// 排他创建锁文件；已存在说明有其他运行在进行
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("无法创建目录: {}", parent.display()))?;
            }
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                // 锁内容仅供排查
                let _ = writeln!(file, "pid={}", std::process::id());
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!("已有装载任务在运行（锁文件: {}）", path.display())
            }
            Err(e) => Err(e).with_context(|| format!("无法创建锁文件: {}", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "锁文件删除失败");
        }
    }
}

// ==========================================
// PipelineReport - 流水线报告
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub source: String,
    pub extract: ExtractReport,
    pub transform: TransformReport,
    pub load: LoadResult,
    pub source_removed: bool,
}

impl PipelineReport {
    pub fn success(&self) -> bool {
        self.load.success
    }
}

/// 执行一次完整流水线
pub async fn run(config: &EtlConfig, source: &Path) -> anyhow::Result<PipelineReport> {
    run_with_sink(config, source, noop_sink()).await
}

/// 执行一次完整流水线，事件写入给定 sink
pub async fn run_with_sink(
    config: &EtlConfig,
    source: &Path,
    sink: Arc<dyn ReportSink>,
) -> anyhow::Result<PipelineReport> {
    config.validate()?;
    let _lock = RunLock::acquire(&config.lock_path())?;
    info!(source = %source.display(), db = %config.db_path.display(), "开始 ETL 运行");

    // ===== 抽取 =====
    let extracted = Extractor::new()
        .extract(source)
        .with_context(|| format!("源文件抽取失败: {}", source.display()))?;

    // ===== 转换 =====
    let transformer = TransformEngine::new(sink.clone()).context("转换引擎初始化失败")?;
    let transformed = transformer.transform_tables(extracted.tables);

    // ===== 装载 =====
    let conn = connect_with_retry(config).await?;
    ensure_schema(&conn)?;
    let repo = SqliteLoadRepository::from_connection(Arc::new(Mutex::new(conn)));
    let loader = LoadEngine::with_sink(Arc::new(repo), sink);
    let load = loader
        .load(&transformed.tables, config.truncate_before_load)
        .await;

    // ===== 清理 =====
    let mut source_removed = false;
    if config.cleanup_source && load.success {
        match std::fs::remove_file(source) {
            Ok(()) => {
                info!(source = %source.display(), "源文件已删除");
                source_removed = true;
            }
            Err(e) => warn!(source = %source.display(), error = %e, "源文件删除失败"),
        }
    }

    info!(
        success = load.success,
        total = load.total_records(),
        "ETL 运行结束"
    );
    Ok(PipelineReport {
        source: source.display().to_string(),
        extract: extracted.report,
        transform: transformed.report,
        load,
        source_removed,
    })
}
