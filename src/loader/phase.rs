// ==========================================
// 主数据 ETL - 装载阶段结果
// ==========================================
// 职责: 单阶段内的逐表计数、表级错误、阶段中止错误
// 规则: 表级错误计数为 0 并继续；连接类错误中止本阶段
// ==========================================

use crate::loader::error::LoadError;
use crate::report::{ReportEvent, ReportSink};
use std::collections::BTreeMap;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutcome {
    pub counts: BTreeMap<String, usize>,
    pub errors: BTreeMap<String, String>,
    pub fatal: Option<LoadError>,
}

impl PhaseOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn record_loaded(&mut self, sink: &dyn ReportSink, phase: &str, table: &str, count: usize) {
        info!(phase, table, count, "表装载完成");
        sink.record(ReportEvent::TableLoaded {
            phase: phase.to_string(),
            table: table.to_string(),
            count,
        });
        self.counts.insert(table.to_string(), count);
    }

    /// 记录表级失败；连接类错误同时标记阶段中止
    pub fn record_failed(
        &mut self,
        sink: &dyn ReportSink,
        phase: &str,
        table: &str,
        err: LoadError,
    ) {
        error!(phase, table, error = %err, kind = %err.kind(), "表装载失败");
        sink.record(ReportEvent::TableFailed {
            phase: phase.to_string(),
            table: table.to_string(),
            error: err.to_string(),
        });
        self.counts.insert(table.to_string(), 0);
        self.errors.insert(table.to_string(), err.to_string());
        if err.aborts_phase() && self.fatal.is_none() {
            self.fatal = Some(err);
        }
    }
}
