// ==========================================
// 主数据 ETL - 运行报告通道
// ==========================================
// 职责: 定义报告事件与 ReportSink trait
// 说明: 转换引擎与装载引擎显式持有 sink，统计结果可直接断言
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 报告事件
// ==========================================

/// 引擎运行期间产生的报告事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    // ===== 转换阶段 =====
    /// 列转换完成
    ColumnApplied {
        table: String,
        column: String,
        transformation: String,
        converted: usize,
        defaulted: usize,
        failed: usize,
    },
    /// 列转换失败（保留原值）
    ColumnFailed {
        table: String,
        column: String,
        transformation: String,
        reason: String,
    },
    /// 计划中的列在表中不存在
    ColumnSkipped { table: String, column: String },
    /// 单值清洗降级
    ValueDegraded {
        table: String,
        column: String,
        row: usize,
        reason: String,
    },

    // ===== 装载阶段 =====
    /// 装载状态机迁移
    StateEntered { state: String },
    /// 表写入完成
    TableLoaded {
        phase: String,
        table: String,
        count: usize,
    },
    /// 表写入失败（计数为 0）
    TableFailed {
        phase: String,
        table: String,
        error: String,
    },
}

// ==========================================
// ReportSink Trait
// ==========================================

/// 报告接收者
pub trait ReportSink: Send + Sync {
    fn record(&self, event: ReportEvent);
}

/// 空操作接收者
#[derive(Debug, Clone, Default)]
pub struct NoOpReportSink;

impl ReportSink for NoOpReportSink {
    fn record(&self, event: ReportEvent) {
        tracing::trace!(?event, "NoOpReportSink: 丢弃报告事件");
    }
}

/// 内存记录接收者
///
/// 用于测试与 CLI 汇总
#[derive(Debug, Default)]
pub struct RecordingReportSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录事件的快照
    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 装载状态迁移轨迹
    pub fn states(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::StateEntered { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    /// 满足条件的事件数
    pub fn count_where(&self, predicate: impl Fn(&ReportEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl ReportSink for RecordingReportSink {
    fn record(&self, event: ReportEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// 默认接收者
pub fn noop_sink() -> Arc<dyn ReportSink> {
    Arc::new(NoOpReportSink)
}
