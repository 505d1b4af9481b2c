// ==========================================
// 主数据 ETL - 装载引擎
// ==========================================
// 状态机:
//   Idle -> ConstraintsRelaxed -> EntitiesLoading -> JunctionsLoading
//   -> BreakpointsLoading -> ConstraintsRestored -> Verified -> {Success | Failed}
// 规则:
// - 约束关闭失败时跳过 ConstraintsRelaxed，装载照常进行
// - 约束关闭后无论各阶段结果如何都恢复一次
// - 连接类错误中止后续装载阶段，恢复与校验照常执行
// - 入口不返回 Err，所有可分类的失败都写入 LoadResult
// - success = 校验总行数 > 0 且约束恢复成功
// ==========================================

use crate::domain::entity::{transformed_key, EntityKind, MAIN_TABLE};
use crate::domain::table_set::TableSet;
use crate::loader::breakpoint::{self, load_breakpoint_data};
use crate::loader::constraint::{ConstraintManager, ConstraintReport};
use crate::loader::entity_loader::{self, load_all_entity_tables};
use crate::loader::error::{ErrorKind, LoadError, LoaderResult};
use crate::loader::junction_loader::{self, load_all_junction_tables};
use crate::loader::phase::PhaseOutcome;
use crate::loader::repository::LoadRepository;
use crate::loader::verify::{check_foreign_keys, verify_table_counts};
use crate::report::{noop_sink, ReportEvent, ReportSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// LoadState - 装载状态
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    ConstraintsRelaxed,
    EntitiesLoading,
    JunctionsLoading,
    BreakpointsLoading,
    ConstraintsRestored,
    Verified,
    Success,
    Failed,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::ConstraintsRelaxed => "constraints_relaxed",
            LoadState::EntitiesLoading => "entities_loading",
            LoadState::JunctionsLoading => "junctions_loading",
            LoadState::BreakpointsLoading => "breakpoints_loading",
            LoadState::ConstraintsRestored => "constraints_restored",
            LoadState::Verified => "verified",
            LoadState::Success => "success",
            LoadState::Failed => "failed",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// LoadResult - 装载结果
// ==========================================

/// 分阶段计数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResults {
    pub entity_tables: BTreeMap<String, usize>,
    pub junction_tables: BTreeMap<String, usize>,
    pub breakpoint_data: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub success: bool,
    /// 校验阶段的逐表行数
    pub record_counts: BTreeMap<String, usize>,
    pub step_results: StepResults,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// 表级错误（表名 -> 错误信息）
    pub table_errors: BTreeMap<String, String>,
    pub foreign_key_violations: Option<usize>,
    pub constraints: ConstraintReport,
    pub states: Vec<LoadState>,
}

impl LoadResult {
    /// 校验总行数
    pub fn total_records(&self) -> usize {
        self.record_counts.values().sum()
    }

    fn push_error(&mut self, message: String, kind: ErrorKind) {
        self.error = Some(match self.error.take() {
            Some(previous) => format!("{}; {}", previous, message),
            None => message,
        });
        self.error_kind.get_or_insert(kind);
    }
}

/// 状态轨迹（同时写入 sink）
struct StateTrace<'a> {
    sink: &'a dyn ReportSink,
    states: Vec<LoadState>,
}

impl<'a> StateTrace<'a> {
    fn new(sink: &'a dyn ReportSink) -> Self {
        Self {
            sink,
            states: Vec::new(),
        }
    }

    fn enter(&mut self, state: LoadState) {
        debug!(state = %state, "装载状态迁移");
        self.sink.record(ReportEvent::StateEntered {
            state: state.as_str().to_string(),
        });
        self.states.push(state);
    }
}

// ==========================================
// LoadEngine - 装载引擎
// ==========================================

pub struct LoadEngine {
    repo: Arc<dyn LoadRepository>,
    sink: Arc<dyn ReportSink>,
}

impl LoadEngine {
    pub fn new(repo: Arc<dyn LoadRepository>) -> Self {
        Self {
            repo,
            sink: noop_sink(),
        }
    }

    pub fn with_sink(repo: Arc<dyn LoadRepository>, sink: Arc<dyn ReportSink>) -> Self {
        Self { repo, sink }
    }

    /// 入参校验: 主表与零件表必须存在且非空
    pub fn validate(tables: &TableSet) -> LoaderResult<()> {
        let required = [transformed_key(MAIN_TABLE), EntityKind::Part.table_key()];
        for key in required {
            match tables.get(&key) {
                None => return Err(LoadError::MissingTable(key)),
                Some(t) if t.is_empty() => return Err(LoadError::EmptyTable(key)),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// 执行一次装载
    ///
    /// # 参数
    /// - tables: `transformed_<name>` 表集合
    /// - truncate: 写入前是否清空目标表（级联）
    #[instrument(skip(self, tables), fields(tables = tables.len()))]
    pub async fn load(&self, tables: &TableSet, truncate: bool) -> LoadResult {
        let sink = self.sink.as_ref();
        let mut trace = StateTrace::new(sink);
        let mut result = LoadResult::default();
        trace.enter(LoadState::Idle);

        if let Err(e) = Self::validate(tables) {
            error!(error = %e, "装载入参校验失败");
            result.push_error(e.to_string(), e.kind());
            trace.enter(LoadState::Failed);
            result.states = trace.states;
            return result;
        }
        let Some(main) = tables.main() else {
            // validate 已保证主表存在
            result.push_error(
                LoadError::MissingTable(transformed_key(MAIN_TABLE)).to_string(),
                ErrorKind::Validation,
            );
            trace.enter(LoadState::Failed);
            result.states = trace.states;
            return result;
        };

        info!(truncate, "开始装载");
        let mut constraints = ConstraintManager::new(self.repo.clone());
        constraints.relax().await;
        if constraints.report().relaxed {
            trace.enter(LoadState::ConstraintsRelaxed);
        }

        // ===== 装载阶段 =====
        let repo = self.repo.as_ref();
        let mut fatal: Option<LoadError> = None;

        trace.enter(LoadState::EntitiesLoading);
        let entities = load_all_entity_tables(repo, tables, truncate, sink).await;
        absorb(&mut result, &mut fatal, entity_loader::PHASE, &entities);
        result.step_results.entity_tables = entities.counts;

        if fatal.is_none() {
            trace.enter(LoadState::JunctionsLoading);
            let junctions = load_all_junction_tables(repo, main, truncate, sink).await;
            absorb(&mut result, &mut fatal, junction_loader::PHASE, &junctions);
            result.step_results.junction_tables = junctions.counts;
        }

        if fatal.is_none() {
            trace.enter(LoadState::BreakpointsLoading);
            let breakpoints = load_breakpoint_data(repo, main, truncate, sink).await;
            absorb(&mut result, &mut fatal, breakpoint::PHASE, &breakpoints);
            result.step_results.breakpoint_data = breakpoints.counts;
        }

        if let Some(e) = &fatal {
            result.push_error(e.to_string(), e.kind());
        }

        // ===== 约束恢复（无条件） =====
        let restored = constraints.restore().await;
        match &restored {
            Ok(()) => trace.enter(LoadState::ConstraintsRestored),
            Err(e) => result.push_error(e.to_string(), e.kind()),
        }
        result.constraints = constraints.into_report();

        // ===== 校验 =====
        result.record_counts = verify_table_counts(repo).await;
        result.foreign_key_violations = check_foreign_keys(repo).await;
        trace.enter(LoadState::Verified);

        let total = result.total_records();
        result.success = total > 0 && restored.is_ok();
        if total == 0 && result.error.is_none() {
            result.error = Some("校验未发现任何已装载记录".to_string());
        }

        if result.success {
            info!(total, "装载成功");
            trace.enter(LoadState::Success);
        } else {
            warn!(total, error = ?result.error, "装载失败");
            trace.enter(LoadState::Failed);
        }
        result.states = trace.states;
        result
    }
}

/// 合并阶段表级错误，记录首个阶段中止错误
fn absorb(
    result: &mut LoadResult,
    fatal: &mut Option<LoadError>,
    phase: &str,
    outcome: &PhaseOutcome,
) {
    for (table, message) in &outcome.errors {
        result.table_errors.insert(table.clone(), message.clone());
    }
    if let Some(e) = &outcome.fatal {
        error!(phase, error = %e, "阶段中止，跳过后续装载阶段");
        fatal.get_or_insert_with(|| e.clone());
    }
}
