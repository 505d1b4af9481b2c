// ==========================================
// 脚本化装载仓储 - 用于故障注入测试
// ==========================================
// 行为:
// - 内存中按表记录行数
// - 可为指定表的插入、约束关闭/恢复注入错误
// - 记录每次调用，便于断言调用次数与顺序
// ==========================================

use async_trait::async_trait;
use mft_etl::domain::Table;
use mft_etl::loader::schema::cascade_order;
use mft_etl::loader::{LoadError, LoadRepository, LoaderResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    counts: BTreeMap<String, usize>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedRepository {
    state: Mutex<State>,
    insert_failures: HashMap<String, LoadError>,
    relax_failure: Option<LoadError>,
    restore_failure: Option<LoadError>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定表插入失败
    pub fn fail_insert(mut self, table: &str, err: LoadError) -> Self {
        self.insert_failures.insert(table.to_string(), err);
        self
    }

    pub fn fail_relax(mut self, err: LoadError) -> Self {
        self.relax_failure = Some(err);
        self
    }

    pub fn fail_restore(mut self, err: LoadError) -> Self {
        self.restore_failure = Some(err);
        self
    }

    /// 全部调用记录，如 "insert:part_data"
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl LoadRepository for ScriptedRepository {
    async fn relax_constraints(&self) -> LoaderResult<()> {
        self.log("relax".to_string());
        match &self.relax_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn restore_constraints(&self) -> LoaderResult<()> {
        self.log("restore".to_string());
        match &self.restore_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn truncate_cascade(&self, table: &str) -> LoaderResult<Vec<String>> {
        self.log(format!("truncate:{}", table));
        let mut state = self.state.lock().unwrap();
        let cleared: Vec<String> = cascade_order(table).into_iter().map(str::to_string).collect();
        for t in &cleared {
            state.counts.insert(t.clone(), 0);
        }
        Ok(cleared)
    }

    async fn insert_rows(&self, table: &str, rows: &Table) -> LoaderResult<usize> {
        self.log(format!("insert:{}", table));
        if let Some(err) = self.insert_failures.get(table) {
            return Err(err.clone());
        }
        let mut state = self.state.lock().unwrap();
        *state.counts.entry(table.to_string()).or_insert(0) += rows.row_count();
        Ok(rows.row_count())
    }

    async fn count_rows(&self, table: &str) -> LoaderResult<usize> {
        self.log(format!("count:{}", table));
        Ok(self.state.lock().unwrap().counts.get(table).copied().unwrap_or(0))
    }

    async fn foreign_key_violations(&self) -> LoaderResult<usize> {
        Ok(0)
    }
}
