// ==========================================
// 主数据 ETL - 约束管理
// ==========================================
// 职责: 外键约束的关闭 / 恢复，保证成对
// 规则:
// - 关闭失败: 记录告警，继续在约束开启状态下装载
// - 恢复失败: 记录错误并上报（保持约束关闭是不安全的）
// - 每次装载恢复恰好一次
// ==========================================

use crate::loader::error::{LoadError, LoaderResult};
use crate::loader::repository::LoadRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// 约束操作记录（写入装载结果）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub relaxed: bool,
    pub relax_error: Option<String>,
    pub restore_attempts: usize,
    pub restored: bool,
    pub restore_error: Option<String>,
}

pub struct ConstraintManager {
    repo: Arc<dyn LoadRepository>,
    report: ConstraintReport,
}

impl ConstraintManager {
    pub fn new(repo: Arc<dyn LoadRepository>) -> Self {
        Self {
            repo,
            report: ConstraintReport::default(),
        }
    }

    /// 关闭约束；失败只告警
    pub async fn relax(&mut self) {
        match self.repo.relax_constraints().await {
            Ok(()) => self.report.relaxed = true,
            Err(e) => {
                warn!(error = %e, "无法关闭外键约束，继续装载");
                self.report.relax_error = Some(e.to_string());
            }
        }
    }

    /// 恢复约束；无论关闭是否成功都会执行
    pub async fn restore(&mut self) -> LoaderResult<()> {
        self.report.restore_attempts += 1;
        match self.repo.restore_constraints().await {
            Ok(()) => {
                self.report.restored = true;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "外键约束恢复失败");
                self.report.restore_error = Some(e.to_string());
                Err(LoadError::Constraint(format!("约束恢复失败: {}", e)))
            }
        }
    }

    pub fn report(&self) -> &ConstraintReport {
        &self.report
    }

    pub fn into_report(self) -> ConstraintReport {
        self.report
    }
}
