// ==========================================
// 珠宝维修定价系统 - 定价重算引擎
// ==========================================
// 职责: 批量重算 / 单任务重算，并写回定价与操作日志
// 输入: 启用中的维修任务 + 当前管理设置
// 输出: RecalcSummary {updated, skipped, errors, total_tasks}
// 红线:
// - 批量重算严格顺序执行，单任务失败只记录不中断
// - 同一时刻只允许一个批量重算（single-flight）
// - 没有工序的任务跳过
// ==========================================

use crate::config::PricingSettingsReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::task::RepairTask;
use crate::engine::error::{PricingError, PricingResult};
use crate::engine::lookup::DocumentCache;
use crate::engine::orchestrator::{PricingMode, PricingOrchestrator, PricingOutcome};
use crate::engine::repositories::PricingRepositories;
use crate::perf::PerfGuard;
use crate::repository::error::RepositoryError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// RecalcSummary - 批量重算结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcTaskError {
    pub task_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcSummary {
    pub updated: usize,                // 已写回定价的任务数
    pub skipped: usize,                // 无工序而跳过的任务数
    pub errors: Vec<RecalcTaskError>,  // 失败任务明细
    pub total_tasks: usize,            // 参与判定的任务总数
    pub elapsed_ms: i64,               // 耗时(毫秒)
    pub degraded: bool,                // 管理设置缺失，全部按零定价写回
}

/// 运行标记守卫（Drop 时释放）
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ==========================================
// PricingRecalcEngine - 定价重算引擎
// ==========================================
pub struct PricingRecalcEngine<R>
where
    R: PricingSettingsReader + ?Sized,
{
    repos: PricingRepositories,
    orchestrator: Arc<PricingOrchestrator<R>>,
    running: AtomicBool,
}

impl<R> PricingRecalcEngine<R>
where
    R: PricingSettingsReader + ?Sized,
{
    /// 创建新的重算引擎实例
    pub fn new(repos: PricingRepositories, orchestrator: Arc<PricingOrchestrator<R>>) -> Self {
        Self {
            repos,
            orchestrator,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 批量重算全部任务
    ///
    /// # 返回
    /// - Ok(RecalcSummary): 单任务失败记录在 errors 中
    /// - Err(RecalcInProgress): 已有批量重算在执行
    /// - Err(Repository): 任务列表或管理设置无法读取（单行 JSON 损坏只计入 errors）
    #[instrument(skip(self))]
    pub fn recalc_all(&self, actor: &str) -> PricingResult<RecalcSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("批量重算已在进行中，拒绝新的请求");
            return Err(PricingError::RecalcInProgress);
        }
        let _running = RunningGuard(&self.running);
        let perf = PerfGuard::new("recalc_all");

        let rows = self.repos.task_repo.list_active_selections()?;
        let settings = self.orchestrator.load_settings(PricingMode::Batch)?;
        info!(total_tasks = rows.len(), degraded = settings.is_none(), "开始批量重算");

        let mut cache = DocumentCache::new(&self.repos);
        let mut updated = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for row in &rows {
            let result = match &row.selections {
                Ok(selections) if selections.processes.is_empty() => {
                    skipped += 1;
                    continue;
                }
                Ok(selections) => self
                    .orchestrator
                    .price_with_cache(selections, &mut cache, settings.as_ref())
                    .and_then(|outcome| {
                        self.repos
                            .task_repo
                            .update_pricing(&row.task_id, &outcome.pricing, Utc::now())
                            .map_err(PricingError::from)
                    }),
                Err(e) => {
                    warn!(task_id = %row.task_id, error = %e, "任务选择项无法解析");
                    errors.push(RecalcTaskError {
                        task_id: row.task_id.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match result {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!(task_id = %row.task_id, error = %e, "任务重算失败");
                    errors.push(RecalcTaskError {
                        task_id: row.task_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let summary = RecalcSummary {
            updated,
            skipped,
            errors,
            total_tasks: rows.len(),
            elapsed_ms: perf.elapsed_ms(),
            degraded: settings.is_none(),
        };

        self.log_recalc_all(actor, &summary);

        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            elapsed_ms = summary.elapsed_ms,
            "批量重算完成"
        );
        Ok(summary)
    }

    /// 单任务重算（交互语义：管理设置缺失报错）
    #[instrument(skip(self))]
    pub fn recalc_task(&self, task_id: &str, actor: &str) -> PricingResult<RepairTask> {
        let _perf = PerfGuard::new("recalc_task");

        let mut task = self
            .repos
            .task_repo
            .find_by_id(task_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "RepairTask".to_string(),
                id: task_id.to_string(),
            })?;

        let outcome =
            self.orchestrator
                .price_selections(&task.selections, &self.repos, PricingMode::Interactive)?;
        let computed_at = Utc::now();
        self.repos
            .task_repo
            .update_pricing(task_id, &outcome.pricing, computed_at)?;

        self.log_action(ActionLog::now(
            ActionType::RecalcTask,
            actor,
            Some(task_id),
            Some(outcome_payload(&outcome)),
            None,
        ));

        task.pricing = outcome.pricing;
        task.pricing_updated_at = Some(computed_at);
        Ok(task)
    }

    fn log_recalc_all(&self, actor: &str, summary: &RecalcSummary) {
        let snapshot = match self.orchestrator.settings_reader().config_snapshot() {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null),
            Ok(None) => serde_json::Value::Null,
            Err(e) => {
                warn!(error = %e, "读取配置快照失败");
                serde_json::Value::Null
            }
        };

        let detail = format!(
            "批量重算: 更新{} 跳过{} 失败{} / 共{}",
            summary.updated,
            summary.skipped,
            summary.errors.len(),
            summary.total_tasks
        );
        self.log_action(ActionLog::now(
            ActionType::RecalcAll,
            actor,
            None,
            Some(json!({
                "summary": summary,
                "config_snapshot": snapshot,
            })),
            Some(detail),
        ));
    }

    // 操作日志写入失败不影响定价结果
    fn log_action(&self, log: ActionLog) {
        if let Err(e) = self.repos.action_log_repo.insert(&log) {
            warn!(action_type = %log.action_type, error = %e, "操作日志写入失败");
        }
    }
}

/// 单任务定价的日志摘要
pub(crate) fn outcome_payload(outcome: &PricingOutcome) -> serde_json::Value {
    json!({
        "variants": outcome.pricing.keys().collect::<Vec<_>>(),
        "degraded": outcome.degraded,
        "missing_processes": outcome.missing_processes,
        "missing_materials": outcome.missing_materials,
    })
}
