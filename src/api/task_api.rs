// ==========================================
// 珠宝维修定价系统 - 维修任务 API
// ==========================================
// 职责: 任务创建/更新（含交互式定价）、定价预览、维修报价查询、定价状态
// 红线: 管理设置缺失时交互路径报错且不落库
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{TaskInput, TaskInputValidator};
use crate::config::PricingSettingsReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::task::{PriceBreakdown, RepairTask, TaskSelections};
use crate::domain::types::PricingState;
use crate::domain::variant::{format_metal_key, UNIVERSAL_VARIANT_KEY};
use crate::engine::lookup::DocumentCache;
use crate::engine::orchestrator::{PricingMode, PricingOrchestrator, PricingOutcome};
use crate::engine::recalc::outcome_payload;
use crate::engine::repositories::PricingRepositories;
use crate::engine::staleness::PricingStateEvaluator;
use crate::perf::PerfGuard;

// ==========================================
// TaskApi - 维修任务 API
// ==========================================
pub struct TaskApi {
    repos: PricingRepositories,
    orchestrator: Arc<PricingOrchestrator<dyn PricingSettingsReader>>,
    validator: TaskInputValidator,
}

impl TaskApi {
    /// 创建新的TaskApi实例
    pub fn new(
        repos: PricingRepositories,
        orchestrator: Arc<PricingOrchestrator<dyn PricingSettingsReader>>,
    ) -> Self {
        Self {
            repos,
            orchestrator,
            validator: TaskInputValidator::new(),
        }
    }

    /// 解析原始 JSON 任务输入
    pub fn parse_input(&self, raw: &serde_json::Value) -> ApiResult<TaskInput> {
        self.validator.parse(raw)
    }

    /// 创建任务并计算定价
    ///
    /// # 返回
    /// - Ok(RepairTask): 已落库的任务（含定价）
    /// - Err(ValidationError): 输入非法
    /// - Err(ComputationError): 管理设置缺失/非法（不落库）
    pub fn create_task(&self, input: TaskInput, actor: &str) -> ApiResult<RepairTask> {
        let _perf = PerfGuard::new("create_task");
        let input = self.validator.validate(input)?;
        let outcome = self.price(&input.selections)?;

        let now = Utc::now();
        let task = RepairTask {
            task_id: Uuid::new_v4().to_string(),
            title: input.title,
            category: input.category,
            description: input.description,
            selections: input.selections,
            pricing: outcome.pricing.clone(),
            pricing_updated_at: Some(now),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repos.task_repo.insert(&task)?;

        self.log_action(ActionType::TaskCreate, actor, &task.task_id, &outcome);
        info!(task_id = %task.task_id, variants = task.pricing.len(), "维修任务已创建");
        Ok(task)
    }

    /// 更新任务定义并重新定价
    pub fn update_task(&self, task_id: &str, input: TaskInput, actor: &str) -> ApiResult<RepairTask> {
        let _perf = PerfGuard::new("update_task");
        let mut task = self.get_task(task_id)?;
        let input = self.validator.validate(input)?;
        let outcome = self.price(&input.selections)?;

        let now = Utc::now();
        task.title = input.title;
        task.category = input.category;
        task.description = input.description;
        task.selections = input.selections;
        task.updated_at = now;
        task.pricing = outcome.pricing.clone();
        task.pricing_updated_at = Some(now);
        self.repos
            .task_repo
            .update_definition_and_pricing(&task, now)?;

        self.log_action(ActionType::TaskUpdate, actor, task_id, &outcome);
        Ok(task)
    }

    /// 查询任务
    pub fn get_task(&self, task_id: &str) -> ApiResult<RepairTask> {
        self.repos
            .task_repo
            .find_by_id(task_id)?
            .ok_or_else(|| ApiError::NotFound(format!("RepairTask(id={})不存在", task_id)))
    }

    /// 查询全部启用中的任务
    pub fn list_tasks(&self) -> ApiResult<Vec<RepairTask>> {
        Ok(self.repos.task_repo.list_active()?)
    }

    /// 预览定价（不落库）
    pub fn preview_pricing(&self, selections: &TaskSelections) -> ApiResult<PricingOutcome> {
        let selections = self.validator.validate_selections(selections)?;
        self.price(&selections)
    }

    /// 维修报价: 按所选金属类型/成色查找任务定价
    ///
    /// 变体键与定价引擎共用 format_metal_key；通用定价的任务对任意金属返回 "universal" 明细。
    pub fn quote_repair(&self, task_id: &str, metal_type: &str, karat: &str) -> ApiResult<PriceBreakdown> {
        let task = self.get_task(task_id)?;
        let key = format_metal_key(metal_type, karat);

        if let Some(breakdown) = task.pricing.get(&key) {
            return Ok(breakdown.clone());
        }
        if task.is_universally_priced() {
            if let Some(breakdown) = task.pricing.get(UNIVERSAL_VARIANT_KEY) {
                return Ok(breakdown.clone());
            }
        }
        Err(ApiError::NotFound(format!(
            "任务 {} 不支持变体 {}",
            task_id, key
        )))
    }

    /// 任务定价状态
    pub fn pricing_state(&self, task_id: &str) -> ApiResult<PricingState> {
        let task = self.get_task(task_id)?;
        let settings_updated_at = self.orchestrator.settings_reader().settings_updated_at()?;
        let mut cache = DocumentCache::new(&self.repos);
        Ok(PricingStateEvaluator::new().evaluate(&task, &mut cache, settings_updated_at)?)
    }

    /// 定价已过期的任务
    pub fn list_stale_tasks(&self) -> ApiResult<Vec<RepairTask>> {
        let settings_updated_at = self.orchestrator.settings_reader().settings_updated_at()?;
        let evaluator = PricingStateEvaluator::new();
        let mut cache = DocumentCache::new(&self.repos);

        let mut stale = Vec::new();
        for task in self.repos.task_repo.list_active()? {
            if evaluator.evaluate(&task, &mut cache, settings_updated_at)? == PricingState::Stale {
                stale.push(task);
            }
        }
        Ok(stale)
    }

    fn price(&self, selections: &TaskSelections) -> ApiResult<PricingOutcome> {
        let outcome =
            self.orchestrator
                .price_selections(selections, &self.repos, PricingMode::Interactive)?;
        if !outcome.missing_processes.is_empty() || !outcome.missing_materials.is_empty() {
            warn!(
                missing_processes = ?outcome.missing_processes,
                missing_materials = ?outcome.missing_materials,
                "部分引用缺失，定价按剩余项计算"
            );
        }
        Ok(outcome)
    }

    fn log_action(&self, action_type: ActionType, actor: &str, task_id: &str, outcome: &PricingOutcome) {
        let log = ActionLog::now(action_type, actor, Some(task_id), Some(outcome_payload(outcome)), None);
        if let Err(e) = self.repos.action_log_repo.insert(&log) {
            warn!(task_id, error = %e, "操作日志写入失败");
        }
    }
}
