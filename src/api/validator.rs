// ==========================================
// 珠宝维修定价系统 - 任务输入校验器
// ==========================================
// 职责: 校验并规范化任务创建/更新输入
// 规则:
// - title / category 非空
// - processes / materials 必须为数组
// - 每个选择项 ID 非空、quantity ≥ 1
// - 重复 ID 合并（数量相加，保留首次出现顺序）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::task::{MaterialSelection, ProcessSelection, TaskSelections};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 任务输入（创建/更新共用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub selections: TaskSelections,
}

// ==========================================
// TaskInputValidator - 任务输入校验器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskInputValidator;

impl TaskInputValidator {
    pub fn new() -> Self {
        Self
    }

    /// 从原始 JSON 解析任务输入
    ///
    /// 选择项字段为 null 视为空列表；存在但不是数组时直接拒绝（而不是静默当作空列表）。
    pub fn parse(&self, raw: &JsonValue) -> ApiResult<TaskInput> {
        let mut raw = raw.clone();
        let Some(obj) = raw.as_object_mut() else {
            return Err(ApiError::ValidationError("任务输入必须为 JSON 对象".to_string()));
        };
        for field in ["processes", "materials"] {
            if let Some(value) = obj.get_mut(field) {
                if value.is_null() {
                    *value = JsonValue::Array(Vec::new());
                } else if !value.is_array() {
                    return Err(ApiError::ValidationError(format!("{} 必须为数组", field)));
                }
            }
        }

        serde_json::from_value(raw)
            .map_err(|e| ApiError::ValidationError(format!("任务输入格式错误: {}", e)))
    }

    /// 校验并规范化任务输入
    pub fn validate(&self, input: TaskInput) -> ApiResult<TaskInput> {
        let mut violations = Vec::new();

        let title = input.title.trim().to_string();
        if title.is_empty() {
            violations.push("title 不能为空".to_string());
        }
        let category = input.category.trim().to_string();
        if category.is_empty() {
            violations.push("category 不能为空".to_string());
        }

        collect_selection_violations(&input.selections, &mut violations);
        if !violations.is_empty() {
            return Err(ApiError::ValidationError(violations.join("; ")));
        }

        Ok(TaskInput {
            title,
            category,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            selections: merge_duplicates(&input.selections),
        })
    }

    /// 仅校验选择项（预览定价使用）
    pub fn validate_selections(&self, selections: &TaskSelections) -> ApiResult<TaskSelections> {
        let mut violations = Vec::new();
        collect_selection_violations(selections, &mut violations);
        if !violations.is_empty() {
            return Err(ApiError::ValidationError(violations.join("; ")));
        }
        Ok(merge_duplicates(selections))
    }
}

fn collect_selection_violations(selections: &TaskSelections, violations: &mut Vec<String>) {
    for (idx, p) in selections.processes.iter().enumerate() {
        if p.process_id.trim().is_empty() {
            violations.push(format!("processes[{}].processId 不能为空", idx));
        }
        if p.quantity < 1 {
            violations.push(format!("processes[{}].quantity 必须 ≥ 1", idx));
        }
    }
    for (idx, m) in selections.materials.iter().enumerate() {
        if m.material_id.trim().is_empty() {
            violations.push(format!("materials[{}].materialId 不能为空", idx));
        }
        if m.quantity < 1 {
            violations.push(format!("materials[{}].quantity 必须 ≥ 1", idx));
        }
    }
}

fn merge_duplicates(selections: &TaskSelections) -> TaskSelections {
    let mut processes: Vec<ProcessSelection> = Vec::new();
    for p in &selections.processes {
        let id = p.process_id.trim();
        match processes.iter_mut().find(|e| e.process_id == id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(p.quantity),
            None => processes.push(ProcessSelection {
                process_id: id.to_string(),
                quantity: p.quantity,
            }),
        }
    }

    let mut materials: Vec<MaterialSelection> = Vec::new();
    for m in &selections.materials {
        let id = m.material_id.trim();
        match materials.iter_mut().find(|e| e.material_id == id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(m.quantity),
            None => materials.push(MaterialSelection {
                material_id: id.to_string(),
                quantity: m.quantity,
            }),
        }
    }

    TaskSelections {
        processes,
        materials,
    }
}
