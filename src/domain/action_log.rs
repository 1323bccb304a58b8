// ==========================================
// 珠宝维修定价系统 - 操作日志领域模型
// ==========================================
// 红线: 所有定价写入必须记录
// 用途: 审计追踪（谁在何时用哪套管理设置重算了定价）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,          // 日志ID
    pub action_type: String,        // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,   // 操作时间戳
    pub actor: String,              // 操作人
    pub target_id: Option<String>,  // 关联任务ID（批量操作为 None）

    pub payload_json: Option<JsonValue>, // 操作参数/结果摘要 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    TaskCreate,      // 创建任务（含首次定价）
    TaskUpdate,      // 更新任务（含重新定价）
    RecalcTask,      // 单任务重算
    RecalcAll,       // 批量重算
    SettingsUpdate,  // 管理设置变更
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::TaskCreate => "TaskCreate",
            ActionType::TaskUpdate => "TaskUpdate",
            ActionType::RecalcTask => "RecalcTask",
            ActionType::RecalcAll => "RecalcAll",
            ActionType::SettingsUpdate => "SettingsUpdate",
        }
    }
}

impl ActionLog {
    /// 构建一条当前时刻的日志
    pub fn now(
        action_type: ActionType,
        actor: &str,
        target_id: Option<&str>,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            target_id: target_id.map(String::from),
            payload_json,
            detail,
        }
    }
}
