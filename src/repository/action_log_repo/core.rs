// ==========================================
// 珠宝维修定价系统 - 操作日志仓储（写入）
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// action_ts 存储格式（微秒精度，同一秒内的多条日志可排序）
pub(super) const ACTION_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// 操作日志仓储
///
/// 与其他仓储共享同一个连接；只追加，不修改、不删除。
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条操作日志，返回 action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        if log.actor.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "操作日志 actor 不能为空".to_string(),
            ));
        }
        let payload = log
            .payload_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO action_log (action_id, action_type, action_ts, actor, target_id, payload_json, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format(ACTION_TS_FORMAT).to_string(),
                log.actor,
                log.target_id,
                payload,
                log.detail,
            ],
        )?;

        tracing::debug!(action_id = %log.action_id, action_type = %log.action_type, "操作日志已写入");
        Ok(log.action_id.clone())
    }
}
