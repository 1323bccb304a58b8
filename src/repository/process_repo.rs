// ==========================================
// 珠宝维修定价系统 - 工序数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: pricing.totalCost 在读取时一次性解析为 ProcessPricing
// ==========================================

use crate::domain::process::{ProcessMaterialEstimate, ProcessPricing, ProcessPricingDoc, RepairProcess};
use crate::domain::types::SkillLevel;
use crate::repository::error::{json_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};

const PROCESS_COLUMNS: &str = r#"
    process_id, display_name, category,
    labor_hours, skill_level, metal_complexity_multiplier,
    total_cost_json, materials_json,
    is_active, created_at, updated_at
"#;

// ==========================================
// ProcessRepository - 工序仓储
// ==========================================
/// 工序仓储
/// 职责: 管理 repair_process 表的 CRUD 操作
pub struct ProcessRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessRepository {
    /// 创建新的 ProcessRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖工序
    pub fn upsert(&self, process: &RepairProcess) -> RepositoryResult<()> {
        let total_cost_json: JsonValue = process.pricing.total_cost.clone().into();
        let materials_json = serde_json::to_string(&process.materials)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO repair_process (
                process_id, display_name, category,
                labor_hours, skill_level, metal_complexity_multiplier,
                total_cost_json, materials_json,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(process_id) DO UPDATE SET
                display_name = excluded.display_name,
                category = excluded.category,
                labor_hours = excluded.labor_hours,
                skill_level = excluded.skill_level,
                metal_complexity_multiplier = excluded.metal_complexity_multiplier,
                total_cost_json = excluded.total_cost_json,
                materials_json = excluded.materials_json,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
            params![
                process.process_id,
                process.display_name,
                process.category,
                process.labor_hours,
                process.skill_level.as_str(),
                process.metal_complexity_multiplier,
                total_cost_json.to_string(),
                materials_json,
                process.is_active,
                process.created_at,
                process.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(RepairProcess)): 找到工序
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, process_id: &str) -> RepositoryResult<Option<RepairProcess>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM repair_process WHERE process_id = ?1",
            PROCESS_COLUMNS
        );
        let process = conn
            .query_row(&sql, params![process_id], map_process_row)
            .optional()?;
        Ok(process)
    }

    /// 查询全部启用中的工序
    pub fn list_active(&self) -> RepositoryResult<Vec<RepairProcess>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM repair_process WHERE is_active = 1 ORDER BY display_name ASC",
            PROCESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let processes = stmt
            .query_map([], map_process_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(processes)
    }

    /// 停用工序（软删除）
    ///
    /// # 返回
    /// - Ok(true): 已停用
    /// - Ok(false): 工序不存在
    pub fn deactivate(&self, process_id: &str, updated_at: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE repair_process SET is_active = 0, updated_at = ?2 WHERE process_id = ?1",
            params![process_id, updated_at],
        )?;
        Ok(rows > 0)
    }
}

fn map_process_row(row: &Row<'_>) -> SqliteResult<RepairProcess> {
    let total_cost = match row.get::<_, Option<String>>(6)? {
        Some(raw) => ProcessPricing::from(json_column::<JsonValue>(6, &raw)?),
        None => ProcessPricing::Unpriced,
    };
    let materials: Vec<ProcessMaterialEstimate> = json_column(7, &row.get::<_, String>(7)?)?;

    Ok(RepairProcess {
        process_id: row.get(0)?,
        display_name: row.get(1)?,
        category: row.get(2)?,
        labor_hours: row.get(3)?,
        skill_level: SkillLevel::from_str_lenient(&row.get::<_, String>(4)?),
        metal_complexity_multiplier: row.get(5)?,
        pricing: ProcessPricingDoc { total_cost },
        materials,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
