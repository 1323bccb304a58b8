// ==========================================
// 珠宝维修定价系统 - 维修任务数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 定价写回只更新 pricing_json / pricing_updated_at，不触碰任务定义
//       批量重算只读取选择项，单行解析失败不影响其他行
// ==========================================

use crate::domain::task::{MaterialSelection, PricingMap, ProcessSelection, RepairTask, TaskSelections};
use crate::repository::error::{json_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const TASK_COLUMNS: &str = r#"
    task_id, title, category, description,
    processes_json, materials_json,
    pricing_json, pricing_updated_at,
    is_active, created_at, updated_at
"#;

/// 批量重算的输入行（不解析 pricing_json）
#[derive(Debug)]
pub struct TaskSelectionsRow {
    pub task_id: String,
    pub selections: RepositoryResult<TaskSelections>,
}

// ==========================================
// RepairTaskRepository - 维修任务仓储
// ==========================================
pub struct RepairTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RepairTaskRepository {
    /// 创建新的 RepairTaskRepository 实例
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入任务（含定价）
    pub fn insert(&self, task: &RepairTask) -> RepositoryResult<()> {
        let processes_json = serde_json::to_string(&task.selections.processes)?;
        let materials_json = serde_json::to_string(&task.selections.materials)?;
        let pricing_json = serde_json::to_string(&task.pricing)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO repair_task (
                task_id, title, category, description,
                processes_json, materials_json,
                pricing_json, pricing_updated_at,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                task.task_id,
                task.title,
                task.category,
                task.description,
                processes_json,
                materials_json,
                pricing_json,
                task.pricing_updated_at,
                task.is_active,
                task.created_at,
                task.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 更新任务定义（标题/分类/描述/选择项）
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在
    pub fn update_definition(&self, task: &RepairTask) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        write_definition(&conn, task)
    }

    /// 在同一事务中更新任务定义与定价
    ///
    /// 任一写入失败则整体回滚，不会留下“新选择项 + 旧定价”的组合。
    pub fn update_definition_and_pricing(
        &self,
        task: &RepairTask,
        computed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        write_definition(&tx, task)?;
        write_pricing(&tx, &task.task_id, &task.pricing, computed_at)?;
        tx.commit()?;
        Ok(())
    }

    /// 写回定价结果
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在
    pub fn update_pricing(
        &self,
        task_id: &str,
        pricing: &PricingMap,
        computed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        write_pricing(&conn, task_id, pricing, computed_at)
    }

    /// 按主键查询
    pub fn find_by_id(&self, task_id: &str) -> RepositoryResult<Option<RepairTask>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM repair_task WHERE task_id = ?1", TASK_COLUMNS);
        let task = conn
            .query_row(&sql, params![task_id], map_task_row)
            .optional()?;
        Ok(task)
    }

    /// 查询全部启用中的任务（按创建时间排序，保证批量重算顺序稳定）
    pub fn list_active(&self) -> RepositoryResult<Vec<RepairTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM repair_task WHERE is_active = 1 ORDER BY created_at ASC, task_id ASC",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], map_task_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(tasks)
    }

    /// 列出启用中任务的选择项（批量重算用，顺序同 list_active）
    ///
    /// 选择项 JSON 损坏只记在对应行上；pricing_json 不读取。
    pub fn list_active_selections(&self) -> RepositoryResult<Vec<TaskSelectionsRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT task_id, processes_json, materials_json
            FROM repair_task
            WHERE is_active = 1
            ORDER BY created_at ASC, task_id ASC
            "#,
        )?;
        let raw_rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(raw_rows
            .into_iter()
            .map(|(task_id, processes_json, materials_json)| TaskSelectionsRow {
                task_id,
                selections: decode_selections(&processes_json, &materials_json),
            })
            .collect())
    }
}

fn decode_selections(processes_json: &str, materials_json: &str) -> RepositoryResult<TaskSelections> {
    let processes: Vec<ProcessSelection> =
        serde_json::from_str(processes_json).map_err(|e| RepositoryError::Serialization {
            field: "processes_json".to_string(),
            message: e.to_string(),
        })?;
    let materials: Vec<MaterialSelection> =
        serde_json::from_str(materials_json).map_err(|e| RepositoryError::Serialization {
            field: "materials_json".to_string(),
            message: e.to_string(),
        })?;
    Ok(TaskSelections {
        processes,
        materials,
    })
}

fn write_definition(conn: &Connection, task: &RepairTask) -> RepositoryResult<()> {
    let processes_json = serde_json::to_string(&task.selections.processes)?;
    let materials_json = serde_json::to_string(&task.selections.materials)?;

    let rows = conn.execute(
        r#"
        UPDATE repair_task SET
            title = ?2,
            category = ?3,
            description = ?4,
            processes_json = ?5,
            materials_json = ?6,
            is_active = ?7,
            updated_at = ?8
        WHERE task_id = ?1
        "#,
        params![
            task.task_id,
            task.title,
            task.category,
            task.description,
            processes_json,
            materials_json,
            task.is_active,
            task.updated_at,
        ],
    )?;

    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "RepairTask".to_string(),
            id: task.task_id.clone(),
        });
    }
    Ok(())
}

fn write_pricing(
    conn: &Connection,
    task_id: &str,
    pricing: &PricingMap,
    computed_at: DateTime<Utc>,
) -> RepositoryResult<()> {
    let pricing_json = serde_json::to_string(pricing)?;
    let rows = conn.execute(
        "UPDATE repair_task SET pricing_json = ?2, pricing_updated_at = ?3 WHERE task_id = ?1",
        params![task_id, pricing_json, computed_at],
    )?;

    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "RepairTask".to_string(),
            id: task_id.to_string(),
        });
    }
    Ok(())
}

fn map_task_row(row: &Row<'_>) -> SqliteResult<RepairTask> {
    let processes: Vec<ProcessSelection> = json_column(4, &row.get::<_, String>(4)?)?;
    let materials: Vec<MaterialSelection> = json_column(5, &row.get::<_, String>(5)?)?;
    let pricing: PricingMap = json_column(6, &row.get::<_, String>(6)?)?;

    Ok(RepairTask {
        task_id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        selections: TaskSelections {
            processes,
            materials,
        },
        pricing,
        pricing_updated_at: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::PriceBreakdown;

    fn setup() -> RepairTaskRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        RepairTaskRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make_task(id: &str) -> RepairTask {
        let now = Utc::now();
        RepairTask {
            task_id: id.to_string(),
            title: "Prong retip".to_string(),
            category: "prongs".to_string(),
            description: None,
            selections: TaskSelections {
                processes: vec![ProcessSelection {
                    process_id: "P1".to_string(),
                    quantity: 2,
                }],
                materials: vec![],
            },
            pricing: PricingMap::new(),
            pricing_updated_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_find_and_update_pricing() {
        let repo = setup();
        repo.insert(&make_task("T1")).unwrap();

        let found = repo.find_by_id("T1").unwrap().unwrap();
        assert_eq!(found.selections.processes[0].quantity, 2);
        assert!(found.pricing_updated_at.is_none());

        let mut pricing = PricingMap::new();
        pricing.insert("universal".to_string(), PriceBreakdown::zeroed(None));
        repo.update_pricing("T1", &pricing, Utc::now()).unwrap();

        let found = repo.find_by_id("T1").unwrap().unwrap();
        assert!(found.is_universally_priced());
        assert!(found.pricing_updated_at.is_some());
    }

    #[test]
    fn test_update_missing_task_is_not_found() {
        let repo = setup();
        let err = repo
            .update_pricing("nope", &PricingMap::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let err = repo.update_definition(&make_task("nope")).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_update_definition_keeps_pricing() {
        let repo = setup();
        repo.insert(&make_task("T1")).unwrap();
        let mut pricing = PricingMap::new();
        pricing.insert("universal".to_string(), PriceBreakdown::zeroed(None));
        repo.update_pricing("T1", &pricing, Utc::now()).unwrap();

        let mut task = make_task("T1");
        task.title = "Prong retip x4".to_string();
        repo.update_definition(&task).unwrap();

        let found = repo.find_by_id("T1").unwrap().unwrap();
        assert_eq!(found.title, "Prong retip x4");
        assert_eq!(found.pricing.len(), 1);
    }

    #[test]
    fn test_update_definition_and_pricing_rolls_back_together() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = RepairTaskRepository::from_connection(conn.clone());
        repo.insert(&make_task("T1")).unwrap();

        conn.lock()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TRIGGER reject_pricing BEFORE UPDATE OF pricing_json ON repair_task
                BEGIN SELECT RAISE(ABORT, 'pricing locked'); END;
                "#,
            )
            .unwrap();

        let mut task = make_task("T1");
        task.title = "Retitled".to_string();
        task.selections.processes[0].quantity = 5;
        task.pricing
            .insert("universal".to_string(), PriceBreakdown::zeroed(None));
        assert!(repo.update_definition_and_pricing(&task, Utc::now()).is_err());

        let found = repo.find_by_id("T1").unwrap().unwrap();
        assert_eq!(found.title, "Prong retip");
        assert_eq!(found.selections.processes[0].quantity, 2);
        assert!(found.pricing_updated_at.is_none());

        conn.lock()
            .unwrap()
            .execute_batch("DROP TRIGGER reject_pricing;")
            .unwrap();
        repo.update_definition_and_pricing(&task, Utc::now()).unwrap();
        let found = repo.find_by_id("T1").unwrap().unwrap();
        assert_eq!(found.title, "Retitled");
        assert!(found.pricing_updated_at.is_some());
    }

    #[test]
    fn test_list_active_selections_isolates_corrupt_rows() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = RepairTaskRepository::from_connection(conn.clone());
        repo.insert(&make_task("T1")).unwrap();
        repo.insert(&make_task("T2")).unwrap();
        repo.insert(&make_task("T3")).unwrap();

        {
            let guard = conn.lock().unwrap();
            // 旧版定价形态：pricing_json 不参与批量读取
            guard
                .execute(
                    "UPDATE repair_task SET pricing_json = ?2 WHERE task_id = ?1",
                    params!["T1", r#"{"universal":{"retailPrice":1}}"#],
                )
                .unwrap();
            guard
                .execute(
                    "UPDATE repair_task SET processes_json = 'not json' WHERE task_id = ?1",
                    params!["T2"],
                )
                .unwrap();
        }

        assert!(repo.list_active().is_err());

        let rows = repo.list_active_selections().unwrap();
        assert_eq!(rows.len(), 3);
        let by_id = |id: &str| rows.iter().find(|r| r.task_id == id).unwrap();
        assert_eq!(by_id("T1").selections.as_ref().unwrap().processes[0].quantity, 2);
        assert!(matches!(
            by_id("T2").selections,
            Err(RepositoryError::Serialization { ref field, .. }) if field == "processes_json"
        ));
        assert!(by_id("T3").selections.is_ok());
    }
}
