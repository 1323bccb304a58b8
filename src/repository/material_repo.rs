// ==========================================
// 珠宝维修定价系统 - 材料数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::material::{RepairMaterial, StullerProduct};
use crate::repository::error::{json_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const MATERIAL_COLUMNS: &str = r#"
    material_id, display_name, category,
    portions_per_unit, is_metal_dependent, unit_cost,
    stuller_products_json,
    is_active, created_at, updated_at
"#;

// ==========================================
// MaterialRepository - 材料仓储
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    /// 创建新的 MaterialRepository 实例
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

    /// 新增或覆盖材料
    pub fn upsert(&self, material: &RepairMaterial) -> RepositoryResult<()> {
        let products_json = serde_json::to_string(&material.stuller_products)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO repair_material (
                material_id, display_name, category,
                portions_per_unit, is_metal_dependent, unit_cost,
                stuller_products_json,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(material_id) DO UPDATE SET
                display_name = excluded.display_name,
                category = excluded.category,
                portions_per_unit = excluded.portions_per_unit,
                is_metal_dependent = excluded.is_metal_dependent,
                unit_cost = excluded.unit_cost,
                stuller_products_json = excluded.stuller_products_json,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
            params![
                material.material_id,
                material.display_name,
                material.category,
                material.portions_per_unit,
                material.is_metal_dependent,
                material.unit_cost,
                products_json,
                material.is_active,
                material.created_at,
                material.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    pub fn find_by_id(&self, material_id: &str) -> RepositoryResult<Option<RepairMaterial>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM repair_material WHERE material_id = ?1",
            MATERIAL_COLUMNS
        );
        let material = conn
            .query_row(&sql, params![material_id], map_material_row)
            .optional()?;
        Ok(material)
    }

    /// 查询全部启用中的材料
    pub fn list_active(&self) -> RepositoryResult<Vec<RepairMaterial>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM repair_material WHERE is_active = 1 ORDER BY display_name ASC",
            MATERIAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let materials = stmt
            .query_map([], map_material_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(materials)
    }

    /// 停用材料（软删除）
    pub fn deactivate(&self, material_id: &str, updated_at: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE repair_material SET is_active = 0, updated_at = ?2 WHERE material_id = ?1",
            params![material_id, updated_at],
        )?;
        Ok(rows > 0)
    }
}

fn map_material_row(row: &Row<'_>) -> SqliteResult<RepairMaterial> {
    let stuller_products: Vec<StullerProduct> = json_column(6, &row.get::<_, String>(6)?)?;

    Ok(RepairMaterial {
        material_id: row.get(0)?,
        display_name: row.get(1)?,
        category: row.get(2)?,
        portions_per_unit: row.get(3)?,
        is_metal_dependent: row.get(4)?,
        unit_cost: row.get(5)?,
        stuller_products,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
