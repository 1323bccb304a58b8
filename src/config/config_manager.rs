// ==========================================
// 珠宝维修定价系统 - 配置管理器
// ==========================================
// 职责: 管理设置加载、保存、快照
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::settings_reader::PricingSettingsReader;
use crate::db::open_sqlite_connection;
use crate::domain::settings::{AdminSettings, SkillLevelMultipliers};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 读取数值配置，缺失或格式错误时使用默认值
    fn get_f64_or_default(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default,
                    "管理设置数值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 读取 JSON 配置，缺失或格式错误时使用默认值
    fn get_json_or_default<T>(&self, key: &str) -> RepositoryResult<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(T::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = key,
                raw_value = %raw,
                "管理设置 JSON 格式错误，使用默认配置"
            );
            T::default()
        }))
    }

    /// 保存管理设置（单事务写入全部键）
    pub fn save_admin_settings(&self, settings: &AdminSettings) -> RepositoryResult<()> {
        let now = Utc::now();
        let entries: Vec<(&str, String)> = vec![
            (config_keys::WAGE, settings.wage.to_string()),
            (config_keys::MATERIAL_MARKUP, settings.material_markup.to_string()),
            (config_keys::ADMINISTRATIVE_FEE, settings.administrative_fee.to_string()),
            (config_keys::BUSINESS_FEE, settings.business_fee.to_string()),
            (config_keys::CONSUMABLES_FEE, settings.consumables_fee.to_string()),
            (
                config_keys::SKILL_LEVEL_MULTIPLIERS,
                serde_json::to_string(&settings.skill_level_multipliers)?,
            ),
            (
                config_keys::METAL_COMPLEXITY_MULTIPLIERS,
                serde_json::to_string(&settings.metal_complexity_multipliers)?,
            ),
        ];

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )?;
        }
        tx.commit()?;

        tracing::info!(
            wage = settings.wage,
            material_markup = settings.material_markup,
            business_multiplier = settings.business_multiplier(),
            "管理设置已保存"
        );
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 在批量重算时记录所用的管理设置，便于事后追溯
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        // 查询所有global scope的配置
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        // 序列化为JSON
        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// PricingSettingsReader Trait 实现
// ==========================================
impl PricingSettingsReader for ConfigManager {
    fn load_admin_settings(&self) -> RepositoryResult<Option<AdminSettings>> {
        // pricing.wage 是管理设置存在与否的锚点
        let Some(raw_wage) = self.get_config_value(config_keys::WAGE)? else {
            return Ok(None);
        };
        let wage = match raw_wage.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                tracing::warn!(raw_value = %raw_wage, "pricing.wage 格式错误，视为管理设置缺失");
                return Ok(None);
            }
        };

        let skill_level_multipliers: SkillLevelMultipliers =
            self.get_json_or_default(config_keys::SKILL_LEVEL_MULTIPLIERS)?;
        let metal_complexity_multipliers: BTreeMap<String, f64> =
            self.get_json_or_default(config_keys::METAL_COMPLEXITY_MULTIPLIERS)?;

        Ok(Some(AdminSettings {
            wage,
            skill_level_multipliers,
            material_markup: self.get_f64_or_default(config_keys::MATERIAL_MARKUP, 1.0)?,
            administrative_fee: self.get_f64_or_default(config_keys::ADMINISTRATIVE_FEE, 0.0)?,
            business_fee: self.get_f64_or_default(config_keys::BUSINESS_FEE, 0.0)?,
            consumables_fee: self.get_f64_or_default(config_keys::CONSUMABLES_FEE, 0.0)?,
            metal_complexity_multipliers,
        }))
    }

    fn settings_updated_at(&self) -> RepositoryResult<Option<DateTime<Utc>>> {
        let conn = self.get_conn()?;
        let latest: Option<DateTime<Utc>> = conn.query_row(
            "SELECT MAX(updated_at) FROM config_kv
             WHERE scope_id = 'global' AND (key LIKE 'pricing.%' OR key = ?1)",
            params![config_keys::METAL_COMPLEXITY_MULTIPLIERS],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    fn config_snapshot(&self) -> RepositoryResult<Option<String>> {
        self.get_config_snapshot().map(Some)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 人工
    pub const WAGE: &str = "pricing.wage";
    pub const SKILL_LEVEL_MULTIPLIERS: &str = "pricing.skillLevelMultipliers"; // JSON

    // 材料
    pub const MATERIAL_MARKUP: &str = "pricing.materialMarkup";

    // 费用系数
    pub const ADMINISTRATIVE_FEE: &str = "pricing.administrativeFee";
    pub const BUSINESS_FEE: &str = "pricing.businessFee";
    pub const CONSUMABLES_FEE: &str = "pricing.consumablesFee";

    // 金属复杂度
    pub const METAL_COMPLEXITY_MULTIPLIERS: &str = "metalComplexityMultipliers"; // JSON
}
