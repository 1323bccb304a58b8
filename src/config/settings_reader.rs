// ==========================================
// 珠宝维修定价系统 - 管理设置读取 Trait
// ==========================================
// 职责: 定义定价引擎所需的设置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::settings::AdminSettings;
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};

// ==========================================
// PricingSettingsReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）；测试中使用内存实现
pub trait PricingSettingsReader: Send + Sync {
    /// 加载管理设置
    ///
    /// # 返回
    /// - Ok(Some(AdminSettings)): 已配置
    /// - Ok(None): 管理设置完全缺失（交互路径为致命错误，批量路径降级为全零）
    /// - Err: 存储读取失败
    fn load_admin_settings(&self) -> RepositoryResult<Option<AdminSettings>>;

    /// 管理设置最后更新时间（用于判定任务定价是否过期）
    ///
    /// # 返回
    /// - Ok(None): 从未写入过
    fn settings_updated_at(&self) -> RepositoryResult<Option<DateTime<Utc>>>;

    /// 设置快照（JSON 字符串），写入批量重算的操作日志
    fn config_snapshot(&self) -> RepositoryResult<Option<String>> {
        Ok(None)
    }
}
