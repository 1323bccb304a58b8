// ==========================================
// 珠宝维修定价系统 - 配置层
// ==========================================
// 职责: 管理设置 (AdminSettings) 的加载与保存
// 存储: config_kv 表 (scope_id='global')
// ==========================================

pub mod config_manager;
pub mod settings_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use settings_reader::PricingSettingsReader;
