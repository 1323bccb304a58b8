// ==========================================
// 珠宝维修定价系统 - 定价引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 定价引擎错误类型
#[derive(Error, Debug)]
pub enum PricingError {
    // ===== 计算错误 =====
    #[error("管理设置缺失，无法计算定价 (pricing.wage 未配置)")]
    AdminSettingsMissing,

    #[error("管理设置非法: {}", .0.join("; "))]
    InvalidSettings(Vec<String>),

    // ===== 并发控制 =====
    #[error("批量重算正在进行中")]
    RecalcInProgress,

    // ===== 文档读写 =====
    #[error("定价文档读写失败: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type PricingResult<T> = Result<T, PricingError>;
