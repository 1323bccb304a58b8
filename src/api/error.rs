// ==========================================
// 珠宝维修定价系统 - API层错误类型
// ==========================================
// 职责: 将仓储/引擎错误转换为调用方可理解的错误分类
// 分类: ValidationError(客户端) / NotFound / ComputationError / PersistenceError
// ==========================================

use crate::engine::error::PricingError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 客户端错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 计算错误
    // ==========================================
    #[error("定价计算失败: {0}")]
    ComputationError(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("批量重算正在进行中，请稍后重试")]
    RecalcInProgress,

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据持久化失败: {0}")]
    PersistenceError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为调用方输入导致的错误
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::ValidationError(_) | ApiError::NotFound(_))
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ValidationError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),

            // 其余均为存储层故障
            other => ApiError::PersistenceError(other.to_string()),
        }
    }
}

// ==========================================
// 从 PricingError 转换
// ==========================================
impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::AdminSettingsMissing | PricingError::InvalidSettings(_) => {
                ApiError::ComputationError(err.to_string())
            }
            PricingError::RecalcInProgress => ApiError::RecalcInProgress,
            PricingError::Repository(e) => ApiError::from(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_are_classified() {
        let not_found: ApiError = RepositoryError::NotFound {
            entity: "RepairTask".to_string(),
            id: "T1".to_string(),
        }
        .into();
        assert!(matches!(not_found, ApiError::NotFound(_)));
        assert!(not_found.is_client_error());

        let lock: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(lock, ApiError::PersistenceError(_)));
        assert!(!lock.is_client_error());
    }

    #[test]
    fn test_pricing_errors_are_classified() {
        let missing: ApiError = PricingError::AdminSettingsMissing.into();
        assert!(matches!(missing, ApiError::ComputationError(_)));

        let busy: ApiError = PricingError::RecalcInProgress.into();
        assert!(matches!(busy, ApiError::RecalcInProgress));

        let wrapped: ApiError = PricingError::Repository(RepositoryError::NotFound {
            entity: "RepairTask".to_string(),
            id: "T9".to_string(),
        })
        .into();
        assert!(matches!(wrapped, ApiError::NotFound(_)));
    }
}
