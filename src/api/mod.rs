// ==========================================
// 珠宝维修定价系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI / 上层服务调用
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod pricing_api;
pub mod task_api;
pub mod validator;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CatalogDocument, CatalogImportResult};
pub use error::{ApiError, ApiResult};
pub use pricing_api::PricingApi;
pub use task_api::TaskApi;
pub use validator::{TaskInput, TaskInputValidator};
