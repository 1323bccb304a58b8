// ==========================================
// 珠宝维修定价系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 维修任务按金属变体定价（零售/批发）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 文档访问
pub mod repository;

// 配置层 - 管理设置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 引擎层 - 定价规则
pub mod engine;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域
pub use domain::{
    ActionLog, ActionType, AdminSettings, MetalVariant, PriceBreakdown, PricingMap, PricingState,
    RepairMaterial, RepairProcess, RepairTask, SkillLevel, TaskSelections, UNIVERSAL_VARIANT_KEY,
};

// 引擎
pub use engine::{
    compute_pricing_map, compute_variant_pricing, PricingError, PricingMode, PricingOrchestrator,
    PricingRecalcEngine, RecalcSummary,
};

// API
pub use api::{ApiError, ApiResult, CatalogApi, PricingApi, TaskApi};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "珠宝维修定价系统";
