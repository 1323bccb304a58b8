// ==========================================
// 珠宝维修定价系统 - 领域模型层
// ==========================================
// 职责: 定义工序、材料、维修任务、管理设置等领域实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod material;
pub mod process;
pub mod settings;
pub mod task;
pub mod types;
pub mod variant;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use material::{RepairMaterial, StullerProduct};
pub use process::{ProcessMaterialEstimate, ProcessPricing, ProcessPricingDoc, RepairProcess};
pub use settings::{AdminSettings, SkillLevelMultipliers};
pub use task::{
    MaterialSelection, PriceBreakdown, PricingMap, ProcessSelection, RepairTask, TaskSelections,
};
pub use types::{PricingState, SkillLevel};
pub use variant::{format_metal_key, parse_metal_key, MetalVariant, UNIVERSAL_VARIANT_KEY};
