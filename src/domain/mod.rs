// ==========================================
// 质检DPU跟踪系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含持久化与业务流程
// 红线: 派生字段（dpu / 各 total）只能经引擎层重算
// ==========================================

pub mod inspection;
pub mod intervention;
pub mod target;
pub mod types;

// 重导出核心实体
pub use inspection::{
    month_sort_key, parse_month_from_label, parse_year_from_label, MonthTotals,
    MonthlyInspection, StageRecord, DEFAULT_STAGE_NAMES, DPDI_STAGE_NAMES, SIGNOUT_STAGE_NAMES,
};
pub use intervention::{
    InterventionAction, InterventionPlan, InterventionProjection, StageStateSnapshot,
};
pub use target::{BaselineDpu, StageTarget, YearTarget};
pub use types::{
    ActionStatus, AllocationStrategy, ConfidenceLevel, PerformanceTier, StageChange, StageType,
};
