// ==========================================
// 质检DPU跟踪系统 - 引擎层
// ==========================================
// 职责: 实现业务规则, 不拼 SQL
// 红线: 引擎层全部为纯函数/无状态引擎, 持久化由 API 层负责
// ==========================================

pub mod allocator;
pub mod dpu;
pub mod report;

// 重导出核心引擎
pub use allocator::{
    performance_tier, reduction_percentage, tier_keep_factor, validate_targets, AllocationScope,
    TargetAllocator,
};
pub use report::{DashboardReport, ReportEngine, StageChangeSummary, TargetContext};
