// ==========================================
// 质检DPU跟踪系统 - API 层
// ==========================================
// 职责: 面向调用方（CLI/外壳）的业务接口
// 约定: 入参校验在此层完成; 错误经 ApiError 统一表达, 不向外 panic
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod inspection_api;
pub mod target_api;

// 重导出核心类型
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse};
pub use inspection_api::{InspectionApi, RecalcTotalsSummary};
pub use target_api::{
    AllocateTargetsRequest, StageTargetSummary, TargetAllocationResponse, TargetApi,
};
