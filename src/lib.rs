// ==========================================
// 质检DPU跟踪系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统（月度质检DPU跟踪与年度目标分摊）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ActionStatus, AllocationStrategy, ConfidenceLevel, PerformanceTier, StageChange, StageType,
};

// 领域实体
pub use domain::{
    BaselineDpu, InterventionPlan, MonthTotals, MonthlyInspection, StageRecord, StageTarget,
    YearTarget,
};

// 引擎
pub use engine::{AllocationScope, DashboardReport, ReportEngine, TargetAllocator};

// 导入
pub use importer::{ReconcileOutcome, Reconciler};

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
