// ==========================================
// 质检DPU跟踪系统 - 导入层
// ==========================================
// 职责: 把异构的历史导出格式归一化为标准 MonthlyInspection 聚合
// 形态: 宽表CSV / 分节CSV / JSON备份（数组、信封、历史导出）
// 红线: 每个形态一个解码器, 均收敛到同一个规范类型;
//       无法匹配任何形态时拒绝/告警, 不做鸭子类型兜底
// ==========================================

pub mod csv_export;
pub mod error;
pub mod json_backup;
pub mod reconciler;
pub mod sectioned_csv;
pub mod wide_csv;

// 重导出核心类型
pub use csv_export::export_wide_csv;
pub use error::{ImportError, ImportResult};
pub use reconciler::{
    detect_shape, InputShape, ReconcileOutcome, Reconciler, DEFAULT_DPU_MISMATCH_TOLERANCE,
};
