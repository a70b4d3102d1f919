// ==========================================
// 质检DPU跟踪系统 - 年度目标领域模型
// ==========================================
// YearTarget: 年度DPU改进目标（按 year 一年一条, upsert 语义）
// StageTarget: 分摊到工序的目标（分摊引擎输出或人工覆写）
// ==========================================

use crate::domain::types::AllocationStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BaselineDpu - 基准月DPU口径
// ==========================================
// 用途: 轨迹与分摊计算的起点（取某参考月的三个口径汇总）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BaselineDpu {
    pub combined_dpu: f64,   // 全口径基准
    pub production_dpu: f64, // 生产口径基准
    pub dpdi_dpu: f64,       // 交检口径基准
}

// ==========================================
// StageTarget - 工序目标
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTarget {
    pub stage_name: String, // 工序显示名
    pub target_dpu: f64,    // 目标DPU（两位小数）
    pub is_manual: bool,    // 人工覆写标记
}

impl StageTarget {
    pub fn computed(stage_name: &str, target_dpu: f64) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            target_dpu,
            is_manual: false,
        }
    }

    pub fn manual(stage_name: &str, target_dpu: f64) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            target_dpu,
            is_manual: true,
        }
    }
}

// ==========================================
// YearTarget - 年度目标
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTarget {
    // ===== 主键 =====
    pub year: i32, // 目标年份（一年一条）

    // ===== 顶层目标 =====
    pub combined_target: f64,   // 全口径年度目标DPU
    pub production_target: f64, // 生产口径年度目标DPU
    pub dpdi_target: f64,       // 交检口径年度目标DPU

    // ===== 分摊配置 =====
    pub allocation_strategy: AllocationStrategy, // 分摊策略
    pub baseline: BaselineDpu,                   // 基准月DPU

    // ===== 分摊结果 =====
    pub stage_targets: Vec<StageTarget>, // 工序目标（顺序有意义）

    // ===== 审计字段 =====
    pub updated_at: DateTime<Utc>,
}

impl YearTarget {
    /// 创建未分摊的年度目标（stage_targets 为空, 待分摊引擎填充）
    pub fn new(
        year: i32,
        combined_target: f64,
        production_target: f64,
        dpdi_target: f64,
        strategy: AllocationStrategy,
        baseline: BaselineDpu,
    ) -> Self {
        Self {
            year,
            combined_target,
            production_target,
            dpdi_target,
            allocation_strategy: strategy,
            baseline,
            stage_targets: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// 按工序名查找目标（忽略大小写）
    pub fn find_stage_target(&self, stage_name: &str) -> Option<&StageTarget> {
        let upper = stage_name.trim().to_uppercase();
        self.stage_targets
            .iter()
            .find(|t| t.stage_name.to_uppercase() == upper)
    }
}
