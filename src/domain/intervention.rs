// ==========================================
// 质检DPU跟踪系统 - 改进计划领域模型
// ==========================================
// InterventionPlan: 工序×年度的改进措施台账
// 定位: 记录型数据, 除复用分摊引擎的口径快照外不含计算逻辑
// ==========================================

use crate::domain::types::{ActionStatus, ConfidenceLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// InterventionAction - 单项改进措施
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionAction {
    pub action_id: String,             // 措施标识（UUID）
    pub description: String,           // 措施描述
    pub estimated_dpu_reduction: f64,  // 预估DPU降幅
    pub confidence: ConfidenceLevel,   // 置信度
    pub status: ActionStatus,          // 实施状态
}

impl InterventionAction {
    pub fn new(
        description: &str,
        estimated_dpu_reduction: f64,
        confidence: ConfidenceLevel,
    ) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            description: description.to_string(),
            estimated_dpu_reduction,
            confidence,
            status: ActionStatus::Planned,
        }
    }
}

// ==========================================
// StageStateSnapshot - 现状快照
// ==========================================
// 由 TargetApi 在保存计划时写入, 非实时派生
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageStateSnapshot {
    pub current_dpu: f64,           // 当前DPU
    pub target_dpu: f64,            // 目标DPU
    pub gap: f64,                   // 差距 = current - target
    pub months_remaining: i32,      // 年内剩余月数
    pub required_monthly_rate: f64, // 达标所需的月均降幅
}

// ==========================================
// InterventionProjection - 预测
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InterventionProjection {
    pub baseline_forecast: f64,  // 不采取措施的年末预测DPU
    pub adjusted_forecast: f64,  // 叠加措施降幅后的预测DPU
    pub confidence_score: f64,   // 综合置信评分（0-1）
}

// ==========================================
// InterventionPlan - 改进计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionPlan {
    // ===== 标识 =====
    pub plan_id: String,    // 计划标识（UUID）
    pub stage_name: String, // 工序显示名
    pub year: i32,          // 目标年份（stage_name + year 唯一）

    // ===== 内容 =====
    pub actions: Vec<InterventionAction>,       // 措施清单
    pub current_state: StageStateSnapshot,      // 现状快照
    pub projections: InterventionProjection,    // 预测

    // ===== 审计字段 =====
    pub updated_at: DateTime<Utc>,
}

impl InterventionPlan {
    pub fn new(stage_name: &str, year: i32) -> Self {
        Self {
            plan_id: Uuid::new_v4().to_string(),
            stage_name: stage_name.to_string(),
            year,
            actions: Vec::new(),
            current_state: StageStateSnapshot::default(),
            projections: InterventionProjection::default(),
            updated_at: Utc::now(),
        }
    }
}
