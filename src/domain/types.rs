// ==========================================
// 质检DPU跟踪系统 - 领域类型定义
// ==========================================
// 工序分类 / 目标分摊策略 / 绩效档位 / 月度变化分类
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工序类型 (Stage Type)
// ==========================================
// 规则: 工序名属于固定集合 {DPDI, DVAL, DCONF} 时为 Dpdi,
//       其余一律视为 Production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    Production, // 生产工序
    Dpdi,       // 交付前检查工序 (Pre-Delivery Inspection)
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageType::Production => write!(f, "PRODUCTION"),
            StageType::Dpdi => write!(f, "DPDI"),
        }
    }
}

// ==========================================
// 目标分摊策略 (Allocation Strategy)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStrategy {
    Proportional, // 按工序DPU占比分摊（默认/兜底策略）
    Weighted,     // 按故障占比加权，叠加反体量因子
    Hybrid,       // 占比目标与档位目标的均值
    Manual,       // 人工直接指定
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStrategy::Proportional => write!(f, "PROPORTIONAL"),
            AllocationStrategy::Weighted => write!(f, "WEIGHTED"),
            AllocationStrategy::Hybrid => write!(f, "HYBRID"),
            AllocationStrategy::Manual => write!(f, "MANUAL"),
        }
    }
}

impl AllocationStrategy {
    /// 从存储字符串解析（未识别时回退 Proportional）
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "WEIGHTED" => AllocationStrategy::Weighted,
            "HYBRID" => AllocationStrategy::Hybrid,
            "MANUAL" => AllocationStrategy::Manual,
            _ => AllocationStrategy::Proportional,
        }
    }
}

// ==========================================
// 绩效档位 (Performance Tier)
// ==========================================
// 纯分类标签: DPU <0.5 / <1.0 / <2.0 / 其余
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceTier {
    Excellent,        // 优秀
    Good,             // 良好
    NeedsImprovement, // 待改进
    Critical,         // 严重
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceTier::Excellent => write!(f, "EXCELLENT"),
            PerformanceTier::Good => write!(f, "GOOD"),
            PerformanceTier::NeedsImprovement => write!(f, "NEEDS_IMPROVEMENT"),
            PerformanceTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 月度变化分类 (Stage Change)
// ==========================================
// 与两期前对比, 阈值 ±0.5 DPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageChange {
    Improved,     // 改善（下降超过阈值）
    Stable,       // 稳定
    Deteriorated, // 恶化（上升超过阈值）
}

impl fmt::Display for StageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageChange::Improved => write!(f, "IMPROVED"),
            StageChange::Stable => write!(f, "STABLE"),
            StageChange::Deteriorated => write!(f, "DETERIORATED"),
        }
    }
}

// ==========================================
// 改进措施状态 (Action Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Planned,    // 已计划
    InProgress, // 实施中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Planned => write!(f, "PLANNED"),
            ActionStatus::InProgress => write!(f, "IN_PROGRESS"),
            ActionStatus::Completed => write!(f, "COMPLETED"),
            ActionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 措施置信度 (Confidence Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,    // 低
    Medium, // 中
    High,   // 高
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "LOW"),
            ConfidenceLevel::Medium => write!(f, "MEDIUM"),
            ConfidenceLevel::High => write!(f, "HIGH"),
        }
    }
}
