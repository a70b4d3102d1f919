// ==========================================
// 质检DPU跟踪系统 - 目标分摊引擎
// ==========================================
// 职责: 将年度整体目标DPU按策略分摊到各工序
// 输入: 基准月聚合 + 整体目标值 + 策略 + 口径
// 输出: Vec<StageTarget>（工序顺序与基准月一致）
// 红线: 退化输入走兜底或返回空结果, 绝不向调用方抛出中断
// ==========================================

use crate::domain::inspection::{MonthlyInspection, StageRecord};
use crate::domain::target::StageTarget;
use crate::domain::types::{AllocationStrategy, PerformanceTier, StageType};
use crate::engine::dpu::round2;

// ==========================================
// 分摊口径 (Allocation Scope)
// ==========================================
// 决定参与分摊的工序子集与基准总DPU的取值口径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationScope {
    Combined,   // 全部工序, 基准取 total_dpu
    Production, // 仅生产工序, 基准取 production_dpu
    Dpdi,       // 仅交检工序, 基准取 dpdi_dpu
}

impl AllocationScope {
    /// 口径内的工序子集（保持原顺序）
    fn stages<'a>(&self, baseline: &'a MonthlyInspection) -> Vec<&'a StageRecord> {
        match self {
            AllocationScope::Combined => baseline.stages.iter().collect(),
            AllocationScope::Production => baseline
                .stages
                .iter()
                .filter(|s| s.stage_type == StageType::Production)
                .collect(),
            AllocationScope::Dpdi => baseline
                .stages
                .iter()
                .filter(|s| s.stage_type == StageType::Dpdi)
                .collect(),
        }
    }

    /// 口径对应的基准总DPU
    fn baseline_total_dpu(&self, baseline: &MonthlyInspection) -> f64 {
        match self {
            AllocationScope::Combined => baseline.total_dpu,
            AllocationScope::Production => baseline.production_dpu,
            AllocationScope::Dpdi => baseline.dpdi_dpu,
        }
    }
}

// ==========================================
// TargetAllocator - 目标分摊引擎
// ==========================================
pub struct TargetAllocator {
    // 无状态引擎, 不需要注入依赖
}

impl Default for TargetAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetAllocator {
    pub fn new() -> Self {
        Self {}
    }

    /// 按策略分摊
    ///
    /// Manual 策略不含计算, 由调用方直接提供 stage_targets, 此处返回空结果
    pub fn allocate(
        &self,
        baseline: &MonthlyInspection,
        overall_target: f64,
        strategy: AllocationStrategy,
        scope: AllocationScope,
    ) -> Vec<StageTarget> {
        match strategy {
            AllocationStrategy::Proportional => {
                self.allocate_proportional(baseline, overall_target, scope)
            }
            AllocationStrategy::Weighted => {
                self.allocate_weighted(baseline, overall_target, scope)
            }
            AllocationStrategy::Hybrid => self.allocate_hybrid(baseline, overall_target, scope),
            AllocationStrategy::Manual => Vec::new(),
        }
    }

    /// 按比例分摊（默认/兜底策略）
    ///
    /// 活跃工序（inspected > 0）: target = round2(dpu / 基准总DPU * overall);
    /// 非活跃工序 target = 0
    ///
    /// # 退化输入
    /// 口径基准总DPU <= 0 时比例无定义, 记录 warn 并返回空结果
    pub fn allocate_proportional(
        &self,
        baseline: &MonthlyInspection,
        overall_target: f64,
        scope: AllocationScope,
    ) -> Vec<StageTarget> {
        let base_total = scope.baseline_total_dpu(baseline);
        if base_total <= 0.0 {
            tracing::warn!(
                month = %baseline.date,
                scope = ?scope,
                "基准月总DPU为零, 无法按比例分摊, 返回空结果"
            );
            return Vec::new();
        }

        scope
            .stages(baseline)
            .iter()
            .map(|stage| {
                let target_dpu = if stage.inspected > 0 {
                    round2(stage.dpu / base_total * overall_target)
                } else {
                    0.0
                };
                StageTarget::computed(&stage.name, target_dpu)
            })
            .collect()
    }

    /// 按故障占比加权分摊, 叠加反体量因子
    ///
    /// target = round2(faults / 总faults * overall * (总inspected / inspected))
    ///
    /// # 退化输入
    /// 口径内总故障数为 0 时回退按比例分摊
    pub fn allocate_weighted(
        &self,
        baseline: &MonthlyInspection,
        overall_target: f64,
        scope: AllocationScope,
    ) -> Vec<StageTarget> {
        let stages = scope.stages(baseline);
        let total_faults: i64 = stages.iter().map(|s| s.faults).sum();
        if total_faults == 0 {
            tracing::warn!(
                month = %baseline.date,
                scope = ?scope,
                "基准月总故障数为零, 加权分摊回退为按比例分摊"
            );
            return self.allocate_proportional(baseline, overall_target, scope);
        }
        let total_inspections: i64 = stages.iter().map(|s| s.inspected).sum();

        stages
            .iter()
            .map(|stage| {
                let target_dpu = if stage.inspected > 0 {
                    let fault_share = stage.faults as f64 / total_faults as f64;
                    let inverse_volume = total_inspections as f64 / stage.inspected as f64;
                    round2(fault_share * overall_target * inverse_volume)
                } else {
                    0.0
                };
                StageTarget::computed(&stage.name, target_dpu)
            })
            .collect()
    }

    /// 混合分摊: 比例目标与档位目标取均值
    ///
    /// 档位保留系数按当前DPU分档: <0.5 保留80%, <1.0 保留60%,
    /// <2.0 保留50%, 其余保留40%
    ///
    /// # 退化输入
    /// 与比例分摊一致: 基准总DPU <= 0 时返回空结果
    pub fn allocate_hybrid(
        &self,
        baseline: &MonthlyInspection,
        overall_target: f64,
        scope: AllocationScope,
    ) -> Vec<StageTarget> {
        let proportional = self.allocate_proportional(baseline, overall_target, scope);
        if proportional.is_empty() {
            return proportional;
        }

        scope
            .stages(baseline)
            .iter()
            .zip(proportional.iter())
            .map(|(stage, prop)| {
                let tier_target = stage.dpu * tier_keep_factor(stage.dpu);
                let target_dpu = if stage.inspected > 0 {
                    round2((prop.target_dpu + tier_target) / 2.0)
                } else {
                    0.0
                };
                StageTarget::computed(&stage.name, target_dpu)
            })
            .collect()
    }

    /// 人工指定: 原样落库, 标记 is_manual
    pub fn manual_targets(&self, pairs: &[(String, f64)]) -> Vec<StageTarget> {
        pairs
            .iter()
            .map(|(name, dpu)| StageTarget::manual(name, *dpu))
            .collect()
    }
}

// ==========================================
// 校验与派生辅助（纯函数）
// ==========================================

/// 校验工序目标之和与整体目标的偏差是否在容差内
///
/// 仅用于提示分摊漂移（advisory）, 不在写入时强制
pub fn validate_targets(stage_targets: &[StageTarget], overall_target: f64, tolerance: f64) -> bool {
    let sum: f64 = stage_targets.iter().map(|t| t.target_dpu).sum();
    (sum - overall_target).abs() <= tolerance
}

/// 降幅百分比: (current - target) / current * 100; current == 0 时为 0
pub fn reduction_percentage(current: f64, target: f64) -> f64 {
    if current == 0.0 {
        return 0.0;
    }
    (current - target) / current * 100.0
}

/// 绩效档位（仅用于标签展示）
pub fn performance_tier(dpu: f64) -> PerformanceTier {
    if dpu < 0.5 {
        PerformanceTier::Excellent
    } else if dpu < 1.0 {
        PerformanceTier::Good
    } else if dpu < 2.0 {
        PerformanceTier::NeedsImprovement
    } else {
        PerformanceTier::Critical
    }
}

/// 档位保留系数（混合分摊用）: 保留当前DPU的 80%/60%/50%/40%
pub fn tier_keep_factor(dpu: f64) -> f64 {
    if dpu < 0.5 {
        0.8
    } else if dpu < 1.0 {
        0.6
    } else if dpu < 2.0 {
        0.5
    } else {
        0.4
    }
}
