// ==========================================
// 质检DPU跟踪系统 - 年度目标API
// ==========================================
// 职责: 目标分摊计算与落库 / 人工覆写 / 目标查询删除 /
//       改进计划台账
// 约定: 分摊校验只提示不拦截（advisory）; Manual 策略不经引擎
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::intervention::{InterventionPlan, StageStateSnapshot};
use crate::domain::target::{BaselineDpu, StageTarget, YearTarget};
use crate::domain::types::{AllocationStrategy, PerformanceTier};
use crate::engine::allocator::{
    performance_tier, reduction_percentage, validate_targets, AllocationScope, TargetAllocator,
};
use crate::engine::dpu::round2;
use crate::repository::{InspectionRepository, InterventionRepository, TargetRepository};
use serde::{Deserialize, Serialize};

/// 分摊请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateTargetsRequest {
    pub year: i32,
    pub combined_target: f64,
    pub production_target: f64,
    pub dpdi_target: f64,
    pub strategy: AllocationStrategy,
    /// 基准月聚合标识（轨迹与分摊的起点）
    pub baseline_month_id: String,
}

/// 工序目标摘要（响应用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTargetSummary {
    pub stage_name: String,
    pub current_dpu: f64,       // 基准月DPU
    pub target_dpu: f64,        // 分摊目标
    pub reduction_pct: f64,     // 需要的降幅百分比
    pub tier: PerformanceTier,  // 当前绩效档位
    pub is_manual: bool,
}

/// 分摊响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAllocationResponse {
    pub target: YearTarget,
    /// Σ工序目标与整体目标偏差是否落在容差内（仅提示）
    pub validation_passed: bool,
    pub stage_summaries: Vec<StageTargetSummary>,
}

// ==========================================
// TargetApi - 年度目标API
// ==========================================
pub struct TargetApi {
    target_repo: Arc<TargetRepository>,
    inspection_repo: Arc<InspectionRepository>,
    intervention_repo: Arc<InterventionRepository>,
    config: Arc<ConfigManager>,
    allocator: TargetAllocator,
}

impl TargetApi {
    /// 创建新的TargetApi实例
    pub fn new(
        target_repo: Arc<TargetRepository>,
        inspection_repo: Arc<InspectionRepository>,
        intervention_repo: Arc<InterventionRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            target_repo,
            inspection_repo,
            intervention_repo,
            config,
            allocator: TargetAllocator::new(),
        }
    }

    // ==========================================
    // 分摊与落库
    // ==========================================

    /// 按策略分摊年度目标并落库（keyed by year, upsert）
    ///
    /// Manual 策略请使用 set_manual_targets
    pub fn allocate_and_save(
        &self,
        request: &AllocateTargetsRequest,
    ) -> ApiResult<TargetAllocationResponse> {
        if request.strategy == AllocationStrategy::Manual {
            return Err(ApiError::InvalidInput(
                "Manual 策略不经分摊引擎, 请使用 set_manual_targets".to_string(),
            ));
        }
        for (label, v) in [
            ("combined_target", request.combined_target),
            ("production_target", request.production_target),
            ("dpdi_target", request.dpdi_target),
        ] {
            if v < 0.0 {
                return Err(ApiError::InvalidInput(format!("{} 不能为负: {}", label, v)));
            }
        }

        let baseline_month = self
            .inspection_repo
            .find_by_id(&request.baseline_month_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("基准月 {}", request.baseline_month_id))
            })?;

        let stage_targets = self.allocator.allocate(
            &baseline_month,
            request.combined_target,
            request.strategy,
            AllocationScope::Combined,
        );

        let tolerance = self.config.target_validation_tolerance();
        let validation_passed =
            validate_targets(&stage_targets, request.combined_target, tolerance);
        if !validation_passed {
            tracing::warn!(
                year = request.year,
                strategy = %request.strategy,
                "工序目标之和偏离整体目标超出容差（仅提示, 照常落库）"
            );
        }

        let mut target = YearTarget::new(
            request.year,
            request.combined_target,
            request.production_target,
            request.dpdi_target,
            request.strategy,
            BaselineDpu {
                combined_dpu: baseline_month.total_dpu,
                production_dpu: baseline_month.production_dpu,
                dpdi_dpu: baseline_month.dpdi_dpu,
            },
        );
        target.stage_targets = stage_targets;
        self.target_repo.upsert(&target)?;

        let stage_summaries = build_summaries(&baseline_month_dpus(&baseline_month), &target);
        Ok(TargetAllocationResponse {
            target,
            validation_passed,
            stage_summaries,
        })
    }

    /// 人工直接指定工序目标（原样落库, is_manual=true）
    ///
    /// 该年份尚无目标记录时, 以零顶层目标新建
    pub fn set_manual_targets(
        &self,
        year: i32,
        pairs: &[(String, f64)],
    ) -> ApiResult<YearTarget> {
        if pairs.is_empty() {
            return Err(ApiError::InvalidInput("工序目标列表不能为空".to_string()));
        }

        let mut target = match self.target_repo.find_by_year(year)? {
            Some(existing) => existing,
            None => YearTarget::new(
                year,
                0.0,
                0.0,
                0.0,
                AllocationStrategy::Manual,
                BaselineDpu::default(),
            ),
        };
        target.allocation_strategy = AllocationStrategy::Manual;
        target.stage_targets = self.allocator.manual_targets(pairs);
        target.updated_at = chrono::Utc::now();
        self.target_repo.upsert(&target)?;
        Ok(target)
    }

    /// 覆写单工序目标（其余条目不变）
    pub fn override_stage_target(
        &self,
        year: i32,
        stage_name: &str,
        target_dpu: f64,
    ) -> ApiResult<YearTarget> {
        if target_dpu < 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "工序目标不能为负: {}",
                target_dpu
            )));
        }
        let mut target = self
            .target_repo
            .find_by_year(year)?
            .ok_or_else(|| ApiError::NotFound(format!("年份 {} 的目标", year)))?;

        let upper = stage_name.trim().to_uppercase();
        match target
            .stage_targets
            .iter_mut()
            .find(|t| t.stage_name.to_uppercase() == upper)
        {
            Some(entry) => {
                entry.target_dpu = target_dpu;
                entry.is_manual = true;
            }
            None => target
                .stage_targets
                .push(StageTarget::manual(stage_name, target_dpu)),
        }
        target.updated_at = chrono::Utc::now();
        self.target_repo.upsert(&target)?;
        Ok(target)
    }

    // ==========================================
    // 查询 / 删除
    // ==========================================

    /// 查询全部年度目标
    pub fn list_targets(&self) -> ApiResult<Vec<YearTarget>> {
        Ok(self.target_repo.find_all()?)
    }

    /// 按年份查询
    pub fn get_target(&self, year: i32) -> ApiResult<YearTarget> {
        self.target_repo
            .find_by_year(year)?
            .ok_or_else(|| ApiError::NotFound(format!("年份 {} 的目标", year)))
    }

    /// 按年份删除
    pub fn delete_target(&self, year: i32) -> ApiResult<bool> {
        Ok(self.target_repo.delete_by_year(year)?)
    }

    // ==========================================
    // 改进计划台账
    // ==========================================

    /// 保存改进计划（(stage_name, year) 唯一, upsert）
    ///
    /// current_state 快照由本方法按当前数据重建后落库
    pub fn save_intervention_plan(&self, mut plan: InterventionPlan) -> ApiResult<InterventionPlan> {
        if plan.stage_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("工序名不能为空".to_string()));
        }

        if let Ok(target) = self.get_target(plan.year) {
            if let Some(stage_target) = target.find_stage_target(&plan.stage_name) {
                let current_dpu = self.latest_stage_dpu(&plan.stage_name)?;
                plan.current_state = build_stage_state(
                    current_dpu,
                    stage_target.target_dpu,
                    months_remaining_in_year(plan.year),
                );
            }
        }
        plan.updated_at = chrono::Utc::now();
        self.intervention_repo.upsert(&plan)?;
        Ok(plan)
    }

    /// 按年份查询改进计划列表
    pub fn list_intervention_plans(&self, year: i32) -> ApiResult<Vec<InterventionPlan>> {
        Ok(self.intervention_repo.find_by_year(year)?)
    }

    /// 按工序和年份查询单条
    pub fn get_intervention_plan(
        &self,
        stage_name: &str,
        year: i32,
    ) -> ApiResult<InterventionPlan> {
        self.intervention_repo
            .find_by_stage_and_year(stage_name, year)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("工序 {} 年份 {} 的改进计划", stage_name, year))
            })
    }

    /// 删除改进计划
    pub fn delete_intervention_plan(&self, stage_name: &str, year: i32) -> ApiResult<bool> {
        Ok(self.intervention_repo.delete(stage_name, year)?)
    }

    /// 最新月中某工序的DPU（无数据时为 0）
    fn latest_stage_dpu(&self, stage_name: &str) -> ApiResult<f64> {
        let months = self.inspection_repo.find_all()?;
        Ok(months
            .last()
            .and_then(|m| m.find_stage(stage_name))
            .map(|s| s.dpu)
            .unwrap_or(0.0))
    }
}

// ==========================================
// 纯辅助函数
// ==========================================

/// 现状快照: 差距与达标所需月均降幅
fn build_stage_state(current_dpu: f64, target_dpu: f64, months_remaining: i32) -> StageStateSnapshot {
    let gap = round2(current_dpu - target_dpu);
    let required_monthly_rate = if months_remaining > 0 && gap > 0.0 {
        round2(gap / months_remaining as f64)
    } else {
        0.0
    };
    StageStateSnapshot {
        current_dpu,
        target_dpu,
        gap,
        months_remaining,
        required_monthly_rate,
    }
}

/// 目标年份内剩余月数（目标年已过则为 0）
fn months_remaining_in_year(year: i32) -> i32 {
    use chrono::Datelike;
    let today = chrono::Local::now().date_naive();
    if today.year() > year {
        0
    } else if today.year() < year {
        12
    } else {
        12 - today.month() as i32 + 1
    }
}

fn baseline_month_dpus(month: &crate::domain::inspection::MonthlyInspection) -> Vec<(String, f64)> {
    month
        .stages
        .iter()
        .map(|s| (s.name.clone(), s.dpu))
        .collect()
}

fn build_summaries(current: &[(String, f64)], target: &YearTarget) -> Vec<StageTargetSummary> {
    target
        .stage_targets
        .iter()
        .map(|st| {
            let current_dpu = current
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&st.stage_name))
                .map(|(_, dpu)| *dpu)
                .unwrap_or(0.0);
            StageTargetSummary {
                stage_name: st.stage_name.clone(),
                current_dpu,
                target_dpu: st.target_dpu,
                reduction_pct: round2(reduction_percentage(current_dpu, st.target_dpu)),
                tier: performance_tier(current_dpu),
                is_manual: st.is_manual,
            }
        })
        .collect()
}
