// ==========================================
// 质检DPU跟踪系统 - 看板报表派生引擎
// ==========================================
// 职责: 由月度聚合序列派生看板报表数据结构
// 约定: 本引擎只产出数据, 渲染（HTML/PDF）由外部协作方完成,
//       系统与渲染方的唯一契约是 DashboardReport 的形状
// ==========================================

use crate::domain::inspection::{month_sort_key, MonthlyInspection};
use crate::domain::target::YearTarget;
use crate::domain::types::{PerformanceTier, StageChange};
use crate::engine::allocator::{performance_tier, reduction_percentage};
use crate::engine::dpu::round2;
use serde::{Deserialize, Serialize};

/// 月度变化判定阈值（DPU绝对差, 与两期前对比）
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.5;

// ==========================================
// 报表数据结构
// ==========================================

/// 工序变化摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChangeSummary {
    pub stage_name: String,            // 工序显示名
    pub current_dpu: f64,              // 最新月DPU
    pub reference_dpu: Option<f64>,    // 两期前DPU（无此期时为 None）
    pub change: StageChange,           // 变化分类
    pub tier: PerformanceTier,         // 当前绩效档位
}

/// 年度目标上下文（存在年度目标时附带）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetContext {
    pub year: i32,                  // 目标年份
    pub combined_target: f64,       // 全口径年度目标
    pub baseline_dpu: f64,          // 基准月全口径DPU
    pub latest_dpu: f64,            // 最新月全口径DPU
    pub reduction_needed_pct: f64,  // 最新月距目标还需的降幅百分比
}

/// 看板报表数据（与渲染协作方的契约）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub latest: Option<MonthlyInspection>,    // 最新月
    pub previous: Option<MonthlyInspection>,  // 上一月
    pub three_month_avg_dpu: f64,             // 近3个月全口径DPU均值
    pub ytd_avg_dpu: f64,                     // 最新年份年初至今均值
    pub stage_changes: Vec<StageChangeSummary>, // 工序变化摘要（显示序）
    pub target_context: Option<TargetContext>,  // 年度目标上下文
}

// ==========================================
// ReportEngine - 报表派生引擎
// ==========================================
pub struct ReportEngine {
    /// 变化判定阈值（可由配置覆写）
    change_threshold: f64,
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }
}

impl ReportEngine {
    pub fn new(change_threshold: f64) -> Self {
        Self { change_threshold }
    }

    /// 派生看板报表
    ///
    /// # 参数
    /// - months: 月度聚合（顺序不限, 内部按时间序排序）
    /// - year_target: 最新年份的年度目标（可选）
    pub fn build_report(
        &self,
        months: &[MonthlyInspection],
        year_target: Option<&YearTarget>,
    ) -> DashboardReport {
        let mut sorted: Vec<&MonthlyInspection> = months.iter().collect();
        sorted.sort_by_key(|m| month_sort_key(m));

        let latest = sorted.last().copied();
        let previous = sorted.len().checked_sub(2).and_then(|i| sorted.get(i)).copied();
        // 两期前: 变化分类的对比基准
        let reference = sorted.len().checked_sub(3).and_then(|i| sorted.get(i)).copied();

        let three_month_avg_dpu = Self::mean_dpu(&sorted[sorted.len().saturating_sub(3)..]);
        let ytd_avg_dpu = latest
            .map(|l| {
                let ytd: Vec<&MonthlyInspection> = sorted
                    .iter()
                    .filter(|m| m.year == l.year)
                    .copied()
                    .collect();
                Self::mean_dpu(&ytd)
            })
            .unwrap_or(0.0);

        let stage_changes = latest
            .map(|l| self.classify_stages(l, reference))
            .unwrap_or_default();

        let target_context = match (latest, year_target) {
            (Some(l), Some(t)) => Some(TargetContext {
                year: t.year,
                combined_target: t.combined_target,
                baseline_dpu: t.baseline.combined_dpu,
                latest_dpu: l.total_dpu,
                reduction_needed_pct: round2(reduction_percentage(
                    l.total_dpu,
                    t.combined_target,
                )),
            }),
            _ => None,
        };

        DashboardReport {
            latest: latest.cloned(),
            previous: previous.cloned(),
            three_month_avg_dpu,
            ytd_avg_dpu,
            stage_changes,
            target_context,
        }
    }

    /// 工序变化分类: 与两期前对比, 超阈值判 Improved/Deteriorated, 否则 Stable
    ///
    /// 两期前不存在（数据不足）或该工序当期新增时一律判 Stable
    fn classify_stages(
        &self,
        latest: &MonthlyInspection,
        reference: Option<&MonthlyInspection>,
    ) -> Vec<StageChangeSummary> {
        latest
            .stages_in_display_order()
            .into_iter()
            .map(|stage| {
                let reference_dpu =
                    reference.and_then(|r| r.find_stage(&stage.name)).map(|s| s.dpu);
                let change = match reference_dpu {
                    Some(ref_dpu) => {
                        let delta = stage.dpu - ref_dpu;
                        if delta <= -self.change_threshold {
                            StageChange::Improved
                        } else if delta >= self.change_threshold {
                            StageChange::Deteriorated
                        } else {
                            StageChange::Stable
                        }
                    }
                    None => StageChange::Stable,
                };
                StageChangeSummary {
                    stage_name: stage.name.clone(),
                    current_dpu: stage.dpu,
                    reference_dpu,
                    change,
                    tier: performance_tier(stage.dpu),
                }
            })
            .collect()
    }

    fn mean_dpu(months: &[&MonthlyInspection]) -> f64 {
        if months.is_empty() {
            return 0.0;
        }
        round2(months.iter().map(|m| m.total_dpu).sum::<f64>() / months.len() as f64)
    }
}
