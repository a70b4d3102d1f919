// ==========================================
// 质检DPU跟踪系统 - DPU计算引擎
// ==========================================
// 职责: 由原始计数确定性地派生 dpu 与月度汇总
// 红线: 纯函数, 无副作用, 幂等; 持久化由调用方负责
// 口径: total_dpu = round2(Σ 工序dpu), 不等于合并计数口径
//       （系统提供 recalculate_totals 维护操作专门重新执行本口径）
// ==========================================

use crate::domain::inspection::{MonthTotals, MonthlyInspection, StageRecord};
use crate::domain::types::StageType;

/// 保留两位小数
///
/// 采用 f64::round 的远离零舍入（half-away-from-zero）, 全系统统一此策略
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// 计算单工序DPU
///
/// # 规则
/// - inspected <= 0 时返回 0（负数视同 0, 任何数值输入都不会 panic）
/// - 其余返回 round2(faults / inspected)
pub fn compute_stage_dpu(inspected: i64, faults: i64) -> f64 {
    if inspected <= 0 {
        return 0.0;
    }
    round2(faults as f64 / inspected as f64)
}

/// 计算月度全口径汇总
///
/// total_inspections / total_faults 为普通求和;
/// total_dpu 为各工序 dpu 字段之和再保留两位小数（领域规则, 非合并计数口径）
pub fn compute_month_totals(stages: &[StageRecord]) -> MonthTotals {
    MonthTotals {
        total_inspections: stages.iter().map(|s| s.inspected).sum(),
        total_faults: stages.iter().map(|s| s.faults).sum(),
        total_dpu: round2(stages.iter().map(|s| s.dpu).sum()),
    }
}

/// 计算指定工序类型子集的汇总（口径规则同全口径）
pub fn compute_segment_totals(stages: &[StageRecord], stage_type: StageType) -> MonthTotals {
    let subset: Vec<StageRecord> = stages
        .iter()
        .filter(|s| s.stage_type == stage_type)
        .cloned()
        .collect();
    compute_month_totals(&subset)
}

/// 更新工序计数并重算 dpu
///
/// 未指定的字段保持原值; 返回新记录, 不修改入参
pub fn update_stage(
    stage: &StageRecord,
    new_inspected: Option<i64>,
    new_faults: Option<i64>,
) -> StageRecord {
    let inspected = new_inspected.unwrap_or(stage.inspected);
    let faults = new_faults.unwrap_or(stage.faults);
    StageRecord {
        inspected,
        faults,
        dpu: compute_stage_dpu(inspected, faults),
        ..stage.clone()
    }
}

/// 重算整月派生字段（工序 dpu + 三个口径汇总 + 签出量）
///
/// stages 发生任何结构性变化（增/删/改）后必须调用;
/// 对未变化的输入重复调用得到相同输出
pub fn recompute_month(month: &mut MonthlyInspection) {
    for stage in &mut month.stages {
        stage.dpu = compute_stage_dpu(stage.inspected, stage.faults);
    }

    let combined = compute_month_totals(&month.stages);
    month.total_inspections = combined.total_inspections;
    month.total_faults = combined.total_faults;
    month.total_dpu = combined.total_dpu;

    let production = compute_segment_totals(&month.stages, StageType::Production);
    month.production_inspections = production.total_inspections;
    month.production_faults = production.total_faults;
    month.production_dpu = production.total_dpu;

    let dpdi = compute_segment_totals(&month.stages, StageType::Dpdi);
    month.dpdi_inspections = dpdi.total_inspections;
    month.dpdi_faults = dpdi.total_faults;
    month.dpdi_dpu = dpdi.total_dpu;

    month.signout_volume = month
        .stages
        .iter()
        .find(|s| StageRecord::is_signout(&s.name))
        .map(|s| s.inspected)
        .unwrap_or(0);
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inspection::StageRecord;

    #[test]
    fn test_compute_stage_dpu_正常计算() {
        // 具体场景: 1384 台检出 12630 个故障
        assert_eq!(compute_stage_dpu(1384, 12630), 9.13);
        assert_eq!(compute_stage_dpu(100, 70), 0.7);
        assert_eq!(compute_stage_dpu(3, 1), 0.33);
    }

    #[test]
    fn test_compute_stage_dpu_零与负数检查量() {
        assert_eq!(compute_stage_dpu(0, 100), 0.0);
        assert_eq!(compute_stage_dpu(-5, 100), 0.0);
        assert_eq!(compute_stage_dpu(0, 0), 0.0);
    }

    #[test]
    fn test_compute_month_totals_dpu为工序dpu之和() {
        // totalDpu 独立于合并计数口径: 两工序 0.5 + 9.0 = 9.5,
        // 而合并口径为 (50 + 90) / (100 + 10) = 1.27
        let stages = vec![
            StageRecord::new("SIP1", 100, 50),
            StageRecord::new("SIP2", 10, 90),
        ];
        let totals = compute_month_totals(&stages);
        assert_eq!(totals.total_inspections, 110);
        assert_eq!(totals.total_faults, 140);
        assert_eq!(totals.total_dpu, 9.5);
    }

    #[test]
    fn test_compute_month_totals_空集() {
        let totals = compute_month_totals(&[]);
        assert_eq!(totals.total_inspections, 0);
        assert_eq!(totals.total_faults, 0);
        assert_eq!(totals.total_dpu, 0.0);
    }

    #[test]
    fn test_update_stage_幂等() {
        let stage = StageRecord::new("SIP3", 200, 84);
        let once = update_stage(&stage, Some(150), Some(60));
        let twice = update_stage(&once, Some(150), Some(60));
        assert_eq!(once, twice);
        assert_eq!(once.dpu, 0.4);
    }

    #[test]
    fn test_update_stage_未指定字段保持原值() {
        let stage = StageRecord::new("SIP3", 200, 84);
        let updated = update_stage(&stage, None, Some(100));
        assert_eq!(updated.inspected, 200);
        assert_eq!(updated.faults, 100);
        assert_eq!(updated.dpu, 0.5);
    }

    #[test]
    fn test_recompute_month_分口径汇总与签出量() {
        let mut month = MonthlyInspection::empty("Jan-25", 2025);
        month.stages = vec![
            StageRecord::new("SIP1", 1000, 700),  // production, dpu 0.7
            StageRecord::new("SIGN", 950, 100),   // production + signout, dpu 0.11
            StageRecord::new("DPDI", 900, 450),   // dpdi, dpu 0.5
            StageRecord::new("DVAL", 800, 80),    // dpdi, dpu 0.1
        ];
        recompute_month(&mut month);

        assert_eq!(month.total_inspections, 3650);
        assert_eq!(month.total_faults, 1330);
        assert_eq!(month.total_dpu, 1.41);
        assert_eq!(month.production_dpu, 0.81);
        assert_eq!(month.dpdi_dpu, 0.6);
        assert_eq!(month.production_inspections, 1950);
        assert_eq!(month.dpdi_faults, 530);
        assert_eq!(month.signout_volume, 950);
    }

    #[test]
    fn test_recompute_month_无签出工序时为零() {
        let mut month = MonthlyInspection::empty("Feb-25", 2025);
        month.stages = vec![StageRecord::new("SIP1", 100, 10)];
        recompute_month(&mut month);
        assert_eq!(month.signout_volume, 0);
    }

    #[test]
    fn test_recompute_month_覆盖外部传入的脏dpu() {
        // dpu 永远由计数重算, 不信任外部值
        let mut month = MonthlyInspection::empty("Mar-25", 2025);
        let mut stage = StageRecord::new("SIP1", 100, 50);
        stage.dpu = 99.0;
        month.stages = vec![stage];
        recompute_month(&mut month);
        assert_eq!(month.stages[0].dpu, 0.5);
        assert_eq!(month.total_dpu, 0.5);
    }
}
