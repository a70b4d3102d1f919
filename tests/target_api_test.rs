// ==========================================
// 年度目标API集成测试
// ==========================================
// 覆盖: 分摊落库、advisory校验、人工目标、单工序覆写、
//       查询删除、改进计划台账
// ==========================================

mod helpers;

use dpu_tracker::api::{AllocateTargetsRequest, ApiError};
use dpu_tracker::domain::intervention::{InterventionAction, InterventionPlan};
use dpu_tracker::domain::types::{AllocationStrategy, ConfidenceLevel, PerformanceTier};
use helpers::{ApiTestEnv, SAMPLE_WIDE_CSV};

fn request_2025(strategy: AllocationStrategy) -> AllocateTargetsRequest {
    AllocateTargetsRequest {
        year: 2025,
        combined_target: 5.0,
        production_target: 4.5,
        dpdi_target: 0.5,
        strategy,
        baseline_month_id: "month-jan-25".to_string(),
    }
}

#[tokio::test]
async fn test_proportional分摊落库() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    let response = env
        .state
        .target_api
        .allocate_and_save(&request_2025(AllocationStrategy::Proportional))
        .unwrap();

    // 基准月 Jan-25: SIP1 0.70, SIGN 9.13, DPDI 0.50, 总 10.33
    assert!(response.validation_passed);
    let target = &response.target;
    assert_eq!(target.year, 2025);
    assert_eq!(target.baseline.combined_dpu, 10.33);
    assert_eq!(target.stage_targets.len(), 3);
    assert_eq!(target.find_stage_target("SIP1").unwrap().target_dpu, 0.34);
    assert_eq!(target.find_stage_target("SIGN").unwrap().target_dpu, 4.42);
    assert_eq!(target.find_stage_target("DPDI").unwrap().target_dpu, 0.24);

    // 摘要带当前DPU/档位/降幅
    let sign = response
        .stage_summaries
        .iter()
        .find(|s| s.stage_name == "SIGN")
        .unwrap();
    assert_eq!(sign.current_dpu, 9.13);
    assert_eq!(sign.tier, PerformanceTier::Critical);
    assert!(sign.reduction_pct > 50.0);
    assert!(!sign.is_manual);

    // 已持久化, 按年份可查回
    let stored = env.state.target_api.get_target(2025).unwrap();
    assert_eq!(stored.stage_targets, target.stage_targets);
}

#[tokio::test]
async fn test_同年份重复分摊为覆盖() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    env.state
        .target_api
        .allocate_and_save(&request_2025(AllocationStrategy::Proportional))
        .unwrap();
    env.state
        .target_api
        .allocate_and_save(&request_2025(AllocationStrategy::Hybrid))
        .unwrap();

    let targets = env.state.target_api.list_targets().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].allocation_strategy, AllocationStrategy::Hybrid);
}

#[tokio::test]
async fn test_分摊入参校验() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    // Manual 策略不经分摊引擎
    let err = env
        .state
        .target_api
        .allocate_and_save(&request_2025(AllocationStrategy::Manual))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 负目标
    let mut request = request_2025(AllocationStrategy::Proportional);
    request.combined_target = -1.0;
    let err = env.state.target_api.allocate_and_save(&request).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 基准月不存在
    let mut request = request_2025(AllocationStrategy::Proportional);
    request.baseline_month_id = "month-dec-99".to_string();
    let err = env.state.target_api.allocate_and_save(&request).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_人工目标与单工序覆写() {
    let env = ApiTestEnv::new().unwrap();

    // 该年份尚无目标记录: 以零顶层目标新建
    let target = env
        .state
        .target_api
        .set_manual_targets(2025, &[("SIP1".to_string(), 0.4), ("SIGN".to_string(), 4.0)])
        .unwrap();
    assert_eq!(target.allocation_strategy, AllocationStrategy::Manual);
    assert_eq!(target.combined_target, 0.0);
    assert!(target.stage_targets.iter().all(|t| t.is_manual));

    // 覆写已有条目
    let target = env
        .state
        .target_api
        .override_stage_target(2025, "sign", 3.5)
        .unwrap();
    let sign = target.find_stage_target("SIGN").unwrap();
    assert_eq!(sign.target_dpu, 3.5);
    assert!(sign.is_manual);

    // 覆写不存在的工序: 追加新条目
    let target = env
        .state
        .target_api
        .override_stage_target(2025, "CAB", 0.2)
        .unwrap();
    assert_eq!(target.stage_targets.len(), 3);
    assert!(target.find_stage_target("CAB").unwrap().is_manual);
}

#[tokio::test]
async fn test_目标查询与删除() {
    let env = ApiTestEnv::new().unwrap();

    let err = env.state.target_api.get_target(2025).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    env.state
        .target_api
        .set_manual_targets(2025, &[("SIP1".to_string(), 0.4)])
        .unwrap();
    assert!(env.state.target_api.delete_target(2025).unwrap());
    assert!(!env.state.target_api.delete_target(2025).unwrap());
    assert!(env.state.target_api.list_targets().unwrap().is_empty());
}

#[tokio::test]
async fn test_改进计划保存时重建现状快照() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();
    env.state
        .target_api
        .allocate_and_save(&request_2025(AllocationStrategy::Proportional))
        .unwrap();

    let mut plan = InterventionPlan::new("SIGN", 2025);
    plan.actions.push(InterventionAction::new(
        "增加出厂前抽检频次",
        0.8,
        ConfidenceLevel::High,
    ));
    let saved = env.state.target_api.save_intervention_plan(plan).unwrap();

    // 最新月 Feb-25 中 SIGN dpu = 1.0, 目标 4.42
    assert_eq!(saved.current_state.current_dpu, 1.0);
    assert_eq!(saved.current_state.target_dpu, 4.42);
    assert_eq!(saved.current_state.gap, -3.42);
    // 已达标, 不需要月均降幅
    assert_eq!(saved.current_state.required_monthly_rate, 0.0);

    let listed = env.state.target_api.list_intervention_plans(2025).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].actions.len(), 1);

    let fetched = env
        .state
        .target_api
        .get_intervention_plan("SIGN", 2025)
        .unwrap();
    assert_eq!(fetched.plan_id, saved.plan_id);

    assert!(env.state.target_api.delete_intervention_plan("SIGN", 2025).unwrap());
    let err = env
        .state
        .target_api
        .get_intervention_plan("SIGN", 2025)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_改进计划同键重复保存为覆盖() {
    let env = ApiTestEnv::new().unwrap();

    let first = InterventionPlan::new("SIP1", 2025);
    env.state.target_api.save_intervention_plan(first).unwrap();

    let mut second = InterventionPlan::new("SIP1", 2025);
    second.actions.push(InterventionAction::new(
        "装配扭矩标定",
        0.2,
        ConfidenceLevel::Medium,
    ));
    env.state.target_api.save_intervention_plan(second).unwrap();

    let listed = env.state.target_api.list_intervention_plans(2025).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].actions.len(), 1);
}
