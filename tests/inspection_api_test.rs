// ==========================================
// 月度质检API集成测试
// ==========================================
// 覆盖: 单工序计数编辑与重算、新年份播种、汇总口径维护重算
// ==========================================

mod helpers;

use dpu_tracker::api::ApiError;
use dpu_tracker::domain::inspection::DEFAULT_STAGE_NAMES;
use helpers::{ApiTestEnv, SAMPLE_WIDE_CSV};

#[tokio::test]
async fn test_编辑工序计数后整月重算() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    // Feb-25: SIP1 0.50, SIGN 1.00, DPDI 0.10 => total 1.60
    let feb = env.state.inspection_api.get_month("month-feb-25").unwrap();
    assert_eq!(feb.total_dpu, 1.6);

    // 只改 faults, inspected 保持原值
    let updated = env
        .state
        .inspection_api
        .update_stage_counts("month-feb-25", "sip1", None, Some(900))
        .unwrap();
    let sip1 = updated.find_stage("SIP1").unwrap();
    assert_eq!(sip1.inspected, 900);
    assert_eq!(sip1.faults, 900);
    assert_eq!(sip1.dpu, 1.0);
    // 整月汇总随之重算: 1.00 + 1.00 + 0.10
    assert_eq!(updated.total_dpu, 2.1);

    // 重新读库确认已持久化
    let reloaded = env.state.inspection_api.get_month("month-feb-25").unwrap();
    assert_eq!(reloaded.total_dpu, 2.1);
}

#[tokio::test]
async fn test_编辑拒绝负数计数() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    let err = env
        .state
        .inspection_api
        .update_stage_counts("month-jan-25", "SIP1", Some(-1), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_编辑不存在的工序或月份() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    let err = env
        .state
        .inspection_api
        .update_stage_counts("month-jan-25", "NOPE", Some(1), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = env
        .state
        .inspection_api
        .update_stage_counts("month-dec-99", "SIP1", Some(1), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_播种新年份() {
    let env = ApiTestEnv::new().unwrap();
    let months = env.state.inspection_api.seed_year(2026).unwrap();

    assert_eq!(months.len(), 12);
    assert_eq!(months[0].date, "Jan-26");
    assert_eq!(months[11].date, "Dec-26");
    for month in &months {
        assert_eq!(month.stages.len(), DEFAULT_STAGE_NAMES.len());
        assert_eq!(month.total_inspections, 0);
        assert_eq!(month.total_dpu, 0.0);
    }

    // 已持久化且按时间序返回
    let listed = env.state.inspection_api.list_months_by_year(2026).unwrap();
    assert_eq!(listed.len(), 12);
    assert_eq!(listed[2].date, "Mar-26");
}

#[tokio::test]
async fn test_播种拒绝已有数据的年份() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    let err = env.state.inspection_api.seed_year(2025).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let err = env.state.inspection_api.seed_year(1999).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_汇总重算修复口径漂移() {
    let env = ApiTestEnv::new().unwrap();
    env.state.import_api.import_text(SAMPLE_WIDE_CSV).await.unwrap();

    // 刚导入的数据全部由引擎派生, 无漂移
    let summary = env.state.inspection_api.recalculate_totals().unwrap();
    assert_eq!(summary.months_checked, 2);
    assert_eq!(summary.months_corrected, 0);

    // 绕过API直接把汇总写歪, 模拟历史手工维护的脏数据
    let repo = env.open_inspection_repo();
    let mut jan = repo.find_by_id("month-jan-25").unwrap().unwrap();
    jan.total_dpu = 99.99;
    jan.signout_volume = 1;
    repo.upsert(&jan).unwrap();

    let summary = env.state.inspection_api.recalculate_totals().unwrap();
    assert_eq!(summary.months_corrected, 1);
    assert_eq!(summary.corrected_months, vec!["Jan-25"]);

    let fixed = env.state.inspection_api.get_month("month-jan-25").unwrap();
    assert_eq!(fixed.total_dpu, 10.33);
    assert_eq!(fixed.signout_volume, 1384);
}
