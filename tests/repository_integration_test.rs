// ==========================================
// 仓储层集成测试
// ==========================================
// 覆盖: 月度仓储的查询排序、upsert、整体替换事务语义,
//       年度目标的JSON列往返
// ==========================================

mod helpers;

use std::sync::{Arc, Mutex};

use dpu_tracker::db;
use dpu_tracker::domain::target::{BaselineDpu, StageTarget, YearTarget};
use dpu_tracker::domain::types::AllocationStrategy;
use dpu_tracker::repository::{InspectionRepository, TargetRepository};
use helpers::build_month;
use tempfile::TempDir;

fn test_repo() -> (TempDir, InspectionRepository) {
    let dir = tempfile::tempdir().expect("无法创建临时目录");
    let db_path = dir.path().join("test.db");
    let conn = db::open_and_init(db_path.to_str().unwrap()).expect("无法初始化数据库");
    let repo = InspectionRepository::from_connection(Arc::new(Mutex::new(conn)));
    (dir, repo)
}

#[test]
fn test_find_all_按时间序返回() {
    let (_dir, repo) = test_repo();
    // 乱序写入: 跨年 + 同年乱月
    repo.upsert(&build_month("Feb-25", 2025, &[("SIP1", 100, 50)]))
        .unwrap();
    repo.upsert(&build_month("Dec-24", 2024, &[("SIP1", 100, 50)]))
        .unwrap();
    repo.upsert(&build_month("Jan-25", 2025, &[("SIP1", 100, 50)]))
        .unwrap();

    let months = repo.find_all().unwrap();
    let labels: Vec<&str> = months.iter().map(|m| m.date.as_str()).collect();
    assert_eq!(labels, vec!["Dec-24", "Jan-25", "Feb-25"]);

    let year_2025 = repo.find_by_year(2025).unwrap();
    assert_eq!(year_2025.len(), 2);
    assert_eq!(year_2025[0].date, "Jan-25");
}

#[test]
fn test_find_by_id_与往返一致() {
    let (_dir, repo) = test_repo();
    let month = build_month("Jan-25", 2025, &[("SIP1", 1000, 700), ("SIGN", 1384, 12630)]);
    repo.upsert(&month).unwrap();

    let loaded = repo.find_by_id("month-jan-25").unwrap().unwrap();
    assert_eq!(loaded.date, "Jan-25");
    assert_eq!(loaded.stages.len(), 2);
    assert_eq!(loaded.find_stage("SIGN").unwrap().dpu, 9.13);
    assert_eq!(loaded.total_dpu, month.total_dpu);
    assert_eq!(loaded.signout_volume, 1384);
    // 列序保留在 stages_json 中
    assert_eq!(loaded.stages[0].order, Some(0));

    assert!(repo.find_by_id("month-nope").unwrap().is_none());
}

#[test]
fn test_upsert_同标识整条替换() {
    let (_dir, repo) = test_repo();
    repo.upsert(&build_month("Jan-25", 2025, &[("SIP1", 100, 70)]))
        .unwrap();
    repo.upsert(&build_month("Jan-25", 2025, &[("SIP1", 100, 30), ("CAB", 50, 10)]))
        .unwrap();

    let months = repo.find_all().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].stages.len(), 2);
    assert_eq!(months[0].find_stage("SIP1").unwrap().faults, 30);
}

#[test]
fn test_replace_all_整体替换() {
    let (_dir, repo) = test_repo();
    repo.insert_many(&[
        build_month("Jan-25", 2025, &[("SIP1", 100, 70)]),
        build_month("Feb-25", 2025, &[("SIP1", 100, 50)]),
    ])
    .unwrap();

    let replaced = repo
        .replace_all(&[build_month("Mar-25", 2025, &[("CAB", 100, 10)])])
        .unwrap();
    assert_eq!(replaced, 1);

    let months = repo.find_all().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].date, "Mar-25");

    // 空批次替换 = 清空
    assert_eq!(repo.replace_all(&[]).unwrap(), 0);
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn test_delete_all() {
    let (_dir, repo) = test_repo();
    repo.insert_many(&[
        build_month("Jan-25", 2025, &[("SIP1", 100, 70)]),
        build_month("Feb-25", 2025, &[("SIP1", 100, 50)]),
    ])
    .unwrap();
    assert_eq!(repo.delete_all().unwrap(), 2);
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn test_year_target_json列往返() {
    let dir = tempfile::tempdir().expect("无法创建临时目录");
    let db_path = dir.path().join("test.db");
    let conn = db::open_and_init(db_path.to_str().unwrap()).expect("无法初始化数据库");
    let repo = TargetRepository::from_connection(Arc::new(Mutex::new(conn)));

    let mut target = YearTarget::new(
        2025,
        8.2,
        7.5,
        0.7,
        AllocationStrategy::Hybrid,
        BaselineDpu {
            combined_dpu: 12.87,
            production_dpu: 12.0,
            dpdi_dpu: 0.87,
        },
    );
    target.stage_targets = vec![
        StageTarget::computed("SIP6", 1.52),
        StageTarget::manual("SIGN", 4.0),
    ];
    repo.upsert(&target).unwrap();

    let loaded = repo.find_by_year(2025).unwrap().unwrap();
    assert_eq!(loaded.allocation_strategy, AllocationStrategy::Hybrid);
    assert_eq!(loaded.baseline.combined_dpu, 12.87);
    assert_eq!(loaded.stage_targets, target.stage_targets);
    assert!(loaded.stage_targets[1].is_manual);

    assert!(repo.delete_by_year(2025).unwrap());
    assert!(repo.find_by_year(2025).unwrap().is_none());
}
