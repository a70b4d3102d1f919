// ==========================================
// 集成测试辅助
// ==========================================
// 职责: 基于临时文件数据库装配 AppState, 供各测试套件复用
// ==========================================

// 各测试二进制只用到部分辅助项
#![allow(dead_code)]

use dpu_tracker::app::AppState;
use dpu_tracker::domain::inspection::{MonthlyInspection, StageRecord};
use dpu_tracker::engine::dpu::recompute_month;
use dpu_tracker::repository::InspectionRepository;
use tempfile::TempDir;

/// API 测试环境（临时库, 测试结束自动清理）
pub struct ApiTestEnv {
    // 临时目录的生命周期必须覆盖整个测试
    _dir: TempDir,
    pub db_path: String,
    pub state: AppState,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dpu_tracker::logging::init_test();
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("test.db").display().to_string();
        let state = AppState::new(db_path.clone())?;
        Ok(Self {
            _dir: dir,
            db_path,
            state,
        })
    }

    /// 独立仓储句柄（绕过 API 层直接读写, 用于构造测试前置状态）
    pub fn open_inspection_repo(&self) -> InspectionRepository {
        InspectionRepository::new(&self.db_path).expect("无法打开仓储")
    }
}

/// 构造已重算的月度聚合
pub fn build_month(label: &str, year: i32, stages: &[(&str, i64, i64)]) -> MonthlyInspection {
    let mut month = MonthlyInspection::empty(label, year);
    month.stages = stages
        .iter()
        .enumerate()
        .map(|(i, (name, inspected, faults))| {
            StageRecord::with_order(name, *inspected, *faults, i as i32)
        })
        .collect();
    recompute_month(&mut month);
    month
}

/// 两个月份的宽表CSV样例（Jan/Feb 2025）
pub const SAMPLE_WIDE_CSV: &str = "\
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU,SIGN INSPECTED,SIGN FAULTS,SIGN DPU,DPDI INSPECTED,DPDI FAULTS,DPDI DPU
Jan-25,1000,700,0.70,1384,12630,9.13,900,450,0.50
Feb-25,900,450,0.50,1200,1200,1.00,800,80,0.10
";
