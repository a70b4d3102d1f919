// ==========================================
// 质检DPU跟踪系统 - 看板API
// ==========================================
// 职责: 产出看板报表数据结构（与渲染协作方的唯一契约）
// 架构: API 层 → ReportEngine（纯派生） → 仓储层只读
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::config::ConfigManager;
use crate::engine::report::{DashboardReport, ReportEngine};
use crate::repository::{InspectionRepository, TargetRepository};

// ==========================================
// DashboardApi - 看板API
// ==========================================
pub struct DashboardApi {
    inspection_repo: Arc<InspectionRepository>,
    target_repo: Arc<TargetRepository>,
    config: Arc<ConfigManager>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(
        inspection_repo: Arc<InspectionRepository>,
        target_repo: Arc<TargetRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            inspection_repo,
            target_repo,
            config,
        }
    }

    /// 派生看板报表
    ///
    /// 报表包含: 最新月/上一月、近3月与YTD均值、工序变化分类
    /// （与两期前对比）、最新年份的目标上下文（存在时）
    pub fn build_report(&self) -> ApiResult<DashboardReport> {
        let months = self.inspection_repo.find_all()?;
        let year_target = match months.last() {
            Some(latest) => self.target_repo.find_by_year(latest.year)?,
            None => None,
        };

        let engine = ReportEngine::new(self.config.stage_change_threshold());
        Ok(engine.build_report(&months, year_target.as_ref()))
    }

    /// 指定年份的报表（轨迹回看）
    pub fn build_report_for_year(&self, year: i32) -> ApiResult<DashboardReport> {
        let months = self.inspection_repo.find_by_year(year)?;
        let year_target = self.target_repo.find_by_year(year)?;
        let engine = ReportEngine::new(self.config.stage_change_threshold());
        Ok(engine.build_report(&months, year_target.as_ref()))
    }
}
