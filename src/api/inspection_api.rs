// ==========================================
// 质检DPU跟踪系统 - 月度质检API
// ==========================================
// 职责: 月度数据查询 / 单工序计数编辑 / 新年份播种 /
//       汇总口径维护重算
// 约定: 所有写路径先经引擎重算派生字段再落库
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::inspection::{MonthlyInspection, StageRecord, DEFAULT_STAGE_NAMES};
use crate::engine::dpu::{recompute_month, update_stage};
use crate::repository::InspectionRepository;
use serde::{Deserialize, Serialize};

/// 月份标签缩写（播种路径）
const MONTH_ABBRS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// 汇总重算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalcTotalsSummary {
    /// 检查的月份数
    pub months_checked: usize,
    /// 发现漂移并修正的月份数
    pub months_corrected: usize,
    /// 修正的月份标签
    pub corrected_months: Vec<String>,
}

// ==========================================
// InspectionApi - 月度质检API
// ==========================================
pub struct InspectionApi {
    inspection_repo: Arc<InspectionRepository>,
}

impl InspectionApi {
    /// 创建新的InspectionApi实例
    pub fn new(inspection_repo: Arc<InspectionRepository>) -> Self {
        Self { inspection_repo }
    }

    /// 查询全部月份（时间序）
    pub fn list_months(&self) -> ApiResult<Vec<MonthlyInspection>> {
        Ok(self.inspection_repo.find_all()?)
    }

    /// 按年份查询月份列表
    pub fn list_months_by_year(&self, year: i32) -> ApiResult<Vec<MonthlyInspection>> {
        Ok(self.inspection_repo.find_by_year(year)?)
    }

    /// 按聚合标识查询单月
    pub fn get_month(&self, month_id: &str) -> ApiResult<MonthlyInspection> {
        if month_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("月份标识不能为空".to_string()));
        }
        self.inspection_repo
            .find_by_id(month_id)?
            .ok_or_else(|| ApiError::NotFound(format!("月份 {}", month_id)))
    }

    /// 编辑单工序计数
    ///
    /// 未指定的字段保持原值; 该工序 dpu 与整月汇总随之重算后落库
    ///
    /// # 参数
    /// - month_id: 月份聚合标识
    /// - stage_name: 工序显示名（忽略大小写）
    /// - new_inspected / new_faults: 新计数（None = 不变）
    pub fn update_stage_counts(
        &self,
        month_id: &str,
        stage_name: &str,
        new_inspected: Option<i64>,
        new_faults: Option<i64>,
    ) -> ApiResult<MonthlyInspection> {
        if let Some(v) = new_inspected {
            if v < 0 {
                return Err(ApiError::InvalidInput(format!("检查台数不能为负: {}", v)));
            }
        }
        if let Some(v) = new_faults {
            if v < 0 {
                return Err(ApiError::InvalidInput(format!("故障数不能为负: {}", v)));
            }
        }

        let mut month = self.get_month(month_id)?;
        let upper = stage_name.trim().to_uppercase();
        let idx = month
            .stages
            .iter()
            .position(|s| s.name.to_uppercase() == upper)
            .ok_or_else(|| {
                ApiError::NotFound(format!("月份 {} 中的工序 {}", month_id, stage_name))
            })?;

        month.stages[idx] = update_stage(&month.stages[idx], new_inspected, new_faults);
        recompute_month(&mut month);
        month.updated_at = chrono::Utc::now();
        self.inspection_repo.upsert(&month)?;

        tracing::info!(
            month = %month.date,
            stage = %stage_name,
            "工序计数已更新并重算汇总"
        );
        Ok(month)
    }

    /// 为新开年份播种 12 个月（默认工序清单, 计数归零）
    ///
    /// # 规则
    /// 该年份已有任何月份时拒绝, 避免覆盖在途数据
    pub fn seed_year(&self, year: i32) -> ApiResult<Vec<MonthlyInspection>> {
        if !(2000..=2100).contains(&year) {
            return Err(ApiError::InvalidInput(format!("年份超出范围: {}", year)));
        }
        let existing = self.inspection_repo.find_by_year(year)?;
        if !existing.is_empty() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "年份 {} 已存在 {} 个月份, 不能重复播种",
                year,
                existing.len()
            )));
        }

        let months: Vec<MonthlyInspection> = MONTH_ABBRS
            .iter()
            .map(|abbr| {
                let label = format!("{}-{:02}", abbr, year % 100);
                let mut month = MonthlyInspection::empty(&label, year);
                month.stages = DEFAULT_STAGE_NAMES
                    .iter()
                    .map(|name| StageRecord::zeroed(name))
                    .collect();
                recompute_month(&mut month);
                month
            })
            .collect();

        self.inspection_repo.insert_many(&months)?;
        tracing::info!(year, "新年份已播种 12 个月");
        Ok(months)
    }

    /// 汇总口径维护重算
    ///
    /// 对每个月重新执行"工序dpu + 各口径汇总"派生, 发现漂移即修正落库。
    /// 用于修复历史数据中手工维护汇总造成的口径漂移
    pub fn recalculate_totals(&self) -> ApiResult<RecalcTotalsSummary> {
        let months = self.inspection_repo.find_all()?;
        let months_checked = months.len();
        let mut corrected_months = Vec::new();

        for month in months {
            let mut recomputed = month.clone();
            recompute_month(&mut recomputed);
            if recomputed != month {
                recomputed.updated_at = chrono::Utc::now();
                self.inspection_repo.upsert(&recomputed)?;
                corrected_months.push(recomputed.date.clone());
            }
        }

        if !corrected_months.is_empty() {
            tracing::warn!(
                corrected = corrected_months.len(),
                "检测到汇总口径漂移并已修正"
            );
        }
        Ok(RecalcTotalsSummary {
            months_checked,
            months_corrected: corrected_months.len(),
            corrected_months,
        })
    }
}
