// ==========================================
// 质检DPU跟踪系统 - 导入归一化调度器
// ==========================================
// 职责: 识别输入形态 → 分派对应解码器 → 归一化为 MonthlyInspection 批次
// 失败策略: 结构性错误整体失败（错误字符串列表, 不落库）;
//           行级异常以 warning 收集, 不中断
// 约定: 每次被接受的导入都是对目标集合的整体替换（由仓储层
//       replace_all 在单事务内完成删全量+插全量）
// ==========================================

use crate::domain::inspection::{month_sort_key, MonthlyInspection};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::json_backup::decode_json_backup;
use crate::importer::sectioned_csv::{decode_sectioned_csv, is_sectioned};
use crate::importer::wide_csv::decode_wide_csv;
use uuid::Uuid;

/// CSV 自带 dpu 列与计数口径的默认抽查容差
pub const DEFAULT_DPU_MISMATCH_TOLERANCE: f64 = 0.1;

// ==========================================
// 输入形态 (Input Shape)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    WideCsv,      // 宽表CSV
    SectionedCsv, // 分节CSV（DETAILED STAGE DATA 标记）
    JsonBackup,   // JSON备份（数组/信封/历史导出）
}

/// 识别输入形态
pub fn detect_shape(raw: &str) -> InputShape {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        InputShape::JsonBackup
    } else if is_sectioned(raw) {
        InputShape::SectionedCsv
    } else {
        InputShape::WideCsv
    }
}

// ==========================================
// ReconcileOutcome - 归一化结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub batch_id: String,                // 导入批次标识（追溯用）
    pub shape: InputShape,               // 识别到的输入形态
    pub months: Vec<MonthlyInspection>,  // 归一化后的月度聚合（时间序）
    pub warnings: Vec<String>,           // 行级异常
}

// ==========================================
// Reconciler - 导入归一化调度器
// ==========================================
pub struct Reconciler {
    /// dpu 抽查容差（可由配置覆写）
    dpu_mismatch_tolerance: f64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_DPU_MISMATCH_TOLERANCE)
    }
}

impl Reconciler {
    pub fn new(dpu_mismatch_tolerance: f64) -> Self {
        Self {
            dpu_mismatch_tolerance,
        }
    }

    /// 归一化原始文本
    ///
    /// # 返回
    /// - Ok(ReconcileOutcome): 至少一个月被接受
    /// - Err(ImportError::Structural): 结构性失败, 调用方不得落库
    pub fn reconcile(&self, raw: &str) -> ImportResult<ReconcileOutcome> {
        if raw.trim().is_empty() {
            return Err(ImportError::structural("输入为空"));
        }

        let shape = detect_shape(raw);
        let mut warnings = Vec::new();
        let mut months = match shape {
            InputShape::JsonBackup => decode_json_backup(raw, &mut warnings)?,
            InputShape::SectionedCsv => {
                decode_sectioned_csv(raw, self.dpu_mismatch_tolerance, &mut warnings)?
            }
            InputShape::WideCsv => {
                decode_wide_csv(raw, self.dpu_mismatch_tolerance, &mut warnings)?
            }
        };

        if months.is_empty() {
            return Err(ImportError::structural("没有解析出任何月份数据"));
        }

        // 同标识月份去重: 后出现的覆盖先出现的（备份文件偶见重复导出）
        months = dedup_by_id(months, &mut warnings);
        months.sort_by_key(month_sort_key);

        let outcome = ReconcileOutcome {
            batch_id: Uuid::new_v4().to_string(),
            shape,
            months,
            warnings,
        };
        tracing::info!(
            batch_id = %outcome.batch_id,
            shape = ?outcome.shape,
            months = outcome.months.len(),
            warnings = outcome.warnings.len(),
            "导入归一化完成"
        );
        Ok(outcome)
    }
}

/// 按聚合标识去重, 保留后出现者
fn dedup_by_id(
    months: Vec<MonthlyInspection>,
    warnings: &mut Vec<String>,
) -> Vec<MonthlyInspection> {
    let mut result: Vec<MonthlyInspection> = Vec::with_capacity(months.len());
    for month in months {
        if let Some(existing) = result.iter_mut().find(|m| m.id == month.id) {
            warnings.push(format!("月份 \"{}\" 重复出现, 保留后出现的记录", month.date));
            *existing = month;
        } else {
            result.push(month);
        }
    }
    result
}
