// ==========================================
// 质检DPU跟踪系统 - 导入/导出API
// ==========================================
// 职责: 封装导入归一化与落库, 以及宽表CSV导出
// 约定:
// - 结构性失败返回 success=false + 错误字符串列表, 不落库, 不抛错
// - 存储层失败作为不透明错误向上传播, 本层不重试不补偿
// - 每次被接受的导入都是整体替换（仓储层单事务换仓）
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::api::error::ApiResult;
use crate::config::ConfigManager;
use crate::importer::{export_wide_csv, ReconcileOutcome, Reconciler};
use crate::repository::InspectionRepository;
use serde::{Deserialize, Serialize};

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 导入是否被接受
    pub success: bool,
    /// 导入批次标识（结构性失败时为空）
    pub batch_id: String,
    /// 处理的月份数
    pub months_processed: usize,
    /// 落库的月份标签（时间序）
    pub months_updated: Vec<String>,
    /// 本次导入相对库内出现的新工序名
    pub new_stages_added: Vec<String>,
    /// 结构性错误（success=false 时非空）
    pub errors: Vec<String>,
    /// 行级异常（不阻断导入）
    pub warnings: Vec<String>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

impl ImportApiResponse {
    fn failed(errors: Vec<String>, elapsed_ms: i64) -> Self {
        Self {
            success: false,
            batch_id: String::new(),
            months_processed: 0,
            months_updated: Vec::new(),
            new_stages_added: Vec::new(),
            errors,
            warnings: Vec::new(),
            elapsed_ms,
        }
    }
}

// ==========================================
// ImportApi - 导入/导出API
// ==========================================
pub struct ImportApi {
    inspection_repo: Arc<InspectionRepository>,
    config: Arc<ConfigManager>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(inspection_repo: Arc<InspectionRepository>, config: Arc<ConfigManager>) -> Self {
        Self {
            inspection_repo,
            config,
        }
    }

    /// 导入原始文本（宽表CSV / 分节CSV / JSON备份, 自动识别）
    ///
    /// # 返回
    /// - Ok(response): success 标记导入是否被接受; 结构性失败不落库
    /// - Err(ApiError): 存储层失败（不透明向上传播）
    pub async fn import_text(&self, raw: &str) -> ApiResult<ImportApiResponse> {
        let started = Instant::now();

        let reconciler = Reconciler::new(self.config.csv_dpu_mismatch_tolerance());
        let outcome = match reconciler.reconcile(raw) {
            Ok(outcome) => outcome,
            Err(e) => {
                let errors = e.error_strings();
                tracing::warn!(errors = ?errors, "导入结构性失败, 未落库");
                return Ok(ImportApiResponse::failed(
                    errors,
                    started.elapsed().as_millis() as i64,
                ));
            }
        };

        // 新工序名 = 本批次出现但库内不存在的工序（按导入前快照计算）
        let new_stages_added = self.diff_new_stages(&outcome)?;

        // 整体替换（单事务删全量+插全量, 中途失败整体回滚）
        self.inspection_repo.replace_all(&outcome.months)?;

        let response = ImportApiResponse {
            success: true,
            batch_id: outcome.batch_id.clone(),
            months_processed: outcome.months.len(),
            months_updated: outcome.months.iter().map(|m| m.date.clone()).collect(),
            new_stages_added,
            errors: Vec::new(),
            warnings: outcome.warnings,
            elapsed_ms: started.elapsed().as_millis() as i64,
        };
        tracing::info!(
            batch_id = %response.batch_id,
            months = response.months_processed,
            new_stages = response.new_stages_added.len(),
            elapsed_ms = response.elapsed_ms,
            "导入完成"
        );
        Ok(response)
    }

    /// 导出库内全部月份为宽表CSV文本
    pub async fn export_csv(&self) -> ApiResult<String> {
        let months = self.inspection_repo.find_all()?;
        Ok(export_wide_csv(&months)?)
    }

    /// 对比导入前库内工序集合, 找出新出现的工序名
    fn diff_new_stages(&self, outcome: &ReconcileOutcome) -> ApiResult<Vec<String>> {
        let existing: HashSet<String> = self
            .inspection_repo
            .find_all()?
            .iter()
            .flat_map(|m| m.stages.iter().map(|s| s.name.to_uppercase()))
            .collect();

        let mut seen = HashSet::new();
        let mut added = Vec::new();
        for month in &outcome.months {
            for stage in &month.stages {
                let upper = stage.name.to_uppercase();
                if !existing.contains(&upper) && seen.insert(upper) {
                    added.push(stage.name.clone());
                }
            }
        }
        Ok(added)
    }
}
