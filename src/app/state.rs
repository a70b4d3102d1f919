// ==========================================
// 质检DPU跟踪系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约定: 连接由调用方显式创建并注入, 所有仓储共享同一连接;
//       不使用进程级单例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{DashboardApi, ImportApi, InspectionApi, TargetApi};
use crate::config::ConfigManager;
use crate::repository::{InspectionRepository, InterventionRepository, TargetRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 月度质检API
    pub inspection_api: Arc<InspectionApi>,

    /// 导入/导出API
    pub import_api: Arc<ImportApi>,

    /// 年度目标API
    pub target_api: Arc<TargetApi>,

    /// 看板API
    pub dashboard_api: Arc<DashboardApi>,
}

impl AppState {
    /// 创建应用状态
    ///
    /// 打开数据库、初始化 schema、装配所有API实例（共享同一连接）
    pub fn new(db_path: String) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = crate::db::open_and_init(&db_path)?;
        Ok(Self::from_connection(db_path, conn))
    }

    /// 从已有连接装配（测试路径可传入内存库）
    pub fn from_connection(db_path: String, conn: Connection) -> Self {
        let conn = Arc::new(Mutex::new(conn));

        let inspection_repo = Arc::new(InspectionRepository::from_connection(conn.clone()));
        let target_repo = Arc::new(TargetRepository::from_connection(conn.clone()));
        let intervention_repo = Arc::new(InterventionRepository::from_connection(conn.clone()));
        let config = Arc::new(ConfigManager::from_connection(conn));

        let inspection_api = Arc::new(InspectionApi::new(inspection_repo.clone()));
        let import_api = Arc::new(ImportApi::new(inspection_repo.clone(), config.clone()));
        let target_api = Arc::new(TargetApi::new(
            target_repo.clone(),
            inspection_repo.clone(),
            intervention_repo,
            config.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(inspection_repo, target_repo, config));

        Self {
            db_path,
            inspection_api,
            import_api,
            target_api,
            dashboard_api,
        }
    }
}

/// 默认数据库路径: <数据目录>/dpu-tracker/dpu_tracker.db
///
/// 数据目录不可用时回退当前目录
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("dpu-tracker");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, "无法创建数据目录, 回退当前目录");
        return "dpu_tracker.db".to_string();
    }
    dir.join("dpu_tracker.db").display().to_string()
}
