// ==========================================
// 质检DPU跟踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 口径: 所有阈值/容差集中在此, 代码内只保留默认值
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ===== 配置键与默认值 =====

/// 分摊校验容差: |Σ工序目标 - 整体目标| 的提示阈值
pub const KEY_TARGET_VALIDATION_TOLERANCE: &str = "target_validation_tolerance";
pub const DEFAULT_TARGET_VALIDATION_TOLERANCE: f64 = 0.1;

/// CSV 自带 dpu 列与计数口径的抽查容差
pub const KEY_CSV_DPU_MISMATCH_TOLERANCE: &str = "csv_dpu_mismatch_tolerance";
pub const DEFAULT_CSV_DPU_MISMATCH_TOLERANCE: f64 = 0.1;

/// 月度变化判定阈值（与两期前对比的 DPU 绝对差）
pub const KEY_STAGE_CHANGE_THRESHOLD: &str = "stage_change_threshold";
pub const DEFAULT_STAGE_CHANGE_THRESHOLD: f64 = 0.5;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值（scope_id='global', upsert 语义）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT (scope_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取浮点配置, 缺失或格式错误时回退默认值
    fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        match self.get_config_value(key) {
            Ok(Some(raw)) => raw.trim().parse::<f64>().unwrap_or_else(|_| {
                tracing::warn!(key, raw, "配置值无法解析为浮点数, 使用默认值");
                default
            }),
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "配置读取失败, 使用默认值");
                default
            }
        }
    }

    /// 分摊校验容差
    pub fn target_validation_tolerance(&self) -> f64 {
        self.get_f64_or(
            KEY_TARGET_VALIDATION_TOLERANCE,
            DEFAULT_TARGET_VALIDATION_TOLERANCE,
        )
    }

    /// CSV dpu 抽查容差
    pub fn csv_dpu_mismatch_tolerance(&self) -> f64 {
        self.get_f64_or(
            KEY_CSV_DPU_MISMATCH_TOLERANCE,
            DEFAULT_CSV_DPU_MISMATCH_TOLERANCE,
        )
    }

    /// 月度变化判定阈值
    pub fn stage_change_threshold(&self) -> f64 {
        self.get_f64_or(KEY_STAGE_CHANGE_THRESHOLD, DEFAULT_STAGE_CHANGE_THRESHOLD)
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn test_manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().expect("无法创建临时目录");
        let db_path = dir.path().join("test.db");
        let conn = crate::db::open_and_init(db_path.to_str().unwrap()).expect("无法初始化数据库");
        let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn)));
        (dir, manager)
    }

    #[test]
    fn test_缺失配置回退默认值() {
        let (_dir, manager) = test_manager();
        assert_eq!(manager.target_validation_tolerance(), 0.1);
        assert_eq!(manager.stage_change_threshold(), 0.5);
    }

    #[test]
    fn test_覆写与回读() {
        let (_dir, manager) = test_manager();
        manager
            .set_config_value(KEY_STAGE_CHANGE_THRESHOLD, "0.3")
            .expect("写入失败");
        assert_eq!(manager.stage_change_threshold(), 0.3);
    }

    #[test]
    fn test_非法配置值回退默认值() {
        let (_dir, manager) = test_manager();
        manager
            .set_config_value(KEY_CSV_DPU_MISMATCH_TOLERANCE, "not-a-number")
            .expect("写入失败");
        assert_eq!(manager.csv_dpu_mismatch_tolerance(), 0.1);
    }
}
