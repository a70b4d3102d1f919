// ==========================================
// 质检DPU跟踪系统 - 年度目标仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 键: year 一年一条, upsert 语义
// ==========================================

use crate::domain::target::{BaselineDpu, StageTarget, YearTarget};
use crate::domain::types::AllocationStrategy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// TargetRepository - 年度目标仓储
// ==========================================
pub struct TargetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TargetRepository {
    /// 创建新的仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部年度目标（按年份升序）
    pub fn find_all(&self) -> RepositoryResult<Vec<YearTarget>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT year, combined_target, production_target, dpdi_target,
                   allocation_strategy, baseline_json, stage_targets_json, updated_at
            FROM year_target
            ORDER BY year
            "#,
        )?;
        let rows = stmt.query_map([], row_to_target)?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row??);
        }
        Ok(targets)
    }

    /// 按年份查询
    pub fn find_by_year(&self, year: i32) -> RepositoryResult<Option<YearTarget>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT year, combined_target, production_target, dpdi_target,
                   allocation_strategy, baseline_json, stage_targets_json, updated_at
            FROM year_target
            WHERE year = ?1
            "#,
        )?;
        let target = stmt
            .query_row(params![year], row_to_target)
            .optional()?
            .transpose()?;
        Ok(target)
    }

    /// 插入或整条替换（keyed by year）
    pub fn upsert(&self, target: &YearTarget) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let baseline_json = serde_json::to_string(&target.baseline)?;
        let stage_targets_json = serde_json::to_string(&target.stage_targets)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO year_target (
                year, combined_target, production_target, dpdi_target,
                allocation_strategy, baseline_json, stage_targets_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                target.year,
                target.combined_target,
                target.production_target,
                target.dpdi_target,
                target.allocation_strategy.to_string(),
                baseline_json,
                stage_targets_json,
                target.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 按年份删除
    ///
    /// # 返回
    /// - Ok(true): 删除了一条
    /// - Ok(false): 该年份不存在
    pub fn delete_by_year(&self, year: i32) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM year_target WHERE year = ?1", params![year])?;
        Ok(deleted > 0)
    }
}

fn row_to_target(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<YearTarget>> {
    let strategy_raw: String = row.get(4)?;
    let baseline_json: String = row.get(5)?;
    let stage_targets_json: String = row.get(6)?;
    let updated_at_raw: String = row.get(7)?;

    let decoded: Result<(BaselineDpu, Vec<StageTarget>), serde_json::Error> = (|| {
        let baseline = serde_json::from_str(&baseline_json)?;
        let stage_targets = serde_json::from_str(&stage_targets_json)?;
        Ok((baseline, stage_targets))
    })();

    let target = match decoded {
        Ok((baseline, stage_targets)) => Ok(YearTarget {
            year: row.get(0)?,
            combined_target: row.get(1)?,
            production_target: row.get(2)?,
            dpdi_target: row.get(3)?,
            allocation_strategy: AllocationStrategy::from_str_or_default(&strategy_raw),
            baseline,
            stage_targets,
            updated_at: DateTime::parse_from_rfc3339(&updated_at_raw)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }),
        Err(e) => Err(RepositoryError::SerializationError {
            column: "baseline_json/stage_targets_json".to_string(),
            message: e.to_string(),
        }),
    };
    Ok(target)
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::{BaselineDpu, StageTarget};

    fn test_repo() -> (tempfile::TempDir, TargetRepository) {
        let dir = tempfile::tempdir().expect("无法创建临时目录");
        let db_path = dir.path().join("test.db");
        let conn = crate::db::open_and_init(db_path.to_str().unwrap()).expect("无法初始化数据库");
        let repo = TargetRepository::from_connection(Arc::new(Mutex::new(conn)));
        (dir, repo)
    }

    fn sample_target(year: i32) -> YearTarget {
        let mut target = YearTarget::new(
            year,
            8.2,
            6.0,
            2.2,
            AllocationStrategy::Proportional,
            BaselineDpu {
                combined_dpu: 12.87,
                production_dpu: 10.0,
                dpdi_dpu: 2.87,
            },
        );
        target.stage_targets = vec![
            StageTarget::computed("SIP6", 1.52),
            StageTarget::manual("SIGN", 0.1),
        ];
        target
    }

    #[test]
    fn test_upsert与查询() {
        let (_dir, repo) = test_repo();
        repo.upsert(&sample_target(2025)).expect("写入失败");

        let loaded = repo.find_by_year(2025).expect("查询失败").expect("应存在");
        assert_eq!(loaded.combined_target, 8.2);
        assert_eq!(loaded.baseline.combined_dpu, 12.87);
        assert_eq!(loaded.stage_targets.len(), 2);
        assert!(loaded.stage_targets[1].is_manual);
    }

    #[test]
    fn test_upsert同年覆盖() {
        let (_dir, repo) = test_repo();
        repo.upsert(&sample_target(2025)).expect("写入失败");

        let mut updated = sample_target(2025);
        updated.combined_target = 7.0;
        updated.allocation_strategy = AllocationStrategy::Hybrid;
        repo.upsert(&updated).expect("覆盖失败");

        let all = repo.find_all().expect("查询失败");
        assert_eq!(all.len(), 1, "同年 upsert 不应产生第二条");
        assert_eq!(all[0].combined_target, 7.0);
        assert_eq!(all[0].allocation_strategy, AllocationStrategy::Hybrid);
    }

    #[test]
    fn test_按年删除() {
        let (_dir, repo) = test_repo();
        repo.upsert(&sample_target(2025)).expect("写入失败");
        assert!(repo.delete_by_year(2025).expect("删除失败"));
        assert!(!repo.delete_by_year(2025).expect("重复删除应返回false"));
        assert!(repo.find_by_year(2025).expect("查询失败").is_none());
    }
}
