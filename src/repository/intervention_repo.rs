// ==========================================
// 质检DPU跟踪系统 - 改进计划仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: 计划整体以 JSON payload 落库, (stage_name, year) 唯一
// ==========================================

use crate::domain::intervention::InterventionPlan;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// InterventionRepository - 改进计划仓储
// ==========================================
pub struct InterventionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InterventionRepository {
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

    /// 按年份查询计划列表（按工序名排序）
    pub fn find_by_year(&self, year: i32) -> RepositoryResult<Vec<InterventionPlan>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM intervention_plan WHERE year = ?1 ORDER BY stage_name",
        )?;
        let rows = stmt.query_map(params![year], |row| row.get::<_, String>(0))?;

        let mut plans = Vec::new();
        for row in rows {
            let payload = row?;
            plans.push(decode_payload(&payload)?);
        }
        Ok(plans)
    }

    /// 按工序和年份查询单条
    pub fn find_by_stage_and_year(
        &self,
        stage_name: &str,
        year: i32,
    ) -> RepositoryResult<Option<InterventionPlan>> {
        let conn = self.get_conn()?;
        let payload = conn
            .query_row(
                "SELECT payload FROM intervention_plan WHERE stage_name = ?1 AND year = ?2",
                params![stage_name, year],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        payload.map(|p| decode_payload(&p)).transpose()
    }

    /// 插入或整条替换（keyed by stage_name + year）
    pub fn upsert(&self, plan: &InterventionPlan) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let payload = serde_json::to_string(plan)?;
        conn.execute(
            r#"
            INSERT INTO intervention_plan (plan_id, stage_name, year, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (stage_name, year)
            DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
            params![
                plan.plan_id,
                plan.stage_name,
                plan.year,
                payload,
                plan.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 按工序和年份删除
    pub fn delete(&self, stage_name: &str, year: i32) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM intervention_plan WHERE stage_name = ?1 AND year = ?2",
            params![stage_name, year],
        )?;
        Ok(deleted > 0)
    }
}

fn decode_payload(payload: &str) -> RepositoryResult<InterventionPlan> {
    serde_json::from_str(payload).map_err(|e| RepositoryError::SerializationError {
        column: "payload".to_string(),
        message: e.to_string(),
    })
}
