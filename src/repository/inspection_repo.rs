// ==========================================
// 质检DPU跟踪系统 - 月度质检数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑, 所有查询使用参数化
// 约定: stages 以 JSON 列存储; 汇总列为引擎重算后的镜像,
//       仓储层只读写, 不重算
// ==========================================

use crate::domain::inspection::{month_sort_key, MonthlyInspection, StageRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// InspectionRepository - 月度质检仓储
// ==========================================

/// 月度质检仓储
/// 职责: 管理 monthly_inspection 表的读写
pub struct InspectionRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = r#"
    id, date, year, stages_json,
    total_inspections, total_faults, total_dpu,
    production_inspections, production_faults, production_dpu,
    dpdi_inspections, dpdi_faults, dpdi_dpu,
    signout_volume, updated_at
"#;

impl InspectionRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部月份（时间序）
    pub fn find_all(&self) -> RepositoryResult<Vec<MonthlyInspection>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM monthly_inspection", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_month)?;

        let mut months = Vec::new();
        for row in rows {
            months.push(row??);
        }
        months.sort_by_key(month_sort_key);
        Ok(months)
    }

    /// 按年份查询（时间序）
    pub fn find_by_year(&self, year: i32) -> RepositoryResult<Vec<MonthlyInspection>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM monthly_inspection WHERE year = ?1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![year], row_to_month)?;

        let mut months = Vec::new();
        for row in rows {
            months.push(row??);
        }
        months.sort_by_key(month_sort_key);
        Ok(months)
    }

    /// 按聚合标识查询单月
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<MonthlyInspection>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM monthly_inspection WHERE id = ?1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let month = stmt
            .query_row(params![id], row_to_month)
            .optional()?
            .transpose()?;
        Ok(month)
    }

    /// 插入或整条替换单月（单月编辑路径）
    pub fn upsert(&self, month: &MonthlyInspection) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_month(&conn, month)?;
        Ok(())
    }

    /// 批量插入（同事务）
    pub fn insert_many(&self, months: &[MonthlyInspection]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        for month in months {
            insert_month(&tx, month)?;
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 清空集合
    pub fn delete_all(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM monthly_inspection", [])?;
        Ok(deleted)
    }

    /// 整体替换: 单事务内删全量 + 插全量
    ///
    /// 导入路径唯一的写入口; 事务中途失败整体回滚,
    /// 不会出现"已清空未写入"的中间状态
    pub fn replace_all(&self, months: &[MonthlyInspection]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute("DELETE FROM monthly_inspection", [])?;
        for month in months {
            insert_month(&tx, month)?;
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(months.len())
    }
}

/// 写入单月（INSERT OR REPLACE, 调用方负责事务边界）
fn insert_month(conn: &Connection, month: &MonthlyInspection) -> RepositoryResult<()> {
    let stages_json = serde_json::to_string(&month.stages)?;
    conn.execute(
        r#"
        INSERT OR REPLACE INTO monthly_inspection (
            id, date, year, stages_json,
            total_inspections, total_faults, total_dpu,
            production_inspections, production_faults, production_dpu,
            dpdi_inspections, dpdi_faults, dpdi_dpu,
            signout_volume, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
        params![
            month.id,
            month.date,
            month.year,
            stages_json,
            month.total_inspections,
            month.total_faults,
            month.total_dpu,
            month.production_inspections,
            month.production_faults,
            month.production_dpu,
            month.dpdi_inspections,
            month.dpdi_faults,
            month.dpdi_dpu,
            month.signout_volume,
            month.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// 行映射（stages_json 反序列化延迟到外层以便返回类型化错误）
fn row_to_month(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<MonthlyInspection>> {
    let stages_json: String = row.get(3)?;
    let updated_at_raw: String = row.get(14)?;

    let stages: Result<Vec<StageRecord>, _> = serde_json::from_str(&stages_json);
    let month = match stages {
        Ok(stages) => Ok(MonthlyInspection {
            id: row.get(0)?,
            date: row.get(1)?,
            year: row.get(2)?,
            stages,
            total_inspections: row.get(4)?,
            total_faults: row.get(5)?,
            total_dpu: row.get(6)?,
            production_inspections: row.get(7)?,
            production_faults: row.get(8)?,
            production_dpu: row.get(9)?,
            dpdi_inspections: row.get(10)?,
            dpdi_faults: row.get(11)?,
            dpdi_dpu: row.get(12)?,
            signout_volume: row.get(13)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at_raw)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }),
        Err(e) => Err(RepositoryError::SerializationError {
            column: "stages_json".to_string(),
            message: e.to_string(),
        }),
    };
    Ok(month)
}
