// ==========================================
// 兽药残留合规核心 - 检测样本仓储
// ==========================================
// 红线: 不存 pass/fail，读取方按当前参考数据重算
// ==========================================

use crate::domain::lab::LabSample;
use crate::domain::types::ResidueUnit;
use crate::repository::error::{parse_text_column, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// 已落库的样本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLabSample {
    pub sample_id: String,
    pub sample: LabSample,
    pub uploaded_by: String,
    pub uploaded_at: NaiveDateTime,
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        sample_id, substance_name, measured_value, unit, scope,
        batch_id, farmer_id, animal_id, test_date, lab_name,
        uploaded_by, uploaded_at
    FROM lab_sample
"#;

fn map_row(row: &Row<'_>) -> rusqlite::Result<StoredLabSample> {
    Ok(StoredLabSample {
        sample_id: row.get(0)?,
        sample: LabSample {
            substance_name: row.get(1)?,
            measured_value: row.get(2)?,
            unit: parse_text_column::<ResidueUnit>(3, "unit", &row.get::<_, String>(3)?)?,
            scope: row.get(4)?,
            batch_id: row.get(5)?,
            farmer_id: row.get(6)?,
            animal_id: row.get(7)?,
            test_date: row.get(8)?,
            lab_name: row.get(9)?,
        },
        uploaded_by: row.get(10)?,
        uploaded_at: row.get(11)?,
    })
}

// ==========================================
// LabSampleRepository - 检测样本仓储
// ==========================================
pub struct LabSampleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LabSampleRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入（单事务，全部成功或全部回滚）
    pub fn insert_batch(&self, samples: &[StoredLabSample]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO lab_sample (
                    sample_id, substance_name, measured_value, unit, scope,
                    batch_id, farmer_id, animal_id, test_date, lab_name,
                    uploaded_by, uploaded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for stored in samples {
                let s = &stored.sample;
                stmt.execute(params![
                    stored.sample_id,
                    s.substance_name,
                    s.measured_value,
                    s.unit.as_str(),
                    s.scope,
                    s.batch_id,
                    s.farmer_id,
                    s.animal_id,
                    s.test_date,
                    s.lab_name,
                    stored.uploaded_by,
                    stored.uploaded_at,
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(samples.len())
    }

    /// 按对象查询（检测日期倒序）
    pub fn list_by_animal(&self, animal_id: &str) -> RepositoryResult<Vec<StoredLabSample>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE animal_id = ?1 ORDER BY test_date DESC, uploaded_at DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![animal_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<StoredLabSample>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY test_date DESC, uploaded_at DESC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
