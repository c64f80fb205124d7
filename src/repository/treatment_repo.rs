// ==========================================
// 兽药残留合规核心 - 用药记录仓储
// ==========================================
// 红线: 只追加；Repository 不含业务逻辑
// ==========================================

use crate::domain::treatment::TreatmentRecord;
use crate::domain::types::{Route, Species};
use crate::repository::error::{parse_text_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT
        record_id, substance_name, dose, dose_unit, route, species,
        treatment_date, animal_id, recorded_by, recorded_at,
        cached_suggested_days, cached_withdrawal_end
    FROM treatment_record
"#;

fn map_row(row: &Row<'_>) -> rusqlite::Result<TreatmentRecord> {
    Ok(TreatmentRecord {
        record_id: row.get(0)?,
        substance_name: row.get(1)?,
        dose: row.get(2)?,
        dose_unit: row.get(3)?,
        route: parse_text_column::<Route>(4, "route", &row.get::<_, String>(4)?)?,
        species: parse_text_column::<Species>(5, "species", &row.get::<_, String>(5)?)?,
        treatment_date: row.get(6)?,
        animal_id: row.get(7)?,
        recorded_by: row.get(8)?,
        recorded_at: row.get(9)?,
        cached_suggested_days: row.get(10)?,
        cached_withdrawal_end: row.get(11)?,
    })
}

// ==========================================
// TreatmentRepository - 用药记录仓储
// ==========================================
pub struct TreatmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TreatmentRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条用药记录
    pub fn insert(&self, record: &TreatmentRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO treatment_record (
                record_id, substance_name, dose, dose_unit, route, species,
                treatment_date, animal_id, recorded_by, recorded_at,
                cached_suggested_days, cached_withdrawal_end
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.record_id,
                record.substance_name,
                record.dose,
                record.dose_unit,
                record.route.to_string(),
                record.species.to_string(),
                record.treatment_date,
                record.animal_id,
                record.recorded_by,
                record.recorded_at,
                record.cached_suggested_days,
                record.cached_withdrawal_end,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<TreatmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE record_id = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![record_id], map_row)
            .optional()?;
        Ok(record)
    }

    /// 某对象全部用药记录（按用药日期升序）
    pub fn list_by_animal(&self, animal_id: &str) -> RepositoryResult<Vec<TreatmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE animal_id = ?1 ORDER BY treatment_date ASC, recorded_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![animal_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<TreatmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY treatment_date ASC, recorded_at ASC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
