// ==========================================
// 兽药残留合规核心 - 告警仓储
// ==========================================
// 红线: 只追加；(kind, subject_id, message) 唯一；已读为软标记
// ==========================================

use crate::domain::alert::Alert;
use crate::domain::types::{AlertKind, AlertSeverity};
use crate::repository::error::{parse_text_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT alert_id, kind, severity, subject_id, message, created_at, is_read
    FROM alert
"#;

fn map_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        alert_id: row.get(0)?,
        kind: parse_text_column::<AlertKind>(1, "kind", &row.get::<_, String>(1)?)?,
        severity: parse_text_column::<AlertSeverity>(2, "severity", &row.get::<_, String>(2)?)?,
        subject_id: row.get(3)?,
        message: row.get(4)?,
        created_at: row.get(5)?,
        read: row.get(6)?,
    })
}

// ==========================================
// AlertRepository - 告警仓储
// ==========================================
pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入；去重键已存在的告警忽略
    ///
    /// # 返回
    /// 实际新增条数
    pub fn insert_all(&self, alerts: &[Alert]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO alert (
                    alert_id, kind, severity, subject_id, message, created_at, is_read
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for alert in alerts {
                inserted += stmt.execute(params![
                    alert.alert_id,
                    alert.kind.as_str(),
                    alert.severity.as_str(),
                    alert.subject_id,
                    alert.message,
                    alert.created_at,
                    alert.read,
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(inserted)
    }

    /// 告警列表（创建时间倒序）
    pub fn list(&self, subject_id: Option<&str>) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let alerts = match subject_id {
            Some(subject) => {
                let sql = format!(
                    "{} WHERE subject_id = ?1 ORDER BY created_at DESC, rowid DESC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![subject], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY created_at DESC, rowid DESC", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(alerts)
    }

    /// 标记已读
    ///
    /// # 错误
    /// - NotFound: alert_id 不存在
    pub fn mark_read(&self, alert_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE alert SET is_read = 1 WHERE alert_id = ?1",
            params![alert_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Alert".to_string(),
                id: alert_id.to_string(),
            });
        }
        Ok(())
    }
}
