// ==========================================
// 兽药残留合规核心 - 告警领域模型
// ==========================================
// 红线: 只追加；已读为软标记，不删除
// ==========================================

use crate::domain::types::{AlertKind, AlertSeverity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub subject_id: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub read: bool,
}

impl Alert {
    /// 去重键: (kind, subject_id, message)
    pub fn dedupe_key(&self) -> (AlertKind, String, String) {
        (self.kind, self.subject_id.clone(), self.message.clone())
    }
}
