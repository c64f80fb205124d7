// ==========================================
// 兽药残留合规核心 - 会话上下文
// ==========================================
// 每次调用显式传入；不存在进程级"当前用户"
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Lab,
    Vet,
    Regulator,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Farmer => write!(f, "farmer"),
            UserRole::Lab => write!(f, "lab"),
            UserRole::Vet => write!(f, "vet"),
            UserRole::Regulator => write!(f, "regulator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub role: UserRole,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
