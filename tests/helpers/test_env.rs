// ==========================================
// 测试环境 - 临时数据库 + ComplianceApi
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use vetintel_mrl::api::ComplianceApi;
use vetintel_mrl::config::ComplianceConfig;
use vetintel_mrl::db::{init_schema, open_sqlite_connection};

/// 测试环境
///
/// temp_file 需要保持存活，drop 后数据库文件被删除
pub struct TestEnv {
    pub temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub api: ComplianceApi,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(ComplianceConfig::default())
    }

    pub fn with_config(config: ComplianceConfig) -> Self {
        vetintel_mrl::logging::init_test();
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let conn = open_connection(&db_path);
        let api = ComplianceApi::with_defaults(conn.clone(), config).unwrap();
        Self {
            temp_file,
            db_path,
            conn,
            api,
        }
    }

    /// 模拟重启：新连接 + 新 API 实例，数据库文件不变
    pub fn reopen(&self) -> ComplianceApi {
        ComplianceApi::with_defaults(open_connection(&self.db_path), ComplianceConfig::default())
            .unwrap()
    }

    pub fn count_rows(&self, table: &str) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
    }
}

pub fn open_connection(db_path: &str) -> Arc<Mutex<Connection>> {
    let conn = open_sqlite_connection(db_path).unwrap();
    init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}
