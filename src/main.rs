// ==========================================
// 兽药残留合规核心 - 命令行入口
// ==========================================
// 用法:
//   vetintel-mrl <db_path> <lab_results.csv> [user_id]
//
// 上传检测结果文件，输出批次报告（JSON）到 stdout
// ==========================================

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use vetintel_mrl::api::{ComplianceApi, SessionContext, UserRole};
use vetintel_mrl::config::{default_db_path, ConfigManager};
use vetintel_mrl::db::{init_schema, open_sqlite_connection};
use vetintel_mrl::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (db_path, csv_path) = match (args.next(), args.next()) {
        (Some(db), Some(csv)) => (db, PathBuf::from(csv)),
        (Some(csv), None) => (default_db_path(), PathBuf::from(csv)),
        _ => bail!("用法: vetintel-mrl <db_path> <lab_results.csv> [user_id]"),
    };
    let user_id = args.next().unwrap_or_else(|| "cli".to_string());

    tracing::info!("{} v{}", vetintel_mrl::APP_NAME, vetintel_mrl::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::new(conn.clone())
        .load()
        .context("配置加载失败")?;
    let api = ComplianceApi::with_defaults(conn, config)?;

    let ctx = SessionContext::new(user_id, UserRole::Lab);
    let now = chrono::Local::now().naive_local();
    let report = api
        .upload_lab_csv(&ctx, &csv_path, now)
        .with_context(|| format!("上传失败: {}", csv_path.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
