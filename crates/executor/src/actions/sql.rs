//! SQL capability against workspace-local SQLite databases

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use crate::guard::confine;
use crate::{str_arg, ExecError};

const ROW_CAP: usize = 200;

pub(crate) async fn query(args: &Value, workspace: &Path) -> Result<String, ExecError> {
    let database = str_arg(args, "database")?;
    let sql = str_arg(args, "query")?;
    let db_path = confine(&database, workspace).await?;

    // rusqlite is synchronous; keep it off the async workers
    tokio::task::spawn_blocking(move || run_query(&db_path, &sql))
        .await
        .map_err(|e| ExecError::Failed(format!("sql task panicked: {}", e)))?
}

fn run_query(db_path: &Path, sql: &str) -> Result<String, ExecError> {
    let conn = Connection::open(db_path)
        .map_err(|e| ExecError::Failed(format!("cannot open database: {}", e)))?;

    let head = sql.trim_start().to_lowercase();
    if head.starts_with("select") || head.starts_with("with") || head.starts_with("pragma") {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ExecError::Failed(format!("sql error: {}", e)))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| ExecError::Failed(format!("sql error: {}", e)))?;

        let mut lines = vec![columns.join(" | ")];
        let mut count = 0usize;
        while let Some(row) = rows
            .next()
            .map_err(|e| ExecError::Failed(format!("sql error: {}", e)))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row
                    .get_ref(i)
                    .map_err(|e| ExecError::Failed(format!("sql error: {}", e)))?;
                values.push(render_value(value));
            }
            lines.push(values.join(" | "));
            count += 1;
            if count >= ROW_CAP {
                lines.push("... (rows truncated)".to_string());
                break;
            }
        }

        Ok(lines.join("\n"))
    } else {
        let affected = conn
            .execute(sql, [])
            .map_err(|e| ExecError::Failed(format!("sql error: {}", e)))?;
        Ok(format!("{} rows affected", affected))
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
