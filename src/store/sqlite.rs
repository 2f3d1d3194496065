//! SQLite 文档存储
//!
//! 以 JSON 文本列保存无模式文档，等值条件通过 `json_extract` 下推。
//! 使用 r2d2 连接池，WAL 模式。
//!
//! ## 表结构
//! ```text
//! documents(seq INTEGER PK AUTOINCREMENT, id TEXT UNIQUE, collection TEXT, fields TEXT)
//! ```
//! `seq` 保证未指定排序时按插入顺序返回。

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::memory::DOCUMENT_ID_LEN;
use super::{Document, DocumentStore, StoreError, StoreQuery, StoreResult, StoredDocument};

/// SQLite 连接池类型
pub type DocumentPool = Pool<SqliteConnectionManager>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT NOT NULL UNIQUE,
    collection TEXT NOT NULL,
    fields     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);
"#;

/// Log row-parse errors instead of silently discarding them.
fn log_and_skip_err<T>(result: Result<T, rusqlite::Error>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("[SqliteStore] Row parse error (skipped): {}", e);
            None
        }
    }
}

/// SQLite 文档存储
pub struct SqliteDocumentStore {
    pool: DocumentPool,
    db_path: Option<PathBuf>,
}

impl SqliteDocumentStore {
    /// 打开（或创建）数据库文件
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        info!("[SqliteStore] Opening document store: {}", db_path.display());

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000i64)?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(8)
            .min_idle(Some(1))
            .connection_timeout(Duration::from_secs(5))
            .max_lifetime(Some(Duration::from_secs(1800)))
            .idle_timeout(Some(Duration::from_secs(600)))
            .build(manager)?;

        let store = Self {
            pool,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// 内存数据库（单连接，连接回收即数据丢失，仅用于测试与临时会话）
    pub fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;
        let store = Self {
            pool,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!("[SqliteStore] Schema ready");
        Ok(())
    }

    fn insert_with_conn(
        conn: &Connection,
        collection: &str,
        fields: &Document,
    ) -> StoreResult<String> {
        let id = nanoid::nanoid!(DOCUMENT_ID_LEN);
        let body = serde_json::to_string(fields)?;
        conn.execute(
            "INSERT INTO documents (id, collection, fields) VALUES (?1, ?2, ?3)",
            params![id, collection, body],
        )?;
        Ok(id)
    }

    fn query_with_conn(
        conn: &Connection,
        collection: &str,
        query: &StoreQuery,
    ) -> StoreResult<Vec<StoredDocument>> {
        let (sql, bind) = build_select(collection, query)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for (id, body) in rows.filter_map(log_and_skip_err) {
            match serde_json::from_str::<Document>(&body) {
                Ok(fields) => docs.push(StoredDocument { id, fields }),
                Err(e) => warn!("[SqliteStore] Document {} is not a JSON object (skipped): {}", id, e),
            }
        }
        Ok(docs)
    }
}

/// 单个等值条件的 SQL 片段与绑定值
///
/// json_extract 会把 JSON true 与数字 1 都返回为整数 1，布尔与数字因此
/// 额外比较 json_type，使结果与内存后端的标量比较一致。
fn equality_clause(field: &str, value: &Value, placeholder: usize) -> StoreResult<(String, SqlValue)> {
    match value {
        Value::String(s) => Ok((
            format!("json_extract(fields, '$.{}') = ?{}", field, placeholder),
            SqlValue::Text(s.clone()),
        )),
        Value::Bool(b) => Ok((
            format!("json_type(fields, '$.{}') = ?{}", field, placeholder),
            SqlValue::Text(if *b { "true" } else { "false" }.to_string()),
        )),
        Value::Number(n) => {
            let bound = match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n
                    .as_f64()
                    .map(SqlValue::Real)
                    .ok_or_else(|| StoreError::Rejected(format!("Unsupported number {}", n)))?,
            };
            Ok((
                format!(
                    "json_type(fields, '$.{f}') IN ('integer', 'real') AND json_extract(fields, '$.{f}') = ?{}",
                    placeholder,
                    f = field
                ),
                bound,
            ))
        }
        other => Err(StoreError::Rejected(format!(
            "Unsupported equality value {}",
            other
        ))),
    }
}

/// 构建 SELECT 语句与绑定参数
fn build_select(collection: &str, query: &StoreQuery) -> StoreResult<(String, Vec<SqlValue>)> {
    query.validate()?;

    let mut sql = String::from("SELECT id, fields FROM documents WHERE collection = ?1");
    let mut bind = vec![SqlValue::Text(collection.to_string())];

    for (field, value) in &query.equals {
        let (clause, bound) = equality_clause(field, value, bind.len() + 1)?;
        bind.push(bound);
        sql.push_str(" AND ");
        sql.push_str(&clause);
    }

    match &query.order_by {
        Some((field, direction)) => {
            sql.push_str(&format!(
                " AND json_extract(fields, '$.{f}') IS NOT NULL ORDER BY json_extract(fields, '$.{f}') {}, seq ASC",
                direction.as_sql(),
                f = field
            ));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    if let Some(limit) = query.limit {
        bind.push(SqlValue::Integer(limit.min(i64::MAX as usize) as i64));
        sql.push_str(&format!(" LIMIT ?{}", bind.len()));
    }

    Ok((sql, bind))
}

impl DocumentStore for SqliteDocumentStore {
    fn provider_name(&self) -> &'static str {
        "sqlite"
    }

    fn add_document(&self, collection: &str, fields: Document) -> StoreResult<String> {
        let conn = self.pool.get()?;
        let id = Self::insert_with_conn(&conn, collection, &fields)?;
        debug!("[SqliteStore] Added document {} to {}", id, collection);
        Ok(id)
    }

    fn run_query(&self, collection: &str, query: &StoreQuery) -> StoreResult<Vec<StoredDocument>> {
        let conn = self.pool.get()?;
        Self::query_with_conn(&conn, collection, query)
    }
}
