//! 文档存储抽象
//!
//! 题库的持久化委托给一个无模式的文档数据库，本模块只定义最小访问接口：
//! - `add_document`: 写入文档，返回存储分配的 ID
//! - `query_equals`: 单字段等值查询
//! - `stream_all`: 全量扫描
//! - `order_by_limit`: 按字段排序后截取前 N 条
//!
//! 等值条件只支持标量（字符串 / 数字 / 布尔）。多值字段（数组）的成员判断
//! 不能与其他等值条件组合下推，由调用方在取回后自行过滤。
//!
//! ## 模块结构
//! ```text
//! store/
//! ├── mod.rs     - DocumentStore trait、StoreQuery
//! ├── error.rs   - StoreError
//! ├── memory.rs  - 进程内存储
//! └── sqlite.rs  - SQLite 存储（r2d2 连接池）
//! ```

pub mod error;
pub mod memory;
pub mod sqlite;

use serde_json::{Map, Value};
use std::cmp::Ordering;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// 文档字段集合
pub type Document = Map<String, Value>;

/// 存储中的文档（ID + 字段）
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// 结构化查询：等值条件（AND）+ 可选排序 + 可选条数限制
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub equals: Vec<(String, Value)>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// 校验字段名与比较值，两个后端共用
    pub fn validate(&self) -> StoreResult<()> {
        for (field, value) in &self.equals {
            validate_field_name(field)?;
            if !is_scalar(value) {
                return Err(StoreError::Rejected(format!(
                    "Equality on '{}' requires a scalar value, got {}",
                    field, value
                )));
            }
        }
        if let Some((field, _)) = &self.order_by {
            validate_field_name(field)?;
        }
        Ok(())
    }

    /// 判断文档是否满足全部等值条件
    pub fn matches(&self, fields: &Document) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| fields.get(field).map_or(false, |v| scalar_eq(v, expected)))
    }
}

/// 文档存储访问接口
///
/// 实现方负责并发安全；本系统每次交互最多发起一个调用，不施加额外的锁纪律。
pub trait DocumentStore: Send + Sync {
    /// 后端名称（用于日志与导出来源标记）
    fn provider_name(&self) -> &'static str;

    /// 写入新文档，返回存储分配的 ID
    fn add_document(&self, collection: &str, fields: Document) -> StoreResult<String>;

    /// 执行结构化查询
    fn run_query(&self, collection: &str, query: &StoreQuery) -> StoreResult<Vec<StoredDocument>>;

    /// 单字段等值查询
    fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<Vec<StoredDocument>> {
        self.run_query(collection, &StoreQuery::new().where_eq(field, value))
    }

    /// 全量扫描
    fn stream_all(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        self.run_query(collection, &StoreQuery::new())
    }

    /// 按字段排序后取前 N 条（缺少该字段的文档不参与）
    fn order_by_limit(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
        n: usize,
    ) -> StoreResult<Vec<StoredDocument>> {
        self.run_query(
            collection,
            &StoreQuery::new().order_by(field, direction).limit(n),
        )
    }
}

/// 字段名仅允许 `[A-Za-z0-9_]`，SQLite 后端会将其拼入 JSON 路径
pub fn validate_field_name(field: &str) -> StoreResult<()> {
    if !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::Rejected(format!("Invalid field name '{}'", field)))
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// 标量比较：数字按数值比较（2020 与 2020.0 相等）
pub fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => false,
    }
}

/// 排序用比较；不同类型之间按 bool < number < string 排列
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
