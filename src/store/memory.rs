//! 进程内文档存储
//!
//! 与托管文档库语义一致的内存实现：插入顺序即默认返回顺序，
//! 排序扫描跳过缺少排序字段的文档。可通过 `set_failure` 模拟后端故障。

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tracing::debug;

use super::{compare_values, Document, DocumentStore, StoreError, StoreQuery, StoreResult, StoredDocument};

/// 文档 ID 长度（与托管文档库自动 ID 一致）
pub const DOCUMENT_ID_LEN: usize = 20;

/// 内存文档存储
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    failure: Mutex<Option<StoreError>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入故障：之后所有调用都返回该错误；传 `None` 恢复
    pub fn set_failure(&self, failure: Option<StoreError>) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = failure;
        }
    }

    /// 集合中的文档数
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_failure(&self) -> StoreResult<()> {
        let guard = self
            .failure
            .lock()
            .map_err(|e| StoreError::Backend(format!("Failure switch poisoned: {}", e)))?;
        match guard.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn add_document(&self, collection: &str, fields: Document) -> StoreResult<String> {
        self.check_failure()?;
        let id = nanoid::nanoid!(DOCUMENT_ID_LEN);
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {}", e)))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields,
            });
        debug!("[MemoryStore] Added document {} to {}", id, collection);
        Ok(id)
    }

    fn run_query(&self, collection: &str, query: &StoreQuery) -> StoreResult<Vec<StoredDocument>> {
        self.check_failure()?;
        query.validate()?;

        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {}", e)))?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<StoredDocument> = docs
            .iter()
            .filter(|d| query.matches(&d.fields))
            .cloned()
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matched.retain(|d| d.fields.get(field).map_or(false, |v| !v.is_null()));
            // sort_by 为稳定排序，相同键保持插入顺序
            matched.sort_by(|a, b| {
                let ord = compare_values(&a.fields[field], &b.fields[field]);
                match direction {
                    super::SortDirection::Ascending => ord,
                    super::SortDirection::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortDirection;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let store = MemoryDocumentStore::new();
        let a = store.add_document("mcqs", doc(json!({"q": 1}))).unwrap();
        let b = store.add_document("mcqs", doc(json!({"q": 2}))).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), DOCUMENT_ID_LEN);
        assert_eq!(store.len("mcqs"), 2);
    }

    #[test]
    fn test_query_equals_and_insertion_order() {
        let store = MemoryDocumentStore::new();
        store.add_document("mcqs", doc(json!({"n": 1, "d": "Easy"}))).unwrap();
        store.add_document("mcqs", doc(json!({"n": 2, "d": "Hard"}))).unwrap();
        store.add_document("mcqs", doc(json!({"n": 3, "d": "Easy"}))).unwrap();

        let easy = store.query_equals("mcqs", "d", json!("Easy")).unwrap();
        let ns: Vec<_> = easy.iter().map(|d| d.fields["n"].clone()).collect();
        assert_eq!(ns, vec![json!(1), json!(3)]);

        assert!(store.stream_all("other").unwrap().is_empty());
    }

    #[test]
    fn test_order_by_limit_skips_missing_field() {
        let store = MemoryDocumentStore::new();
        store.add_document("mcqs", doc(json!({"t": "2024-01-01"}))).unwrap();
        store.add_document("mcqs", doc(json!({"other": true}))).unwrap();
        store.add_document("mcqs", doc(json!({"t": "2024-03-01"}))).unwrap();
        store.add_document("mcqs", doc(json!({"t": "2024-02-01"}))).unwrap();

        let docs = store
            .order_by_limit("mcqs", "t", SortDirection::Descending, 2)
            .unwrap();
        let ts: Vec<_> = docs.iter().map(|d| d.fields["t"].clone()).collect();
        assert_eq!(ts, vec![json!("2024-03-01"), json!("2024-02-01")]);
    }

    #[test]
    fn test_bool_equality_does_not_match_numbers() {
        let store = MemoryDocumentStore::new();
        store.add_document("mcqs", doc(json!({"n": "bool", "flag": true}))).unwrap();
        store.add_document("mcqs", doc(json!({"n": "int", "flag": 1}))).unwrap();

        let on = store.query_equals("mcqs", "flag", json!(true)).unwrap();
        assert_eq!(on.len(), 1);
        assert_eq!(on[0].fields["n"], json!("bool"));

        let one = store.query_equals("mcqs", "flag", json!(1)).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].fields["n"], json!("int"));
    }

    #[test]
    fn test_injected_failure() {
        let store = MemoryDocumentStore::new();
        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        assert_eq!(
            store.stream_all("mcqs").unwrap_err(),
            StoreError::Unavailable("offline".into())
        );
        assert!(store.add_document("mcqs", Document::new()).is_err());

        store.set_failure(None);
        assert!(store.stream_all("mcqs").unwrap().is_empty());
    }
}
