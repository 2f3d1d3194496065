//! 筛选目录
//!
//! 一次全量扫描收集五个字段的去重取值，用于填充筛选下拉：
//! 难度 / 科目 / 题型 / 标签按字符串升序，年份按降序（最近在前）。
//!
//! 扫描失败时降级为空目录，界面仍可加载，只是没有筛选项。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::repos::QuestionRepo;
use crate::store::Document;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCatalog {
    pub difficulties: Vec<String>,
    pub subjects: Vec<String>,
    pub types: Vec<String>,
    pub years: Vec<i32>,
    pub tags: Vec<String>,
}

impl FilterCatalog {
    pub fn is_empty(&self) -> bool {
        self.difficulties.is_empty()
            && self.subjects.is_empty()
            && self.types.is_empty()
            && self.years.is_empty()
            && self.tags.is_empty()
    }

    /// 从原始文档累积；缺失、null 与空字符串字段跳过
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut difficulties = BTreeSet::new();
        let mut subjects = BTreeSet::new();
        let mut types = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for fields in docs {
            if let Some(d) = non_empty_str(fields.get("difficulty")) {
                difficulties.insert(d.to_string());
            }
            if let Some(s) = non_empty_str(fields.get("subject")) {
                subjects.insert(s.to_string());
            }
            if let Some(t) = non_empty_str(fields.get("question_type")) {
                types.insert(t.to_string());
            }
            if let Some(y) = fields
                .get("year")
                .and_then(Value::as_i64)
                .and_then(|y| i32::try_from(y).ok())
            {
                years.insert(y);
            }
            if let Some(Value::Array(items)) = fields.get("tags") {
                tags.extend(
                    items
                        .iter()
                        .filter_map(|t| non_empty_str(Some(t)))
                        .map(str::to_string),
                );
            }
        }

        Self {
            difficulties: difficulties.into_iter().collect(),
            subjects: subjects.into_iter().collect(),
            types: types.into_iter().collect(),
            years: years.into_iter().rev().collect(),
            tags: tags.into_iter().collect(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// 扫描全部题目构建筛选目录；存储失败时返回空目录
pub fn build_catalog(repo: &QuestionRepo) -> FilterCatalog {
    match repo.scan_documents() {
        Ok(docs) => {
            let catalog = FilterCatalog::from_documents(docs.iter().map(|d| &d.fields));
            debug!(
                "[FilterCatalog] Scanned {} documents: {} difficulties, {} subjects, {} types, {} years, {} tags",
                docs.len(),
                catalog.difficulties.len(),
                catalog.subjects.len(),
                catalog.types.len(),
                catalog.years.len(),
                catalog.tags.len()
            );
            catalog
        }
        Err(e) => {
            warn!(
                "[FilterCatalog] Scan of '{}' failed, serving empty catalog: {}",
                repo.collection(),
                e
            );
            FilterCatalog::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryDocumentStore, StoreError};
    use serde_json::json;
    use std::sync::Arc;

    fn docs(values: Vec<Value>) -> Vec<Document> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let docs = docs(vec![
            json!({"difficulty": "Hard", "year": 2019, "tags": ["optics", "Waves"]}),
            json!({"difficulty": "Easy", "year": 2023, "subject": "Physics - Optics"}),
            json!({"difficulty": "Hard", "year": 2021, "question_type": "PYQ", "tags": ["optics"]}),
        ]);
        let c = FilterCatalog::from_documents(docs.iter());
        assert_eq!(c.difficulties, vec!["Easy", "Hard"]);
        assert_eq!(c.years, vec![2023, 2021, 2019]);
        assert_eq!(c.tags, vec!["Waves", "optics"]);
        assert_eq!(c.subjects, vec!["Physics - Optics"]);
        assert_eq!(c.types, vec!["PYQ"]);
    }

    #[test]
    fn test_skips_absent_and_null() {
        let docs = docs(vec![json!({
            "difficulty": null, "subject": "", "year": null, "tags": [], "question_type": "Question Bank"
        })]);
        let c = FilterCatalog::from_documents(docs.iter());
        assert!(c.difficulties.is_empty());
        assert!(c.subjects.is_empty());
        assert!(c.years.is_empty());
        assert!(c.tags.is_empty());
        assert_eq!(c.types, vec!["Question Bank"]);
    }

    #[test]
    fn test_store_failure_degrades_to_empty() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .add_document("mcqs", json!({"difficulty": "Easy"}).as_object().cloned().unwrap())
            .unwrap();
        let repo = QuestionRepo::new(store.clone(), "mcqs");
        assert_eq!(build_catalog(&repo).difficulties, vec!["Easy"]);

        store.set_failure(Some(StoreError::PermissionDenied("rules".into())));
        assert!(build_catalog(&repo).is_empty());
    }
}
