//! 题目仓储
//!
//! 把结构化筛选请求翻译为文档存储查询。
//!
//! ## 两阶段筛选
//! 1. **下推**：难度、科目、知识点、题型、年份作为等值条件交给存储
//! 2. **取回后过滤**：标签是多值字段，存储无法与其他等值条件高效组合，
//!    取回后按小写成员关系在本地过滤
//!
//! 两个阶段分别由 `QuestionFilters::store_query` 与
//! `QuestionFilters::matches_post_fetch` 表达，可独立测试。

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::McqResult;
use crate::models::{Difficulty, Question, QuestionContent, QuestionType};
use crate::store::{DocumentStore, SortDirection, StoreQuery, StoreResult, StoredDocument};

/// 筛选下拉中的"全部"
pub const ALL_CHOICE: &str = "All";

/// 最近题目默认条数
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Log document-parse errors instead of silently discarding them.
fn log_and_skip_err(result: McqResult<Question>, id: &str) -> Option<Question> {
    match result {
        Ok(q) => Some(q),
        Err(e) => {
            warn!("[QuestionRepo] Document {} parse error (skipped): {}", id, e);
            None
        }
    }
}

/// 时间戳格式：固定微秒精度的 RFC 3339，字典序即时间序
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 下拉选项转筛选值："All" 或空白表示不限
pub fn parse_choice(choice: &str) -> Option<&str> {
    let trimmed = choice.trim();
    if trimmed.is_empty() || trimmed == ALL_CHOICE {
        None
    } else {
        Some(trimmed)
    }
}

// ============================================================================
// 筛选参数
// ============================================================================

/// 题目筛选参数；None 表示该字段不限
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionFilters {
    pub difficulty: Option<Difficulty>,
    /// 结构化科目（优先）
    pub subject_name: Option<String>,
    /// 兼容字段 "科目 - 知识点"，仅在 subject_name 为空时生效
    pub subject: Option<String>,
    pub topic_name: Option<String>,
    pub question_type: Option<QuestionType>,
    pub year: Option<i32>,
    /// 单个标签，大小写不敏感
    pub tag: Option<String>,
}

impl QuestionFilters {
    /// 由界面下拉值构建；"All" 视为不限，无法识别的难度/题型/年份同样视为不限
    pub fn from_choices(
        difficulty: &str,
        subject_name: &str,
        topic_name: &str,
        question_type: &str,
        year: &str,
        tag: &str,
    ) -> Self {
        Self {
            difficulty: parse_choice(difficulty).and_then(Difficulty::parse),
            subject_name: parse_choice(subject_name).map(str::to_string),
            subject: None,
            topic_name: parse_choice(topic_name).map(str::to_string),
            question_type: parse_choice(question_type).and_then(QuestionType::parse),
            year: parse_choice(year).and_then(|y| y.parse().ok()),
            tag: parse_choice(tag).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 第一阶段：可下推到存储的等值条件
    pub fn store_query(&self) -> StoreQuery {
        let mut query = StoreQuery::new();

        if let Some(d) = self.difficulty {
            query = query.where_eq("difficulty", d.as_str());
        }

        // 科目：优先 subject_name，否则回退 subject，二者不同时使用
        match (non_blank(&self.subject_name), non_blank(&self.subject)) {
            (Some(name), _) => query = query.where_eq("subject_name", name),
            (None, Some(legacy)) => query = query.where_eq("subject", legacy),
            (None, None) => {}
        }

        if let Some(topic) = non_blank(&self.topic_name) {
            query = query.where_eq("topic_name", topic);
        }

        if let Some(t) = self.question_type {
            query = query.where_eq("question_type", t.as_str());
        }

        if let Some(year) = self.year {
            query = query.where_eq("year", Value::from(year));
        }

        query
    }

    /// 第二阶段：取回后的本地过滤（标签成员关系）
    pub fn matches_post_fetch(&self, content: &QuestionContent) -> bool {
        match non_blank(&self.tag) {
            Some(tag) => content.has_tag_lowercase(&tag.to_lowercase()),
            None => true,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// 仓储
// ============================================================================

/// 题目仓储
pub struct QuestionRepo {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl QuestionRepo {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }

    /// 保存题目，写入当前时间作为 created_at / updated_at，返回文档 ID
    pub fn save(&self, content: &QuestionContent) -> McqResult<String> {
        self.save_at(content, Utc::now())
    }

    /// 以指定时间保存
    pub fn save_at(&self, content: &QuestionContent, now: DateTime<Utc>) -> McqResult<String> {
        let stamp = format_timestamp(now);
        let fields = content.to_document(&stamp, &stamp)?;
        let id = self.store.add_document(&self.collection, fields)?;
        info!(
            "[QuestionRepo] Saved question {} ({}, {})",
            id, content.question_type, content.difficulty
        );
        Ok(id)
    }

    /// 按筛选条件查询；无匹配返回空列表，存储不可达返回 Persistence 错误
    pub fn query(&self, filters: &QuestionFilters) -> McqResult<Vec<Question>> {
        let store_query = filters.store_query();
        debug!(
            "[QuestionRepo] Pushdown constraints: {:?}, post-fetch tag: {:?}",
            store_query.equals, filters.tag
        );
        let docs = self.store.run_query(&self.collection, &store_query)?;
        let fetched = docs.len();

        let questions: Vec<Question> = Self::materialize(docs)
            .into_iter()
            .filter(|q| filters.matches_post_fetch(&q.content))
            .collect();

        debug!(
            "[QuestionRepo] Query fetched {} documents, {} after post-fetch filter",
            fetched,
            questions.len()
        );
        Ok(questions)
    }

    /// 最近创建的题目（按 created_at 倒序）
    pub fn recent(&self, limit: usize) -> McqResult<Vec<Question>> {
        let docs = self.store.order_by_limit(
            &self.collection,
            "created_at",
            SortDirection::Descending,
            limit,
        )?;
        Ok(Self::materialize(docs))
    }

    /// 原始文档全量扫描（筛选目录使用，保留无法解析为题目的旧记录）
    pub fn scan_documents(&self) -> StoreResult<Vec<StoredDocument>> {
        self.store.stream_all(&self.collection)
    }

    fn materialize(docs: Vec<StoredDocument>) -> Vec<Question> {
        docs.into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                log_and_skip_err(Question::from_stored(doc), &id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McqError;
    use crate::models::{McqOptions, OptionLabel};
    use crate::store::{MemoryDocumentStore, StoreError};
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;

    fn content(difficulty: Difficulty, tags: &[&str]) -> QuestionContent {
        QuestionContent {
            question: "Q".into(),
            options: McqOptions {
                a: "1".into(),
                b: "2".into(),
                c: "3".into(),
                d: "4".into(),
            },
            correct_answer: OptionLabel::A,
            difficulty,
            solution: "S".into(),
            question_type: QuestionType::QuestionBank,
            year: None,
            subject: Some("Physics - Optics".into()),
            subject_name: Some("Physics".into()),
            topic_name: Some("Optics".into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image: None,
        }
    }

    fn repo() -> (Arc<MemoryDocumentStore>, QuestionRepo) {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = QuestionRepo::new(store.clone(), "mcqs");
        (store, repo)
    }

    #[test]
    fn test_store_query_pushdown() {
        let filters = QuestionFilters {
            difficulty: Some(Difficulty::Hard),
            subject_name: Some("Physics".into()),
            subject: Some("Physics - Optics".into()),
            topic_name: Some("Optics".into()),
            question_type: Some(QuestionType::PastYearQuestion),
            year: Some(2020),
            tag: Some("Waves".into()),
        };
        let q = filters.store_query();
        let fields: Vec<&str> = q.equals.iter().map(|(f, _)| f.as_str()).collect();
        // subject 不与 subject_name 同时下推，tag 不下推
        assert_eq!(
            fields,
            vec!["difficulty", "subject_name", "topic_name", "question_type", "year"]
        );
        assert_eq!(q.equals[3].1, json!("PYQ"));
        assert_eq!(q.equals[4].1, json!(2020));
    }

    #[test]
    fn test_legacy_subject_used_without_subject_name() {
        let filters = QuestionFilters {
            subject: Some("Physics - Optics".into()),
            ..Default::default()
        };
        assert_eq!(
            filters.store_query().equals,
            vec![("subject".to_string(), json!("Physics - Optics"))]
        );
    }

    #[test]
    fn test_post_fetch_tag_filter() {
        let c = content(Difficulty::Easy, &["Algebra", "quadratics"]);
        let f = |tag: &str| QuestionFilters {
            tag: Some(tag.into()),
            ..Default::default()
        };
        assert!(f("algebra").matches_post_fetch(&c));
        assert!(f("ALGEBRA").matches_post_fetch(&c));
        assert!(f("Quadratics").matches_post_fetch(&c));
        assert!(!f("geometry").matches_post_fetch(&c));
        assert!(QuestionFilters::default().matches_post_fetch(&c));
    }

    #[test]
    fn test_from_choices_treats_all_as_unset() {
        let f = QuestionFilters::from_choices("All", "All", "All", "All", "All", "All");
        assert!(f.is_empty());

        let f = QuestionFilters::from_choices("Hard", "Physics", "Optics", "PYQ", "2020", "waves");
        assert_eq!(f.difficulty, Some(Difficulty::Hard));
        assert_eq!(f.question_type, Some(QuestionType::PastYearQuestion));
        assert_eq!(f.year, Some(2020));
        assert_eq!(f.tag.as_deref(), Some("waves"));
    }

    #[test]
    fn test_save_stamps_timestamps() {
        let (_, repo) = repo();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let id = repo.save_at(&content(Difficulty::Easy, &[]), at).unwrap();

        let all = repo.query(&QuestionFilters::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].created_at, "2024-05-01T08:30:00.000000Z");
        assert_eq!(all[0].created_at, all[0].updated_at);
    }

    #[test]
    fn test_query_combines_both_phases() {
        let (_, repo) = repo();
        repo.save(&content(Difficulty::Easy, &["Algebra"])).unwrap();
        repo.save(&content(Difficulty::Hard, &["algebra"])).unwrap();
        repo.save(&content(Difficulty::Hard, &["geometry"])).unwrap();

        let filters = QuestionFilters {
            difficulty: Some(Difficulty::Hard),
            tag: Some("Algebra".into()),
            ..Default::default()
        };
        let found = repo.query(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content.tags, vec!["algebra"]);
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let (_, repo) = repo();
        repo.save(&content(Difficulty::Easy, &[])).unwrap();
        let filters = QuestionFilters {
            year: Some(1999),
            ..Default::default()
        };
        assert!(repo.query(&filters).unwrap().is_empty());
    }

    #[test]
    fn test_store_outage_is_persistence_error() {
        let (store, repo) = repo();
        store.set_failure(Some(StoreError::Unavailable("network down".into())));
        let err = repo.query(&QuestionFilters::default()).unwrap_err();
        assert_matches!(err, McqError::Persistence(StoreError::Unavailable(_)));
        assert_eq!(err.to_string(), "Store unavailable: network down");

        let err = repo.save(&content(Difficulty::Easy, &[])).unwrap_err();
        assert_matches!(err, McqError::Persistence(_));
    }

    #[test]
    fn test_unparseable_documents_are_skipped() {
        let (store, repo) = repo();
        repo.save(&content(Difficulty::Easy, &[])).unwrap();
        store
            .add_document("mcqs", json!({"question": "orphan"}).as_object().cloned().unwrap())
            .unwrap();
        assert_eq!(repo.query(&QuestionFilters::default()).unwrap().len(), 1);
        assert_eq!(repo.scan_documents().unwrap().len(), 2);
    }

    #[test]
    fn test_recent_newest_first() {
        let (_, repo) = repo();
        for day in 1..=7 {
            let at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
            repo.save_at(&content(Difficulty::Easy, &[]), at).unwrap();
        }
        let recent = repo.recent(DEFAULT_RECENT_LIMIT).unwrap();
        assert_eq!(recent.len(), 5);
        assert!(recent[0].created_at.starts_with("2024-01-07"));
        assert!(recent[4].created_at.starts_with("2024-01-03"));
    }
}
