// MCQ Bank library entry
// 题目录入、两阶段筛选、随机抽题与导出。

pub mod config;
pub mod error;
pub mod filter_catalog;
pub mod logging;
pub mod models;
pub mod question_bank_service;
pub mod question_export_service;
pub mod repos;
pub mod sampler;
pub mod selector_session;
pub mod store;
pub mod syllabus;

pub use config::AppConfig;
pub use error::{McqError, McqResult};
pub use filter_catalog::{build_catalog, FilterCatalog};
pub use models::{Difficulty, OptionLabel, Question, QuestionContent, QuestionDraft, QuestionType};
pub use question_bank_service::{open_store, QuestionBankService};
pub use repos::{QuestionFilters, QuestionRepo};
pub use selector_session::SelectorSession;
pub use store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore, StoreError};
pub use syllabus::Syllabus;
