//! Repo 模块
//!
//! - `question_repo`: 题目写入、两阶段筛选查询、最近题目

pub mod question_repo;

pub use question_repo::{
    format_timestamp, parse_choice, QuestionFilters, QuestionRepo, ALL_CHOICE,
    DEFAULT_RECENT_LIMIT,
};
