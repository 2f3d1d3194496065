//! 随机抽题会话状态
//!
//! 每个会话的筛选条件、抽题数量、当前抽样结果与已展开的解析
//! 作为显式值在交互间传递；每个处理函数接收旧状态、返回新状态，
//! 不依赖任何全局可变量。

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::Question;
use crate::repos::QuestionFilters;
use crate::sampler;

/// 抽题数量限制在 1..=available；无可选题目时为 0
pub fn clamp_count(requested: usize, available: usize) -> usize {
    if available == 0 {
        0
    } else {
        requested.clamp(1, available)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSession {
    pub id: String,
    pub filters: QuestionFilters,
    pub requested_count: usize,
    pub selection: Vec<Question>,
    pub revealed_solutions: HashSet<String>,
}

impl SelectorSession {
    pub fn new(default_count: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filters: QuestionFilters::default(),
            requested_count: default_count.max(1),
            selection: Vec::new(),
            revealed_solutions: HashSet::new(),
        }
    }

    /// 更新筛选条件；条件变化时清空旧的抽样结果
    pub fn with_filters(mut self, filters: QuestionFilters) -> Self {
        if self.filters != filters {
            self.filters = filters;
            self.selection.clear();
            self.revealed_solutions.clear();
        }
        self
    }

    /// 记录用户输入的抽题数量，按当前可选题目数限制在 1..=available
    ///
    /// 无可选题目时仍保留至少 1，避免 0 写入会话后在题库扩大时无法恢复。
    pub fn with_count(mut self, requested: usize, available: usize) -> Self {
        self.requested_count = requested.clamp(1, available.max(1));
        self
    }

    /// 从候选题目中重新抽样；展开状态随之重置
    ///
    /// 实际抽取数量按候选数临时限制，`requested_count` 保持不变。
    pub fn generate_selection<R: Rng + ?Sized>(mut self, pool: &[Question], rng: &mut R) -> Self {
        let count = clamp_count(self.requested_count, pool.len());
        self.selection = sampler::sample(pool, count, rng);
        self.revealed_solutions.clear();
        self
    }

    /// 切换某题解析的显示状态；不在当前抽样中的题目忽略
    pub fn toggle_solution(mut self, question_id: &str) -> Self {
        if self.selection.iter().any(|q| q.id == question_id)
            && !self.revealed_solutions.remove(question_id)
        {
            self.revealed_solutions.insert(question_id.to_string());
        }
        self
    }

    pub fn is_solution_visible(&self, question_id: &str) -> bool {
        self.revealed_solutions.contains(question_id)
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }
}
