//! 题库服务
//!
//! 录入、筛选查询、筛选目录、随机抽题与导出的统一入口。
//!
//! ## 核心功能
//! - 题目录入（校验后委托给 QuestionRepo）
//! - 两阶段筛选查询
//! - 筛选目录（失败降级为空）
//! - 随机抽题与会话状态推进
//! - 抽题结果导出

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, AuthoringConfig, ExportConfig, StoreBackend, StoreConfig};
use crate::error::McqResult;
use crate::filter_catalog::{build_catalog, FilterCatalog};
use crate::models::{Question, QuestionDraft};
use crate::question_export_service::{ExportResult, QuestionExportService, SelectionExport};
use crate::repos::{QuestionFilters, QuestionRepo, DEFAULT_RECENT_LIMIT};
use crate::sampler;
use crate::selector_session::SelectorSession;
use crate::store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use crate::syllabus::Syllabus;

/// 按配置打开文档存储
pub fn open_store(config: &StoreConfig) -> McqResult<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteDocumentStore::open(&config.sqlite_path)?),
    };
    info!("[QuestionBank] Using {} document store", store.provider_name());
    Ok(store)
}

/// 题库服务
pub struct QuestionBankService {
    repo: QuestionRepo,
    syllabus: Arc<Syllabus>,
    authoring: AuthoringConfig,
    export: ExportConfig,
    default_count: usize,
}

impl QuestionBankService {
    pub fn new(store: Arc<dyn DocumentStore>, syllabus: Arc<Syllabus>, config: &AppConfig) -> Self {
        Self {
            repo: QuestionRepo::new(store, config.store.collection.clone()),
            syllabus,
            authoring: config.authoring.clone(),
            export: config.export.clone(),
            default_count: config.selector.default_count,
        }
    }

    /// 按配置装配存储与大纲
    pub fn from_config(config: &AppConfig) -> McqResult<Self> {
        let store = open_store(&config.store)?;
        let syllabus = match &config.syllabus.path {
            Some(path) => Syllabus::from_path(path)?,
            None => Syllabus::builtin()?,
        };
        Ok(Self::new(store, Arc::new(syllabus), config))
    }

    pub fn syllabus(&self) -> &Syllabus {
        &self.syllabus
    }

    pub fn repo(&self) -> &QuestionRepo {
        &self.repo
    }

    // ========================================================================
    // 录入
    // ========================================================================

    /// 校验并保存题目，返回文档 ID；校验失败不会触达存储
    pub fn create_question(&self, draft: &QuestionDraft) -> McqResult<String> {
        let content = draft.validate(&self.syllabus, &self.authoring).map_err(|e| {
            warn!("[QuestionBank] Draft rejected: {}", e);
            e
        })?;
        self.repo.save(&content)
    }

    // ========================================================================
    // 查询
    // ========================================================================

    pub fn query_questions(&self, filters: &QuestionFilters) -> McqResult<Vec<Question>> {
        self.repo.query(filters)
    }

    /// 题库总数（不加筛选）
    pub fn total_questions(&self) -> McqResult<usize> {
        Ok(self.repo.query(&QuestionFilters::default())?.len())
    }

    pub fn filter_catalog(&self) -> FilterCatalog {
        build_catalog(&self.repo)
    }

    pub fn recent_questions(&self, limit: Option<usize>) -> McqResult<Vec<Question>> {
        self.repo.recent(limit.unwrap_or(DEFAULT_RECENT_LIMIT))
    }

    // ========================================================================
    // 随机抽题
    // ========================================================================

    /// 查询后抽取 `count` 道题；不足时返回全部
    pub fn random_selection<R: Rng + ?Sized>(
        &self,
        filters: &QuestionFilters,
        count: usize,
        rng: &mut R,
    ) -> McqResult<Vec<Question>> {
        let pool = self.repo.query(filters)?;
        Ok(sampler::sample(&pool, count, rng))
    }

    pub fn new_session(&self) -> SelectorSession {
        SelectorSession::new(self.default_count)
    }

    /// 按会话中的筛选条件重新查询并抽样；会话记录的抽题数量不受候选数影响
    pub fn refresh_session<R: Rng + ?Sized>(
        &self,
        session: SelectorSession,
        rng: &mut R,
    ) -> McqResult<SelectorSession> {
        let pool = self.repo.query(&session.filters)?;
        Ok(session.generate_selection(&pool, rng))
    }

    // ========================================================================
    // 导出
    // ========================================================================

    pub fn build_export(&self, session: &SelectorSession) -> SelectionExport {
        let source = self
            .export
            .source
            .clone()
            .unwrap_or_else(|| self.repo.provider_name().to_string());
        SelectionExport::new(session.selection.clone(), &session.filters, source, Utc::now())
    }

    /// 导出当前抽样结果到配置的目录
    pub fn export_selection(&self, session: &SelectorSession) -> McqResult<ExportResult> {
        let export = self.build_export(session);
        QuestionExportService::write_to_dir(&self.export.directory, &export)
    }
}
