//! 应用配置
//!
//! 加载顺序：内置默认值 → 可选 TOML 文件 → `MCQ__` 前缀环境变量
//! （如 `MCQ__STORE__BACKEND=sqlite`）。启动前先读取 `.env`。

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{McqError, McqResult};

/// 默认集合名
pub const DEFAULT_COLLECTION: &str = "mcqs";

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: PathBuf,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: PathBuf::from("data/mcq_bank.db"),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: PathBuf,
    /// 导出文件中的来源标记；为空时使用存储后端名称
    pub source: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("exports"),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyllabusConfig {
    /// 大纲 JSON 文件；未配置时使用内置大纲
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub default_count: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { default_count: 5 }
    }
}

/// 录入约束
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoringConfig {
    /// 真题年份下限（含）
    pub min_year: i32,
    /// 真题年份上限（含）
    pub max_year: i32,
}

impl Default for AuthoringConfig {
    fn default() -> Self {
        Self {
            min_year: 2015,
            max_year: 2024,
        }
    }
}

impl AuthoringConfig {
    pub fn year_range(&self) -> RangeInclusive<i32> {
        self.min_year..=self.max_year
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub syllabus: SyllabusConfig,
    pub logging: LoggingConfig,
    pub selector: SelectorConfig,
    pub authoring: AuthoringConfig,
}

impl AppConfig {
    /// 从 `.env`、可选配置文件与环境变量加载
    pub fn load(file: Option<&Path>) -> McqResult<Self> {
        dotenvy::dotenv().ok();
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MCQ")
                .prefix_separator("__")
                .separator("__"),
        );
        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        debug!(
            "[Config] store={} collection={} export_dir={}",
            cfg.store.backend,
            cfg.store.collection,
            cfg.export.directory.display()
        );
        Ok(cfg)
    }

    /// 仅从 TOML 字符串加载（不读取环境变量）
    pub fn from_toml_str(raw: &str) -> McqResult<Self> {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> McqResult<()> {
        if self.store.collection.trim().is_empty() {
            return Err(McqError::Config("store.collection must not be empty".into()));
        }
        if self.authoring.min_year > self.authoring.max_year {
            return Err(McqError::Config(format!(
                "authoring.min_year ({}) is greater than authoring.max_year ({})",
                self.authoring.min_year, self.authoring.max_year
            )));
        }
        if self.selector.default_count == 0 {
            return Err(McqError::Config("selector.default_count must be at least 1".into()));
        }
        Ok(())
    }
}
