//! 题库统一错误类型
//!
//! - `Validation`: 提交前校验失败，不会触达存储
//! - `Persistence`: 存储层失败，消息原样上抛，不自动重试
//! - 其余为导出 / 配置 / IO 等外围错误
//!
//! 筛选目录扫描失败不经过本类型：记录日志后返回空目录。

use thiserror::Error;

use crate::store::StoreError;

/// 题库操作结果类型别名
pub type McqResult<T> = Result<T, McqError>;

#[derive(Debug, Error)]
pub enum McqError {
    /// 必填字段缺失、年份缺失或取值非法
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// 存储不可达、权限不足或写入被拒
    #[error("{0}")]
    Persistence(#[from] StoreError),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 导出失败
    #[error("Export error: {0}")]
    Export(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(String),
}

impl McqError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        McqError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, McqError::Validation { .. })
    }
}

impl From<serde_json::Error> for McqError {
    fn from(err: serde_json::Error) -> Self {
        McqError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for McqError {
    fn from(err: std::io::Error) -> Self {
        McqError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for McqError {
    fn from(err: config::ConfigError) -> Self {
        McqError::Config(err.to_string())
    }
}

// 转换为 String（用于前端命令返回）
impl From<McqError> for String {
    fn from(err: McqError) -> Self {
        err.to_string()
    }
}
