//! 文档存储错误类型
//!
//! 后端（内存 / SQLite）统一返回 `StoreError`，上层将其包装为
//! `McqError::Persistence` 并原样展示给调用方。

use thiserror::Error;

/// 存储操作结果类型别名
pub type StoreResult<T> = Result<T, StoreError>;

/// 文档存储错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// 存储不可达（网络中断、文件无法打开、连接池耗尽）
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// 权限不足
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// 写入或查询被拒绝（非法字段名、不支持的比较值、非对象文档）
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// 其他后端错误
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _) => match code.code {
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked => StoreError::Unavailable(err.to_string()),
                rusqlite::ErrorCode::PermissionDenied | rusqlite::ErrorCode::ReadOnly => {
                    StoreError::PermissionDenied(err.to_string())
                }
                rusqlite::ErrorCode::ConstraintViolation => StoreError::Rejected(err.to_string()),
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable(format!("Connection pool error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Rejected(format!("Malformed document: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::PermissionDenied("collection mcqs".to_string());
        assert_eq!(err.to_string(), "Permission denied: collection mcqs");
    }

    #[test]
    fn test_json_error_is_rejection() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
