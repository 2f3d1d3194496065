//! 日志初始化
//!
//! `RUST_LOG` 优先，其次使用配置中的过滤指令。重复调用无副作用。

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 安装全局 fmt 订阅者；已安装时返回 false
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let cfg = LoggingConfig {
            filter: "mcq_bank_lib=debug".into(),
        };
        let _ = init_logging(&cfg);
        assert!(!init_logging(&cfg));
    }
}
