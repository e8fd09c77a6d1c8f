use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "CHATWATCH_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. ./chatwatch.toml
    /// 3. 环境变量（`CHATWATCH_HISTORY__CAPACITY=30` 形式）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        let threshold = config.snapshot.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigValidationError::InvalidConfidence(threshold));
        }

        if config.snapshot.interval_secs == 0 {
            return Err(ConfigValidationError::InvalidInterval);
        }

        if config.history.capacity == 0 {
            return Err(ConfigValidationError::InvalidCapacity);
        }

        if config.history.context_turns > config.history.capacity {
            return Err(ConfigValidationError::ContextExceedsCapacity {
                context: config.history.context_turns,
                capacity: config.history.capacity,
            });
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("OCR 置信度阈值必须在 0 到 1 之间，当前为 {0}")]
    InvalidConfidence(f32),

    #[error("轮询间隔无效，必须大于 0")]
    InvalidInterval,

    #[error("历史容量无效，必须大于 0")]
    InvalidCapacity,

    #[error("上下文轮数 {context} 超过历史容量 {capacity}")]
    ContextExceedsCapacity { context: usize, capacity: usize },
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("chatwatch.toml")
}
