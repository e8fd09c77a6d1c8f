//! 错误处理模块
//!
//! 定义应用程序的错误类型。核心检测逻辑本身不会失败，
//! 错误只来自持久化、配置和外部协作方（回复生成、消息投递）。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 会话存储错误
    #[error("会话存储错误: {0}")]
    Storage(String),

    /// 回复生成错误
    #[error("回复生成失败: {0}")]
    ReplyGeneration(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::ReplyGeneration(e.to_string())
    }
}

impl AppError {
    /// 错误代码，用于日志中的结构化字段
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::ReplyGeneration(_) => "REPLY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.code(), "IO_ERROR");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: AppError = parse.into();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
        assert!(err.to_string().starts_with("序列化错误"));
    }
}
