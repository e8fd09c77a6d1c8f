use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::user::KnownUser;

/// 未匹配任何角色时使用的系统提示词
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个微信机器人，要扮演一个特定角色在微信中回复他人
【角色设定】
- 友好、专业的助手
- 回答简洁明了，有礼貌
- 尽量提供有用的信息

【强制规则】
1. 回答简短，避免过长的回复
2. 使用礼貌的语气
3. 如果不确定，坦诚表示不知道";

/// 角色配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// 角色描述文件目录
    pub dir: PathBuf,
    /// 启动时的默认角色
    pub default_role: String,
    /// 未匹配角色时的系统提示词
    pub default_prompt: String,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("roles"),
            default_role: "@专业助手bot".into(),
            default_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

/// 用户配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    /// 群成员名称及其 OCR 识别变体
    pub known_users: Vec<KnownUser>,
    /// 无法识别发送者时使用的名称
    pub default_sender: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            known_users: Vec::new(),
            default_sender: "未知用户".into(),
        }
    }
}

/// 快照配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// 轮询间隔（秒）
    pub interval_secs: u64,
    /// OCR 置信度阈值（0-1）
    pub confidence_threshold: f32,
    /// 聊天窗口标题，为空时不做窗口检查
    pub window_title: String,
    /// 窗口标题的 OCR 识别变体
    pub window_title_aliases: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            confidence_threshold: 0.6,
            window_title: String::new(),
            window_title_aliases: Vec::new(),
        }
    }
}

/// 聊天历史配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// 历史文件目录
    pub dir: PathBuf,
    /// 内存中保留的最大轮数
    pub capacity: usize,
    /// 发送给回复生成器的最大轮数
    pub context_turns: usize,
    /// 重复检查回看的轮数，0 表示关闭
    pub duplicate_check_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("chat_histories"),
            capacity: 20,
            context_turns: 10,
            duplicate_check_window: 5,
        }
    }
}

/// 大模型接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat Completions 接口地址
    pub api_url: String,
    /// API 密钥
    pub api_key: String,
    /// 模型名称
    pub model: String,
    /// 采样温度
    pub temperature: f32,
    /// 最大生成 Token 数
    pub max_tokens: u32,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/chat/completions".into(),
            api_key: String::new(),
            model: "deepseek-chat".into(),
            temperature: 0.7,
            max_tokens: 800,
            timeout_secs: 60,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录，为空时只输出到控制台
    pub log_dir: Option<PathBuf>,
    /// 保留日志文件数
    pub file_max_count: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: Some(PathBuf::from("log")),
            file_max_count: 30,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 角色配置
    pub roles: RolesConfig,
    /// 用户配置
    pub users: UsersConfig,
    /// 快照配置
    pub snapshot: SnapshotConfig,
    /// 聊天历史配置
    pub history: HistoryConfig,
    /// 大模型接口配置
    pub llm: LlmConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".into();
        config.logging.log_dir = None;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.history.capacity, 20);
        assert_eq!(config.history.context_turns, 10);
        assert_eq!(config.history.duplicate_check_window, 5);
        assert_eq!(config.snapshot.interval_secs, 5);
        assert!((config.snapshot.confidence_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.users.default_sender, "未知用户");
        assert_eq!(config.roles.default_role, "@专业助手bot");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"history": {"capacity": 3}}"#).unwrap();
        assert_eq!(config.history.capacity, 3);
        assert_eq!(config.history.context_turns, 10);
        assert_eq!(config.llm.model, "deepseek-chat");
    }
}
