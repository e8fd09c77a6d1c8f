//! 回复生成
//!
//! 组装 Chat Completions 消息列表，并通过 OpenAI 兼容接口生成回复。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::models::chat_turn::ChatTurn;

/// 未配置 API 密钥时的固定回复
pub const MISSING_KEY_REPLY: &str = "抱歉，我的API密钥未设置，无法回答您的问题。";

/// 单条对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// 构建消息列表
///
/// 系统提示词在前，其后每轮历史展开为 `发送者: 问题` 与回复两条消息，
/// 最后是当前问题。发送者为默认名称时当前问题不加前缀。
pub fn build_messages(
    system_prompt: &str,
    context: &[ChatTurn],
    sender: &str,
    question: &str,
    default_sender: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.len() * 2 + 2);
    messages.push(ChatMessage::system(system_prompt));

    for turn in context {
        messages.push(ChatMessage::user(format!("{}: {}", turn.sender, turn.question)));
        messages.push(ChatMessage::assistant(turn.response.clone()));
    }

    if sender == default_sender {
        messages.push(ChatMessage::user(question));
    } else {
        messages.push(ChatMessage::user(format!("{}: {}", sender, question)));
    }

    messages
}

/// 回复请求
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// 当前角色
    pub role: String,
    /// 完整消息列表
    pub messages: Vec<ChatMessage>,
}

impl ReplyRequest {
    /// 上下文中的历史轮数
    pub fn context_turns(&self) -> usize {
        self.messages.len().saturating_sub(2) / 2
    }
}

/// 回复生成器
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// 生成回复文本
    async fn generate(&self, request: &ReplyRequest) -> Result<String>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

/// OpenAI 兼容的 Chat Completions 客户端
pub struct ChatCompletionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_empty() {
            tracing::warn!("未设置 API 密钥，所有问题都将收到固定的提示回复");
        }

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ReplyGenerator for ChatCompletionClient {
    async fn generate(&self, request: &ReplyRequest) -> Result<String> {
        if self.api_key.is_empty() {
            tracing::error!("未设置 API 密钥，无法生成回复");
            return Ok(MISSING_KEY_REPLY.to_string());
        }

        tracing::info!(
            "发送回复请求，角色: {}，包含{}轮历史对话",
            request.role,
            request.context_turns()
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages: &request.messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ReplyGeneration(format!(
                "接口返回 {}: {}",
                status, error_text
            )));
        }

        let body: ChatCompletionResponse = response.json().await?;
        let answer = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ReplyGeneration("响应中没有候选回复".into()))?;

        tracing::info!("成功生成回复: {}", answer.chars().take(50).collect::<String>());
        Ok(answer)
    }
}

pub fn create_reply_generator(config: &LlmConfig) -> Result<Box<dyn ReplyGenerator>> {
    Ok(Box::new(ChatCompletionClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String, key: &str) -> LlmConfig {
        LlmConfig {
            api_url: url,
            api_key: key.into(),
            ..LlmConfig::default()
        }
    }

    fn request() -> ReplyRequest {
        ReplyRequest {
            role: "@专业助手bot".into(),
            messages: build_messages("你是助手", &[], "张三", "你好", "未知用户"),
        }
    }

    #[test]
    fn test_build_messages_layout() {
        let context = vec![
            ChatTurn::new("张三", "一加一", "二", "R"),
            ChatTurn::new("李四", "二加二", "四", "R"),
        ];
        let messages = build_messages("提示词", &context, "张三", "三加三", "未知用户");

        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], ChatMessage::system("提示词"));
        assert_eq!(messages[1], ChatMessage::user("张三: 一加一"));
        assert_eq!(messages[2], ChatMessage::assistant("二"));
        assert_eq!(messages[3], ChatMessage::user("李四: 二加二"));
        assert_eq!(messages[5], ChatMessage::user("张三: 三加三"));
    }

    #[test]
    fn test_default_sender_has_no_prefix() {
        let messages = build_messages("p", &[], "未知用户", "在吗", "未知用户");
        assert_eq!(messages.last().unwrap(), &ChatMessage::user("在吗"));
    }

    #[test]
    fn test_context_turn_count() {
        let context = vec![ChatTurn::new("A", "q", "r", "R")];
        let request = ReplyRequest {
            role: "R".into(),
            messages: build_messages("p", &context, "A", "q2", "未知用户"),
        };
        assert_eq!(request.context_turns(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_returns_apology_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config(server.uri(), "")).unwrap();
        let reply = client.generate(&request()).await.unwrap();
        assert_eq!(reply, MISSING_KEY_REPLY);
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "deepseek-chat",
                "max_tokens": 800
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "你好，张三"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/v1/chat/completions", server.uri());
        let client = ChatCompletionClient::new(&config(url, "test-key")).unwrap();
        let reply = client.generate(&request()).await.unwrap();
        assert_eq!(reply, "你好，张三");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config(server.uri(), "k")).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::ReplyGeneration(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&config(server.uri(), "k")).unwrap();
        assert!(client.generate(&request()).await.is_err());
    }
}
