//! 发送者推断
//!
//! 聊天界面通常把发送者名称渲染在触发消息上方的单独一行。这里依赖上一次轮询的
//! 快照来推断发送者，受轮询间隔影响，结果只是近似的启发式判断，不保证正确。

use crate::config::config::UsersConfig;
use crate::models::role::Role;
use crate::models::token::Token;
use crate::models::user::{KnownUser, canonicalize};
use crate::services::trigger;

/// 发送者名称的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderSource {
    /// 上一次快照中的名称行
    PreviousSnapshot,
    /// 当前 Token 中触发词之前的文本
    CurrentToken,
    /// 未识别，使用默认名称
    Default,
}

/// 推断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSender {
    pub name: String,
    pub source: SenderSource,
}

/// 发送者推断器
#[derive(Debug, Clone)]
pub struct SenderResolver {
    known_users: Vec<KnownUser>,
    default_sender: String,
}

impl SenderResolver {
    pub fn new(known_users: Vec<KnownUser>, default_sender: &str) -> Self {
        Self {
            known_users,
            default_sender: default_sender.to_string(),
        }
    }

    pub fn from_config(config: &UsersConfig) -> Self {
        Self::new(config.known_users.clone(), &config.default_sender)
    }

    pub fn default_sender(&self) -> &str {
        &self.default_sender
    }

    /// 推断发送者
    ///
    /// 优先级：
    /// 1. 上一次快照中的名称行，规范化后命中已知用户
    /// 2. 当前 Token 中触发词之前的文本，规范化后命中已知用户
    /// 3. 默认名称
    pub fn resolve(
        &self,
        source_text: &str,
        matched_word: &str,
        previous: &[Token],
        roles: &[Role],
    ) -> ResolvedSender {
        if let Some(name) = self.infer_from_previous(previous, roles) {
            return ResolvedSender {
                name,
                source: SenderSource::PreviousSnapshot,
            };
        }

        if let Some(name) = self.infer_from_prefix(source_text, matched_word) {
            return ResolvedSender {
                name,
                source: SenderSource::CurrentToken,
            };
        }

        ResolvedSender {
            name: self.default_sender.clone(),
            source: SenderSource::Default,
        }
    }

    /// 从上一次快照推断
    ///
    /// 上一次快照里也有触发词时取触发 Token 前一个 Token，否则取第一个 Token。
    pub fn infer_from_previous(&self, previous: &[Token], roles: &[Role]) -> Option<String> {
        let candidate = match trigger::scan(previous, roles) {
            Some(hit) if hit.token_index > 0 => previous.get(hit.token_index - 1),
            _ => previous.first(),
        }?;

        let candidate = candidate.text.trim();
        tracing::debug!("从上一次 OCR 结果推断可能的发送者名称: '{}'", candidate);
        self.canonical(candidate)
    }

    /// 从当前 Token 中触发词前面的文本推断
    pub fn infer_from_prefix(&self, source_text: &str, matched_word: &str) -> Option<String> {
        let position = source_text.find(matched_word)?;
        let prefix = source_text[..position].trim();
        if prefix.is_empty() {
            return None;
        }
        self.canonical(prefix)
    }

    fn canonical(&self, candidate: &str) -> Option<String> {
        if candidate.is_empty() {
            return None;
        }
        canonicalize(&self.known_users, candidate).map(str::to_string)
    }
}
