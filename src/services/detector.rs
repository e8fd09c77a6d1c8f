//! 消息检测
//!
//! 把触发词扫描、发送者推断、问题提取和重复检查串成一次快照的完整判断。

use crate::models::token::Token;
use crate::services::duplicate::{DuplicateGuard, DuplicateVerdict};
use crate::services::history::{HistoryStore, LoadOutcome, SwitchReport};
use crate::services::question;
use crate::services::role_registry::RoleRegistry;
use crate::services::sender::{ResolvedSender, SenderResolver};
use crate::services::trigger;

/// 一次被接受的检测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// 被 @ 的角色（主名称）
    pub role: String,
    /// 实际命中的触发词
    pub matched_word: String,
    /// 推断出的发送者
    pub sender: ResolvedSender,
    /// 问题文本
    pub question: String,
    /// 触发 Token 下标
    pub token_index: usize,
}

/// 单次快照的检测结果
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// 被接受的问题
    pub detection: Option<Detection>,
    /// 检查过的触发 Token 数
    pub triggers_seen: usize,
    /// 被重复检查抑制的问题数
    pub suppressed: usize,
}

/// 消息检测器
///
/// 持有最近一次已回答的问题，由轮询循环独占。
#[derive(Debug, Clone)]
pub struct MessageDetector {
    sender_resolver: SenderResolver,
    guard: DuplicateGuard,
    last_answered: Option<String>,
}

impl MessageDetector {
    pub fn new(sender_resolver: SenderResolver, guard: DuplicateGuard) -> Self {
        Self {
            sender_resolver,
            guard,
            last_answered: None,
        }
    }

    pub fn last_answered(&self) -> Option<&str> {
        self.last_answered.as_deref()
    }

    pub fn sender_resolver(&self) -> &SenderResolver {
        &self.sender_resolver
    }

    /// 检测快照中第一个需要回答的问题
    ///
    /// 每遇到一个触发 Token 就把历史切换到对应角色；问题为空或被抑制时继续检查后续 Token。
    pub fn detect(
        &mut self,
        tokens: &[Token],
        previous: &[Token],
        registry: &RoleRegistry,
        history: &mut HistoryStore,
    ) -> ScanOutcome {
        let roles = registry.all_roles();
        let mut outcome = ScanOutcome::default();

        for hit in trigger::scan_all(tokens, roles) {
            outcome.triggers_seen += 1;
            let token = &tokens[hit.token_index];
            if hit.via_alias() {
                tracing::info!(
                    "检测到触发词别名: {}，将作为 {} 处理",
                    hit.matched_word,
                    hit.role.name
                );
            }

            if let Some(report) = history.switch_role(&hit.role.name) {
                log_switch(&report);
            }

            let sender =
                self.sender_resolver
                    .resolve(&token.text, hit.matched_word, previous, roles);
            let question = question::assemble(token, hit.matched_word, tokens, hit.token_index);
            if question.is_empty() {
                tracing::debug!("触发词 {} 后没有找到问题内容", hit.matched_word);
                continue;
            }

            tracing::info!(
                "检测到触发词 {}，发送者: {}，问题: {}",
                hit.matched_word,
                sender.name,
                question
            );

            let verdict = self.guard.check(
                &question,
                &sender.name,
                history.active_role(),
                self.last_answered.as_deref(),
                history.session(),
            );
            match verdict {
                DuplicateVerdict::Fresh => {}
                DuplicateVerdict::SameAsLastAnswered => {
                    tracing::debug!("问题'{}'与上一次回答的问题相同，跳过", question);
                    outcome.suppressed += 1;
                    continue;
                }
                DuplicateVerdict::SimilarInHistory { .. } => {
                    tracing::info!("当前问题'{}'重复问题检查未通过，继续检查后续问题", question);
                    outcome.suppressed += 1;
                    continue;
                }
            }

            self.last_answered = Some(question.clone());
            outcome.detection = Some(Detection {
                role: hit.role.name.clone(),
                matched_word: hit.matched_word.to_string(),
                sender,
                question,
                token_index: hit.token_index,
            });
            break;
        }

        outcome
    }
}

fn log_switch(report: &SwitchReport) {
    if let Err(e) = &report.flush {
        tracing::error!("保存角色'{}'的对话历史失败: {}", report.previous_role, e);
    }
    if let LoadOutcome::Corrupt(e) = &report.load {
        tracing::error!("加载历史对话失败，以空会话继续: {}", e);
    }
}
