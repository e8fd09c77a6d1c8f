//! 重复问题抑制
//!
//! 两级检查：
//! 1. 与本进程最近一次已回答的问题完全相同，直接抑制（屏幕上的旧消息在下一次轮询时仍可见）。
//! 2. 回看当前角色最近若干轮历史，同一发送者向同一角色提过相似问题时抑制。

use std::collections::HashSet;

use crate::models::chat_turn::ChatTurn;
use crate::models::session::RoleSession;

/// 归一化时删除的标点
const PUNCTUATION: &str = "，。！？、；：“”‘’（）【】《》「」『』〈〉…—～,.!?;:\"'()[]<>";

/// 字符集合重合度阈值，严格大于时视为相似
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// 检查结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateVerdict {
    /// 允许回答
    Fresh,
    /// 与最近一次已回答的问题相同
    SameAsLastAnswered,
    /// 与历史中同一发送者、同一角色的问题相似
    SimilarInHistory { previous_question: String },
}

impl DuplicateVerdict {
    pub fn is_suppressed(&self) -> bool {
        !matches!(self, DuplicateVerdict::Fresh)
    }
}

/// 重复问题检查器
#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    check_window: usize,
}

impl DuplicateGuard {
    /// `check_window` 为 0 时关闭历史相似度检查
    pub fn new(check_window: usize) -> Self {
        Self { check_window }
    }

    /// 检查候选问题
    ///
    /// 历史检查只看 `history` 属于 `active_role` 时的记录。
    pub fn check(
        &self,
        question: &str,
        sender: &str,
        active_role: &str,
        last_answered: Option<&str>,
        history: &RoleSession,
    ) -> DuplicateVerdict {
        if last_answered == Some(question) {
            return DuplicateVerdict::SameAsLastAnswered;
        }

        if self.check_window == 0 || history.role() != active_role {
            return DuplicateVerdict::Fresh;
        }

        for turn in history.recent(self.check_window) {
            if !is_similar_question(question, &turn.question) {
                continue;
            }
            if is_same_asker(turn, sender, active_role) {
                tracing::info!(
                    "用户'{}'向角色'{}'提出的问题'{}'与最近{}轮对话中的问题'{}'相似",
                    sender,
                    active_role,
                    question,
                    self.check_window,
                    turn.question
                );
                return DuplicateVerdict::SimilarInHistory {
                    previous_question: turn.question.clone(),
                };
            }
            tracing::debug!(
                "问题'{}'与历史中的'{}'相似，但发送者或角色不同（历史：{} / {}），允许回答",
                question,
                turn.question,
                turn.sender,
                turn.role
            );
        }

        DuplicateVerdict::Fresh
    }

    /// 是否应当抑制候选问题
    pub fn should_suppress(
        &self,
        question: &str,
        sender: &str,
        active_role: &str,
        last_answered: Option<&str>,
        history: &RoleSession,
    ) -> bool {
        self.check(question, sender, active_role, last_answered, history)
            .is_suppressed()
    }
}

fn is_same_asker(turn: &ChatTurn, sender: &str, role: &str) -> bool {
    turn.sender == sender && turn.role == role
}

/// 删除标点并转为小写
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !PUNCTUATION.contains(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// 判断两个问题是否相似
///
/// 归一化后相等、互相包含，或字符集合重合度超过阈值即视为相似。
pub fn is_similar_question(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);

    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }

    char_overlap(&a, &b) > SIMILARITY_THRESHOLD
}

/// 公共字符数 / 较大的字符集合大小
pub fn char_overlap(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let larger = set_a.len().max(set_b.len());
    if larger == 0 {
        return 1.0;
    }
    set_a.intersection(&set_b).count() as f64 / larger as f64
}
