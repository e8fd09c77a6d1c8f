use std::collections::VecDeque;

use crate::models::chat_turn::ChatTurn;

/// 当前驻留内存的角色会话
///
/// 有界环形缓冲：新记录追加到尾部，超过容量时从头部淘汰最旧的记录。
#[derive(Debug, Clone)]
pub struct RoleSession {
    role: String,
    turns: VecDeque<ChatTurn>,
    capacity: usize,
}

impl RoleSession {
    /// 创建空会话
    pub fn new(role: &str, capacity: usize) -> Self {
        Self {
            role: role.to_string(),
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 由已加载的记录构建会话，超出容量时只保留最新的 `capacity` 条
    pub fn from_turns(role: &str, turns: Vec<ChatTurn>, capacity: usize) -> Self {
        let skip = turns.len().saturating_sub(capacity);
        Self {
            role: role.to_string(),
            turns: turns.into_iter().skip(skip).collect(),
            capacity,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 追加记录，返回因超出容量被淘汰的最旧记录
    pub fn push(&mut self, turn: ChatTurn) -> Option<ChatTurn> {
        self.turns.push_back(turn);
        if self.turns.len() > self.capacity {
            self.turns.pop_front()
        } else {
            None
        }
    }

    /// 最近的 `n` 条记录，按时间正序
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ChatTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip)
    }

    /// 全部记录，按时间正序
    pub fn turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    /// 导出为持久化格式
    pub fn to_vec(&self) -> Vec<ChatTurn> {
        self.turns.iter().cloned().collect()
    }
}
