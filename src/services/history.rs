//! 聊天历史服务
//!
//! 同一时刻只有一个角色会话驻留内存。切换角色时先整体保存当前会话，
//! 再加载（或新建）目标角色的会话。每次追加记录后整体保存当前会话。
//!
//! 持久化失败不会中断轮询：内存中的会话始终是权威数据，错误以返回值交给调用方处理。

use crate::error::{AppError, Result};
use crate::models::chat_turn::ChatTurn;
use crate::models::session::RoleSession;
use crate::storage::repository::SessionStore;

/// 加载角色会话的结果
#[derive(Debug)]
pub enum LoadOutcome {
    /// 成功加载，`trimmed` 为超出容量被丢弃的旧记录数
    Loaded { turns: usize, trimmed: usize },
    /// 没有历史记录，新建空会话
    Missing,
    /// 记录损坏或无法读取，以空会话继续
    Corrupt(AppError),
}

/// 切换角色的结果
#[derive(Debug)]
pub struct SwitchReport {
    /// 切换前的角色
    pub previous_role: String,
    /// 保存旧会话的结果；失败时切换仍然生效
    pub flush: Result<()>,
    /// 加载新会话的结果
    pub load: LoadOutcome,
}

/// 聊天历史服务
pub struct HistoryStore {
    store: Box<dyn SessionStore>,
    session: RoleSession,
    capacity: usize,
}

impl HistoryStore {
    /// 打开历史服务并加载初始角色的会话
    pub fn open(store: Box<dyn SessionStore>, initial_role: &str, capacity: usize) -> (Self, LoadOutcome) {
        let (session, outcome) = load_session(store.as_ref(), initial_role, capacity);
        let history = Self {
            store,
            session,
            capacity,
        };
        (history, outcome)
    }

    /// 当前角色
    pub fn active_role(&self) -> &str {
        self.session.role()
    }

    /// 当前会话（只读）
    pub fn session(&self) -> &RoleSession {
        &self.session
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 切换到新角色，角色未变化时返回 `None`
    pub fn switch_role(&mut self, new_role: &str) -> Option<SwitchReport> {
        if new_role == self.session.role() {
            return None;
        }

        tracing::info!("检测到角色变更: {} -> {}", self.session.role(), new_role);
        let flush = self.flush();

        let (session, load) = load_session(self.store.as_ref(), new_role, self.capacity);
        let previous = std::mem::replace(&mut self.session, session);
        tracing::info!(
            "切换到新角色: {}，历史位置: {}",
            new_role,
            self.store.describe(new_role)
        );

        Some(SwitchReport {
            previous_role: previous.role().to_string(),
            flush,
            load,
        })
    }

    /// 追加一条记录并整体保存当前会话
    ///
    /// 记录的角色必须是当前角色，否则返回 `Validation` 且不修改会话。
    /// 保存失败返回 `Storage`，此时记录已在内存中生效。
    pub fn append(&mut self, turn: ChatTurn) -> Result<()> {
        if turn.role != self.session.role() {
            return Err(AppError::Validation(format!(
                "记录角色 '{}' 与当前角色 '{}' 不一致",
                turn.role,
                self.session.role()
            )));
        }

        if let Some(removed) = self.session.push(turn) {
            tracing::info!(
                "内存中历史记录已达到最大长度，删除最早的对话: {}: {}",
                removed.sender,
                preview(&removed.question, 20)
            );
        }

        self.flush()
    }

    /// 以当前角色创建记录并追加，返回创建的记录
    pub fn record(&mut self, sender: &str, question: &str, response: &str) -> Result<ChatTurn> {
        let turn = ChatTurn::new(sender, question, response, self.session.role());
        self.append(turn.clone())?;
        Ok(turn)
    }

    /// 最近 `max_turns` 轮对话，用作回复生成的上下文
    pub fn recent_for_context(&self, max_turns: usize) -> Vec<ChatTurn> {
        self.session.recent(max_turns).cloned().collect()
    }

    /// 整体保存当前会话
    pub fn flush(&self) -> Result<()> {
        let role = self.session.role();
        self.store
            .save(role, &self.session.to_vec())
            .map_err(|e| {
                AppError::Storage(format!("保存 {} 失败: {}", self.store.describe(role), e))
            })?;
        tracing::debug!(
            "成功将{}轮对话历史保存到{}",
            self.session.len(),
            self.store.describe(role)
        );
        Ok(())
    }
}

fn load_session(store: &dyn SessionStore, role: &str, capacity: usize) -> (RoleSession, LoadOutcome) {
    match store.load(role) {
        Ok(Some(turns)) => {
            let total = turns.len();
            let session = RoleSession::from_turns(role, turns, capacity);
            let trimmed = total - session.len();
            tracing::info!("成功从{}加载了{}轮历史对话", store.describe(role), total);
            if trimmed > 0 {
                tracing::info!("历史对话超过最大长度，只保留最新的{}轮对话", capacity);
            }
            (
                session,
                LoadOutcome::Loaded {
                    turns: total,
                    trimmed,
                },
            )
        }
        Ok(None) => {
            tracing::info!("未找到角色'{}'的历史对话，将创建新的对话历史", role);
            (RoleSession::new(role, capacity), LoadOutcome::Missing)
        }
        Err(e) => (RoleSession::new(role, capacity), LoadOutcome::Corrupt(e)),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
