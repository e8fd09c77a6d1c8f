//! 聊天界面协作方
//!
//! 截图、OCR 和消息发送都在进程之外完成，这里只定义输入输出的接口：
//! - [`SnapshotSource`]：提供每次轮询的 OCR Token
//! - [`ReplySink`]：把生成的回复投递回聊天窗口

pub mod console;
pub mod replay;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::token::Token;

pub use console::ConsoleReplySink;
pub use replay::JsonLinesSnapshotSource;

/// 快照来源
#[async_trait]
pub trait SnapshotSource: Send {
    /// 下一次快照的原始 Token，来源耗尽时返回 `None`
    async fn next_snapshot(&mut self) -> Result<Option<Vec<Token>>>;
}

/// 回复投递
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// 投递回复，返回错误表示消息未能送达
    async fn deliver(&self, role: &str, reply: &str) -> Result<()>;
}
