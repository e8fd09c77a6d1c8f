//! 存储层模块
//!
//! 提供角色会话的持久化服务：每个角色一个 JSON 文件，整体覆盖写入。

pub mod atomic;
pub mod repository;

pub use repository::{JsonFileSessionStore, MemorySessionStore, SessionStore, history_file_name};
