//! Chatwatch - 群聊角色机器人
//!
//! 周期性读取聊天窗口的 OCR 快照，发现 `@角色` 的提问后按角色生成回复，
//! 并为每个角色维护独立的、可持久化的对话历史。

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod surface;
