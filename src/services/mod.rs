//! 服务模块

pub mod detector;
pub mod duplicate;
pub mod history;
pub mod monitor;
pub mod question;
pub mod reply;
pub mod role_registry;
pub mod sender;
pub mod surface_guard;
pub mod trigger;

pub use detector::{Detection, MessageDetector, ScanOutcome};
pub use duplicate::{DuplicateGuard, DuplicateVerdict};
pub use history::{HistoryStore, LoadOutcome, SwitchReport};
pub use monitor::{ChatMonitor, MonitorSettings, SnapshotOutcome};
pub use reply::{
    ChatCompletionClient, ChatMessage, ReplyGenerator, ReplyRequest, build_messages,
    create_reply_generator,
};
pub use role_registry::RoleRegistry;
pub use sender::{ResolvedSender, SenderResolver, SenderSource};
pub use trigger::TriggerMatch;
