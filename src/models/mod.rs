//! 核心数据模型模块
//!
//! 定义角色、OCR Token、已知用户、问答记录和角色会话。

pub mod chat_turn;
pub mod role;
pub mod session;
pub mod token;
pub mod user;

pub use chat_turn::ChatTurn;
pub use role::Role;
pub use session::RoleSession;
pub use token::{Point, Quad, Snapshot, Token};
pub use user::KnownUser;
