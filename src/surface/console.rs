//! 控制台投递
//!
//! 没有接入真实聊天窗口时，把回复打印到标准输出。

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::surface::ReplySink;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReplySink;

impl ConsoleReplySink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReplySink for ConsoleReplySink {
    async fn deliver(&self, role: &str, reply: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("[{}] {}\n", role, reply).as_bytes())
            .await?;
        stdout.flush().await?;
        tracing::info!("成功发送回复，角色: {}", role);
        Ok(())
    }
}
