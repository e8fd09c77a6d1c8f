//! 回放录制的 OCR 结果
//!
//! 每行一个 JSON 数组，数组元素为 `{"text", "confidence", "quad"}`，空行忽略。

use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::{AppError, Result};
use crate::models::token::Token;
use crate::surface::SnapshotSource;

/// 按行读取快照的来源
pub struct JsonLinesSnapshotSource {
    lines: Lines<Box<dyn AsyncBufRead + Send + Unpin>>,
    line_number: usize,
}

impl JsonLinesSnapshotSource {
    pub fn new(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// 打开文件，路径为 `-` 时读取标准输入
    pub async fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            tracing::info!("从标准输入读取快照");
            return Ok(Self::new(BufReader::new(tokio::io::stdin())));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| AppError::Io(format!("无法打开快照文件 {}: {}", path.display(), e)))?;
        tracing::info!("从文件读取快照: {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl SnapshotSource for JsonLinesSnapshotSource {
    async fn next_snapshot(&mut self) -> Result<Option<Vec<Token>>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<Token> = serde_json::from_str(line).map_err(|e| {
                AppError::Serialization(format!("第{}行快照无法解析: {}", self.line_number, e))
            })?;
            return Ok(Some(tokens));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINE: &str = r#"[{"text":"张三 @专业助手bot 你好","confidence":0.95,"quad":[[0,0],[100,0],[100,20],[0,20]]}]"#;

    #[tokio::test]
    async fn test_reads_snapshots_and_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", LINE, "[]");
        let mut source = JsonLinesSnapshotSource::new(BufReader::new(std::io::Cursor::new(input.into_bytes())));

        let first = source.next_snapshot().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].text, "张三 @专业助手bot 你好");
        assert_eq!(first[0].quad.max_y(), 20.0);

        assert!(source.next_snapshot().await.unwrap().unwrap().is_empty());
        assert!(source.next_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_reports_line_number() {
        let input = "[]\nnot json\n";
        let mut source = JsonLinesSnapshotSource::new(BufReader::new(std::io::Cursor::new(input.as_bytes().to_vec())));
        source.next_snapshot().await.unwrap();
        let err = source.next_snapshot().await.unwrap_err();
        assert!(err.to_string().contains("第2行"));
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", LINE).unwrap();

        let mut source = JsonLinesSnapshotSource::open(file.path()).await.unwrap();
        assert!(source.next_snapshot().await.unwrap().is_some());
        assert!(source.next_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_missing_file_is_io_error() {
        let result = JsonLinesSnapshotSource::open(Path::new("/nonexistent/snapshots.jsonl")).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
