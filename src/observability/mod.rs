//! 可观测性模块
//!
//! 提供日志初始化和轮询循环的运行计数。

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

/// 快照证据日志使用的 target
pub const SNAPSHOT_TARGET: &str = "chatwatch::snapshot";

// ===== 运行计数 =====

/// 轮询循环计数
#[derive(Clone, Default)]
pub struct MonitorMetrics {
    pub snapshots_processed: Arc<AtomicU64>,
    pub snapshots_skipped: Arc<AtomicU64>,
    pub triggers_detected: Arc<AtomicU64>,
    pub duplicates_suppressed: Arc<AtomicU64>,
    pub replies_delivered: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

/// 计数的某一时刻取值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub snapshots_processed: u64,
    pub snapshots_skipped: u64,
    pub triggers_detected: u64,
    pub duplicates_suppressed: u64,
    pub replies_delivered: u64,
    pub errors_total: u64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完成检测的快照
    pub fn record_processed(&self) {
        self.snapshots_processed.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录一次被窗口检查跳过的快照
    pub fn record_skipped(&self) {
        self.snapshots_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_triggers(&self, count: usize) {
        self.triggers_detected
            .fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn record_suppressed(&self, count: usize) {
        self.duplicates_suppressed
            .fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn record_reply(&self) {
        self.replies_delivered.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            snapshots_processed: self.snapshots_processed.load(Ordering::SeqCst),
            snapshots_skipped: self.snapshots_skipped.load(Ordering::SeqCst),
            triggers_detected: self.triggers_detected.load(Ordering::SeqCst),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::SeqCst),
            replies_delivered: self.replies_delivered.load(Ordering::SeqCst),
            errors_total: self.errors_total.load(Ordering::SeqCst),
        }
    }

    /// 单行汇总，退出时写入日志
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "处理快照 {} 次，跳过 {} 次，触发 {} 次，抑制重复 {} 次，发送回复 {} 条，错误 {} 次",
            s.snapshots_processed,
            s.snapshots_skipped,
            s.triggers_detected,
            s.duplicates_suppressed,
            s.replies_delivered,
            s.errors_total
        )
    }
}

// ===== Structured Logging =====

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化日志
///
/// 控制台输出总是开启；配置了 `log_dir` 时额外按天滚动写入文件。
/// 返回的 guard 必须在程序退出前保持存活，否则文件日志可能丢失。
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = if config.structured {
        fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter(&config.level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_filter(env_filter(&config.level))
            .boxed()
    };
    layers.push(console);

    let mut guard = None;
    if let Some(dir) = &config.log_dir {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("chatwatch")
            .filename_suffix("log")
            .max_log_files(config.file_max_count)
            .build(dir)
            .map_err(|e| AppError::Config(format!("无法创建日志目录 {}: {}", dir.display(), e)))?;
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);

        let file = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter(&config.level))
            .boxed();
        layers.push(file);
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| AppError::Internal(format!("日志系统初始化失败: {}", e)))?;

    Ok(guard)
}
