//! 轮询循环
//!
//! 每次快照依次经过：置信度过滤、窗口检查、消息检测、回复生成、写入历史、投递回复。
//! 上一次快照缓冲区归循环所有，每处理完一次快照后更新。

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::config::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::chat_turn::ChatTurn;
use crate::models::token::{Snapshot, Token};
use crate::observability::{MonitorMetrics, SNAPSHOT_TARGET};
use crate::services::detector::MessageDetector;
use crate::services::duplicate::DuplicateGuard;
use crate::services::history::{HistoryStore, LoadOutcome};
use crate::services::reply::{ReplyGenerator, ReplyRequest, build_messages};
use crate::services::role_registry::RoleRegistry;
use crate::services::sender::SenderResolver;
use crate::services::surface_guard::window_title_visible;
use crate::storage::repository::JsonFileSessionStore;
use crate::surface::{ReplySink, SnapshotSource};

/// 轮询参数
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub confidence_threshold: f32,
    pub window_title: String,
    pub window_title_aliases: Vec<String>,
    pub context_turns: usize,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.snapshot.interval_secs),
            confidence_threshold: config.snapshot.confidence_threshold,
            window_title: config.snapshot.window_title.clone(),
            window_title_aliases: config.snapshot.window_title_aliases.clone(),
            context_turns: config.history.context_turns,
        }
    }
}

/// 单次快照的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// 未看到聊天窗口，跳过
    Skipped,
    /// 没有需要回答的问题
    Idle,
    /// 已回复
    Replied(ChatTurn),
}

/// 群聊监控器
pub struct ChatMonitor {
    settings: MonitorSettings,
    registry: RoleRegistry,
    detector: MessageDetector,
    history: HistoryStore,
    generator: Box<dyn ReplyGenerator>,
    sink: Box<dyn ReplySink>,
    metrics: MonitorMetrics,
    previous: Vec<Token>,
}

impl ChatMonitor {
    pub fn new(
        settings: MonitorSettings,
        registry: RoleRegistry,
        detector: MessageDetector,
        history: HistoryStore,
        generator: Box<dyn ReplyGenerator>,
        sink: Box<dyn ReplySink>,
    ) -> Self {
        Self {
            settings,
            registry,
            detector,
            history,
            generator,
            sink,
            metrics: MonitorMetrics::new(),
            previous: Vec::new(),
        }
    }

    /// 按配置组装：角色目录、JSON 文件历史、已知用户
    pub fn from_config(
        config: &AppConfig,
        generator: Box<dyn ReplyGenerator>,
        sink: Box<dyn ReplySink>,
    ) -> Self {
        let registry = RoleRegistry::load_from_dir(&config.roles.dir, &config.roles.default_prompt);
        let detector = MessageDetector::new(
            SenderResolver::from_config(&config.users),
            DuplicateGuard::new(config.history.duplicate_check_window),
        );

        let store = JsonFileSessionStore::new(config.history.dir.clone());
        let (history, outcome) = HistoryStore::open(
            Box::new(store),
            &config.roles.default_role,
            config.history.capacity,
        );
        if let LoadOutcome::Corrupt(e) = &outcome {
            tracing::error!("加载历史对话失败，以空会话继续: {}", e);
        }

        Self::new(
            MonitorSettings::from_config(config),
            registry,
            detector,
            history,
            generator,
            sink,
        )
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// 上一次处理过的快照（已过滤）
    pub fn previous_tokens(&self) -> &[Token] {
        &self.previous
    }

    /// 处理一次原始快照
    ///
    /// 回复生成或投递失败时返回错误。无论结果如何（包括窗口检查未通过），
    /// 过滤后的快照都会成为下一次的“上一次快照”。
    pub async fn run_once(&mut self, raw: Vec<Token>) -> Result<SnapshotOutcome> {
        let snapshot = Snapshot::from_recognized(raw, self.settings.confidence_threshold);

        if !window_title_visible(
            snapshot.tokens(),
            &self.settings.window_title,
            &self.settings.window_title_aliases,
        ) {
            tracing::warn!("未检测到聊天窗口名称，窗口可能被遮挡，跳过本次检测");
            self.metrics.record_skipped();
            self.previous = snapshot.tokens;
            return Ok(SnapshotOutcome::Skipped);
        }

        self.metrics.record_processed();
        let result = self.respond(&snapshot).await;
        self.previous = snapshot.tokens;
        result
    }

    async fn respond(&mut self, snapshot: &Snapshot) -> Result<SnapshotOutcome> {
        let scan = self.detector.detect(
            snapshot.tokens(),
            &self.previous,
            &self.registry,
            &mut self.history,
        );
        self.metrics.record_triggers(scan.triggers_seen);
        self.metrics.record_suppressed(scan.suppressed);

        let Some(detection) = scan.detection else {
            return Ok(SnapshotOutcome::Idle);
        };
        tracing::info!("检测到需要回复的消息，准备回复...");

        let role = self.history.active_role().to_string();
        let context = self.history.recent_for_context(self.settings.context_turns);
        let request = ReplyRequest {
            role: role.clone(),
            messages: build_messages(
                self.registry.prompt_for(&role),
                &context,
                &detection.sender.name,
                &detection.question,
                self.detector.sender_resolver().default_sender(),
            ),
        };

        let reply = self.generator.generate(&request).await?;

        let turn = ChatTurn::new(&detection.sender.name, &detection.question, &reply, &role);
        if let Err(e) = self.history.append(turn.clone()) {
            self.metrics.record_error();
            tracing::error!(code = e.code(), "保存聊天历史失败: {}", e);
        }

        self.sink.deliver(&role, &reply).await?;
        self.metrics.record_reply();
        log_snapshot_evidence(snapshot);

        Ok(SnapshotOutcome::Replied(turn))
    }

    /// 持续轮询直到来源耗尽或收到 Ctrl-C，退出前保存历史
    pub async fn run(&mut self, source: &mut dyn SnapshotSource) -> Result<()> {
        self.run_until(source, tokio::signal::ctrl_c()).await
    }

    /// 持续轮询直到来源耗尽或 `shutdown` 完成，退出前保存历史
    ///
    /// 等待下一次快照和处理快照期间都会响应 `shutdown`。
    pub async fn run_until<F>(&mut self, source: &mut dyn SnapshotSource, shutdown: F) -> Result<()>
    where
        F: Future,
    {
        tracing::info!("群聊监控已启动，当前角色: {}", self.history.active_role());
        tracing::info!("当前已加载{}轮历史对话", self.history.session().len());
        for role in self.registry.all_roles() {
            tracing::info!("- {} (别名: {})", role.name, role.aliases.join(", "));
        }

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut failure = None;
        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("收到中断信号，监控已停止");
                    break;
                }
                next = async {
                    ticker.tick().await;
                    source.next_snapshot().await
                } => next,
            };

            match next {
                Ok(Some(raw)) => {
                    tokio::select! {
                        _ = &mut shutdown => {
                            tracing::info!("收到中断信号，放弃处理中的快照，监控已停止");
                            break;
                        }
                        result = self.run_once(raw) => {
                            if let Err(e) = result {
                                self.metrics.record_error();
                                tracing::error!(code = e.code(), "处理快照出错: {}", e);
                            }
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("快照来源已结束");
                    break;
                }
                Err(AppError::Serialization(msg)) => {
                    self.metrics.record_error();
                    tracing::warn!("跳过无法解析的快照: {}", msg);
                }
                Err(e) => {
                    self.metrics.record_error();
                    tracing::error!("读取快照失败，停止监控: {}", e);
                    failure = Some(e);
                    break;
                }
            }
        }

        self.shutdown();
        failure.map_or(Ok(()), Err)
    }

    /// 保存历史并输出运行汇总
    pub fn shutdown(&self) {
        if let Err(e) = self.history.flush() {
            tracing::error!("退出前保存聊天历史失败: {}", e);
        }
        tracing::info!("{}", self.metrics.summary());
    }
}

fn log_snapshot_evidence(snapshot: &Snapshot) {
    if snapshot.is_empty() {
        tracing::info!(target: SNAPSHOT_TARGET, "本次OCR未识别到有效文本");
        return;
    }
    tracing::info!(target: SNAPSHOT_TARGET, "---------- 本次成功回复对应的OCR识别详情 ----------");
    for token in snapshot.tokens() {
        tracing::info!(
            target: SNAPSHOT_TARGET,
            "文本: '{}', 置信度: {:.4}, 位置: {:?}",
            token.text,
            token.confidence,
            token.quad.0
        );
    }
}
