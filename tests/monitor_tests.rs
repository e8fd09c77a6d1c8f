// Integration tests for the poll loop
//
// Tests cover:
// - Building the monitor from configuration (role directory, history directory)
// - Replaying recorded snapshots end to end
// - History flushed to disk on shutdown

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

use chatwatch::config::config::AppConfig;
use chatwatch::error::Result;
use chatwatch::models::role::Role;
use chatwatch::models::user::KnownUser;
use chatwatch::services::reply::{ReplyGenerator, ReplyRequest};
use chatwatch::services::role_registry::write_descriptor;
use chatwatch::services::ChatMonitor;
use chatwatch::storage::repository::{JsonFileSessionStore, SessionStore};
use chatwatch::surface::{JsonLinesSnapshotSource, ReplySink};

struct EchoGenerator;

#[async_trait]
impl ReplyGenerator for EchoGenerator {
    async fn generate(&self, request: &ReplyRequest) -> Result<String> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("收到: {}", last))
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<(String, String)>>>);

#[async_trait]
impl ReplySink for RecordingSink {
    async fn deliver(&self, role: &str, reply: &str) -> Result<()> {
        self.0.lock().push((role.to_string(), reply.to_string()));
        Ok(())
    }
}

fn snapshot_line(lines: &[&str]) -> String {
    let tokens: Vec<serde_json::Value> = lines
        .iter()
        .enumerate()
        .map(|(row, text)| {
            let top = row as f32 * 30.0;
            let bottom = top + 20.0;
            serde_json::json!({
                "text": text,
                "confidence": 0.93,
                "quad": [[0.0, top], [300.0, top], [300.0, bottom], [0.0, bottom]]
            })
        })
        .collect();
    serde_json::to_string(&tokens).unwrap()
}

fn config(root: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::development();
    config.roles.dir = root.join("roles");
    config.history.dir = root.join("chat_histories");
    config.snapshot.interval_secs = 1;
    config.snapshot.window_title = "技术交流群".into();
    config.users.known_users = vec![KnownUser::new("张三", &["张3"])];
    config
}

#[tokio::test]
async fn test_replay_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_descriptor(
        &config.roles.dir,
        &Role::new("@专业助手bot", &[], "你是一个专业助手"),
        false,
    )
    .unwrap();
    write_descriptor(
        &config.roles.dir,
        &Role::new("@老师bot", &["@老师"], "你是一位耐心的老师"),
        false,
    )
    .unwrap();

    let mut recording = tempfile::NamedTempFile::new().unwrap();
    writeln!(recording, "{}", snapshot_line(&["技术交流群", "张三 @老师 一加一等于几"])).unwrap();
    writeln!(recording, "{}", snapshot_line(&["技术交流群", "张三 @老师 一加一等于几"])).unwrap();
    writeln!(recording, "{}", snapshot_line(&["别的窗口", "张三 @专业助手bot 你好"])).unwrap();
    writeln!(recording, "{}", snapshot_line(&["技术交流群", "张3 @专业助手bot 讲个笑话"])).unwrap();

    let sink = RecordingSink::default();
    let mut monitor = ChatMonitor::from_config(&config, Box::new(EchoGenerator), Box::new(sink.clone()));
    assert_eq!(monitor.registry().len(), 2);

    let mut source = JsonLinesSnapshotSource::open(recording.path()).await.unwrap();
    monitor.run(&mut source).await.unwrap();

    let delivered = sink.0.lock().clone();
    assert_eq!(
        delivered,
        vec![
            ("@老师bot".to_string(), "收到: 张三: 一加一等于几".to_string()),
            ("@专业助手bot".to_string(), "收到: 张三: 讲个笑话".to_string()),
        ]
    );

    let metrics = monitor.metrics().snapshot();
    assert_eq!(metrics.snapshots_skipped, 1);
    assert_eq!(metrics.replies_delivered, 2);

    let store = JsonFileSessionStore::new(&config.history.dir);
    let tutor = store.load("@老师bot").unwrap().unwrap();
    assert_eq!(tutor.len(), 1);
    assert_eq!(tutor[0].sender, "张三");
    let assistant = store.load("@专业助手bot").unwrap().unwrap();
    assert_eq!(assistant.len(), 1);
    assert_eq!(assistant[0].question, "讲个笑话");
}
