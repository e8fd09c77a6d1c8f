use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::chat_turn::ChatTurn;
use crate::storage::atomic::write_atomic;

/// 会话仓储 trait
///
/// 每个角色对应一条持久化记录，保存该角色会话的完整快照。
pub trait SessionStore: Send + Sync {
    /// 加载角色的全部记录
    ///
    /// - `Ok(Some(turns))`: 成功加载
    /// - `Ok(None)`: 记录不存在或为空
    /// - `Err`: 读取或解析失败
    fn load(&self, role: &str) -> Result<Option<Vec<ChatTurn>>>;

    /// 以整体覆盖的方式保存角色的全部记录
    fn save(&self, role: &str, turns: &[ChatTurn]) -> Result<()>;

    /// 记录位置的描述，用于日志
    fn describe(&self, role: &str) -> String;
}

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

/// 根据角色名生成历史文件名
///
/// 删除字母、数字、下划线和空白以外的字符，空格替换为下划线；
/// 结果为空时使用 `default_role`。
pub fn history_file_name(role: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(role, "").replace(' ', "_");
    let stem = if cleaned.is_empty() {
        "default_role"
    } else {
        cleaned.as_str()
    };
    format!("{}_history.json", stem)
}

/// JSON 文件会话仓储
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    /// 创建仓储，目录不存在时在首次写入时创建
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 角色对应的历史文件路径
    pub fn path_for(&self, role: &str) -> PathBuf {
        self.dir.join(history_file_name(role))
    }
}

impl SessionStore for JsonFileSessionStore {
    fn load(&self, role: &str) -> Result<Option<Vec<ChatTurn>>> {
        let path = self.path_for(role);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let turns: Vec<ChatTurn> = serde_json::from_str(&content)?;
        Ok(Some(turns))
    }

    fn save(&self, role: &str, turns: &[ChatTurn]) -> Result<()> {
        let json = serde_json::to_string_pretty(turns)?;
        write_atomic(&self.path_for(role), json.as_bytes())
    }

    fn describe(&self, role: &str) -> String {
        self.path_for(role).display().to_string()
    }
}

/// 内存会话仓储，用于测试和不落盘运行
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, Vec<ChatTurn>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的角色数量
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, role: &str) -> Result<Option<Vec<ChatTurn>>> {
        Ok(self
            .records
            .lock()
            .get(role)
            .filter(|turns| !turns.is_empty())
            .cloned())
    }

    fn save(&self, role: &str, turns: &[ChatTurn]) -> Result<()> {
        self.records.lock().insert(role.to_string(), turns.to_vec());
        Ok(())
    }

    fn describe(&self, role: &str) -> String {
        format!("memory://{}", role)
    }
}
