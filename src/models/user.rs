use serde::{Deserialize, Serialize};

/// 已知群成员
///
/// 用于把 OCR 推断出的发送者名称规范化为标准名称。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnownUser {
    /// 标准名称
    pub name: String,

    /// OCR 可能识别出的变体
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl KnownUser {
    /// 创建已知用户
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// 候选名称与标准名称或任一别名完全相等
    pub fn matches(&self, candidate: &str) -> bool {
        self.name == candidate || self.aliases.iter().any(|alias| alias == candidate)
    }
}

/// 在已知用户表中规范化名称，别名命中时返回标准名称
pub fn canonicalize<'a>(users: &'a [KnownUser], candidate: &str) -> Option<&'a str> {
    users
        .iter()
        .find(|user| user.matches(candidate))
        .map(|user| user.name.as_str())
}
