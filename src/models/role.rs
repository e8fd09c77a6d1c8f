use serde::{Deserialize, Serialize};

/// 可被 @ 的角色
///
/// 从角色描述文件加载，进程生命周期内不可变。三个字段缺一不可，
/// 缺失任意字段的描述文件在反序列化阶段即失败并被跳过。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// 主触发词，同时作为角色标识
    pub name: String,

    /// 触发词别名（通常是 OCR 的误识别变体），按配置顺序匹配
    pub aliases: Vec<String>,

    /// 角色系统提示词
    pub system_prompt: String,
}

impl Role {
    /// 创建新角色
    pub fn new(name: &str, aliases: &[&str], system_prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            system_prompt: system_prompt.to_string(),
        }
    }

    /// 按匹配优先级依次返回触发词：主名称在前，别名按配置顺序在后
    pub fn trigger_words(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// 返回文本中包含的第一个触发词
    pub fn find_trigger_in(&self, text: &str) -> Option<&str> {
        self.trigger_words()
            .filter(|word| !word.is_empty())
            .find(|word| text.contains(word))
    }

    /// 判断文本是否提及该角色（名称或任意别名被包含）
    pub fn is_mentioned_by(&self, text: &str) -> bool {
        self.find_trigger_in(text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_checked_before_aliases() {
        let role = Role::new("@专业助手bot", &["@专业助手", "助手"], "prompt");
        assert_eq!(role.find_trigger_in("@专业助手bot 你好"), Some("@专业助手bot"));
        assert_eq!(role.find_trigger_in("@专业助手 你好"), Some("@专业助手"));
        assert_eq!(role.find_trigger_in("小助手在吗"), Some("助手"));
        assert_eq!(role.find_trigger_in("大家好"), None);
    }

    #[test]
    fn test_descriptor_requires_all_fields() {
        let ok: Result<Role, _> =
            serde_json::from_str(r#"{"name":"@a","aliases":[],"system_prompt":"p"}"#);
        assert!(ok.is_ok());

        let missing: Result<Role, _> = serde_json::from_str(r#"{"name":"@a","aliases":[]}"#);
        assert!(missing.is_err());
    }
}
