//! 触发词扫描
//!
//! 按 Token 顺序查找第一个包含角色名称或别名的 Token。优先级依次为：
//! Token 顺序、角色加载顺序、角色内主名称先于别名、别名按配置顺序。

use crate::models::role::Role;
use crate::models::token::Token;

/// 一次触发命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerMatch<'a> {
    /// 被触发的角色
    pub role: &'a Role,
    /// 实际命中的触发词（主名称或别名）
    pub matched_word: &'a str,
    /// 命中 Token 在快照中的下标
    pub token_index: usize,
}

impl TriggerMatch<'_> {
    /// 是否通过别名命中
    pub fn via_alias(&self) -> bool {
        self.matched_word != self.role.name
    }
}

/// 在单个文本中查找触发词，返回第一个命中的角色及触发词
pub fn match_text<'a>(text: &str, roles: &'a [Role]) -> Option<(&'a Role, &'a str)> {
    roles
        .iter()
        .find_map(|role| role.find_trigger_in(text).map(|word| (role, word)))
}

/// 扫描快照，返回第一个包含触发词的 Token
pub fn scan<'a>(tokens: &[Token], roles: &'a [Role]) -> Option<TriggerMatch<'a>> {
    scan_from(tokens, roles, 0)
}

/// 从 `start` 下标开始扫描
pub fn scan_from<'a>(tokens: &[Token], roles: &'a [Role], start: usize) -> Option<TriggerMatch<'a>> {
    tokens
        .iter()
        .enumerate()
        .skip(start)
        .find_map(|(token_index, token)| {
            match_text(&token.text, roles).map(|(role, matched_word)| TriggerMatch {
                role,
                matched_word,
                token_index,
            })
        })
}

/// 依次返回快照中所有包含触发词的 Token
///
/// 用于重复问题被抑制后继续检查后续 Token。
pub fn scan_all<'t, 'a>(tokens: &'t [Token], roles: &'a [Role]) -> TriggerMatches<'t, 'a> {
    TriggerMatches {
        tokens,
        roles,
        next: 0,
    }
}

/// [`scan_all`] 返回的迭代器
pub struct TriggerMatches<'t, 'a> {
    tokens: &'t [Token],
    roles: &'a [Role],
    next: usize,
}

impl<'a> Iterator for TriggerMatches<'_, 'a> {
    type Item = TriggerMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = scan_from(self.tokens, self.roles, self.next)?;
        self.next = found.token_index + 1;
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::Quad;

    fn tokens(texts: &[&str]) -> Vec<Token> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let top = i as f32 * 20.0;
                Token::new(text, 0.9, Quad::from_rect(0.0, top, 100.0, top + 15.0))
            })
            .collect()
    }

    fn roles() -> Vec<Role> {
        vec![
            Role::new("@专业助手bot", &["@专业助手", "@专业肋手bot"], "p1"),
            Role::new("@老师bot", &["@老师"], "p2"),
        ]
    }

    #[test]
    fn test_no_trigger_yields_none() {
        let roles = roles();
        assert!(scan(&tokens(&["大家好", "今天吃什么", ""]), &roles).is_none());
        assert!(scan(&[], &roles).is_none());
    }

    #[test]
    fn test_first_token_wins_over_role_order() {
        let roles = roles();
        let snapshot = tokens(&["闲聊", "@老师bot 你好", "@专业助手bot 在吗"]);
        let hit = scan(&snapshot, &roles).unwrap();
        assert_eq!(hit.role.name, "@老师bot");
        assert_eq!(hit.token_index, 1);
        assert!(!hit.via_alias());
    }

    #[test]
    fn test_role_order_breaks_ties_within_token() {
        let roles = roles();
        let hit = scan(&tokens(&["@老师bot @专业助手bot"]), &roles).unwrap();
        assert_eq!(hit.role.name, "@专业助手bot");
    }

    #[test]
    fn test_alias_hit_reports_alias_and_canonical_role() {
        let roles = roles();
        let hit = scan(&tokens(&["张三 @专业肋手bot 你好"]), &roles).unwrap();
        assert_eq!(hit.role.name, "@专业助手bot");
        assert_eq!(hit.matched_word, "@专业肋手bot");
        assert!(hit.via_alias());
    }

    #[test]
    fn test_scan_all_visits_every_triggered_token() {
        let roles = roles();
        let snapshot = tokens(&["@老师 一", "无关", "@专业助手bot 二", "@老师bot 三"]);
        let indices: Vec<_> = scan_all(&snapshot, &roles).map(|m| m.token_index).collect();
        assert_eq!(indices, vec![0, 2, 3]);
    }
}
