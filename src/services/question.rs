//! 问题提取
//!
//! 问题优先取触发词之后的文本；触发词位于行尾时，退而取几何位置上的下一行。

use crate::models::token::Token;

/// 从触发 Token 中提取问题文本，可能为空
///
/// `position` 是触发 Token 在 `tokens` 中的下标。
pub fn assemble(token: &Token, matched_word: &str, tokens: &[Token], position: usize) -> String {
    let inline = text_after(&token.text, matched_word);
    if !inline.is_empty() || tokens.len() <= 1 {
        return inline.to_string();
    }

    // 纵向判断：候选框最小 Y 大于触发框最大 Y 即视为下一行，不看水平位置
    tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != position)
        .find(|(_, candidate)| token.quad.is_followed_by(&candidate.quad))
        .map(|(_, candidate)| candidate.text.trim().to_string())
        .unwrap_or_default()
}

/// 触发词之后的文本（已去除首尾空白）
pub fn text_after<'t>(text: &'t str, matched_word: &str) -> &'t str {
    match text.find(matched_word) {
        Some(position) => text[position + matched_word.len()..].trim(),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::Quad;

    fn at(text: &str, top: f32, bottom: f32) -> Token {
        Token::new(text, 0.9, Quad::from_rect(10.0, top, 200.0, bottom))
    }

    #[test]
    fn test_inline_question() {
        let token = at("张三 @专业助手bot 今天天气怎么样", 0.0, 20.0);
        let question = assemble(&token, "@专业助手bot", std::slice::from_ref(&token), 0);
        assert_eq!(question, "今天天气怎么样");
    }

    #[test]
    fn test_falls_back_to_next_line() {
        let tokens = vec![
            at("昨天的消息", -40.0, -20.0),
            at("@专业助手bot", 0.0, 20.0),
            at("谢谢", 25.0, 45.0),
            at("更下面一行", 50.0, 70.0),
        ];
        let question = assemble(&tokens[1], "@专业助手bot", &tokens, 1);
        assert_eq!(question, "谢谢");
    }

    #[test]
    fn test_next_line_ignores_horizontal_position() {
        let tokens = vec![
            at("@专业助手bot", 0.0, 20.0),
            Token::new(" 远处的文本 ", 0.9, Quad::from_rect(900.0, 21.0, 990.0, 40.0)),
        ];
        assert_eq!(assemble(&tokens[0], "@专业助手bot", &tokens, 0), "远处的文本");
    }

    #[test]
    fn test_overlapping_line_is_not_next_line() {
        let tokens = vec![at("@专业助手bot", 0.0, 20.0), at("同一行", 5.0, 20.0)];
        assert_eq!(assemble(&tokens[0], "@专业助手bot", &tokens, 0), "");
    }

    #[test]
    fn test_single_token_without_question_is_empty() {
        let token = at("@专业助手bot   ", 0.0, 20.0);
        assert_eq!(assemble(&token, "@专业助手bot", std::slice::from_ref(&token), 0), "");
    }
}
