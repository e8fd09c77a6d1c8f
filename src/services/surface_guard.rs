//! 聊天窗口可见性检查
//!
//! 快照中找不到聊天窗口标题时，窗口很可能被其他窗口遮挡，这一轮不做检测。

use crate::models::token::Token;

/// 快照中是否能看到聊天窗口标题（或其别名）
///
/// 未配置标题时总是返回 `true`。
pub fn window_title_visible(tokens: &[Token], title: &str, aliases: &[String]) -> bool {
    let title = title.trim();
    if title.is_empty() {
        return true;
    }

    let candidates: Vec<&str> = std::iter::once(title)
        .chain(aliases.iter().map(|a| a.trim()))
        .filter(|c| !c.is_empty())
        .collect();

    tokens
        .iter()
        .any(|token| candidates.iter().any(|c| token.text.contains(c)))
}
