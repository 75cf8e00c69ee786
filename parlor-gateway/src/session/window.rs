//! Context window builder.
//!
//! Pure transformation from a full history to the bounded prompt: the system
//! preamble followed by the last `size` messages, roles and content verbatim,
//! timestamps dropped.

use crate::provider::ChatMessage;
use parlor_memory::{Message, Role};

/// Number of history messages submitted with each turn.
pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Build the prompt window for `history`.
pub fn build_window(history: &[Message], system_prompt: &str, size: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(size);

    std::iter::once(ChatMessage::new(Role::System, system_prompt))
        .chain(
            history[start..]
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        )
        .collect()
}

/// Fixed window configuration: preamble text and size.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    system_prompt: String,
    size: usize,
}

impl ContextWindow {
    pub fn new(system_prompt: impl Into<String>, size: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn build(&self, history: &[Message]) -> Vec<ChatMessage> {
        build_window(history, &self.system_prompt, self.size)
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(
            parlor_common::config::SessionConfig::default().system_prompt,
            DEFAULT_WINDOW_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Message::new(role, format!("m{i}"))
            })
            .collect()
    }

    #[test]
    fn empty_history_yields_only_preamble() {
        let window = build_window(&[], "sys", 8);
        assert_eq!(window, vec![ChatMessage::new(Role::System, "sys")]);
    }

    #[test]
    fn short_history_is_kept_whole() {
        let h = history(5);
        let window = build_window(&h, "sys", 8);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].role, Role::System);
        for (msg, chat) in h.iter().zip(&window[1..]) {
            assert_eq!(chat.role, msg.role);
            assert_eq!(chat.content, msg.content);
        }
    }

    #[test]
    fn exactly_window_size_is_kept_whole() {
        let window = build_window(&history(8), "sys", 8);
        assert_eq!(window.len(), 9);
        assert_eq!(window[1].content, "m0");
    }

    #[test]
    fn long_history_keeps_last_entries_in_order() {
        let window = build_window(&history(20), "sys", 8);
        assert_eq!(window.len(), 9);
        let contents: Vec<_> = window[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m12", "m13", "m14", "m15", "m16", "m17", "m18", "m19"]);
        assert_eq!(window[1].role, Role::User);
        assert_eq!(window[2].role, Role::Assistant);
    }

    #[test]
    fn build_is_deterministic() {
        let h = history(11);
        let ctx = ContextWindow::new("sys", 8);
        assert_eq!(ctx.build(&h), ctx.build(&h));
    }

    #[test]
    fn content_is_verbatim() {
        let h = vec![Message::new(Role::User, "  spaced  \n")];
        let window = build_window(&h, "sys", 8);
        assert_eq!(window[1].content, "  spaced  \n");
    }

    #[test]
    fn default_uses_eight() {
        assert_eq!(ContextWindow::default().size(), DEFAULT_WINDOW_SIZE);
        assert_eq!(DEFAULT_WINDOW_SIZE, 8);
    }
}
