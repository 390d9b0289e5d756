use serde::{Deserialize, Serialize};

use crate::domain::{Mode, COMPANION_ROLE, USER_ROLE};

pub const SEND_ROUTE: &str = "/send";
pub const TOGGLE_MODE_ROUTE: &str = "/toggle_mode";

/// One chat turn. `content` may carry markup and is rendered as-is unless
/// the client picks the escaped content policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_ROLE, content)
    }

    pub fn companion(content: impl Into<String>) -> Self {
        Self::new(COMPANION_ROLE, content)
    }
}

/// Server-reported hints attached to every response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationState {
    #[serde(default)]
    pub typing: bool,
    #[serde(default)]
    pub progress: f64,
}

impl ConversationState {
    pub fn new(typing: bool, progress: f64) -> Self {
        Self { typing, progress }
    }

    /// Progress as a percentage, without clamping. Out-of-range values are
    /// displayed as reported.
    pub fn progress_percent(&self) -> f64 {
        self.progress * 100.0
    }
}

/// Response body of both `/send` and `/toggle_mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatSnapshot {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub state: ConversationState,
}

impl ChatSnapshot {
    pub fn new(messages: Vec<Message>, state: ConversationState) -> Self {
        Self { messages, state }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SendForm {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleModeForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

impl ToggleModeForm {
    pub fn new(mode: Mode) -> Self {
        Self { mode: Some(mode) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_without_state_uses_defaults() {
        let snapshot: ChatSnapshot =
            serde_json::from_str(r#"{"messages":[{"role":"monika","content":"hey"}]}"#)
                .expect("json");
        assert_eq!(snapshot.messages, vec![Message::companion("hey")]);
        assert!(!snapshot.state.typing);
        assert_eq!(snapshot.state.progress, 0.0);
    }

    #[test]
    fn state_fields_default_independently() {
        let state: ConversationState = serde_json::from_str(r#"{"progress":0.4}"#).expect("json");
        assert!(!state.typing);
        assert!((state.progress_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn mode_serializes_as_plain_string() {
        let form = ToggleModeForm::new(Mode::new("story"));
        assert_eq!(
            serde_json::to_value(&form).expect("json"),
            serde_json::json!({ "mode": "story" })
        );
    }
}
