use std::sync::Arc;

use client_core::view::escape_html;
use shared::{
    domain::Mode,
    error::ApiException,
    protocol::{ChatSnapshot, ConversationState, Message},
};
use tracing::debug;

use crate::{
    companion::{ReplyContext, Responder},
    config::Settings,
};

/// The single in-memory conversation the server hosts.
pub struct Session {
    messages: Vec<Message>,
    mode: Mode,
    state: ConversationState,
    turns_in_mode: u32,
    user_name: String,
    companion_name: String,
    progress_step: f64,
    max_message_chars: usize,
    report_typing: bool,
    responder: Arc<dyn Responder>,
}

impl Session {
    pub fn new(settings: &Settings, responder: Arc<dyn Responder>) -> Self {
        Self {
            messages: Vec::new(),
            mode: settings.default_mode(),
            state: ConversationState::new(false, settings.initial_progress),
            turns_in_mode: 0,
            user_name: settings.user_name.clone(),
            companion_name: settings.companion_name.clone(),
            progress_step: settings.progress_step,
            max_message_chars: settings.max_message_chars,
            report_typing: settings.report_typing,
            responder,
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot::new(self.messages.clone(), self.state)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Opens an empty transcript with a greeting for the current mode.
    pub fn greet_if_empty(&mut self) {
        if !self.messages.is_empty() {
            return;
        }
        let greeting = self.responder.greeting(&self.mode, &self.reply_context());
        self.push_companion(&greeting);
    }

    /// Blank input leaves the transcript as it is.
    pub fn send(&mut self, text: Option<&str>) -> Result<ChatSnapshot, ApiException> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(self.snapshot());
        };
        if text.chars().count() > self.max_message_chars {
            return Err(ApiException::too_large(format!(
                "message exceeds {} characters",
                self.max_message_chars
            )));
        }

        self.push_user(text);
        if self.mode.is(Mode::FITNESS) {
            self.state.progress = (self.state.progress + self.progress_step).clamp(0.0, 1.0);
        }
        let reply = self
            .responder
            .reply(&self.mode, text, &self.reply_context());
        self.push_companion(&reply);
        self.turns_in_mode += 1;
        // Leaves the indicator up after a reply, as if a follow-up were coming.
        self.state.typing = self.report_typing;

        debug!(
            mode = %self.mode,
            messages = self.messages.len(),
            progress = self.state.progress,
            "handled chat turn"
        );
        Ok(self.snapshot())
    }

    pub fn toggle_mode(&mut self, mode: Option<Mode>) -> Result<ChatSnapshot, ApiException> {
        let Some(mode) = mode.filter(|m| !m.as_str().trim().is_empty()) else {
            return Err(ApiException::validation("mode must not be empty"));
        };

        self.mode = Mode::new(mode.as_str().trim().to_ascii_lowercase());
        self.turns_in_mode = 0;
        let greeting = self.responder.greeting(&self.mode, &self.reply_context());
        self.push_companion(&greeting);
        Ok(self.snapshot())
    }

    fn reply_context(&self) -> ReplyContext<'_> {
        ReplyContext {
            user_name: &self.user_name,
            turns_in_mode: self.turns_in_mode,
            progress: self.state.progress,
        }
    }

    fn push_user(&mut self, text: &str) {
        let content = format!("{}: {}", self.user_name, text);
        self.messages.push(Message::user(escape_html(&content)));
    }

    fn push_companion(&mut self, text: &str) {
        let content = format!("{}: {}", self.companion_name, text);
        self.messages.push(Message::companion(escape_html(&content)));
        self.state.typing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::ScriptedCompanion;

    fn session() -> Session {
        Session::new(&Settings::default(), Arc::new(ScriptedCompanion))
    }

    #[test]
    fn blank_send_returns_transcript_unchanged() {
        let mut session = session();
        session.greet_if_empty();
        let before = session.snapshot();

        assert_eq!(session.send(None).expect("send"), before);
        assert_eq!(session.send(Some("   ")).expect("send"), before);
    }

    #[test]
    fn send_appends_user_then_companion_and_moves_fitness_progress() {
        let mut session = session();
        let snapshot = session.send(Some("ran 10 laps")).expect("send");

        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0], Message::user("Joseph: ran 10 laps"));
        assert_eq!(snapshot.messages[1].role, "monika");
        assert!(snapshot.messages[1].content.starts_with("Monika: "));
        assert!((snapshot.state.progress - 0.55).abs() < 1e-9);
        assert!(!snapshot.state.typing);
    }

    #[test]
    fn typing_is_reported_after_replies_only_when_enabled() {
        let settings = Settings {
            report_typing: true,
            ..Settings::default()
        };
        let mut session = Session::new(&settings, Arc::new(ScriptedCompanion));

        let snapshot = session.send(Some("one more set")).expect("send");
        assert!(snapshot.state.typing);

        let snapshot = session.toggle_mode(Some(Mode::new("chat"))).expect("toggle");
        assert!(!snapshot.state.typing);
    }

    #[test]
    fn user_markup_is_escaped_before_it_reaches_clients() {
        let mut session = session();
        let snapshot = session.send(Some("<img src=x onerror=alert(1)>")).expect("send");
        assert!(snapshot.messages[0].content.contains("&lt;img"));
        assert!(!snapshot.messages[0].content.contains("<img"));
    }

    #[test]
    fn toggle_mode_switches_and_greets() {
        let mut session = session();
        let snapshot = session.toggle_mode(Some(Mode::new(" Story "))).expect("toggle");
        assert!(session.mode().is("story"));
        assert_eq!(snapshot.messages.len(), 1);
        assert!(snapshot.messages[0].content.contains("Story time"));

        // Progress only moves in fitness mode.
        let snapshot = session.send(Some("a dragon appears")).expect("send");
        assert!((snapshot.state.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn toggle_mode_requires_a_value() {
        let mut session = session();
        assert!(session.toggle_mode(None).is_err());
        assert!(session.toggle_mode(Some(Mode::new("  "))).is_err());
        assert!(session.mode().is("fitness"));
    }

    #[test]
    fn oversized_message_is_rejected_without_changes() {
        let mut session = session();
        let err = session
            .send(Some("x".repeat(2001).as_str()))
            .expect_err("too long");
        assert_eq!(err.code, shared::error::ErrorCode::PayloadTooLarge);
        assert!(session.snapshot().messages.is_empty());
    }
}
