//! Pure rendering of a chat snapshot into a node tree.
//!
//! The tree mirrors the markup the index page uses, so the same nodes can be
//! serialized to HTML for the browser or flattened to text for a terminal.

use std::{fmt::Write as _, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::protocol::{ConversationState, Message};

pub const MESSAGE_CLASS: &str = "chat-message";
pub const TYPING_INDICATOR_CLASS: &str = "typing-indicator";
pub const MOOD_BAR_CLASS: &str = "mood-bar";
pub const MOOD_PROGRESS_CLASS: &str = "mood-progress";
pub const DEFAULT_TYPING_LABEL: &str = "Monika is typing...";

const PLAIN_BAR_WIDTH: usize = 20;

/// How message content is inserted into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPolicy {
    /// Content is inserted as markup. The server must sanitize it.
    #[default]
    Trusted,
    Escaped,
}

impl FromStr for ContentPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trusted" | "raw" => Ok(ContentPolicy::Trusted),
            "escaped" | "escape" => Ok(ContentPolicy::Escaped),
            other => Err(format!("unknown content policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub content_policy: ContentPolicy,
    pub typing_label: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            content_policy: ContentPolicy::Trusted,
            typing_label: DEFAULT_TYPING_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub classes: Vec<String>,
    pub style: Option<String>,
    /// Inner markup, already escaped when the content policy asks for it.
    pub inner_html: String,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            style: None,
            inner_html: String::new(),
            children: Vec::new(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn class_attr(&self) -> String {
        self.classes.join(" ")
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<div class=\"{}\"", escape_html(&self.class_attr()));
        if let Some(style) = &self.style {
            let _ = write!(out, " style=\"{}\"", escape_html(style));
        }
        out.push('>');
        out.push_str(&self.inner_html);
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</div>");
    }
}

/// Everything the message container shows after one render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatView {
    pub nodes: Vec<ViewNode>,
}

impl ChatView {
    pub fn message_nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.nodes.iter().filter(|n| n.has_class(MESSAGE_CLASS))
    }

    pub fn message_count(&self) -> usize {
        self.message_nodes().count()
    }

    pub fn typing_indicator_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.has_class(TYPING_INDICATOR_CLASS))
            .count()
    }

    pub fn progress_width(&self) -> Option<&str> {
        self.nodes
            .iter()
            .filter(|n| n.has_class(MOOD_BAR_CLASS))
            .flat_map(|n| n.children.iter())
            .find(|n| n.has_class(MOOD_PROGRESS_CLASS))
            .and_then(|n| n.style.as_deref())
            .and_then(|style| style.strip_prefix("width: "))
            .map(|width| width.trim_end_matches(';'))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }

    /// Terminal rendering: one line per message, then the indicator and bar.
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if node.has_class(MESSAGE_CLASS) {
                lines.push(strip_tags(&node.inner_html));
            } else if node.has_class(TYPING_INDICATOR_CLASS) {
                lines.push(format!("... {}", strip_tags(&node.inner_html)));
            } else if node.has_class(MOOD_BAR_CLASS) {
                lines.push(plain_mood_bar(self.progress_width().unwrap_or("0%")));
            }
        }
        lines.join("\n")
    }
}

pub fn render(messages: &[Message], state: &ConversationState, options: &RenderOptions) -> ChatView {
    let mut nodes = Vec::with_capacity(messages.len() + 2);

    for message in messages {
        let mut node = ViewNode::new(vec![MESSAGE_CLASS.to_string(), message.role.clone()]);
        node.inner_html = match options.content_policy {
            ContentPolicy::Trusted => message.content.clone(),
            ContentPolicy::Escaped => escape_html(&message.content),
        };
        nodes.push(node);
    }

    if state.typing {
        let mut indicator = ViewNode::new(vec![TYPING_INDICATOR_CLASS.to_string()]);
        indicator.inner_html = escape_html(&options.typing_label);
        nodes.push(indicator);
    }

    let mut progress = ViewNode::new(vec![MOOD_PROGRESS_CLASS.to_string()]);
    progress.style = Some(format!("width: {}%;", format_progress(state)));
    let mut bar = ViewNode::new(vec![MOOD_BAR_CLASS.to_string()]);
    bar.children.push(progress);
    nodes.push(bar);

    ChatView { nodes }
}

/// Progress `0.4` renders as `40`, `0.125` as `12.5`. Float noise past four
/// decimals is dropped so `0.4 * 100` does not print as `40.00000000000001`.
pub fn format_progress(state: &ConversationState) -> String {
    let percent = state.progress_percent();
    if !percent.is_finite() {
        return "0".to_string();
    }
    let rounded = (percent * 10_000.0).round() / 10_000.0;
    // -0.0 would otherwise print as "-0".
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn plain_mood_bar(width: &str) -> String {
    let percent = width
        .trim_end_matches('%')
        .parse::<f64>()
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * PLAIN_BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {width}",
        "#".repeat(filled),
        "-".repeat(PLAIN_BAR_WIDTH - filled)
    )
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
