use crate::view::{ChatView, ViewNode};

/// Approximate row height used by `MemorySurface` to derive a scroll height.
pub const NODE_HEIGHT: u64 = 24;

/// The display target a controller renders into: an input field plus the
/// scrollable message container.
pub trait ChatSurface: Send {
    fn input_value(&self) -> String;
    fn clear_input(&mut self);
    /// Drops whatever the container shows and shows `view` instead.
    fn replace_messages(&mut self, view: ChatView);
    fn scroll_to_bottom(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    input: String,
    view: ChatView,
    scroll_top: u64,
    renders: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose container already shows a server-rendered transcript.
    pub fn with_transcript(view: ChatView) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    pub fn nodes(&self) -> &[ViewNode] {
        &self.view.nodes
    }

    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    pub fn scroll_height(&self) -> u64 {
        self.view.nodes.len() as u64 * NODE_HEIGHT
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_top == self.scroll_height()
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl ChatSurface for MemorySurface {
    fn input_value(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn replace_messages(&mut self, view: ChatView) {
        self.view = view;
        self.renders += 1;
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.scroll_height();
    }
}
