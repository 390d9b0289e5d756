use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use shared::{domain::Mode, protocol::ChatSnapshot};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, error, info};

pub mod config;
pub mod error;
pub mod surface;
pub mod transport;
pub mod view;

pub use config::{load_settings, ClientSettings};
pub use error::ClientError;
pub use surface::{ChatSurface, MemorySurface};
pub use transport::{ChatTransport, HttpTransport};
pub use view::{render, ChatView, ContentPolicy, RenderOptions};

/// What to do with a response that arrives after a newer request's response
/// has already been rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOrdering {
    /// Whatever arrives last is shown.
    #[default]
    LastArrival,
    /// Responses to requests older than the one on screen are dropped.
    LatestIssued,
}

impl FromStr for RenderOrdering {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last_arrival" | "last-arrival" => Ok(RenderOrdering::LastArrival),
            "latest_issued" | "latest-issued" => Ok(RenderOrdering::LatestIssued),
            other => Err(format!("unknown render ordering '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Nothing to send; no request was made.
    Skipped,
    Rendered,
    /// The response was superseded and not rendered.
    Stale,
    /// The request failed; the surface was left untouched.
    Failed,
}

struct SurfaceSlot<S> {
    surface: S,
    rendered_generation: u64,
}

pub struct ChatController<T: ChatTransport, S: ChatSurface> {
    transport: T,
    options: RenderOptions,
    ordering: RenderOrdering,
    issued_generation: AtomicU64,
    slot: Mutex<SurfaceSlot<S>>,
}

impl<S: ChatSurface> ChatController<HttpTransport, S> {
    pub fn from_settings(settings: &ClientSettings, surface: S) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&settings.server_url, settings.request_timeout)?;
        Ok(Self::new(transport, surface)
            .with_render_options(settings.render_options())
            .with_ordering(settings.render_ordering))
    }
}

impl<T: ChatTransport, S: ChatSurface> ChatController<T, S> {
    pub fn new(transport: T, surface: S) -> Self {
        Self {
            transport,
            options: RenderOptions::default(),
            ordering: RenderOrdering::default(),
            issued_generation: AtomicU64::new(0),
            slot: Mutex::new(SurfaceSlot {
                surface,
                rendered_generation: 0,
            }),
        }
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_ordering(mut self, ordering: RenderOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub async fn surface(&self) -> MappedMutexGuard<'_, S> {
        MutexGuard::map(self.slot.lock().await, |slot| &mut slot.surface)
    }

    /// Page-ready hook: shows the bottom of whatever transcript is already
    /// on the surface.
    pub async fn on_ready(&self) {
        self.slot.lock().await.surface.scroll_to_bottom();
    }

    /// Posts the surface's input text to `/send`. Blank input is dropped
    /// without a request. The input is cleared only after a successful
    /// render.
    pub async fn submit_message(&self) -> ActionOutcome {
        let text = {
            let slot = self.slot.lock().await;
            slot.surface.input_value().trim().to_string()
        };
        if text.is_empty() {
            debug!("ignoring blank chat submission");
            return ActionOutcome::Skipped;
        }

        let generation = self.next_generation();
        info!(generation, chars = text.chars().count(), "sending chat message");
        match self.transport.send_message(&text).await {
            Ok(snapshot) => self.apply(generation, snapshot, true).await,
            Err(err) => log_failure("send", generation, &err),
        }
    }

    pub async fn toggle_mode(&self, mode: &Mode) -> ActionOutcome {
        let generation = self.next_generation();
        info!(generation, %mode, "toggling chat mode");
        match self.transport.toggle_mode(mode).await {
            Ok(snapshot) => self.apply(generation, snapshot, false).await,
            Err(err) => log_failure("toggle_mode", generation, &err),
        }
    }

    /// Rebuilds the surface from `snapshot` regardless of request ordering.
    pub async fn render_snapshot(&self, snapshot: &ChatSnapshot) {
        let mut slot = self.slot.lock().await;
        self.paint(&mut slot.surface, snapshot);
    }

    fn next_generation(&self) -> u64 {
        self.issued_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply(&self, generation: u64, snapshot: ChatSnapshot, clear_input: bool) -> ActionOutcome {
        let mut slot = self.slot.lock().await;
        if self.ordering == RenderOrdering::LatestIssued && generation < slot.rendered_generation {
            debug!(
                generation,
                rendered = slot.rendered_generation,
                "dropping superseded chat response"
            );
            return ActionOutcome::Stale;
        }

        self.paint(&mut slot.surface, &snapshot);
        if clear_input {
            slot.surface.clear_input();
        }
        slot.rendered_generation = slot.rendered_generation.max(generation);
        debug!(
            generation,
            messages = snapshot.messages.len(),
            typing = snapshot.state.typing,
            progress = snapshot.state.progress,
            "rendered chat snapshot"
        );
        ActionOutcome::Rendered
    }

    fn paint(&self, surface: &mut S, snapshot: &ChatSnapshot) {
        let view = render(&snapshot.messages, &snapshot.state, &self.options);
        surface.replace_messages(view);
        surface.scroll_to_bottom();
    }
}

fn log_failure(action: &str, generation: u64, err: &ClientError) -> ActionOutcome {
    error!(
        action,
        generation,
        status = err.status(),
        response = err.response_text(),
        error = %err,
        "chat request failed"
    );
    ActionOutcome::Failed
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
