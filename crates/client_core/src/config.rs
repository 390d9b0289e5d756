use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use anyhow::Context;
use tracing::warn;

use crate::{
    view::{ContentPolicy, RenderOptions, DEFAULT_TYPING_LABEL},
    RenderOrdering,
};

pub const DEFAULT_SETTINGS_FILE: &str = "chat.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: String,
    pub content_policy: ContentPolicy,
    pub render_ordering: RenderOrdering,
    /// Unset means a hung request is never abandoned.
    pub request_timeout: Option<Duration>,
    pub typing_label: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            content_policy: ContentPolicy::Trusted,
            render_ordering: RenderOrdering::LastArrival,
            request_timeout: None,
            typing_label: DEFAULT_TYPING_LABEL.into(),
        }
    }
}

impl ClientSettings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            content_policy: self.content_policy,
            typing_label: self.typing_label.clone(),
        }
    }
}

/// Defaults, then `chat.toml` (or `path`) if present, then environment.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read client settings '{}'", path.display()))?;
        apply_file_overrides(&mut settings, &raw)
            .with_context(|| format!("invalid client settings '{}'", path.display()))?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: HashMap<String, toml::Value> = toml::from_str(raw)?;

    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("typing_label").and_then(toml::Value::as_str) {
        settings.typing_label = v.to_string();
    }
    if let Some(v) = file_cfg.get("content_policy").and_then(toml::Value::as_str) {
        settings.content_policy = ContentPolicy::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = file_cfg.get("render_ordering").and_then(toml::Value::as_str) {
        settings.render_ordering = RenderOrdering::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        settings.request_timeout = timeout_from_secs(v);
    }

    Ok(())
}

pub(crate) fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("CHAT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__CONTENT_POLICY") {
        match v.parse() {
            Ok(policy) => settings.content_policy = policy,
            Err(error) => warn!(%error, "ignoring APP__CONTENT_POLICY"),
        }
    }

    if let Some(v) = lookup("APP__RENDER_ORDERING") {
        match v.parse() {
            Ok(ordering) => settings.render_ordering = ordering,
            Err(error) => warn!(%error, "ignoring APP__RENDER_ORDERING"),
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.request_timeout = timeout_from_secs(parsed);
        }
    }

    if let Some(v) = lookup("APP__TYPING_LABEL") {
        settings.typing_label = v;
    }
}

// Zero or negative disables the timeout.
fn timeout_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
