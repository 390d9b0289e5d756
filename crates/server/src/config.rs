use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::Mode;

pub const DEFAULT_SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub user_name: String,
    pub companion_name: String,
    pub default_mode: String,
    pub initial_progress: f64,
    pub progress_step: f64,
    pub max_body_bytes: usize,
    pub max_message_chars: usize,
    /// Report `typing = true` after each `/send` reply.
    pub report_typing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            user_name: "Joseph".into(),
            companion_name: "Monika".into(),
            default_mode: Mode::FITNESS.into(),
            initial_progress: 0.5,
            progress_step: 0.05,
            max_body_bytes: 16 * 1024,
            max_message_chars: 2000,
            report_typing: false,
        }
    }
}

impl Settings {
    pub fn default_mode(&self) -> Mode {
        Mode::new(self.default_mode.clone())
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = Path::new(DEFAULT_SETTINGS_FILE);
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        apply_file_overrides(&mut settings, &raw)
            .with_context(|| format!("invalid settings in '{}'", path.display()))?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.initial_progress = settings.initial_progress.clamp(0.0, 1.0);
    Ok(settings)
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(raw)?;

    let text = |key: &str| file_cfg.get(key).and_then(toml::Value::as_str).map(str::to_string);
    let float = |key: &str| {
        file_cfg.get(key).and_then(|v| {
            v.as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
        })
    };
    let count = |key: &str| {
        file_cfg
            .get(key)
            .and_then(toml::Value::as_integer)
            .and_then(|v| usize::try_from(v).ok())
    };

    if let Some(v) = text("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = text("user_name") {
        settings.user_name = v;
    }
    if let Some(v) = text("companion_name") {
        settings.companion_name = v;
    }
    if let Some(v) = text("default_mode") {
        settings.default_mode = v;
    }
    if let Some(v) = float("initial_progress") {
        settings.initial_progress = v;
    }
    if let Some(v) = float("progress_step") {
        settings.progress_step = v;
    }
    if let Some(v) = count("max_body_bytes") {
        settings.max_body_bytes = v;
    }
    if let Some(v) = count("max_message_chars") {
        settings.max_message_chars = v;
    }
    if let Some(v) = file_cfg.get("report_typing").and_then(toml::Value::as_bool) {
        settings.report_typing = v;
    }

    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("APP__USER_NAME") {
        settings.user_name = v;
    }
    if let Some(v) = lookup("APP__COMPANION_NAME") {
        settings.companion_name = v;
    }
    if let Some(v) = lookup("APP__DEFAULT_MODE") {
        settings.default_mode = v;
    }

    if let Some(v) = lookup("APP__INITIAL_PROGRESS") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.initial_progress = parsed;
        }
    }
    if let Some(v) = lookup("APP__PROGRESS_STEP") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.progress_step = parsed;
        }
    }
    if let Some(v) = lookup("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }
    if let Some(v) = lookup("APP__MAX_MESSAGE_CHARS") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_message_chars = parsed;
        }
    }
    if let Some(v) = lookup("APP__REPORT_TYPING") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.report_typing = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
