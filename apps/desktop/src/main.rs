use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ActionOutcome, ChatController, ChatSurface, ContentPolicy, HttpTransport,
    MemorySurface, RenderOrdering,
};
use shared::domain::Mode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Talk to a companion chat server")]
struct Args {
    /// Overrides `server_url` from settings and environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Client settings file (defaults to ./chat.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the rendered container as HTML instead of text.
    #[arg(long)]
    html: bool,
    /// Escape message markup instead of trusting it.
    #[arg(long)]
    escape: bool,
    /// Drop responses that arrive after a newer one was shown.
    #[arg(long)]
    latest_only: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and print the conversation.
    Send { text: Vec<String> },
    /// Switch the conversation mode and print the conversation.
    Mode { mode: String },
    /// Read messages from stdin; `/mode <name>` switches mode, `/quit` exits.
    Interactive,
}

#[derive(Debug, PartialEq, Eq)]
enum InputLine {
    Message(String),
    ToggleMode(String),
    Quit,
}

fn parse_input_line(line: &str) -> InputLine {
    let trimmed = line.trim();
    if trimmed == "/quit" || trimmed == "/exit" {
        return InputLine::Quit;
    }
    if let Some(mode) = trimmed.strip_prefix("/mode ") {
        return InputLine::ToggleMode(mode.trim().to_string());
    }
    InputLine::Message(line.to_string())
}

type Controller = ChatController<HttpTransport, MemorySurface>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("loading client settings")?;
    if let Some(url) = args.server_url.clone() {
        settings.server_url = url;
    }
    if args.escape {
        settings.content_policy = ContentPolicy::Escaped;
    }
    if args.latest_only {
        settings.render_ordering = RenderOrdering::LatestIssued;
    }
    info!(server_url = %settings.server_url, "starting chat client");

    let controller = ChatController::from_settings(&settings, MemorySurface::new())
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    controller.on_ready().await;

    match &args.command {
        Command::Send { text } => {
            controller.surface().await.set_input(text.join(" "));
            let outcome = controller.submit_message().await;
            finish_one_shot(&controller, outcome, args.html).await
        }
        Command::Mode { mode } => {
            let outcome = controller.toggle_mode(&Mode::new(mode.clone())).await;
            finish_one_shot(&controller, outcome, args.html).await
        }
        Command::Interactive => run_interactive(&controller, args.html).await,
    }
}

async fn finish_one_shot(controller: &Controller, outcome: ActionOutcome, html: bool) -> Result<()> {
    match outcome {
        ActionOutcome::Rendered => {
            print_surface(controller, html).await;
            Ok(())
        }
        ActionOutcome::Skipped => bail!("nothing to send"),
        ActionOutcome::Stale | ActionOutcome::Failed => bail!("chat request failed"),
    }
}

async fn run_interactive(controller: &Controller, html: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = match parse_input_line(&line) {
            InputLine::Quit => break,
            InputLine::ToggleMode(mode) => controller.toggle_mode(&Mode::new(mode)).await,
            InputLine::Message(text) => {
                controller.surface().await.set_input(text);
                controller.submit_message().await
            }
        };
        if outcome == ActionOutcome::Rendered {
            print_surface(controller, html).await;
        }
    }
    Ok(())
}

async fn print_surface(controller: &Controller, html: bool) {
    let surface = controller.surface().await;
    let view = surface.view();
    if html {
        println!("{}", view.to_html());
    } else {
        println!("{}", view.to_plain_text());
    }
    if !surface.input_value().is_empty() {
        println!("(draft: {})", surface.input_value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_are_recognized() {
        assert_eq!(parse_input_line("/quit"), InputLine::Quit);
        assert_eq!(
            parse_input_line("/mode  story "),
            InputLine::ToggleMode("story".to_string())
        );
        assert_eq!(
            parse_input_line("hello there"),
            InputLine::Message("hello there".to_string())
        );
    }

    #[test]
    fn cli_parses_global_flags_with_subcommand() {
        let args = Args::try_parse_from([
            "chat",
            "--server-url",
            "http://127.0.0.1:5000",
            "--escape",
            "send",
            "hi",
            "there",
        ])
        .expect("args");
        assert!(args.escape);
        assert!(matches!(args.command, Command::Send { ref text } if text.join(" ") == "hi there"));
    }
}
