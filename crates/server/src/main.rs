use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::FormRejection, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::map_response,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use shared::{
    error::{ApiError, ApiException, ErrorCode},
    protocol::{ChatSnapshot, SendForm, ToggleModeForm, SEND_ROUTE, TOGGLE_MODE_ROUTE},
};
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod companion;
mod config;
mod page;
mod session;

use companion::ScriptedCompanion;
use config::{load_settings, Settings};
use session::Session;

const PAGE_TITLE: &str = "Companion";

struct AppState {
    session: Mutex<Session>,
}

type ApiResult = Result<Json<ChatSnapshot>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings()?;
    let app = build_router(&settings);

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, mode = %settings.default_mode, "companion server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(settings: &Settings) -> Router {
    let state = AppState {
        session: Mutex::new(Session::new(settings, Arc::new(ScriptedCompanion))),
    };
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(SEND_ROUTE, post(send_chat))
        .route(TOGGLE_MODE_ROUTE, post(toggle_mode))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(map_response(payload_too_large_as_json))
        .with_state(Arc::new(state))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut session = state.session.lock().await;
    session.greet_if_empty();
    Html(page::build_index_html(
        PAGE_TITLE,
        session.mode(),
        &session.snapshot(),
    ))
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SendForm>, FormRejection>,
) -> ApiResult {
    let Form(form) = form.map_err(|e| reject_form("send", e))?;
    let snapshot = state
        .session
        .lock()
        .await
        .send(form.message.as_deref())
        .map_err(|e| reject("send", e))?;
    Ok(Json(snapshot))
}

async fn toggle_mode(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ToggleModeForm>, FormRejection>,
) -> ApiResult {
    let Form(form) = form.map_err(|e| reject_form("toggle_mode", e))?;
    let mut session = state.session.lock().await;
    let snapshot = session
        .toggle_mode(form.mode)
        .map_err(|e| reject("toggle_mode", e))?;
    info!(mode = %session.mode(), "mode toggled");
    Ok(Json(snapshot))
}

fn reject(action: &str, err: ApiException) -> (StatusCode, Json<ApiError>) {
    warn!(action, error = %err, "rejected chat request");
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiError::from(err)))
}

fn reject_form(action: &str, rejection: FormRejection) -> (StatusCode, Json<ApiError>) {
    let code = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ErrorCode::UnsupportedMediaType,
        _ => ErrorCode::Validation,
    };
    reject(action, ApiException::new(code, rejection.body_text()))
}

// The limit layer answers a declared oversized Content-Length itself, in
// plain text, before any handler runs.
async fn payload_too_large_as_json(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }
    warn!("request body over the configured limit");
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ApiError::new(
            ErrorCode::PayloadTooLarge,
            "request body exceeds the configured limit",
        )),
    )
        .into_response()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
