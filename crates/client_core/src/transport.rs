//! HTTP plumbing between the controller and the companion server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::{
    domain::Mode,
    protocol::{ChatSnapshot, SendForm, ToggleModeForm, SEND_ROUTE, TOGGLE_MODE_ROUTE},
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<ChatSnapshot, ClientError>;
    async fn toggle_mode(&self, mode: &Mode) -> Result<ChatSnapshot, ClientError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let base_url = parse_base_url(server_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn endpoint(&self, route: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{route}", self.base_url),
                source,
            })
    }

    async fn post_form<F: Serialize + ?Sized + Sync>(
        &self,
        route: &str,
        form: &F,
    ) -> Result<ChatSnapshot, ClientError> {
        let url = self.endpoint(route)?;
        debug!(%url, "posting chat form");
        let res = self.http.post(url).form(form).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| ClientError::Decode { body, source })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_message(&self, text: &str) -> Result<ChatSnapshot, ClientError> {
        self.post_form(SEND_ROUTE, &SendForm::new(text)).await
    }

    async fn toggle_mode(&self, mode: &Mode) -> Result<ChatSnapshot, ClientError> {
        self.post_form(TOGGLE_MODE_ROUTE, &ToggleModeForm::new(mode.clone()))
            .await
    }
}

// Routes resolve relative to the base, so a mounted prefix like
// `http://host/companion` needs its trailing slash.
fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_against_root_and_prefixed_bases() {
        let root = HttpTransport::new("http://127.0.0.1:5000", None).expect("transport");
        assert_eq!(
            root.endpoint(SEND_ROUTE).expect("url").as_str(),
            "http://127.0.0.1:5000/send"
        );

        let prefixed = HttpTransport::new("http://example.test/companion", None).expect("transport");
        assert_eq!(
            prefixed.endpoint(TOGGLE_MODE_ROUTE).expect("url").as_str(),
            "http://example.test/companion/toggle_mode"
        );
    }

    #[test]
    fn rejects_unparseable_server_url() {
        let err = HttpTransport::new("not a url", None)
            .err()
            .expect("must fail");
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}
