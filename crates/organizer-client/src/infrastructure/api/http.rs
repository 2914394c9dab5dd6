//! HTTP implementation of the session API over reqwest.
//!
//! [`Transport`] performs one authenticated call and classifies the outcome;
//! [`HttpSessionApi`] composes it with the validators in `organizer-core` to
//! implement [`SessionApi`].
//!
//! Every request carries two fixed headers:
//!
//! - `Accept: application/json`
//! - `Authorization: bearer <token>` (the bridge expects the lowercase
//!   scheme), sourced from the process-wide credential loaded at startup.
//!
//! Redirects are followed (reqwest's default policy).  A request timeout is
//! imposed at construction; expiry surfaces as [`ApiError::Http`], i.e. a
//! transport failure.  No retries happen here — retry policy belongs to the
//! connection lifecycle.

use std::time::Duration;

use async_trait::async_trait;
use organizer_core::{
    validate_connection_state_response, validate_send_image_response, Base64Image, ConnectionId,
    ConnectionState, SchemaViolation, SendImageDirective,
};
use reqwest::{header, Client, RequestBuilder, Response};
use tracing::debug;

use super::{ApiError, ResponseSnapshot, SessionApi};

/// Body placeholder recorded when a failing response's body cannot be read.
const BODY_NOT_PROVIDED: &str = "Not provided";

// ── Transport ─────────────────────────────────────────────────────────────────

/// One authenticated HTTP call: build, execute, classify.
pub struct Transport {
    http: Client,
    base_url: String,
    /// Pre-rendered `bearer <token>` header value.
    bearer: String,
}

impl Transport {
    /// Builds a transport for `base_url` with the given static credential and
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying builder error if the TLS backend cannot be
    /// initialised.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: format!("bearer {}", auth_token.as_ref()),
        })
    }

    /// Joins `path` (which must start with `/`) onto the base URL.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Snapshots status, reason, URL, and headers before the body is consumed.
    fn snapshot(response: &Response) -> ResponseSnapshot {
        ResponseSnapshot {
            status: response.status().as_u16(),
            status_text: response
                .status()
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            url: response.url().to_string(),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        value.to_str().unwrap_or("<binary>").to_string(),
                    )
                })
                .collect(),
        }
    }

    /// Attaches the credential, executes the request, and classifies non-2xx
    /// outcomes as transport failures.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .header(header::AUTHORIZATION, self.bearer.clone())
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let snapshot = Self::snapshot(&response);
        // Best-effort body capture; an unreadable body is recorded, not fatal.
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| BODY_NOT_PROVIDED.to_string());
        debug!(
            "request to {} failed with status {}",
            snapshot.url, snapshot.status
        );
        Err(ApiError::Transport {
            response: snapshot,
            body,
        })
    }

    /// Reads a 2xx response body as JSON.  A body that is not JSON at all is
    /// a schema failure with the violation at the root.
    async fn read_json(
        &self,
        response: Response,
    ) -> Result<(ResponseSnapshot, serde_json::Value), ApiError> {
        let snapshot = Self::snapshot(&response);
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(json) => Ok((snapshot, json)),
            Err(e) => Err(ApiError::Schema {
                response: snapshot,
                json: serde_json::Value::Null,
                violation: SchemaViolation::at("", format!("response body is not valid JSON: {e}")),
            }),
        }
    }
}

// ── HTTP session API ──────────────────────────────────────────────────────────

/// [`SessionApi`] implemented over [`Transport`].
pub struct HttpSessionApi {
    transport: Transport,
}

impl HttpSessionApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn join_connection(&self, id: &ConnectionId) -> Result<(), ApiError> {
        let url = self.transport.url(&format!("/join_connection/{id}"));
        // Bodyless endpoint: a 2xx response is success as-is.
        self.transport
            .execute(self.transport.http.post(url))
            .await
            .map(drop)
    }

    async fn connection_state(&self, id: &ConnectionId) -> Result<ConnectionState, ApiError> {
        let url = self.transport.url(&format!("/connection_state/{id}"));
        let response = self.transport.execute(self.transport.http.get(url)).await?;
        let (snapshot, json) = self.transport.read_json(response).await?;
        validate_connection_state_response(&json).map_err(|violation| ApiError::Schema {
            response: snapshot,
            json,
            violation,
        })
    }

    async fn end_connection(&self, id: &ConnectionId) -> Result<(), ApiError> {
        let url = self.transport.url(&format!("/end_connection/{id}"));
        self.transport
            .execute(self.transport.http.post(url))
            .await
            .map(drop)
    }

    async fn send_image(
        &self,
        id: &ConnectionId,
        state: ConnectionState,
        image_base64: &str,
    ) -> Result<SendImageDirective, ApiError> {
        // Validate before any request is constructed; an invalid payload must
        // never reach the network.
        let image = Base64Image::parse(image_base64).map_err(ApiError::InvalidImage)?;

        let url = self.transport.url(&format!("/image_queue/{id}"));
        let form = reqwest::multipart::Form::new().text("image_base64", image.into_inner());
        let request = self
            .transport
            .http
            .post(url)
            .query(&[("state", state.as_str())])
            .multipart(form);

        let response = self.transport.execute(request).await?;
        let (snapshot, json) = self.transport.read_json(response).await?;
        validate_send_image_response(&json).map_err(|violation| ApiError::Schema {
            response: snapshot,
            json,
            violation,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_transport(base_url: &str) -> Transport {
        Transport::new(base_url, "secret-token", Duration::from_secs(5)).expect("build transport")
    }

    #[test]
    fn test_url_joins_path_onto_base() {
        let transport = make_transport("http://localhost:8000");
        assert_eq!(
            transport.url("/join_connection/abc"),
            "http://localhost:8000/join_connection/abc"
        );
    }

    #[test]
    fn test_url_tolerates_trailing_slash_in_base() {
        let transport = make_transport("http://localhost:8000/");
        assert_eq!(
            transport.url("/connection_state/abc"),
            "http://localhost:8000/connection_state/abc"
        );
    }

    #[test]
    fn test_bearer_header_value_uses_lowercase_scheme() {
        // The bridge matches the scheme case-sensitively.
        let transport = make_transport("http://localhost:8000");
        assert_eq!(transport.bearer, "bearer secret-token");
    }
}
