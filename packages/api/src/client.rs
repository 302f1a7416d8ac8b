//! # Remote API client
//!
//! [`RemoteApi`] is the single capability the widget layer needs from the
//! network: send one [`ApiRequest`], get back either the parsed
//! [`ServerResponse`] or a [`TransportError`]. The success/failure split is the
//! `Result` itself; there are no retries and no timeouts, so a server that never
//! answers leaves the returned future pending forever.
//!
//! [`HttpClient`] is the production implementation on top of `reqwest`, which
//! runs both natively and in the browser. [`crate::MemoryBackend`] implements
//! the same trait in-process for tests and demos.

use std::future::Future;

use reqwest::Client;

use crate::error::TransportError;
use crate::models::ServerResponse;
use crate::request::ApiRequest;

/// Async request/response capability used by widget controllers.
pub trait RemoteApi {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ServerResponse, TransportError>>;
}

/// JSON-over-HTTP client: form-encoded `POST` in, JSON body out.
#[derive(Clone, Debug, Default)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured `reqwest` client (cookies, default headers, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl RemoteApi for HttpClient {
    async fn send(&self, request: &ApiRequest) -> Result<ServerResponse, TransportError> {
        let url = request.url();
        tracing::debug!(verb = %request.verb, %url, "posting widget request");

        let response = self
            .client
            .post(&url)
            .form(&request.params)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(verb = %request.verb, %url, status = status.as_u16(), "widget request rejected");
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        if !request.verb.expects_body() {
            return Ok(ServerResponse::default());
        }

        response
            .json::<ServerResponse>()
            .await
            .map_err(|e| TransportError::Decode {
                url,
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Params;

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = HttpClient::new();
        // Port 9 (discard) on loopback is closed on any sane test machine.
        let request = ApiRequest::delete("http://127.0.0.1:9/api", 1, &Params::new());
        let result = client.send(&request).await;
        assert!(matches!(result, Err(TransportError::Request { .. })));
    }
}
