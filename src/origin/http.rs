//! HTTP origin over reqwest.

use super::Origin;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Configuration for [`HttpOrigin`].
#[derive(Debug, Clone)]
pub struct HttpOriginConfig {
    /// User agent string (default: "cache-relay/<version>")
    pub user_agent: String,

    /// Overall request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for HttpOriginConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("cache-relay/{}", crate::VERSION),
            timeout: None,
            max_redirects: 5,
        }
    }
}

/// Origin that forwards requests to a real HTTP server.
#[derive(Clone)]
pub struct HttpOrigin {
    http: Client,
}

impl HttpOrigin {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the TLS backend cannot be initialised.
    pub fn new(config: HttpOriginConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

impl Origin for HttpOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let mut outgoing = self.http.request(method, request.url().clone());
        for (name, value) in request.headers() {
            outgoing = outgoing.header(name.as_str(), value.as_str());
        }

        let response = outgoing
            .send()
            .await
            .map_err(|e| Error::OriginUnreachable(format!("{}: {}", request.url(), e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::OriginUnreachable(format!("{}: {}", request.url(), e)))?;

        debug!(
            "✓ Origin {} {} -> {} in {:?}",
            request.method(),
            request.url(),
            status,
            start.elapsed()
        );

        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
