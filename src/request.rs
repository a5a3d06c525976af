//! Intercepted request model.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP request method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    /// Any other token, stored upper-cased.
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_uppercase();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(Error::InvalidRequest(format!("invalid method: {:?}", s)));
        }
        Ok(match token.as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Other(token),
        })
    }
}

/// How the request was initiated by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level navigation to a document.
    Navigate,
    /// Subresource or programmatic fetch.
    #[default]
    Subresource,
}

/// A request delivered to the relay for interception.
///
/// The URL is always absolute. Fragments are dropped at construction since
/// they never reach the origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    mode: RequestMode,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Build a request from a method, an absolute URL and a mode.
    pub fn new(method: Method, url: &str, mode: RequestMode) -> Result<Self> {
        let mut url = Url::parse(url)?;
        url.set_fragment(None);
        Ok(Request {
            method,
            url,
            mode,
            headers: Vec::new(),
        })
    }

    /// Subresource GET request.
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::Get, url, RequestMode::Subresource)
    }

    /// Top-level navigation GET request.
    pub fn navigate(url: &str) -> Result<Self> {
        Self::new(Method::Get, url, RequestMode::Navigate)
    }

    /// Build a request from an already parsed URL.
    pub fn from_url(method: Method, mut url: Url, mode: RequestMode) -> Self {
        url.set_fragment(None);
        Request {
            method,
            url,
            mode,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// True when the URL carries a non-empty query string.
    pub fn has_query(&self) -> bool {
        self.url.query().is_some_and(|q| !q.is_empty())
    }

    /// True when the request targets the same origin (scheme, host, port) as `scope`.
    pub fn is_same_origin(&self, scope: &Url) -> bool {
        self.url.origin() == scope.origin()
    }
}
