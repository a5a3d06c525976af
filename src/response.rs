//! Response model handed back to the requester.

use crate::entry::CacheEntry;

/// Body of the synthesized last-resort response.
pub const UNAVAILABLE_BODY: &str = "Service Unavailable: the resource could not be fetched and no cached copy exists.";

/// An HTTP response, either from the origin, from the store, or synthesized.
///
/// Responses are plain owned values: handing one to a caller and later
/// refreshing the store never mutates what the caller already holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// The 503 plain-text response used when nothing else can answer.
    pub fn unavailable() -> Self {
        Self::new(503, UNAVAILABLE_BODY)
            .with_header("content-type", "text/plain; charset=utf-8")
    }

    /// Rebuild the response stored in a cache entry.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Response {
            status: entry.status,
            headers: entry.headers.clone(),
            body: entry.body.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
