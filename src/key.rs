//! Request identity and store key management.

use crate::request::{Method, Request};
use std::fmt;
use url::Url;

/// Separator between the generation name and the request key in a store key.
///
/// Generation names are validated to never contain it.
pub const GENERATION_SEPARATOR: char = '|';

/// Identity of a request in the store: method plus absolute URL.
///
/// The query string is significant, so `GET /calc?x=1` and `GET /calc?x=2`
/// are distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        RequestKey(format!("{} {}", method, url))
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method(), request.url())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for backend keys scoped to a generation.
pub struct StoreKeyBuilder;

impl StoreKeyBuilder {
    /// Build the backend key: `"{generation}|{METHOD} {url}"`.
    pub fn build(generation: &str, key: &RequestKey) -> String {
        format!("{}{}{}", generation, GENERATION_SEPARATOR, key)
    }

    /// Prefix shared by every backend key of a generation.
    pub fn generation_prefix(generation: &str) -> String {
        format!("{}{}", generation, GENERATION_SEPARATOR)
    }

    /// Split a backend key into generation name and request key.
    pub fn parse(store_key: &str) -> Option<(&str, RequestKey)> {
        store_key
            .split_once(GENERATION_SEPARATOR)
            .map(|(generation, key)| (generation, RequestKey(key.to_string())))
    }
}
