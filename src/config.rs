//! Relay configuration.
//!
//! One [`RelayConfig`] per relay instance, injected into the lifecycle
//! controller. Nothing is read from globals, so several isolated instances
//! can coexist in one process.
//!
//! ```ignore
//! use cache_relay::config::RelayConfig;
//!
//! let config = RelayConfig::default()
//!     .with_app_id("shop")
//!     .with_version("2.1.0")
//!     .with_scope("https://shop.example.com/")
//!     .with_precache(["/", "/app.js", "/offline.html"]);
//! config.validate()?;
//! ```
//!
//! Or from JSON, where every field is optional:
//!
//! ```json
//! { "app_id": "shop", "version": "2.1.0", "scope": "https://shop.example.com/" }
//! ```

use crate::error::{Error, Result};
use crate::generation::{GenerationName, Version};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Application identifier, the `<app-id>` part of generation names.
    pub app_id: String,

    /// Semantic version of this instance's resources.
    pub version: String,

    /// Origin URL the relay intercepts (scheme, host and port matter).
    pub scope: String,

    /// Absolute paths fetched into the generation at install, in order.
    pub precache: Vec<String>,

    /// Document served to navigations when offline with nothing stored.
    /// Must be listed in `precache`.
    pub offline_path: String,

    /// Path prefixes whose responses are always dynamic.
    pub api_prefixes: Vec<String>,

    /// Activate right after install even when a predecessor is active.
    pub skip_waiting: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            app_id: "app".to_string(),
            version: "0.1.0".to_string(),
            scope: "http://localhost/".to_string(),
            precache: vec!["/".to_string(), "/offline.html".to_string()],
            offline_path: "/offline.html".to_string(),
            api_prefixes: vec!["/api/".to_string()],
            skip_waiting: false,
        }
    }
}

impl RelayConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` on malformed JSON. The result is not
    /// validated; call [`RelayConfig::validate`].
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::ConfigError(format!("invalid config: {}", e)))
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn with_app_id(mut self, app_id: &str) -> Self {
        self.app_id = app_id.to_string();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Replace the precache list.
    pub fn with_precache<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offline_path(mut self, path: &str) -> Self {
        self.offline_path = path.to_string();
        self
    }

    pub fn with_api_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    /// Check the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let app_id_ok = !self.app_id.is_empty()
            && self
                .app_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !app_id_ok {
            return Err(Error::ConfigError(format!(
                "app_id '{}' must be non-empty ASCII alphanumerics, '-' or '_'",
                self.app_id
            )));
        }

        self.version.parse::<Version>()?;
        self.scope_url()?;

        for path in &self.precache {
            if !path.starts_with('/') {
                return Err(Error::ConfigError(format!(
                    "precache path '{}' must be absolute",
                    path
                )));
            }
        }
        if !self.precache.contains(&self.offline_path) {
            return Err(Error::ConfigError(format!(
                "offline_path '{}' is not listed in precache",
                self.offline_path
            )));
        }
        for prefix in &self.api_prefixes {
            if !prefix.starts_with('/') {
                return Err(Error::ConfigError(format!(
                    "api prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }
        Ok(())
    }

    /// This instance's generation, `"<app_id>-v<version>"`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the version is not valid semver.
    pub fn generation_name(&self) -> Result<GenerationName> {
        Ok(GenerationName::new(&self.app_id, self.version.parse()?))
    }

    /// # Errors
    ///
    /// Returns `Error::ConfigError` unless the scope is an http(s) URL.
    pub fn scope_url(&self) -> Result<Url> {
        let url = Url::parse(&self.scope)
            .map_err(|e| Error::ConfigError(format!("invalid scope '{}': {}", self.scope, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::ConfigError(format!(
                "scope scheme must be http or https, got '{}'",
                other
            ))),
        }
    }

    /// Precache paths resolved against the scope, in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the scope or a path is invalid.
    pub fn resource_urls(&self) -> Result<Vec<Url>> {
        let scope = self.scope_url()?;
        self.precache.iter().map(|path| resolve(&scope, path)).collect()
    }

    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the scope or the path is invalid.
    pub fn offline_url(&self) -> Result<Url> {
        resolve(&self.scope_url()?, &self.offline_path)
    }
}

fn resolve(scope: &Url, path: &str) -> Result<Url> {
    let mut url = scope
        .join(path)
        .map_err(|e| Error::ConfigError(format!("invalid path '{}': {}", path, e)))?;
    url.set_fragment(None);
    Ok(url)
}
