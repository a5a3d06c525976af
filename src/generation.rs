//! Cache generations: naming, population, promotion and purge.
//!
//! A generation is one named, versioned namespace in the [`CacheStore`].
//! Names follow `"<app-id>-v<semver>"`; a higher version supersedes a lower
//! one. At most one generation is current, and every other name under the
//! `"<app-id>-v"` prefix is stale.
//!
//! The [`GenerationManager`] is the only component that opens or deletes
//! generations.

use crate::backend::CacheBackend;
use crate::entry::CacheEntry;
use crate::error::{Error, Result};
use crate::key::RequestKey;
use crate::origin::Origin;
use crate::request::{Method, Request, RequestMode};
use crate::store::CacheStore;
use futures::future::join_all;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use url::Url;

// ============================================================================
// Naming
// ============================================================================

/// Semantic version `major.minor.patch[-pre]`.
///
/// Build metadata is not supported. A pre-release orders below the release
/// it precedes; two pre-releases compare lexicographically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: None,
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::ConfigError(format!("invalid version '{}'", s));

        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => {
                let valid_pre = !pre.is_empty()
                    && pre
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
                if !valid_pre {
                    return Err(invalid());
                }
                (core, Some(pre.to_string()))
            }
            None => (s, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Parsed generation name, e.g. `app-v1.2.0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationName {
    app_id: String,
    version: Version,
}

impl GenerationName {
    pub fn new(app_id: &str, version: Version) -> Self {
        GenerationName {
            app_id: app_id.to_string(),
            version,
        }
    }

    /// Parse `"<app-id>-v<semver>"`.
    ///
    /// The app id may itself contain `-v`; the first split whose remainder
    /// is a valid version wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if no valid split exists.
    pub fn parse(name: &str) -> Result<Self> {
        name.match_indices("-v")
            .filter(|(idx, _)| *idx > 0)
            .find_map(|(idx, _)| {
                name[idx + 2..]
                    .parse::<Version>()
                    .ok()
                    .map(|version| GenerationName::new(&name[..idx], version))
            })
            .ok_or_else(|| Error::ConfigError(format!("invalid generation name '{}'", name)))
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Prefix shared by every generation of this app, `"<app-id>-v"`.
    pub fn prefix(&self) -> String {
        app_prefix(&self.app_id)
    }

    /// Same app and strictly higher version.
    pub fn supersedes(&self, other: &GenerationName) -> bool {
        self.app_id == other.app_id && self.version > other.version
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.app_id, self.version)
    }
}

impl FromStr for GenerationName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GenerationName::parse(s)
    }
}

fn app_prefix(app_id: &str) -> String {
    format!("{}-v", app_id)
}

// ============================================================================
// Manager
// ============================================================================

/// Snapshot of one generation in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    pub name: String,
    pub created_at: Option<SystemTime>,
    pub current: bool,
}

/// Outcome of a successful [`GenerationManager::populate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulateReport {
    pub generation: String,
    /// Entries written.
    pub stored: usize,
    /// Whether the generation was created by this call.
    pub created: bool,
}

/// Creates, promotes and purges the generations of one app.
pub struct GenerationManager<B: CacheBackend, O: Origin> {
    app_id: String,
    store: CacheStore<B>,
    origin: Arc<O>,
    current: RwLock<Option<String>>,
}

impl<B: CacheBackend, O: Origin> GenerationManager<B, O> {
    pub fn new(app_id: &str, store: CacheStore<B>, origin: Arc<O>) -> Self {
        GenerationManager {
            app_id: app_id.to_string(),
            store,
            origin,
            current: RwLock::new(None),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Whether `name` is one of this app's generations.
    ///
    /// `app-vendor-v1.0.0` shares the `app-v` prefix but belongs to `app-vendor`.
    fn owns(&self, name: &str) -> bool {
        name.starts_with(&app_prefix(&self.app_id))
            && GenerationName::parse(name).is_ok_and(|parsed| parsed.app_id() == self.app_id)
    }

    /// Open a generation, creating it if absent. Returns `true` if created.
    pub fn open(&self, name: &str) -> bool {
        self.store.open(name)
    }

    /// Fetch every resource and store it under `name`.
    ///
    /// Fetches run concurrently. Nothing is written unless every fetch
    /// returned a 200, so a failed populate leaves the store as it was.
    ///
    /// # Errors
    ///
    /// - `Error::Population`: One or more resources were unreachable or non-200
    /// - `Error::BackendError`: A store write failed
    pub async fn populate(&self, name: &str, resources: &[Url]) -> Result<PopulateReport> {
        debug!("» Populating {} with {} resources", name, resources.len());

        let fetches = resources.iter().map(|url| async move {
            let request = Request::from_url(Method::Get, url.clone(), RequestMode::Subresource);
            let result = self.origin.fetch(&request).await;
            (request, result)
        });
        let results = join_all(fetches).await;

        let mut ready = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (request, result) in results {
            let entry = result.and_then(|response| CacheEntry::from_response(&response));
            match entry {
                Ok(entry) => ready.push((RequestKey::from_request(&request), entry)),
                Err(e) => {
                    warn!("✗ Populate {}: {} failed: {}", name, request.url(), e);
                    failed.push(format!("{} ({})", request.url(), e));
                }
            }
        }

        if !failed.is_empty() {
            error!(
                "✗ Population of {} failed for {} of {} resources",
                name,
                failed.len(),
                resources.len()
            );
            return Err(Error::Population {
                generation: name.to_string(),
                failed,
            });
        }

        let created = self.store.open(name);
        for (key, entry) in &ready {
            self.store.put(name, key, entry).await?;
        }

        info!("✓ Populated {} ({} entries)", name, ready.len());
        Ok(PopulateReport {
            generation: name.to_string(),
            stored: ready.len(),
            created,
        })
    }

    /// Mark `name` as the current generation.
    pub async fn promote(&self, name: &str) {
        let mut current = self.current.write().await;
        if let Some(previous) = current.as_deref() {
            let supersedes = match (GenerationName::parse(name), GenerationName::parse(previous)) {
                (Ok(next), Ok(prev)) => next.supersedes(&prev),
                _ => false,
            };
            if !supersedes && previous != name {
                warn!("Promoting {} which does not supersede {}", name, previous);
            }
        }
        *current = Some(name.to_string());
        info!("✓ Promoted {} to current", name);
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Delete every generation of this app except `current`.
    ///
    /// Idempotent: a second call finds nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails; generations deleted before the
    /// failure stay deleted.
    pub async fn purge_others(&self, current: &str) -> Result<Vec<String>> {
        let mut purged = Vec::new();
        for name in self.store.generation_names() {
            if self.owns(&name) && name != current {
                self.store.delete_generation(&name).await?;
                purged.push(name);
            }
        }
        if !purged.is_empty() {
            warn!("Purged {} stale generation(s): {:?}", purged.len(), purged);
        }
        Ok(purged)
    }

    /// Delete every generation of this app, current included.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails.
    pub async fn clear_all(&self) -> Result<usize> {
        let mut cleared = 0;
        for name in self.store.generation_names() {
            if self.owns(&name) && self.store.delete_generation(&name).await? {
                cleared += 1;
            }
        }
        *self.current.write().await = None;
        warn!("Cleared {} generation(s) of {}", cleared, self.app_id);
        Ok(cleared)
    }

    /// Every generation of this app, sorted by name.
    pub async fn generations(&self) -> Vec<Generation> {
        let current = self.current().await;
        self.store
            .generation_names()
            .into_iter()
            .filter(|name| self.owns(name))
            .map(|name| Generation {
                created_at: self.store.created_at(&name),
                current: current.as_deref() == Some(name.as_str()),
                name,
            })
            .collect()
    }
}
