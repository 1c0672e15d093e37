//! File-backed cache of credential fingerprint → account identity.
//!
//! The whole cache is one JSON object on disk. It is capped at
//! `max_entries` keys; when an insert would go past the cap the file is
//! reset to empty first instead of evicting a single entry.
//!
//! The cache never fails the operation it accelerates: an unreadable or
//! corrupt file reads as empty, and a failed write is logged and dropped.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::core::AccountIdentity;
use crate::util::fs::{remove_file_if_exists, write_atomic};
use crate::util::hash::credential_fingerprint;

/// Default cap on the number of cached identities.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// File name of the cache under the cache directory.
pub const CACHE_FILE_NAME: &str = "accounts_partitions.json";

type IdentityMap = BTreeMap<String, AccountIdentity>;

/// Persistent map from credential fingerprint to [`AccountIdentity`].
#[derive(Debug, Clone)]
pub struct AccountIdentityCache {
    path: PathBuf,
    max_entries: usize,
}

impl AccountIdentityCache {
    /// Create a cache backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AccountIdentityCache {
            path: path.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Override the entry cap.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a cached identity.
    pub fn get(&self, fingerprint: &str) -> Option<AccountIdentity> {
        self.load().remove(fingerprint)
    }

    /// Store an identity, resetting the store first if it is full.
    pub fn put(&self, fingerprint: &str, identity: AccountIdentity) {
        let mut map = self.load();

        if map.len() >= self.max_entries && !map.contains_key(fingerprint) {
            tracing::debug!(
                "account cache reached {} entries, resetting {}",
                map.len(),
                self.path.display()
            );
            map.clear();
        }

        map.insert(fingerprint.to_string(), identity);
        self.save(&map);
    }

    /// Return the cached identity, or resolve, store and return it.
    ///
    /// Resolver errors are passed through and nothing is cached.
    pub async fn fetch<F, Fut, E>(&self, fingerprint: &str, resolver: F) -> Result<AccountIdentity, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountIdentity, E>>,
    {
        if let Some(cached) = self.get(fingerprint) {
            tracing::debug!(
                "retrieved account id {} from disk cache",
                cached.account_id
            );
            return Ok(cached);
        }

        let identity = resolver().await?;
        self.put(fingerprint, identity.clone());
        Ok(identity)
    }

    /// [`fetch`](Self::fetch) keyed by the fingerprint of a credential pair.
    pub async fn fetch_for_credentials<F, Fut, E>(
        &self,
        access_key_id: &str,
        session_token: Option<&str>,
        resolver: F,
    ) -> Result<AccountIdentity, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountIdentity, E>>,
    {
        let fingerprint = credential_fingerprint(access_key_id, session_token);
        self.fetch(&fingerprint, resolver).await
    }

    /// All cached entries.
    pub fn entries(&self) -> BTreeMap<String, AccountIdentity> {
        self.load()
    }

    /// Empty the cache by deleting its backing file.
    pub fn clear(&self) -> anyhow::Result<()> {
        remove_file_if_exists(&self.path)
    }

    fn load(&self) -> IdentityMap {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("cannot read account cache {}: {}", self.path.display(), e);
                }
                return IdentityMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::debug!(
                "ignoring unparsable account cache {}: {}",
                self.path.display(),
                e
            );
            IdentityMap::new()
        })
    }

    fn save(&self, map: &IdentityMap) {
        let contents = match serde_json::to_vec_pretty(map) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!("cannot serialize account cache: {}", e);
                return;
            }
        };

        if let Err(e) = write_atomic(&self.path, &contents) {
            tracing::debug!("cannot write account cache: {:#}", e);
        }
    }
}
