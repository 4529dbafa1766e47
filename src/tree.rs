//! Repository file-tree retrieval with a freshness window.
//!
//! One recursive listing call per (owner, repo, branch) per window; within
//! the window every lookup is served from the cache. The window is compared
//! against the timestamp embedded in the snapshot record itself, so the
//! cache stays TTL-agnostic.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{tree_key, CacheBackend, TieredCache};
use crate::config::Config;
use crate::error::RetrievalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
}

/// One repository listing at one point in time.
///
/// `entries` holds file (blob) entries only; directory entries are dropped
/// at fetch time. Serializes as the self-describing persistent record
/// `{tree, fetched_at, branch, sha}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTreeSnapshot {
    #[serde(rename = "tree")]
    pub entries: Vec<TreeEntry>,
    pub fetched_at: DateTime<Utc>,
    pub branch: String,
    pub sha: String,
}

impl FileTreeSnapshot {
    pub fn is_fresh(&self, ttl_secs: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age < chrono::Duration::seconds(ttl_secs as i64)
    }
}

/// Wire shape of the recursive listing endpoint (GitHub git/trees API).
#[derive(Debug, Deserialize)]
struct TreeResponse {
    sha: String,
    tree: Vec<WireEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    // Present for blobs only.
    #[serde(default)]
    size: u64,
}

impl TreeEntry {
    fn from_wire(wire: WireEntry) -> Self {
        let kind = if wire.kind == "blob" {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        Self {
            path: wire.path,
            kind,
            size: wire.size,
        }
    }
}

pub struct TreeFetcher {
    client: reqwest::Client,
    cache: Arc<TieredCache>,
    owner: String,
    repo: String,
    branch: String,
    api_base_url: String,
    token: Option<String>,
    ttl_secs: u64,
}

impl TreeFetcher {
    pub fn new(config: &Config, cache: Arc<TieredCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .user_agent(config.fetch.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            cache,
            owner: config.repo.owner.clone(),
            repo: config.repo.name.clone(),
            branch: config.repo.branch.clone(),
            api_base_url: config.repo.api_base_url.clone(),
            token: config.repo.token(),
            ttl_secs: config.cache.tree_ttl_secs,
        })
    }

    /// Current file tree, cached or fetched.
    ///
    /// A cached snapshot younger than the freshness window is returned
    /// without any network traffic. A stale or missing snapshot triggers
    /// exactly one listing call; nothing partial is cached on failure and
    /// no retry happens here.
    pub async fn get_file_tree(&self) -> Result<FileTreeSnapshot, RetrievalError> {
        let key = tree_key(&self.owner, &self.repo, &self.branch);

        if let Some(snapshot) = self.cache.get::<FileTreeSnapshot>(&key) {
            if snapshot.is_fresh(self.ttl_secs) {
                debug!(key, "file tree served from cache");
                return Ok(snapshot);
            }
            debug!(key, "cached file tree is stale");
        }

        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base_url, self.owner, self.repo, self.branch
        );
        debug!(%url, "fetching file tree");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| RetrievalError::transport(&url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::status(status, &url));
        }

        let body: TreeResponse = response
            .json()
            .await
            .map_err(|err| RetrievalError::transport(&url, err))?;

        if body.truncated {
            warn!(%url, "upstream truncated the recursive listing");
        }

        let entries: Vec<TreeEntry> = body
            .tree
            .into_iter()
            .map(TreeEntry::from_wire)
            .filter(|entry| entry.kind == EntryKind::File)
            .collect();

        let snapshot = FileTreeSnapshot {
            entries,
            fetched_at: Utc::now(),
            branch: self.branch.clone(),
            sha: body.sha,
        };
        self.cache.put(&key, &snapshot);

        Ok(snapshot)
    }
}

/// CLI entry: list the repository tree, cached or fetched.
pub async fn run_tree(config: &Config) -> Result<()> {
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = TreeFetcher::new(config, cache)?;
    let snapshot = fetcher.get_file_tree().await?;

    println!(
        "{} files on {} (revision {}, fetched {})",
        snapshot.entries.len(),
        snapshot.branch,
        snapshot.sha,
        snapshot.fetched_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    for entry in &snapshot.entries {
        println!("{:>9}  {}", entry.size, entry.path);
    }

    Ok(())
}
