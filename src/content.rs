//! Raw file-content retrieval.
//!
//! Contents are cached indefinitely once fetched: a hit returns with no
//! freshness check. A 404 is a legitimate "file does not exist" answer,
//! returned as `Ok(None)` and never cached, so lookups of an absent path
//! re-attempt the network call every time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{file_key, CacheBackend, TieredCache};
use crate::config::Config;
use crate::error::RetrievalError;

/// Self-describing persistent record for one cached file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileRecord {
    content: String,
    path: String,
    fetched_at: DateTime<Utc>,
    branch: String,
}

pub struct FileFetcher {
    client: reqwest::Client,
    cache: Arc<TieredCache>,
    owner: String,
    repo: String,
    branch: String,
    raw_base_url: String,
    token: Option<String>,
}

impl FileFetcher {
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
            raw_base_url: config.repo.raw_base_url.clone(),
            token: config.repo.token(),
        })
    }

    /// Content of one repository file, or `None` when the file does not
    /// exist on the branch.
    pub async fn get_file_content(&self, path: &str) -> Result<Option<String>, RetrievalError> {
        let key = file_key(&self.owner, &self.repo, &self.branch, path);

        if let Some(record) = self.cache.get::<FileRecord>(&key) {
            debug!(path, "file content served from cache");
            return Ok(Some(record.content));
        }

        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base_url, self.owner, self.repo, self.branch, path
        );
        debug!(%url, "fetching file content");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| RetrievalError::transport(&url, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path, "file not present on branch");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RetrievalError::status(status, &url));
        }

        let content = response
            .text()
            .await
            .map_err(|err| RetrievalError::transport(&url, err))?;

        let record = FileRecord {
            content: content.clone(),
            path: path.to_string(),
            fetched_at: Utc::now(),
            branch: self.branch.clone(),
        };
        self.cache.put(&key, &record);

        Ok(Some(content))
    }
}

/// CLI entry: print one repository file, cached or fetched.
pub async fn run_file(config: &Config, path: &str) -> Result<()> {
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = FileFetcher::new(config, cache)?;

    match fetcher.get_file_content(path).await? {
        Some(content) => {
            println!("{}", content);
            Ok(())
        }
        None => {
            eprintln!("Error: file not found: {}", path);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreOutcome;

    #[test]
    fn record_round_trips_through_the_cache() {
        let cache = TieredCache::new(CacheBackend::Memory);
        let key = file_key("acme", "widgets", "main", "src/index.ts");
        let record = FileRecord {
            content: "export {}".to_string(),
            path: "src/index.ts".to_string(),
            fetched_at: Utc::now(),
            branch: "main".to_string(),
        };

        assert_eq!(cache.put(&key, &record), StoreOutcome::MemoryOnly);
        let back = cache.get::<FileRecord>(&key).unwrap();
        assert_eq!(back.content, "export {}");
        assert_eq!(back.path, "src/index.ts");
    }
}
