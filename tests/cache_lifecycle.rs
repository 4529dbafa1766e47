//! Cache and fetcher behavior against a mocked upstream: freshness window,
//! 404 semantics, persistence round-trips, and memory-only degradation.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use grounder::cache::{tree_key, CacheBackend, TieredCache};
use grounder::config::{
    AssemblyConfig, CacheConfig, Config, FetchConfig, ProjectConfig, RepoConfig,
};
use grounder::content::FileFetcher;
use grounder::error::RetrievalError;
use grounder::tree::{FileTreeSnapshot, TreeFetcher};

fn test_config(server_url: &str, cache_root: &Path) -> Config {
    Config {
        project: ProjectConfig {
            name: "Harmony".to_string(),
            docs_base_url: server_url.to_string(),
        },
        repo: RepoConfig {
            owner: "acme".to_string(),
            name: "harmony".to_string(),
            branch: "master".to_string(),
            api_base_url: server_url.to_string(),
            raw_base_url: server_url.to_string(),
            token_env: "GROUNDER_TEST_TOKEN_UNSET".to_string(),
        },
        cache: CacheConfig {
            backend: "disk".to_string(),
            root: cache_root.to_path_buf(),
            tree_ttl_secs: 86_400,
        },
        fetch: FetchConfig::default(),
        assembly: AssemblyConfig::default(),
    }
}

fn listing_body() -> &'static str {
    r#"{
        "sha": "rev1",
        "tree": [
            {"path": "src", "type": "tree"},
            {"path": "src/index.ts", "type": "blob", "size": 300},
            {"path": "README.md", "type": "blob", "size": 400}
        ]
    }"#
}

#[tokio::test]
async fn tree_is_fetched_once_within_the_freshness_window() {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/repos/acme/harmony/git/trees/master?recursive=1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(listing_body())
        .expect(1)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.url(), tmp.path());
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = TreeFetcher::new(&config, cache).unwrap();

    let first = fetcher.get_file_tree().await.unwrap();
    let second = fetcher.get_file_tree().await.unwrap();

    assert_eq!(first.entries.len(), 2);
    assert_eq!(second.sha, "rev1");
    listing.assert_async().await;
}

#[tokio::test]
async fn stale_tree_snapshot_triggers_a_refetch() {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/repos/acme/harmony/git/trees/master?recursive=1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(listing_body())
        .expect(1)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.url(), tmp.path());
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));

    // Seed a snapshot that aged out of the window.
    let stale = FileTreeSnapshot {
        entries: vec![],
        fetched_at: Utc::now() - chrono::Duration::hours(25),
        branch: "master".to_string(),
        sha: "rev0".to_string(),
    };
    cache.put(&tree_key("acme", "harmony", "master"), &stale);

    let fetcher = TreeFetcher::new(&config, Arc::clone(&cache)).unwrap();
    let snapshot = fetcher.get_file_tree().await.unwrap();

    assert_eq!(snapshot.sha, "rev1");
    assert_eq!(snapshot.entries.len(), 2);
    listing.assert_async().await;
}

#[tokio::test]
async fn upstream_error_caches_nothing() {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/repos/acme/harmony/git/trees/master?recursive=1")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.url(), tmp.path());
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = TreeFetcher::new(&config, cache).unwrap();

    let err = fetcher.get_file_tree().await.unwrap_err();
    match err {
        RetrievalError::UpstreamStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("expected UpstreamStatus, got {other}"),
    }

    // No partial snapshot was cached, so the second call goes upstream too.
    assert!(fetcher.get_file_tree().await.is_err());
    listing.assert_async().await;
}

#[tokio::test]
async fn missing_file_is_not_negatively_cached() {
    let mut server = mockito::Server::new_async().await;
    let raw = server
        .mock("GET", "/acme/harmony/master/missing.md")
        .with_status(404)
        .expect(2)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.url(), tmp.path());
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = FileFetcher::new(&config, cache).unwrap();

    assert_eq!(fetcher.get_file_content("missing.md").await.unwrap(), None);
    // Absence is re-checked every time.
    assert_eq!(fetcher.get_file_content("missing.md").await.unwrap(), None);
    raw.assert_async().await;
}

#[tokio::test]
async fn file_content_survives_into_a_new_process() {
    let mut server = mockito::Server::new_async().await;
    let raw = server
        .mock("GET", "/acme/harmony/master/README.md")
        .with_status(200)
        .with_body("# Harmony")
        .expect(1)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.url(), tmp.path());

    {
        let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
        let fetcher = FileFetcher::new(&config, cache).unwrap();
        let content = fetcher.get_file_content("README.md").await.unwrap();
        assert_eq!(content.as_deref(), Some("# Harmony"));
    }

    // Fresh cache over the same root stands in for a new process; the hit
    // comes from the persistent tier, not the network.
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = FileFetcher::new(&config, cache).unwrap();
    let content = fetcher.get_file_content("README.md").await.unwrap();
    assert_eq!(content.as_deref(), Some("# Harmony"));

    raw.assert_async().await;
}

#[tokio::test]
async fn failing_persistence_still_round_trips_in_process() {
    let mut server = mockito::Server::new_async().await;
    let raw = server
        .mock("GET", "/acme/harmony/master/README.md")
        .with_status(200)
        .with_body("# Harmony")
        .expect(1)
        .create_async()
        .await;

    // A plain file where the cache root should be makes every persistent
    // write fail, which flips the store into memory-only mode.
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("occupied");
    std::fs::write(&blocker, "").unwrap();

    let config = test_config(&server.url(), &blocker);
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = FileFetcher::new(&config, Arc::clone(&cache)).unwrap();

    let first = fetcher.get_file_content("README.md").await.unwrap();
    assert_eq!(first.as_deref(), Some("# Harmony"));
    assert!(cache.is_degraded());

    // Second lookup is served by the in-process tier.
    let second = fetcher.get_file_content("README.md").await.unwrap();
    assert_eq!(second.as_deref(), Some("# Harmony"));

    raw.assert_async().await;
}
