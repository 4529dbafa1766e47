use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub repo: RepoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
}

/// The documented project this instance grounds questions about.
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    /// Display name used in context section headers.
    pub name: String,
    /// Documentation site root, without a trailing slash.
    pub docs_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepoConfig {
    pub owner: String,
    pub name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Listing service root (GitHub REST shape). Overridable for tests.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Raw file-content service root. Overridable for tests.
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
    /// Environment variable holding an optional bearer token.
    /// Absence means unauthenticated, rate-limited access.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl RepoConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_branch() -> String {
    "master".to_string()
}
fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}
fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Persistent tier selection: `disk`, `temp`, or `memory`.
    ///
    /// `memory` skips the persistent tier entirely; `temp` keeps records
    /// under the OS temp directory, which suits read-only deployments.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Root directory for the `disk` backend.
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    /// Freshness window for the file-tree snapshot.
    #[serde(default = "default_tree_ttl_secs")]
    pub tree_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_cache_root(),
            tree_ttl_secs: default_tree_ttl_secs(),
        }
    }
}

fn default_backend() -> String {
    "disk".to_string()
}
fn default_cache_root() -> PathBuf {
    PathBuf::from(".cache")
}
fn default_tree_ttl_secs() -> u64 {
    86_400
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("grounder/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssemblyConfig {
    /// Ranked candidate files fetched per question.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Documentation sub-pages fetched per question.
    #[serde(default = "default_max_doc_pages")]
    pub max_doc_pages: usize,
    /// Character cap applied to each stripped documentation page.
    #[serde(default = "default_doc_page_char_cap")]
    pub doc_page_char_cap: usize,
    /// Character cap applied to each fetched repository file.
    #[serde(default = "default_file_char_cap")]
    pub file_char_cap: usize,
    /// Global ceiling on the assembled context.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_readme_path")]
    pub readme_path: String,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Entry-point candidates probed in listing order; first hit wins.
    #[serde(default = "default_entry_candidates")]
    pub entry_candidates: Vec<String>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            max_doc_pages: default_max_doc_pages(),
            doc_page_char_cap: default_doc_page_char_cap(),
            file_char_cap: default_file_char_cap(),
            max_context_chars: default_max_context_chars(),
            readme_path: default_readme_path(),
            manifest_path: default_manifest_path(),
            entry_candidates: default_entry_candidates(),
        }
    }
}

fn default_max_candidates() -> usize {
    10
}
fn default_max_doc_pages() -> usize {
    5
}
fn default_doc_page_char_cap() -> usize {
    12_000
}
fn default_file_char_cap() -> usize {
    10_000
}
fn default_max_context_chars() -> usize {
    120_000
}
fn default_readme_path() -> String {
    "README.md".to_string()
}
fn default_manifest_path() -> String {
    "package.json".to_string()
}
fn default_entry_candidates() -> Vec<String> {
    [
        "src/index.js",
        "src/index.ts",
        "src/main.js",
        "src/main.ts",
        "index.js",
        "index.ts",
        "tsconfig.json",
        "vite.config.js",
        "vite.config.ts",
        "webpack.config.js",
        "vite.config.mjs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate project
    if config.project.docs_base_url.trim().is_empty() {
        anyhow::bail!("project.docs_base_url must be set");
    }

    // Link resolution concatenates paths onto the base; keep it slash-free.
    while config.project.docs_base_url.ends_with('/') {
        config.project.docs_base_url.pop();
    }

    // Validate repo
    if config.repo.owner.trim().is_empty() || config.repo.name.trim().is_empty() {
        anyhow::bail!("repo.owner and repo.name must be set");
    }

    // Validate cache
    match config.cache.backend.as_str() {
        "disk" | "temp" | "memory" => {}
        other => anyhow::bail!(
            "Unknown cache backend: '{}'. Must be disk, temp, or memory.",
            other
        ),
    }

    if config.cache.tree_ttl_secs == 0 {
        anyhow::bail!("cache.tree_ttl_secs must be > 0");
    }

    // Validate assembly
    if config.assembly.max_candidates == 0 {
        anyhow::bail!("assembly.max_candidates must be >= 1");
    }

    if config.assembly.max_context_chars == 0 {
        anyhow::bail!("assembly.max_context_chars must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("grounder.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[project]
name = "Harmony"
docs_base_url = "https://docs.example.io/harmony/"

[repo]
owner = "example"
name = "harmony"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.repo.branch, "master");
        assert_eq!(config.cache.backend, "disk");
        assert_eq!(config.cache.tree_ttl_secs, 86_400);
        assert_eq!(config.assembly.max_candidates, 10);
        assert_eq!(config.assembly.max_context_chars, 120_000);
        // Trailing slash trimmed for link resolution.
        assert_eq!(
            config.project.docs_base_url,
            "https://docs.example.io/harmony"
        );
    }

    #[test]
    fn rejects_unknown_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[project]
name = "Harmony"
docs_base_url = "https://docs.example.io"

[repo]
owner = "example"
name = "harmony"

[cache]
backend = "redis"
"#,
        );

        let err = load_config(&path).unwrap_err().to_string();
        assert!(err.contains("Unknown cache backend"));
    }

    #[test]
    fn rejects_empty_repo_owner() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[project]
name = "Harmony"
docs_base_url = "https://docs.example.io"

[repo]
owner = ""
name = "harmony"
"#,
        );

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn entry_candidates_default_order() {
        let defaults = AssemblyConfig::default();
        assert_eq!(defaults.entry_candidates[0], "src/index.js");
        assert!(defaults
            .entry_candidates
            .contains(&"tsconfig.json".to_string()));
    }
}
