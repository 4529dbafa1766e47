//! Context assembly: one question in, one bounded bundle of grounding
//! fragments out.
//!
//! The documentation half and the repository half run concurrently; within
//! each half fetches are sequential. Every step is best-effort — an upstream
//! failure logs a warning and skips that contribution — so the terminal
//! state is always reached. Only when nothing at all contributed does
//! [`Assembler::assemble`] return `None`, which callers surface as an
//! explicit "context unavailable" notice instead of an empty prompt.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, TieredCache};
use crate::config::Config;
use crate::content::FileFetcher;
use crate::docs::{strip_html, DocFetcher};
use crate::links::extract_links;
use crate::rank::{rank, OVERSIZE_BYTES};
use crate::tree::TreeFetcher;

/// Per-candidate caps: oversized files contribute less.
const CANDIDATE_CAP: usize = 5_000;
const CANDIDATE_CAP_OVERSIZE: usize = 2_000;
/// Entry-point and configuration-file caps.
const ENTRY_POINT_CAP: usize = 3_000;
const CONFIG_FILE_CAP: usize = 2_000;

/// Substring triggers in the lowercased question, and the file keywords
/// each one contributes. Fixed and enumerable, not learned.
const KEYWORD_TRIGGERS: &[(&[&str], &[&str])] = &[
    (
        &["component", "ui"],
        &["component", "components", "ui", "view"],
    ),
    (
        &["module", "generate"],
        &["module", "generator", "generate", "template"],
    ),
    (&["config", "setup"], &["config", "setup", "configuration"]),
    (&["service", "api"], &["service", "api", "endpoint"]),
    (
        &["store", "redux", "state"],
        &["store", "redux", "state", "slice"],
    ),
    (
        &["route", "navigation"],
        &["route", "router", "navigation", "page"],
    ),
    (&["test", "spec"], &["test", "spec", "jest"]),
    (&["hook", "custom"], &["hook", "hooks", "custom"]),
];

/// Triggers for documentation sub-page selection.
const DOC_PAGE_TRIGGERS: &[(&[&str], &[&str])] = &[
    (
        &[
            "setup",
            "install",
            "new project",
            "initialize",
            "create project",
            "build project",
            "getting started",
            "start",
        ],
        &[
            "getting-started",
            "getting_started",
            "start",
            "setup",
            "install",
            "initialize",
        ],
    ),
    (&["module", "generate"], &["module", "generate", "generator"]),
    (&["component"], &["component", "components"]),
    (
        &["architecture", "structure"],
        &["architecture", "structure", "overview"],
    ),
];

/// File-ranking keywords derived from the question. Empty when no trigger
/// fires, in which case candidate ranking is skipped entirely.
pub fn derive_keywords(question: &str) -> Vec<String> {
    expand_triggers(question, KEYWORD_TRIGGERS)
}

fn doc_page_keywords(question: &str) -> Vec<String> {
    expand_triggers(question, DOC_PAGE_TRIGGERS)
}

fn expand_triggers(question: &str, table: &[(&[&str], &[&str])]) -> Vec<String> {
    let lower = question.to_lowercase();
    let mut keywords = Vec::new();
    for (triggers, additions) in table {
        if triggers.iter().any(|t| lower.contains(t)) {
            keywords.extend(additions.iter().map(|s| s.to_string()));
        }
    }
    keywords
}

/// The assembled grounding context for one question. Never cached.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Section fragments, each led by an origin header.
    pub fragments: Vec<String>,
    /// Total characters across fragments (separators excluded).
    pub total_size: usize,
}

impl ContextBundle {
    pub fn text(&self) -> String {
        self.fragments.join("\n\n")
    }
}

/// Accumulates fragments under the global character ceiling. A fragment
/// that would overflow is truncated to the remaining budget; everything
/// after that is dropped.
struct BundleBuilder {
    fragments: Vec<String>,
    total_size: usize,
    remaining: usize,
}

impl BundleBuilder {
    fn new(budget: usize) -> Self {
        Self {
            fragments: Vec::new(),
            total_size: 0,
            remaining: budget,
        }
    }

    fn push(&mut self, fragment: String) {
        if self.remaining == 0 {
            return;
        }
        let len = fragment.chars().count();
        if len <= self.remaining {
            self.remaining -= len;
            self.total_size += len;
            self.fragments.push(fragment);
        } else {
            let cut = truncate_chars(&fragment, self.remaining).to_string();
            self.total_size += self.remaining;
            self.remaining = 0;
            self.fragments.push(cut);
        }
    }

    fn finish(self) -> Option<ContextBundle> {
        if self.fragments.is_empty() {
            None
        } else {
            Some(ContextBundle {
                fragments: self.fragments,
                total_size: self.total_size,
            })
        }
    }
}

/// First `max` characters of `s`, on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub struct Assembler {
    config: Config,
    tree: TreeFetcher,
    files: FileFetcher,
    docs: DocFetcher,
}

impl Assembler {
    /// Wire up the cache and all three fetchers. Meant to be constructed
    /// once per process and reused across questions.
    pub fn new(config: Config) -> Result<Self> {
        let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
        let tree = TreeFetcher::new(&config, Arc::clone(&cache))?;
        let files = FileFetcher::new(&config, Arc::clone(&cache))?;
        let docs = DocFetcher::new(&config)?;
        Ok(Self {
            config,
            tree,
            files,
            docs,
        })
    }

    /// Assemble grounding context for one question. `None` means no
    /// contribution succeeded at all.
    pub async fn assemble(&self, question: &str) -> Option<ContextBundle> {
        let (doc_fragments, repo_fragments) =
            tokio::join!(self.gather_docs(question), self.gather_repo(question));

        let mut builder = BundleBuilder::new(self.config.assembly.max_context_chars);
        for fragment in doc_fragments.into_iter().chain(repo_fragments) {
            builder.push(fragment);
        }

        let bundle = builder.finish();
        match &bundle {
            Some(b) => info!(
                fragments = b.fragments.len(),
                chars = b.total_size,
                "context assembled"
            ),
            None => info!("no context available"),
        }
        bundle
    }

    /// Documentation half: root page text, then keyword-matched sub-pages.
    async fn gather_docs(&self, question: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let assembly = &self.config.assembly;
        let base_url = &self.config.project.docs_base_url;

        let root_html = match self.docs.fetch_page(base_url).await {
            Ok(Some(html)) => Some(html),
            Ok(None) => {
                debug!(url = %base_url, "docs root page absent");
                None
            }
            Err(err) => {
                warn!(error = %err, "docs root page unavailable");
                None
            }
        };

        if let Some(html) = &root_html {
            let text = strip_html(html);
            let text = truncate_chars(&text, assembly.doc_page_char_cap);
            if !text.is_empty() {
                fragments.push(format!(
                    "## {} Official Documentation:\n{}",
                    self.config.project.name, text
                ));
            }
        }

        let page_keywords = doc_page_keywords(question);
        if page_keywords.is_empty() {
            return fragments;
        }

        let mut fetched = 0usize;
        if let Some(html) = &root_html {
            let links = extract_links(html, base_url);
            for link in links {
                if fetched >= assembly.max_doc_pages {
                    break;
                }
                let lower = link.to_lowercase();
                if !page_keywords.iter().any(|k| lower.contains(k)) {
                    continue;
                }
                if let Some(fragment) = self.doc_page_fragment(&link).await {
                    fragments.push(fragment);
                    fetched += 1;
                }
            }
        }

        // Nothing matched (or the root page was missing): probe the
        // conventional getting-started locations and take the first hit.
        if fetched == 0 {
            for url in [
                format!("{base_url}/getting-started/"),
                format!("{base_url}/getting-started"),
                format!("{base_url}/getting_started/"),
                format!("{base_url}/getting_started"),
            ] {
                if let Some(fragment) = self.doc_page_fragment(&url).await {
                    fragments.push(fragment);
                    break;
                }
            }
        }

        fragments
    }

    /// One sub-page as a headed fragment, or `None` when missing, failed,
    /// or empty after stripping.
    async fn doc_page_fragment(&self, url: &str) -> Option<String> {
        let html = match self.docs.fetch_page(url).await {
            Ok(Some(html)) => html,
            Ok(None) => return None,
            Err(err) => {
                warn!(url, error = %err, "doc sub-page unavailable");
                return None;
            }
        };
        let text = strip_html(&html);
        let text = truncate_chars(&text, self.config.assembly.doc_page_char_cap);
        if text.is_empty() {
            return None;
        }
        Some(format!("## From {}:\n{}", url, text))
    }

    /// Repository half: README, manifest, one entry-point candidate, then
    /// ranked keyword candidates.
    async fn gather_repo(&self, question: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let assembly = &self.config.assembly;
        let mut fetched_paths: HashSet<String> = HashSet::new();

        if let Some(text) = self.file_text(&assembly.readme_path).await {
            fetched_paths.insert(assembly.readme_path.clone());
            let text = truncate_chars(&text, assembly.file_char_cap);
            if !text.is_empty() {
                fragments.push(format!("## Repository README:\n{}", text));
            }
        }

        if let Some(text) = self.file_text(&assembly.manifest_path).await {
            fetched_paths.insert(assembly.manifest_path.clone());
            let text = truncate_chars(&text, assembly.file_char_cap);
            if !text.is_empty() {
                fragments.push(format!(
                    "## Package Configuration ({}):\n{}",
                    assembly.manifest_path, text
                ));
            }
        }

        for path in &assembly.entry_candidates {
            let Some(text) = self.file_text(path).await else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            fetched_paths.insert(path.clone());
            let fragment = if path.contains("index") || path.contains("main") {
                format!(
                    "## Project Entry Point ({}):\n{}",
                    path,
                    truncate_chars(&text, ENTRY_POINT_CAP)
                )
            } else {
                format!(
                    "## Configuration File ({}):\n{}",
                    path,
                    truncate_chars(&text, CONFIG_FILE_CAP)
                )
            };
            fragments.push(fragment);
            break;
        }

        let keywords = derive_keywords(question);
        if keywords.is_empty() {
            debug!("no keyword triggers fired; skipping candidate ranking");
            return fragments;
        }

        let snapshot = match self.tree.get_file_tree().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "file tree unavailable; skipping candidates");
                return fragments;
            }
        };

        for entry in rank(&snapshot.entries, &keywords, assembly.max_candidates) {
            if fetched_paths.contains(&entry.path) {
                continue;
            }
            if let Some(text) = self.file_text(&entry.path).await {
                let cap = if entry.size > OVERSIZE_BYTES {
                    CANDIDATE_CAP_OVERSIZE
                } else {
                    CANDIDATE_CAP
                };
                let text = truncate_chars(&text, cap);
                if !text.is_empty() {
                    fragments.push(format!("## {}:\n{}", entry.path, text));
                }
            }
        }

        fragments
    }

    /// One repository file's content, with failures downgraded to `None`.
    async fn file_text(&self, path: &str) -> Option<String> {
        match self.files.get_file_content(path).await {
            Ok(found) => found,
            Err(err) => {
                warn!(path, error = %err, "file fetch failed");
                None
            }
        }
    }
}

/// CLI entry: assemble and print grounding context for a question.
pub async fn run_context(config: &Config, question: &str) -> Result<()> {
    let assembler = Assembler::new(config.clone())?;
    match assembler.assemble(question).await {
        Some(bundle) => {
            println!("{}", bundle.text());
            Ok(())
        }
        None => {
            println!("No context available: documentation and repository could not be reached.");
            Ok(())
        }
    }
}
