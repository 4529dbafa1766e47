//! Lexical relevance ranking over file-tree entries.
//!
//! A heuristic proxy, not semantic search: substring hits against the
//! lowercased path, small bonuses for source-file extensions and entry-point
//! names, a penalty for very large files. The weights are fixed constants;
//! downstream consumers depend on exact scores staying put.

use std::sync::Arc;

use anyhow::Result;

use crate::cache::{CacheBackend, TieredCache};
use crate::config::Config;
use crate::tree::{TreeEntry, TreeFetcher};

/// Keyword is a substring of the path.
const KEYWORD_MATCH: i64 = 10;
/// Only the keyword's first-3-character prefix is a substring. Fallback,
/// never stacked on top of a full match.
const PREFIX_MATCH: i64 = 2;
const TYPED_SOURCE_BONUS: i64 = 3;
const LOOSE_SOURCE_BONUS: i64 = 2;
const ENTRY_POINT_BONUS: i64 = 1;
const OVERSIZE_PENALTY: i64 = 5;
/// Shared with the assembler, which halves its per-file budget past this.
pub(crate) const OVERSIZE_BYTES: u64 = 50_000;

/// Score one entry against the keyword set. Pure.
pub fn score_entry(entry: &TreeEntry, keywords: &[String]) -> i64 {
    let path = entry.path.to_lowercase();
    let mut score = 0;

    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if path.contains(&keyword) {
            score += KEYWORD_MATCH;
        } else {
            let prefix: String = keyword.chars().take(3).collect();
            if !prefix.is_empty() && path.contains(&prefix) {
                score += PREFIX_MATCH;
            }
        }
    }

    if path.ends_with(".ts") || path.ends_with(".tsx") {
        score += TYPED_SOURCE_BONUS;
    }
    if path.ends_with(".js") || path.ends_with(".jsx") {
        score += LOOSE_SOURCE_BONUS;
    }

    let base_name = path.rsplit('/').next().unwrap_or(&path);
    if base_name.starts_with("index.") {
        score += ENTRY_POINT_BONUS;
    }

    if entry.size > OVERSIZE_BYTES {
        score -= OVERSIZE_PENALTY;
    }

    score
}

/// Rank entries by descending score, keeping at most `limit`.
///
/// Entries scoring zero or below are dropped. The sort is stable, so equal
/// scores preserve the original listing order.
pub fn rank(entries: &[TreeEntry], keywords: &[String], limit: usize) -> Vec<TreeEntry> {
    let mut scored: Vec<(i64, &TreeEntry)> = entries
        .iter()
        .map(|entry| (score_entry(entry, keywords), entry))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, entry)| entry.clone())
        .collect()
}

/// CLI entry: rank the repository tree against explicit keywords.
pub async fn run_rank(config: &Config, keywords: &[String], limit: usize) -> Result<()> {
    let cache = Arc::new(TieredCache::new(CacheBackend::from_config(&config.cache)));
    let fetcher = TreeFetcher::new(config, cache)?;
    let snapshot = fetcher.get_file_tree().await?;

    let ranked = rank(&snapshot.entries, keywords, limit);
    if ranked.is_empty() {
        println!("No files matched.");
        return Ok(());
    }

    for entry in &ranked {
        println!("{:>5}  {}", score_entry(entry, keywords), entry.path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::EntryKind;

    fn entry(path: &str, size: u64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: EntryKind::File,
            size,
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn component_query_ranks_button_first() {
        let entries = vec![
            entry("src/components/Button.tsx", 1000),
            entry("README.md", 500),
        ];
        let ranked = rank(&entries, &keywords(&["component"]), 10);

        // Substring match (10) plus typed-source bonus (3); README scores
        // zero and is dropped.
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].path, "src/components/Button.tsx");
        assert_eq!(score_entry(&ranked[0], &keywords(&["component"])), 13);
    }

    #[test]
    fn prefix_bonus_does_not_stack_on_full_match() {
        let e = entry("src/components/list.txt", 100);
        // "component" matches fully; its prefix "com" must not add more.
        assert_eq!(score_entry(&e, &keywords(&["component"])), 10);
    }

    #[test]
    fn prefix_bonus_applies_without_full_match() {
        let e = entry("src/context.ts", 100);
        // "configure" is absent but its prefix "con" appears.
        assert_eq!(score_entry(&e, &keywords(&["configure"])), 2 + 3);
    }

    #[test]
    fn oversize_files_are_penalized() {
        let small = entry("src/store.ts", 1000);
        let large = entry("src/store.ts", 60_000);
        let kw = keywords(&["store"]);
        assert_eq!(score_entry(&small, &kw), 13);
        assert_eq!(score_entry(&large, &kw), 8);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let e = entry("SRC/COMPONENTS/APP.TSX", 100);
        assert_eq!(score_entry(&e, &keywords(&["Component"])), 13);
    }

    #[test]
    fn entry_point_names_get_a_nudge() {
        let e = entry("src/index.ts", 100);
        assert_eq!(score_entry(&e, &keywords(&["index"])), 10 + 3 + 1);
    }

    #[test]
    fn ties_keep_listing_order_and_limit_holds() {
        let entries = vec![
            entry("a/service.md", 100),
            entry("b/service.md", 100),
            entry("c/service.md", 100),
        ];
        let ranked = rank(&entries, &keywords(&["service"]), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].path, "a/service.md");
        assert_eq!(ranked[1].path, "b/service.md");
    }

    #[test]
    fn zero_and_negative_scores_are_dropped() {
        let entries = vec![entry("docs/huge-blob.bin", 90_000), entry("notes.txt", 10)];
        let ranked = rank(&entries, &keywords(&["service"]), 10);
        assert!(ranked.is_empty());
    }
}
