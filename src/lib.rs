//! # Grounder
//!
//! Question-grounding context retrieval and caching for a remote software
//! project.
//!
//! Grounder turns a natural-language question into a bounded, relevance-
//! ranked bundle of external content — documentation pages and repository
//! source files — suitable for embedding into a language-model prompt. It
//! minimizes redundant network calls with a two-tier cache and keeps working
//! on hosts where persistent disk storage is unavailable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────────┐   ┌─────────────┐
//! │ question │──▶│          Assembler            │──▶│ContextBundle│
//! └──────────┘   │  docs half      repo half     │   └─────────────┘
//!                │  DocFetcher     TreeFetcher    │
//!                │  extract_links  rank           │
//!                │                 FileFetcher    │
//!                └───────┬───────────────┬───────┘
//!                        ▼               ▼
//!                  docs host       TieredCache ──▶ listing / raw services
//!                                  (memory + disk)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! grd context "How do I create a component?"   # assemble grounding context
//! grd tree                                     # list the repository tree
//! grd file src/index.ts                        # print one repository file
//! grd rank component ui                        # rank files by keywords
//! grd cache clear                              # drop all cached records
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`cache`] | Two-tier (memory + disk) record cache |
//! | [`tree`] | Repository file-tree retrieval with a freshness window |
//! | [`content`] | Raw file-content retrieval |
//! | [`rank`] | Lexical relevance ranking |
//! | [`links`] | Documentation link extraction from HTML |
//! | [`docs`] | Documentation page retrieval and HTML stripping |
//! | [`assemble`] | Per-question context assembly |
//! | [`error`] | Retrieval and persistence error types |

pub mod assemble;
pub mod cache;
pub mod config;
pub mod content;
pub mod docs;
pub mod error;
pub mod links;
pub mod rank;
pub mod tree;
