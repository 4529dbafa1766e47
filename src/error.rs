//! Error types for the retrieval and caching core.
//!
//! Two failure families exist and they never mix:
//!
//! - [`RetrievalError`] — an upstream service said no (non-2xx) or the
//!   transport fell over. Propagated to the assembly step that triggered the
//!   fetch, where it downgrades to "this contribution is absent".
//! - [`PersistenceError`] — the persistent cache tier could not be read or
//!   written. Always recovered inside the cache itself (log, degrade to
//!   memory-only); it never crosses the cache boundary as an `Err`.
//!
//! A missing remote file (HTTP 404) is not an error at all: fetchers return
//! `Ok(None)` for it.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to an upstream service (listing, raw content, docs host).
///
/// Carries enough to log a useful line: which URL, and either the status the
/// upstream returned or the transport error underneath. No retry is attempted
/// at this layer; retrying is the caller's call.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Upstream answered with a non-success status other than 404.
    #[error("upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// The request never produced a usable response (DNS, TLS, timeout...).
    #[error("transport failure for {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl RetrievalError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn status(status: reqwest::StatusCode, url: &str) -> Self {
        Self::UpstreamStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}

/// Failure of the persistent cache tier.
///
/// Only constructed (and immediately handled) inside `cache.rs`; public so
/// the taxonomy is visible and the warn-log lines have a typed source.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cache read failed for {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache record corrupt at {}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache write failed for {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_error_displays_status_and_url() {
        let err = RetrievalError::UpstreamStatus {
            status: 500,
            url: "https://api.example.com/tree".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("https://api.example.com/tree"));
    }

    #[test]
    fn persistence_error_displays_path() {
        let err = PersistenceError::Write {
            path: PathBuf::from("/ro/cache/tree.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/ro/cache/tree.json"));
    }
}
