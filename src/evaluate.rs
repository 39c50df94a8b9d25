use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::diff::diff_lines;
use crate::fetch::PageFetcher;
use crate::normalize::CanonicalText;
use crate::snapshot::store::{SnapshotStore, StoreError};

pub const FETCH_FAILED: &str = "fetch failed";
pub const NO_PREVIOUS_VERSION: &str = "no previous version found";

/// Per-source outcome of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeResult {
    pub source: String,
    pub changed: bool,
    pub diff: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ChangeResult>,
}

impl RunReport {
    pub fn has_changes(&self) -> bool {
        self.results.iter().any(|r| r.changed)
    }
}

/// Normalizes fetched markup, compares it against the stored snapshot and
/// updates the store. `fetched` is `None` when the fetch failed; that is
/// terminal for this source this run and leaves the store untouched.
pub fn evaluate_source(
    store: &SnapshotStore,
    source: &str,
    fetched: Option<&str>,
) -> Result<ChangeResult, StoreError> {
    let Some(raw) = fetched else {
        return Ok(ChangeResult {
            source: source.to_string(),
            changed: false,
            diff: FETCH_FAILED.to_string(),
        });
    };

    let new_text = CanonicalText::from_html(raw);
    let Some(stored) = store.load(source)? else {
        store.save(source, &new_text)?;
        return Ok(ChangeResult {
            source: source.to_string(),
            changed: true,
            diff: NO_PREVIOUS_VERSION.to_string(),
        });
    };

    if stored == new_text {
        return Ok(ChangeResult {
            source: source.to_string(),
            changed: false,
            diff: String::new(),
        });
    }

    let report = diff_lines(&stored, &new_text);
    store.save(source, &new_text)?;
    Ok(ChangeResult {
        source: source.to_string(),
        changed: true,
        diff: report.render(),
    })
}

/// Evaluates every source sequentially in input order. Every source yields
/// exactly one result; a store failure aborts the run.
pub async fn run_once(
    sources: &[String],
    fetcher: &dyn PageFetcher,
    store: &SnapshotStore,
) -> Result<RunReport, StoreError> {
    let mut results = Vec::with_capacity(sources.len());
    for source in sources {
        info!("processing source: {source}");
        let fetched = match fetcher.fetch(source).await {
            Ok(body) => Some(body),
            Err(err) => {
                warn!("failed fetching {source}: {err:#}");
                None
            }
        };
        let result = evaluate_source(store, source, fetched.as_deref())?;
        if result.changed {
            info!("changes detected for {source}");
        } else {
            info!("no changes for {source}");
        }
        results.push(result);
    }
    Ok(RunReport {
        generated_at: Utc::now(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::{evaluate_source, run_once, FETCH_FAILED, NO_PREVIOUS_VERSION};
    use crate::fetch::PageFetcher;
    use crate::snapshot::store::SnapshotStore;

    struct StubFetcher {
        pages: HashMap<String, String>,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, source: &str) -> Result<String> {
            self.pages
                .get(source)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused: {source}"))
        }
    }

    #[test]
    fn first_evaluation_reports_changed_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        let result =
            evaluate_source(&store, "https://example.com", Some("<p>Hello</p>")).expect("evaluate");
        assert!(result.changed);
        assert_eq!(result.diff, NO_PREVIOUS_VERSION);
        assert!(store.load("https://example.com").expect("load").is_some());
    }

    #[test]
    fn fetch_failure_is_terminal_and_leaves_store_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        let result = evaluate_source(&store, "https://example.com", None).expect("evaluate");
        assert!(!result.changed);
        assert_eq!(result.diff, FETCH_FAILED);
        assert!(store.load("https://example.com").expect("load").is_none());
    }

    #[test]
    fn identical_content_reports_unchanged_with_empty_diff() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        let html = "<p>Hello</p><p>World</p>";
        evaluate_source(&store, "https://example.com", Some(html)).expect("first");
        let result = evaluate_source(&store, "https://example.com", Some(html)).expect("second");
        assert!(!result.changed);
        assert_eq!(result.diff, "");
    }

    #[test]
    fn changed_content_reports_diff_and_replaces_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        evaluate_source(&store, "https://example.com", Some("<p>Hello</p><p>World</p>"))
            .expect("first");
        let result =
            evaluate_source(&store, "https://example.com", Some("<p>Hello</p><p>Planet</p>"))
                .expect("second");
        assert!(result.changed);
        assert_eq!(result.diff, "+ Planet\n- World");
        let stored = store
            .load("https://example.com")
            .expect("load")
            .expect("snapshot");
        assert_eq!(stored.lines(), ["Hello", "Planet"]);
    }

    #[test]
    fn reordered_content_counts_as_changed_with_sentinel_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        evaluate_source(&store, "https://example.com", Some("<p>A</p><p>B</p>")).expect("first");
        let result = evaluate_source(&store, "https://example.com", Some("<p>B</p><p>A</p>"))
            .expect("second");
        assert!(result.changed);
        assert_eq!(result.diff, "No line changes.");
    }

    #[tokio::test]
    async fn run_produces_one_result_per_source_in_input_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("open");
        let sources = vec!["s1".to_string(), "s2".to_string()];
        let fetcher = StubFetcher::new(&[("s2", "<p>Hello</p><p>World</p>")]);

        let first = run_once(&sources, &fetcher, &store).await.expect("run");
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.results[0].source, "s1");
        assert_eq!(first.results[0].diff, FETCH_FAILED);
        assert!(!first.results[0].changed);
        assert!(first.results[1].changed);

        let fetcher = StubFetcher::new(&[("s2", "<p>Hello</p><p>Planet</p>")]);
        let second = run_once(&sources, &fetcher, &store).await.expect("run");
        assert_eq!(second.results[1].diff, "+ Planet\n- World");
        assert!(second.has_changes());
    }
}
