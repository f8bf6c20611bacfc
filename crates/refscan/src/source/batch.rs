use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::info;

use super::embed::{EmbedExtractor, ItemOutcome};
use super::pool::run_bounded;
use crate::extractor::FailureReason;

pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(25);

type ProgressHook = Arc<dyn Fn(&ItemOutcome) + Send + Sync>;

/// Outcomes of a batch, one per input item, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Extracts references from many embed pages on a bounded pool of workers.
///
/// A failing or slow item only affects its own outcome.
pub struct BatchRunner {
    extractor: Arc<EmbedExtractor>,
    max_concurrent: usize,
    item_timeout: Duration,
    referer: Option<String>,
    progress: Option<ProgressHook>,
}

impl BatchRunner {
    pub fn new(extractor: Arc<EmbedExtractor>) -> Self {
        Self {
            extractor,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
            referer: None,
            progress: None,
        }
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    pub fn referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    /// Called once per finished item, from the collecting task.
    pub fn on_progress<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ItemOutcome) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(hook));
        self
    }

    pub async fn run(&self, urls: Vec<String>) -> BatchReport {
        let total = urls.len();
        let extractor = Arc::clone(&self.extractor);
        let referer = self.referer.clone();
        let item_timeout = self.item_timeout;
        let progress = self.progress.clone();

        let finished = run_bounded(
            urls.clone(),
            self.max_concurrent,
            move |url: String| {
                let extractor = Arc::clone(&extractor);
                let referer = referer.clone();
                async move {
                    match timeout(item_timeout, extractor.extract(&url, referer.as_deref())).await {
                        Ok(outcome) => outcome,
                        Err(_) => ItemOutcome::empty(
                            url,
                            FailureReason::Fetch,
                            format!("timed out after {} seconds", item_timeout.as_secs()),
                        ),
                    }
                }
            },
            |outcome| {
                if let Some(hook) = &progress {
                    hook(outcome);
                }
            },
        )
        .await;

        // workers that died without an outcome still get a marker
        let mut slots: Vec<Option<ItemOutcome>> = vec![None; total];
        for (index, outcome) in finished {
            slots[index] = Some(outcome);
        }
        let outcomes: Vec<ItemOutcome> = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| {
                    ItemOutcome::empty(url, FailureReason::Fetch, "worker task aborted")
                })
            })
            .collect();

        let report = BatchReport { outcomes };
        info!(
            "batch finished: {} item(s), {} succeeded, {} failed",
            report.len(),
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }
}
