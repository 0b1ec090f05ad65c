//! Bounded worker pool that fetches (and optionally processes) leaf pages.
//!
//! Workers pull uris from a shared queue, fetch them with retry, run the
//! caller's handler on the body and send the outcome to a single collector.
//! Nothing but the collector writes to the result maps.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use scripturekit_shared::{FetchConfig, Language, Result, ScripturekitError};

use crate::http::HttpSource;
use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// FetchReport
// ---------------------------------------------------------------------------

/// Per-uri outcome of a fetch run.
#[derive(Debug)]
pub struct FetchReport<T> {
    /// Successfully fetched (and handled) uris.
    pub completed: HashMap<String, T>,
    /// Uris whose fetch or handler failed.
    pub failed: HashMap<String, ScripturekitError>,
    /// Uris never attempted because the run was cut short, in input order.
    pub abandoned: Vec<String>,
}

impl<T> Default for FetchReport<T> {
    fn default() -> Self {
        Self {
            completed: HashMap::new(),
            failed: HashMap::new(),
            abandoned: Vec::new(),
        }
    }
}

impl<T> FetchReport<T> {
    /// Number of distinct uris the run was asked for.
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len() + self.abandoned.len()
    }

    /// Whether every uri completed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.abandoned.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fixed-size pool of fetch workers.
#[derive(Debug, Clone)]
pub struct Fetcher {
    source: HttpSource,
    policy: RetryPolicy,
    workers: usize,
    failure_limit: Option<usize>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self::from_parts(
            HttpSource::from_config(config)?,
            RetryPolicy::from(&config.retry),
            config.workers,
        ))
    }

    pub fn from_parts(source: HttpSource, policy: RetryPolicy, workers: usize) -> Self {
        Self {
            source,
            policy,
            workers: workers.max(1),
            failure_limit: None,
        }
    }

    /// Stop taking new uris once more than `limit` have failed.
    pub fn with_failure_limit(mut self, limit: usize) -> Self {
        self.failure_limit = Some(limit);
        self
    }

    /// Fetch raw markup for every uri.
    pub async fn fetch_all(&self, uris: &[String], lang: &Language) -> FetchReport<String> {
        self.fetch_with(uris, lang, |_, body| Ok(body)).await
    }

    /// Fetch every uri and run `handler` on each body inside the worker.
    pub async fn fetch_with<T, H>(
        &self,
        uris: &[String],
        lang: &Language,
        handler: H,
    ) -> FetchReport<T>
    where
        T: Send + 'static,
        H: Fn(&str, String) -> Result<T> + Send + Sync + 'static,
    {
        self.fetch_observed(uris, lang, handler, |_, _| {}).await
    }

    /// Like [`Fetcher::fetch_with`], calling `on_done(uri, ok)` from the
    /// collector as each uri finishes.
    #[instrument(skip_all, fields(uris = uris.len(), lang = %lang, workers = self.workers))]
    pub async fn fetch_observed<T, H, O>(
        &self,
        uris: &[String],
        lang: &Language,
        handler: H,
        mut on_done: O,
    ) -> FetchReport<T>
    where
        T: Send + 'static,
        H: Fn(&str, String) -> Result<T> + Send + Sync + 'static,
        O: FnMut(&str, bool),
    {
        let mut seen = HashSet::new();
        let pending: VecDeque<String> = uris
            .iter()
            .filter(|uri| seen.insert(uri.as_str()))
            .cloned()
            .collect();

        let mut report = FetchReport::default();
        if pending.is_empty() {
            return report;
        }

        let worker_count = self.workers.min(pending.len());
        info!(pages = pending.len(), workers = worker_count, "starting fetch");

        let queue = Arc::new(Mutex::new(pending));
        let failures = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Result<T>)>();

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let worker = Worker {
                source: self.source.clone(),
                policy: self.policy.clone(),
                lang: lang.clone(),
                queue: queue.clone(),
                failures: failures.clone(),
                failure_limit: self.failure_limit,
                handler: handler.clone(),
                tx: tx.clone(),
            };
            set.spawn(worker.run());
        }
        drop(tx);

        while let Some((uri, outcome)) = rx.recv().await {
            match outcome {
                Ok(value) => {
                    debug!(%uri, "page done");
                    on_done(&uri, true);
                    report.completed.insert(uri, value);
                }
                Err(e) => {
                    warn!(%uri, error = %e, "page failed");
                    on_done(&uri, false);
                    report.failed.insert(uri, e);
                }
            }
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "fetch worker aborted");
            }
        }

        report.abandoned = queue.lock().await.drain(..).collect();
        if !report.abandoned.is_empty() {
            warn!(
                abandoned = report.abandoned.len(),
                failed = report.failed.len(),
                "failure limit exceeded, remaining pages abandoned"
            );
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            abandoned = report.abandoned.len(),
            "fetch finished"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker<T, H> {
    source: HttpSource,
    policy: RetryPolicy,
    lang: Language,
    queue: Arc<Mutex<VecDeque<String>>>,
    failures: Arc<AtomicUsize>,
    failure_limit: Option<usize>,
    handler: Arc<H>,
    tx: mpsc::UnboundedSender<(String, Result<T>)>,
}

impl<T, H> Worker<T, H>
where
    H: Fn(&str, String) -> Result<T>,
{
    async fn run(self) {
        loop {
            if self.limit_exceeded() {
                break;
            }
            let Some(uri) = self.queue.lock().await.pop_front() else {
                break;
            };

            let outcome = self.process(&uri).await;
            if outcome.is_err() {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
            if self.tx.send((uri, outcome)).is_err() {
                break;
            }
        }
    }

    /// Fetch and handle one uri as a unit. A transient error from either
    /// step refetches the page within the same retry budget.
    async fn process(&self, uri: &str) -> Result<T> {
        self.policy
            .run(uri, move || async move {
                let body = self.source.get(uri, &self.lang).await?;
                (self.handler)(uri, body)
            })
            .await
    }

    fn limit_exceeded(&self) -> bool {
        self.failure_limit
            .is_some_and(|limit| self.failures.load(Ordering::SeqCst) > limit)
    }
}
