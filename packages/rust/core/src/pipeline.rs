//! End-to-end pipeline: navigation → fetch + parse → assemble → document.
//!
//! [`Pipeline::process_publication`] handles one (language, publication)
//! pair. [`Pipeline::run_batch`] drives many pairs, skipping documents the
//! sink already has, retrying publications that fail as a whole, and
//! isolating each pair's failure from the rest of the batch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use scripturekit_crawler::Fetcher;
use scripturekit_discovery::Discoverer;
use scripturekit_parser::parse_content;
use scripturekit_shared::{Document, Language, PipelineConfig, PublicationConfig, Result};

use crate::assembler::{self, AssemblyWarning};
use crate::toc;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Destination for assembled documents.
pub trait DocumentSink: Send + Sync {
    /// Whether a document for the pair is already present.
    fn exists(&self, language: &Language, publication: &str) -> Result<bool>;
    /// Store the document for the pair, replacing any previous one.
    fn write(&self, language: &Language, publication: &str, document: &Document) -> Result<()>;
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a pair starts; `index` is 1-based.
    fn job_started(&self, job: &Job, index: usize, total: usize);
    /// Called when entering a new phase of the current pair.
    fn phase(&self, name: &str);
    /// Called as each leaf page finishes.
    fn page_done(&self, uri: &str, current: usize, total: usize);
    /// Called when a pair reaches its final status.
    fn job_finished(&self, outcome: &PublicationOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn job_started(&self, _job: &Job, _index: usize, _total: usize) {}
    fn phase(&self, _name: &str) {}
    fn page_done(&self, _uri: &str, _current: usize, _total: usize) {}
    fn job_finished(&self, _outcome: &PublicationOutcome) {}
}

// ---------------------------------------------------------------------------
// Jobs and outcomes
// ---------------------------------------------------------------------------

/// One (language, publication) pair to process.
#[derive(Debug, Clone)]
pub struct Job {
    pub language: Language,
    pub publication: PublicationConfig,
}

impl Job {
    pub fn new(language: Language, publication: PublicationConfig) -> Self {
        Self {
            language,
            publication,
        }
    }

    /// Every pair of `languages` × `publications`, publication-major.
    pub fn matrix(languages: &[Language], publications: &[PublicationConfig]) -> Vec<Self> {
        publications
            .iter()
            .flat_map(|publication| {
                languages
                    .iter()
                    .map(|language| Self::new(language.clone(), publication.clone()))
            })
            .collect()
    }

    pub fn slug(&self) -> &str {
        &self.publication.slug
    }
}

/// Final status of one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    /// Every leaf is in the document.
    Success,
    /// Written, with some leaves omitted or records dropped.
    Partial,
    /// No document was produced.
    Failed,
    /// The sink already had a document.
    Skipped,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of processing one publication.
#[derive(Debug, Clone)]
pub struct PublicationReport {
    pub language: Language,
    pub publication: String,
    pub document: Document,
    pub warnings: Vec<AssemblyWarning>,
    pub elapsed: Duration,
}

impl PublicationReport {
    pub fn status(&self) -> PublicationStatus {
        if self.warnings.is_empty() {
            PublicationStatus::Success
        } else {
            PublicationStatus::Partial
        }
    }
}

/// What a batch reports for each pair.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationOutcome {
    pub language: Language,
    pub publication: String,
    pub status: PublicationStatus,
    pub warnings: Vec<AssemblyWarning>,
    /// Fatal error of the last attempt, for failed pairs.
    pub error: Option<String>,
    pub attempts: u32,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PublicationOutcome {
    fn new(job: &Job, status: PublicationStatus) -> Self {
        Self {
            language: job.language.clone(),
            publication: job.publication.slug.clone(),
            status,
            warnings: Vec::new(),
            error: None,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Leaf uris that are not in the document.
    pub fn failed_uris(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter(|w| w.kind.is_omission())
            .map(|w| w.uri.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    discoverer: Discoverer,
    fetcher: Fetcher,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            discoverer: Discoverer::new(&config.fetch, config.max_depth)?,
            fetcher: Fetcher::new(&config.fetch)?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover, fetch, parse and assemble one publication.
    #[instrument(skip_all, fields(publication = %job.publication.slug, lang = %job.language))]
    pub async fn process_publication(
        &self,
        job: &Job,
        progress: &dyn ProgressReporter,
    ) -> Result<PublicationReport> {
        let start = Instant::now();
        let root_uri = job.publication.root_uri();

        progress.phase("Discovering navigation");
        let discovered = self
            .discoverer
            .discover(&root_uri, &job.language, &job.publication.exclude)
            .await?;

        let uris = toc::content_uris(&discovered.structure);
        let total = uris.len();
        let (sections, contents) = toc::count_nodes(&discovered.structure);
        info!(sections, contents, pages = total, "navigation discovered");
        let failure_limit = (self.config.max_failure_ratio * total as f64).floor() as usize;

        progress.phase("Fetching pages");
        let mut done = 0;
        let report = self
            .fetcher
            .clone()
            .with_failure_limit(failure_limit)
            .fetch_observed(
                &uris,
                &job.language,
                |uri, body| parse_content(uri, &body),
                |uri, _ok| {
                    done += 1;
                    progress.page_done(uri, done, total);
                },
            )
            .await;

        let mut failures: HashMap<String, String> = report
            .failed
            .into_iter()
            .map(|(uri, e)| (uri, e.to_string()))
            .collect();
        failures.extend(
            report
                .abandoned
                .into_iter()
                .map(|uri| (uri, "abandoned after too many failures".to_string())),
        );

        progress.phase("Assembling document");
        let assembly = assembler::assemble(
            &discovered.title,
            &discovered.uri,
            discovered.structure,
            report.completed,
            &failures,
            self.config.max_failure_ratio,
        )?;

        let elapsed = start.elapsed();
        info!(
            contents = assembly.document.contents.len(),
            warnings = assembly.warnings.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "publication processed"
        );

        Ok(PublicationReport {
            language: job.language.clone(),
            publication: job.publication.slug.clone(),
            document: assembly.document,
            warnings: assembly.warnings,
            elapsed,
        })
    }

    /// Process every job in order. A failing job never stops the batch.
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    pub async fn run_batch(
        &self,
        jobs: &[Job],
        sink: &dyn DocumentSink,
        progress: &dyn ProgressReporter,
    ) -> Vec<PublicationOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            progress.job_started(job, i + 1, jobs.len());
            let outcome = self.run_job(job, sink, progress).await;
            progress.job_finished(&outcome);
            outcomes.push(outcome);
        }

        let failed = outcomes
            .iter()
            .filter(|o| o.status == PublicationStatus::Failed)
            .count();
        info!(total = outcomes.len(), failed, "batch finished");
        outcomes
    }

    async fn run_job(
        &self,
        job: &Job,
        sink: &dyn DocumentSink,
        progress: &dyn ProgressReporter,
    ) -> PublicationOutcome {
        let start = Instant::now();

        if !self.config.overwrite {
            match sink.exists(&job.language, job.slug()) {
                Ok(true) => {
                    info!(publication = job.slug(), lang = %job.language, "document exists, skipping");
                    return PublicationOutcome::new(job, PublicationStatus::Skipped);
                }
                Ok(false) => {}
                Err(e) => {
                    let mut outcome = PublicationOutcome::new(job, PublicationStatus::Failed);
                    outcome.error = Some(e.to_string());
                    return outcome;
                }
            }
        }

        let max_attempts = self.config.publication_attempts.max(1);
        let mut outcome = PublicationOutcome::new(job, PublicationStatus::Failed);

        for attempt in 1..=max_attempts {
            outcome.attempts = attempt;
            match self.process_publication(job, progress).await {
                Ok(report) => {
                    outcome.status = report.status();
                    outcome.warnings = report.warnings;
                    outcome.error = None;
                    if let Err(e) = sink.write(&job.language, job.slug(), &report.document) {
                        warn!(publication = job.slug(), lang = %job.language, error = %e, "failed to write document");
                        outcome.status = PublicationStatus::Failed;
                        outcome.error = Some(e.to_string());
                    }
                    break;
                }
                Err(e) => {
                    warn!(
                        publication = job.slug(),
                        lang = %job.language,
                        attempt,
                        max_attempts,
                        error = %e,
                        "publication failed"
                    );
                    outcome.error = Some(e.to_string());
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.publication_retry_delay).await;
                    }
                }
            }
        }

        outcome.elapsed = start.elapsed();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use scripturekit_parser::testing::{
        content_entry, content_page, linked_section_entry, nav_page, paragraphs_body,
        section_entry, verses_body,
    };
    use scripturekit_shared::{AppConfig, ContentKind, ScripturekitError};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROOT: &str = "/study/scriptures/bofm";

    #[derive(Default)]
    struct MemorySink {
        documents: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemorySink {
        fn key(language: &Language, publication: &str) -> String {
            format!("{publication}-{language}")
        }

        fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.documents.lock().unwrap().get(key).cloned()
        }
    }

    impl DocumentSink for MemorySink {
        fn exists(&self, language: &Language, publication: &str) -> Result<bool> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .contains_key(&Self::key(language, publication)))
        }

        fn write(&self, language: &Language, publication: &str, document: &Document) -> Result<()> {
            self.documents
                .lock()
                .unwrap()
                .insert(Self::key(language, publication), document.to_json_pretty()?);
            Ok(())
        }
    }

    fn eng() -> Language {
        "eng".parse().unwrap()
    }

    fn pipeline(server: &MockServer, max_failure_ratio: f64) -> Pipeline {
        let mut app = AppConfig::default();
        app.defaults.base_url = server.uri();
        app.defaults.workers = 4;
        app.defaults.max_failure_ratio = max_failure_ratio;
        app.defaults.publication_attempts = 2;
        app.defaults.publication_retry_delay_secs = 0;
        app.retry.max_attempts = 2;
        app.retry.base_delay_ms = 1;
        app.retry.max_delay_ms = 1;
        app.retry.jitter_ms = 0;
        Pipeline::new(PipelineConfig::from_app(&app).unwrap()).unwrap()
    }

    fn job() -> Job {
        Job::new(eng(), PublicationConfig::new("bofm"))
    }

    async fn serve(server: &MockServer, uri: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(uri))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Root with two sections: one inline with two chapters, one linked
    /// section holding a single figure page.
    async fn mount_publication(server: &MockServer) {
        serve(
            server,
            ROOT,
            nav_page(
                "Book of Mormon",
                ROOT,
                json!([
                    section_entry(
                        "1 Nephi",
                        Some("/study/scriptures/bofm/1-ne"),
                        json!([
                            content_entry("1 Nephi 1", "/study/scriptures/bofm/1-ne/1"),
                            content_entry("1 Nephi 2", "/study/scriptures/bofm/1-ne/2"),
                        ])
                    ),
                    linked_section_entry("Witnesses", "/study/scriptures/bofm/witnesses"),
                ]),
            ),
        )
        .await;
        serve(
            server,
            "/study/scriptures/bofm/witnesses",
            nav_page(
                "Witnesses",
                "/study/scriptures/bofm/witnesses",
                json!([content_entry("Three Witnesses", "/study/scriptures/bofm/three")]),
            ),
        )
        .await;
        serve(
            server,
            "/study/scriptures/bofm/1-ne/1",
            content_page(
                "1 Nephi 1",
                Some("chapter"),
                &verses_body("Chapter 1", &["I, Nephi.", "Yea, I make a record."]),
            ),
        )
        .await;
        serve(
            server,
            "/study/scriptures/bofm/three",
            content_page(
                "The Testimony of Three Witnesses",
                Some("figure"),
                &paragraphs_body(&["Be it known unto all nations.", "Oliver Cowdery"]),
            ),
        )
        .await;
    }

    async fn mount_second_chapter(server: &MockServer) {
        serve(
            server,
            "/study/scriptures/bofm/1-ne/2",
            content_page(
                "1 Nephi 2",
                Some("chapter"),
                &verses_body("Chapter 2", &["For behold, it came to pass."]),
            ),
        )
        .await;
    }

    #[tokio::test]
    async fn builds_document_for_publication() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        mount_second_chapter(&server).await;

        let report = pipeline(&server, 0.1)
            .process_publication(&job(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.status(), PublicationStatus::Success);
        let doc = &report.document;
        assert_eq!(doc.title, "Book of Mormon");
        assert_eq!(doc.uri, ROOT);
        assert_eq!(doc.structure.len(), 2);
        assert_eq!(doc.structure[0].entries().len(), 2);
        assert_eq!(doc.structure[1].entries().len(), 1);
        assert_eq!(doc.contents.len(), 3);

        let chapter = &doc.contents["/study/scriptures/bofm/1-ne/1"];
        assert_eq!(chapter.kind, ContentKind::Chapter);
        assert_eq!(chapter.body.verses().map(|v| v.len()), Some(2));
        let figure = &doc.contents["/study/scriptures/bofm/three"];
        assert_eq!(figure.kind, ContentKind::Figure);
        assert_eq!(figure.body.paragraphs().map(|v| v.len()), Some(2));

        assert_eq!(
            toc::content_uris(&doc.structure),
            doc.contents.keys().cloned().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn page_served_without_state_is_fetched_again() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        Mock::given(path("/study/scriptures/bofm/1-ne/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<html><body><div id="app"></div></body></html>"#),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_second_chapter(&server).await;

        let report = pipeline(&server, 0.1)
            .process_publication(&job(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.status(), PublicationStatus::Success);
        assert!(report.warnings.is_empty());
        let chapter = &report.document.contents["/study/scriptures/bofm/1-ne/2"];
        assert_eq!(chapter.body.verses().map(|v| v.len()), Some(1));
    }

    #[tokio::test]
    async fn missing_page_is_reported_and_siblings_survive() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        Mock::given(path("/study/scriptures/bofm/1-ne/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let report = pipeline(&server, 0.5)
            .process_publication(&job(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.status(), PublicationStatus::Partial);
        assert_eq!(report.document.contents.len(), 2);
        assert!(!report.document.contents.contains_key("/study/scriptures/bofm/1-ne/2"));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].uri, "/study/scriptures/bofm/1-ne/2");
        assert!(report.warnings[0].reason.contains("404"));
    }

    #[tokio::test]
    async fn output_is_idempotent() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        mount_second_chapter(&server).await;

        let pipeline = pipeline(&server, 0.1);
        let first = pipeline.process_publication(&job(), &SilentProgress).await.unwrap();
        let second = pipeline.process_publication(&job(), &SilentProgress).await.unwrap();

        assert_eq!(
            first.document.to_json_pretty().unwrap(),
            second.document.to_json_pretty().unwrap()
        );
    }

    #[tokio::test]
    async fn failure_threshold_fails_publication() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        Mock::given(path("/study/scriptures/bofm/1-ne/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = pipeline(&server, 0.1)
            .process_publication(&job(), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ScripturekitError::Assembly { .. }));
    }

    #[tokio::test]
    async fn batch_writes_documents_and_isolates_failures() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        mount_second_chapter(&server).await;
        Mock::given(path("/study/scriptures/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let jobs = vec![
            Job::new(eng(), PublicationConfig::new("missing")),
            job(),
        ];
        let sink = MemorySink::default();
        let outcomes = pipeline(&server, 0.1)
            .run_batch(&jobs, &sink, &SilentProgress)
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, PublicationStatus::Failed);
        assert_eq!(outcomes[0].attempts, 2);
        assert!(outcomes[0].error.as_deref().unwrap().contains("discovery error"));
        assert_eq!(outcomes[1].status, PublicationStatus::Success);
        assert_eq!(outcomes[1].attempts, 1);

        let written = sink.get("bofm-eng").unwrap();
        let doc: Document = serde_json::from_slice(&written).unwrap();
        assert_eq!(doc.contents.len(), 3);
        assert!(sink.get("missing-eng").is_none());
    }

    #[tokio::test]
    async fn existing_documents_are_skipped_unless_overwriting() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        mount_second_chapter(&server).await;

        let sink = MemorySink::default();
        sink.documents
            .lock()
            .unwrap()
            .insert("bofm-eng".into(), b"{}".to_vec());

        let outcomes = pipeline(&server, 0.1)
            .run_batch(&[job()], &sink, &SilentProgress)
            .await;
        assert_eq!(outcomes[0].status, PublicationStatus::Skipped);
        assert_eq!(sink.get("bofm-eng").unwrap(), b"{}".to_vec());

        let mut overwriting = pipeline(&server, 0.1);
        overwriting.config.overwrite = true;
        let outcomes = overwriting.run_batch(&[job()], &sink, &SilentProgress).await;
        assert_eq!(outcomes[0].status, PublicationStatus::Success);
        assert_ne!(sink.get("bofm-eng").unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn partial_outcome_lists_failed_uris() {
        let server = MockServer::start().await;
        mount_publication(&server).await;
        Mock::given(path("/study/scriptures/bofm/1-ne/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let sink = MemorySink::default();
        let outcomes = pipeline(&server, 0.5)
            .run_batch(&[job()], &sink, &SilentProgress)
            .await;

        assert_eq!(outcomes[0].status, PublicationStatus::Partial);
        assert_eq!(outcomes[0].failed_uris(), vec!["/study/scriptures/bofm/1-ne/2"]);
        assert!(sink.get("bofm-eng").is_some());
    }

    #[test]
    fn job_matrix_is_publication_major() {
        let languages = vec![eng(), "spa".parse().unwrap()];
        let publications = vec![PublicationConfig::new("bofm"), PublicationConfig::new("dc-testament")];
        let jobs = Job::matrix(&languages, &publications);
        let pairs: Vec<(String, String)> = jobs
            .iter()
            .map(|j| (j.slug().to_string(), j.language.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bofm".to_string(), "eng".to_string()),
                ("bofm".to_string(), "spa".to_string()),
                ("dc-testament".to_string(), "eng".to_string()),
                ("dc-testament".to_string(), "spa".to_string()),
            ]
        );
    }
}
