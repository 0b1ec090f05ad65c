//! Application configuration for scripturekit.
//!
//! User config lives at `~/.scripturekit/scripturekit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScripturekitError};
use crate::language::Language;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "scripturekit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".scripturekit";

/// Origin serving the scripture pages.
pub const DEFAULT_BASE_URL: &str = "https://www.churchofjesuschrist.org";

/// Path prefix under which publications live.
pub const SCRIPTURES_PATH: &str = "/study/scriptures";

// ---------------------------------------------------------------------------
// Config structs (matching scripturekit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Languages to process. Every supported language when empty.
    #[serde(default)]
    pub languages: Vec<Language>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-request retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Publications to process.
    #[serde(default = "default_publications")]
    pub publications: Vec<PublicationConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            defaults: DefaultsConfig::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            publications: default_publications(),
        }
    }
}

impl AppConfig {
    /// Languages to process, falling back to every supported language.
    pub fn resolved_languages(&self) -> Vec<Language> {
        if self.languages.is_empty() {
            Language::all()
        } else {
            self.languages.clone()
        }
    }

    /// Look up a configured publication by slug.
    pub fn publication(&self, slug: &str) -> Option<&PublicationConfig> {
        self.publications.iter().find(|p| p.slug == slug)
    }

    /// Parse the configured origin.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.defaults.base_url).map_err(|e| {
            ScripturekitError::config(format!(
                "invalid base_url '{}': {e}",
                self.defaults.base_url
            ))
        })
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Origin serving the publication pages.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory documents are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Number of concurrent fetch workers per publication.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fraction of leaf pages allowed to fail before a publication is abandoned.
    #[serde(default = "default_max_failure_ratio")]
    pub max_failure_ratio: f64,

    /// Maximum nesting depth of the navigation tree.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Attempts per publication before reporting it failed.
    #[serde(default = "default_publication_attempts")]
    pub publication_attempts: u32,

    /// Pause between publication attempts, in seconds.
    #[serde(default = "default_publication_retry_delay")]
    pub publication_retry_delay_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            workers: default_workers(),
            max_failure_ratio: default_max_failure_ratio(),
            max_depth: default_max_depth(),
            publication_attempts: default_publication_attempts(),
            publication_retry_delay_secs: default_publication_retry_delay(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_output_dir() -> String {
    "output".into()
}
fn default_workers() -> usize {
    20
}
fn default_max_failure_ratio() -> f64 {
    0.1
}
fn default_max_depth() -> usize {
    16
}
fn default_publication_attempts() -> u32 {
    3
}
fn default_publication_retry_delay() -> u64 {
    10
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for the exponential delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Random extra delay added to each wait, up to this many ms.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter_ms() -> u64 {
    250
}

/// `[[publications]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationConfig {
    /// Short name, e.g. `bofm`. Used in output file names.
    pub slug: String,

    /// Navigation root; `/study/scriptures/<slug>` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_uri: Option<String>,

    /// Content uris left out of the document.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl PublicationConfig {
    /// A publication under the default scriptures path with no exclusions.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            root_uri: None,
            exclude: Vec::new(),
        }
    }

    pub fn root_uri(&self) -> String {
        self.root_uri
            .clone()
            .unwrap_or_else(|| format!("{SCRIPTURES_PATH}/{}", self.slug))
    }
}

fn default_publications() -> Vec<PublicationConfig> {
    vec![PublicationConfig {
        slug: "bofm".into(),
        root_uri: None,
        exclude: vec![format!("{SCRIPTURES_PATH}/bofm/illustrations")],
    }]
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration shared by discovery and the fetch pool.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the content uris are resolved against.
    pub base_url: Url,
    /// Concurrent workers.
    pub workers: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Redirects followed per request.
    pub max_redirects: usize,
    /// Retry settings.
    pub retry: RetryConfig,
}

impl FetchConfig {
    /// Build from the app config, validating the origin.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            workers: config.defaults.workers.max(1),
            timeout: Duration::from_secs(config.http.timeout_secs),
            max_redirects: config.http.max_redirects,
            retry: config.retry.clone(),
        })
    }
}

/// Runtime configuration for one publication run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    /// Fraction of leaf pages allowed to fail.
    pub max_failure_ratio: f64,
    /// Maximum nesting depth of the navigation tree.
    pub max_depth: usize,
    /// Attempts per publication.
    pub publication_attempts: u32,
    /// Pause between publication attempts.
    pub publication_retry_delay: Duration,
    /// Rewrite documents that already exist at the sink.
    pub overwrite: bool,
}

impl PipelineConfig {
    /// Build from the app config, validating the origin.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        let ratio = config.defaults.max_failure_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ScripturekitError::config(format!(
                "max_failure_ratio must be between 0 and 1, got {ratio}"
            )));
        }

        Ok(Self {
            fetch: FetchConfig::from_app(config)?,
            max_failure_ratio: ratio,
            max_depth: config.defaults.max_depth,
            publication_attempts: config.defaults.publication_attempts.max(1),
            publication_retry_delay: Duration::from_secs(
                config.defaults.publication_retry_delay_secs,
            ),
            overwrite: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.scripturekit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScripturekitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.scripturekit/scripturekit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScripturekitError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ScripturekitError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScripturekitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScripturekitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScripturekitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("bofm/illustrations"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.workers, 20);
        assert_eq!(parsed.retry.max_attempts, 5);
        assert_eq!(parsed.publications.len(), 1);
    }

    #[test]
    fn config_with_publications_and_languages() {
        let toml_str = r#"
languages = ["eng", "spa"]

[defaults]
workers = 4

[[publications]]
slug = "dc-testament"
root_uri = "/study/scriptures/dc-testament"

[[publications]]
slug = "pgp"
exclude = ["/study/scriptures/pgp/facsimiles"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.workers, 4);
        assert_eq!(config.defaults.max_failure_ratio, 0.1);
        assert_eq!(config.resolved_languages().len(), 2);
        assert_eq!(config.publications.len(), 2);
        assert_eq!(
            config.publication("pgp").map(|p| p.root_uri()),
            Some("/study/scriptures/pgp".to_string())
        );
        assert_eq!(config.publications[1].exclude.len(), 1);
    }

    #[test]
    fn invalid_language_in_config_is_rejected() {
        let result: std::result::Result<AppConfig, _> = toml::from_str(r#"languages = ["english"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_languages_resolve_to_all_supported() {
        let config = AppConfig::default();
        assert_eq!(
            config.resolved_languages().len(),
            crate::language::SUPPORTED_LANGUAGES.len()
        );
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from_app(&app).expect("valid defaults");
        assert_eq!(pipeline.fetch.workers, 20);
        assert_eq!(pipeline.fetch.timeout, Duration::from_secs(30));
        assert_eq!(pipeline.publication_attempts, 3);
        assert_eq!(pipeline.fetch.base_url.as_str(), "https://www.churchofjesuschrist.org/");
    }

    #[test]
    fn pipeline_config_rejects_bad_ratio() {
        let mut app = AppConfig::default();
        app.defaults.max_failure_ratio = 1.5;
        let err = PipelineConfig::from_app(&app).unwrap_err();
        assert!(err.to_string().contains("max_failure_ratio"));
    }

    #[test]
    fn pipeline_config_rejects_bad_base_url() {
        let mut app = AppConfig::default();
        app.defaults.base_url = "not a url".into();
        assert!(PipelineConfig::from_app(&app).is_err());
    }
}
