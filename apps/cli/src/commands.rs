//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use scripturekit_core::{
    Job, Pipeline, ProgressReporter, PublicationOutcome, PublicationStatus,
};
use scripturekit_shared::{
    AppConfig, Language, PipelineConfig, PublicationConfig, SUPPORTED_LANGUAGES, init_config,
    load_config, load_config_from,
};

use crate::sink::JsonFileSink;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// scripturekit — turn scripture publications into structured JSON documents.
#[derive(Parser)]
#[command(
    name = "scripturekit",
    version,
    about = "Download scripture publications as structured JSON documents, one per language.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.scripturekit/scripturekit.toml.
    #[arg(long, env = "SCRIPTUREKIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download publications and write one document per language.
    Fetch {
        /// Publication slug, e.g. `bofm` (repeatable). Defaults to the configured publications.
        #[arg(short, long = "publication")]
        publications: Vec<String>,

        /// Language code, e.g. `eng` (repeatable). Defaults to the configured languages.
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Output directory (defaults to `output_dir` from the config).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Concurrent page downloads per publication.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Rewrite documents that already exist.
        #[arg(long)]
        force: bool,
    },

    /// List the supported language codes.
    Languages,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "scripturekit=info",
        1 => "scripturekit=debug",
        _ => "scripturekit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Fetch {
            publications,
            languages,
            out,
            workers,
            force,
        } => {
            let config = load(config_path.as_deref())?;
            let args = FetchArgs {
                publications,
                languages,
                out,
                workers,
                force,
            };
            cmd_fetch(config, args).await
        }
        Command::Languages => cmd_languages(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

struct FetchArgs {
    publications: Vec<String>,
    languages: Vec<String>,
    out: Option<PathBuf>,
    workers: Option<usize>,
    force: bool,
}

async fn cmd_fetch(mut config: AppConfig, args: FetchArgs) -> Result<()> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(eyre!("--workers must be at least 1"));
        }
        config.defaults.workers = workers;
    }

    let languages = resolve_languages(&config, &args.languages)?;
    let publications = resolve_publications(&config, &args.publications);
    let jobs = Job::matrix(&languages, &publications);

    let out_dir = args
        .out
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    let sink = JsonFileSink::new(out_dir);

    let mut pipeline_config = PipelineConfig::from_app(&config)?;
    pipeline_config.overwrite = args.force;
    let pipeline = Pipeline::new(pipeline_config)?;

    info!(
        jobs = jobs.len(),
        languages = languages.len(),
        publications = publications.len(),
        out = %sink.dir().display(),
        force = args.force,
        "starting batch"
    );

    let reporter = CliProgress::new();
    let outcomes = pipeline.run_batch(&jobs, &sink, &reporter).await;
    reporter.finish();

    print_summary(&outcomes, &sink);

    let failed = outcomes
        .iter()
        .filter(|o| o.status == PublicationStatus::Failed)
        .count();
    if failed > 0 {
        return Err(eyre!("{failed} of {} publication(s) failed", outcomes.len()));
    }
    Ok(())
}

fn resolve_languages(config: &AppConfig, requested: &[String]) -> Result<Vec<Language>> {
    if requested.is_empty() {
        return Ok(config.resolved_languages());
    }

    let mut languages = Vec::with_capacity(requested.len());
    for code in requested {
        let language: Language = code.parse()?;
        if !language.is_supported() {
            warn!(%language, "language is not in the supported list, trying anyway");
        }
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(languages)
}

fn resolve_publications(config: &AppConfig, requested: &[String]) -> Vec<PublicationConfig> {
    if requested.is_empty() {
        return config.publications.clone();
    }

    requested
        .iter()
        .map(|slug| {
            config
                .publication(slug)
                .cloned()
                .unwrap_or_else(|| PublicationConfig::new(slug.as_str()))
        })
        .collect()
}

fn print_summary(outcomes: &[PublicationOutcome], sink: &JsonFileSink) {
    let counts = |status: PublicationStatus| outcomes.iter().filter(|o| o.status == status).count();

    println!();
    println!(
        "  {:<8}  {:<24}  {:>8}  {:>7}  {}",
        "STATUS", "DOCUMENT", "ATTEMPTS", "TIME", "NOTES"
    );
    for outcome in outcomes {
        let name = format!("{}-{}", outcome.publication, outcome.language);
        let notes = match outcome.status {
            PublicationStatus::Failed => outcome.error.clone().unwrap_or_default(),
            PublicationStatus::Partial => format!("{} warning(s)", outcome.warnings.len()),
            PublicationStatus::Skipped => "already present".to_string(),
            PublicationStatus::Success => String::new(),
        };
        println!(
            "  {:<8}  {:<24}  {:>8}  {:>6.1}s  {}",
            outcome.status,
            name,
            outcome.attempts,
            outcome.elapsed.as_secs_f64(),
            notes
        );
        for uri in outcome.failed_uris() {
            println!("  {:<8}  {:<24}  {:>8}  {:>7}  missing {uri}", "", "", "", "");
        }
    }
    println!();
    println!(
        "  {} succeeded, {} partial, {} skipped, {} failed. Output: {}",
        counts(PublicationStatus::Success),
        counts(PublicationStatus::Partial),
        counts(PublicationStatus::Skipped),
        counts(PublicationStatus::Failed),
        sink.dir().display()
    );
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn job_started(&self, job: &Job, index: usize, total: usize) {
        self.spinner
            .set_prefix(format!("[{index}/{total}] {}-{}", job.slug(), job.language));
    }

    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_done(&self, uri: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {uri}"));
    }

    fn job_finished(&self, outcome: &PublicationOutcome) {
        self.spinner.println(format!(
            "  {:<8} {}-{}",
            outcome.status, outcome.publication, outcome.language
        ));
    }
}

// ---------------------------------------------------------------------------
// languages / config
// ---------------------------------------------------------------------------

fn cmd_languages() -> Result<()> {
    for row in SUPPORTED_LANGUAGES.chunks(12) {
        println!("{}", row.join(" "));
    }
    println!();
    println!("{} languages", SUPPORTED_LANGUAGES.len());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
