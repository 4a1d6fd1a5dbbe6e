//! prsync CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse flags and configuration**: read the YAML file named by
//!    `--config` and validate it (see [`config`]).
//! 2. **Wire observability**: install `tracing-subscriber` with a text or
//!    JSON layer and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: build the [`github::GithubClient`] and
//!    check that the API endpoint answers with the given token.
//! 4. **Run once**: perform one synchronization pass with [`board::run`],
//!    racing it against Ctrl-C, and print the summary.

mod config;
mod observability;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use board::{RepositoryService, RunSummary};
use clap::Parser;
use github::GithubClient;
use tracing::{error, info};

use crate::observability::LogFormat;

#[derive(Parser)]
#[command(
    name = "prsync",
    version,
    about = "Keep a GitHub Projects board in sync with a roster's pull requests",
    long_about = None,
)]
struct Args {
    /// Path to the config file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log every change without making it.
    #[arg(long)]
    dry_run: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    verbose: bool,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("config", &self.config)
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .field("log_format", &self.log_format)
            .field("github_token", &"<redacted>")
            .finish()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let telemetry = match observability::init(args.log_format, args.verbose) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    // Dropping the run future on Ctrl-C abandons the in-flight request.
    let result = tokio::select! {
        result = run(&args) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    };

    let code = match result.and_then(|summary| render_summary(&summary, args.log_format)) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(args: &Args) -> anyhow::Result<RunSummary> {
    if args.github_token.is_empty() {
        bail!("GITHUB_TOKEN is required");
    }

    let settings = config::load(&args.config)?;
    let mut sync = settings.sync;
    sync.dry_run = args.dry_run;
    info!(
        config = %args.config.display(),
        project = %sync.project,
        repositories = sync.repositories.len(),
        dry_run = sync.dry_run,
        "configuration loaded"
    );

    let client = GithubClient::new(settings.endpoint.clone(), &args.github_token)?;
    let login = client
        .check_endpoint()
        .await
        .with_context(|| format!("error checking API endpoint {}", settings.endpoint))?;
    info!(%login, endpoint = %settings.endpoint, "authenticated");

    let service: Arc<dyn RepositoryService> = Arc::new(client);
    Ok(board::run(service, &sync).await?)
}

fn render_summary(summary: &RunSummary, format: LogFormat) -> anyhow::Result<String> {
    match format {
        LogFormat::Json => Ok(serde_json::to_string(summary)?),
        LogFormat::Text => {
            let mode = if summary.dry_run { " (dry run)" } else { "" };
            Ok(format!(
                "Project: {title} ({board} pull requests){mode}\n\
                 Added: {added} of {candidates} candidates ({tracked} already tracked, {assigned} assigned, {inspected} inspected)\n\
                 Deleted: {deleted} of {board_inspected} board items\n\
                 Elapsed: {elapsed:.2}s",
                title = summary.project_title,
                board = summary.board_items,
                added = summary.add.added,
                candidates = summary.add.candidates,
                tracked = summary.add.tracked,
                assigned = summary.add.assigned,
                inspected = summary.add.inspected,
                deleted = summary.delete.deleted,
                board_inspected = summary.delete.inspected,
                elapsed = summary.elapsed_seconds(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use board::{AddSummary, DeleteSummary, RunId, Timestamp};
    use clap::CommandFactory;

    use super::*;

    fn summary(dry_run: bool) -> RunSummary {
        let now = Timestamp::now();
        RunSummary {
            run_id: RunId::new_random(),
            project_title: "Reviews".to_string(),
            board_items: 4,
            add: AddSummary {
                inspected: 9,
                candidates: 5,
                tracked: 3,
                added: 2,
                assigned: 1,
            },
            delete: DeleteSummary {
                inspected: 4,
                deleted: 1,
            },
            dry_run,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn flags_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["prsync", "--github-token", "t"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.yaml"));
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn all_flags() {
        let args = Args::try_parse_from([
            "prsync",
            "--config",
            "sync.yaml",
            "--dry-run",
            "--verbose",
            "--log-format",
            "json",
            "--github-token",
            "t",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("sync.yaml"));
        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let args = Args::try_parse_from(["prsync", "--github-token", "ghp_secret"]).unwrap();
        let debug = format!("{args:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("github_token: \"<redacted>\""));
    }

    #[test]
    fn text_summary_reports_counts() {
        let report = render_summary(&summary(true), LogFormat::Text).unwrap();
        assert!(report.starts_with("Project: Reviews (4 pull requests) (dry run)\n"));
        assert!(report.contains("Added: 2 of 5 candidates (3 already tracked, 1 assigned, 9 inspected)"));
        assert!(report.contains("Deleted: 1 of 4 board items"));
    }

    #[test]
    fn json_summary_is_machine_readable() {
        let report = render_summary(&summary(false), LogFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["add"]["added"], 2);
        assert_eq!(value["delete"]["deleted"], 1);
        assert_eq!(value["dry_run"], false);
    }
}
