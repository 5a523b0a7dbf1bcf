//! Issue Triage CLI
//!
//! The `issue-triage` command runs one triage run for a repository event.
//!
//! ## Commands
//!
//! - `run`: handle the event described by the injected action inputs
//! - `tree`: print the file tree the selection model would see

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use triage_core::config::{
    require_non_empty, CompletionConfig, DecisionConfig, TriageConfig, DEFAULT_COMPLETION_URL,
    DEFAULT_DECISION_URL,
};
use triage_core::{
    build_repo_tree, handle_event, ChatCompletionClient, InferenceStreamClient, TriageContext,
    TriageReport, TriggerEvent,
};
use triage_store::github::DEFAULT_API_BASE;
use triage_store::{GithubRepoHost, RepoSlug};

#[derive(Parser)]
#[command(name = "issue-triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offer help on issues and commit model-written changes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one issue event
    Run(RunArgs),

    /// Print the repository file tree sent to the selection model
    Tree {
        /// Checkout to walk (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Extension whose files are left out of the tree
        #[arg(long, default_value = "mds")]
        exclude_extension: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Token used for every repository call
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Key for the completion endpoint
    #[arg(long, env = "INPUT_MODEL_API_KEY", hide_env_values = true)]
    model_api_key: Option<String>,

    /// Completion model used for file selection and modification
    #[arg(long, env = "INPUT_MODEL_NAME")]
    model_name: Option<String>,

    /// Name of the triggering event (`issues`, `issue_comment`)
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "")]
    event_name: String,

    /// Path to the event payload JSON
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// Repository as `owner/name`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    github_api_url: String,

    #[arg(long, env = "TRIAGE_DECISION_URL", default_value = DEFAULT_DECISION_URL)]
    decision_url: String,

    #[arg(long, env = "TRIAGE_COMPLETION_URL", default_value = DEFAULT_COMPLETION_URL)]
    completion_url: String,

    /// Seconds to wait for the whole decision stream
    #[arg(long, default_value = "30")]
    decision_timeout_secs: u64,

    /// Local checkout the file tree is built from
    #[arg(long, env = "TRIAGE_WORKDIR", default_value = ".")]
    workdir: PathBuf,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    triage_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Tree {
            path,
            exclude_extension,
        } => cmd_tree(&path, &exclude_extension),
    }
}

/// Unwrap a required input, rejecting missing and blank values.
fn required(name: &str, value: Option<String>) -> Result<String> {
    let value = value.unwrap_or_default();
    require_non_empty(name, &value)?;
    Ok(value)
}

fn load_event(event_name: &str, event_path: &Path) -> Result<TriggerEvent> {
    let raw = std::fs::read_to_string(event_path)
        .with_context(|| format!("Failed to read event payload {:?}", event_path))?;
    let payload: Value = serde_json::from_str(&raw).context("Event payload is not valid JSON")?;
    Ok(TriggerEvent::from_payload(event_name, &payload)?)
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let token = required("github token", args.github_token)?;
    let model_api_key = required("model api key", args.model_api_key)?;
    let model_name = required("model name", args.model_name)?;
    let event_path = args
        .event_path
        .filter(|p| !p.as_os_str().is_empty())
        .context("GITHUB_EVENT_PATH is required")?;
    let repository = required("repository", args.repository)?;

    let event = load_event(&args.event_name, &event_path)?;
    info!(event_name = %args.event_name, event = ?event, "loaded trigger event");

    let repo = RepoSlug::parse(&repository)?;
    let host = GithubRepoHost::new(&args.github_api_url, &token, repo)
        .context("Failed to build GitHub client")?;

    let decision = InferenceStreamClient::new(DecisionConfig {
        url: args.decision_url,
        ..Default::default()
    })?;
    let completion = ChatCompletionClient::new(
        model_api_key,
        CompletionConfig {
            base_url: args.completion_url,
            model: model_name,
        },
    )?;

    let config = TriageConfig {
        decision_timeout: Duration::from_secs(args.decision_timeout_secs),
        ..Default::default()
    };
    config.validate()?;

    let ctx = TriageContext::new(
        Arc::new(host),
        Arc::new(decision),
        Arc::new(completion),
        args.workdir,
    )
    .with_config(config);

    let report = handle_event(&ctx, event).await?;
    print_report(&report);

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        println!("Report written to {:?}", path);
    }

    Ok(())
}

fn print_report(report: &TriageReport) {
    for line in report_lines(report) {
        println!("{}", line);
    }
}

fn report_lines(report: &TriageReport) -> Vec<String> {
    let mut lines = vec![format!("Outcome: {}", report.outcome.as_str())];
    if let Some(decision) = report.decision {
        lines.push(format!("Decision: {:?}", decision));
    }
    if let Some(branch) = &report.branch {
        lines.push(format!("Branch:  {}", branch));
        lines.push(format!(
            "Committed {} of {} file(s)",
            report.committed_paths().len(),
            report.files.len()
        ));
    }
    for file in &report.files {
        let status = if file.committed { "committed" } else { "skipped" };
        match &file.error {
            Some(error) => lines.push(format!("  {} {} ({})", status, file.path, error)),
            None => lines.push(format!("  {} {}", status, file.path)),
        }
    }
    lines
}

fn cmd_tree(path: &Path, exclude_extension: &str) -> Result<()> {
    let tree = build_repo_tree(path, exclude_extension)
        .with_context(|| format!("Failed to walk {:?}", path))?;
    println!("{}", tree);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use triage_core::{FileReport, TriageOutcome};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_rejects_blank_values() {
        assert!(required("model name", None).is_err());
        assert!(required("model name", Some("   ".to_string())).is_err());
        assert_eq!(
            required("model name", Some("gpt".to_string())).unwrap(),
            "gpt"
        );
    }

    #[test]
    fn test_tree_subcommand_parses() {
        let cli = Cli::try_parse_from(["issue-triage", "tree", "some/dir"]).unwrap();
        match cli.command {
            Commands::Tree {
                path,
                exclude_extension,
            } => {
                assert_eq!(path, PathBuf::from("some/dir"));
                assert_eq!(exclude_extension, "mds");
            }
            Commands::Run(_) => panic!("expected tree"),
        }
    }

    #[test]
    fn test_report_lines_count_committed_files() {
        let mut report = TriageReport::new(
            "run-1",
            TriggerEvent::IssueComment { issue_number: 3 },
            TriageOutcome::Modified,
        );
        report.branch = Some("llm-updates-1-1000".to_string());
        report.files.push(FileReport {
            path: "src/lib.rs".to_string(),
            mode: None,
            patch: None,
            committed: true,
            error: None,
        });
        report.files.push(FileReport {
            path: "src/gone.rs".to_string(),
            mode: None,
            patch: None,
            committed: false,
            error: Some("not found".to_string()),
        });

        let lines = report_lines(&report);
        assert_eq!(lines[0], "Outcome: modified");
        assert!(lines.contains(&"Committed 1 of 2 file(s)".to_string()));
        assert!(lines.contains(&"  skipped src/gone.rs (not found)".to_string()));
    }

    #[test]
    fn test_run_parses_decision_timeout_flag() {
        let cli = Cli::try_parse_from([
            "issue-triage",
            "run",
            "--decision-timeout-secs",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.decision_timeout_secs, 7),
            Commands::Tree { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_load_event_reads_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"issue": {"number": 12}}"#).unwrap();

        let event = load_event("issue_comment", &path).unwrap();
        assert_eq!(event, TriggerEvent::IssueComment { issue_number: 12 });
        assert!(load_event("issues", &dir.path().join("missing.json")).is_err());
    }
}
