//! End-to-end triage run.
//!
//! Every stage runs sequentially on one task. Failures that end the run
//! propagate as [`TriageError`](crate::TriageError); per-file failures are
//! logged, recorded in the report and skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, Instrument};
use uuid::Uuid;

use triage_store::{Identity, RepoHost};

use crate::commit::{branch_name, commit_one, create_run_branch};
use crate::config::TriageConfig;
use crate::conversation::{build_conversation, pick_canned, ConversationMessage, CANNED_MESSAGES};
use crate::decision::{decide, Decision};
use crate::error::Result;
use crate::event::TriggerEvent;
use crate::guard::has_duplicate_comment;
use crate::modify::{modify_file, FileModification, ModificationOutcome};
use crate::obs;
use crate::oracle::{CompletionOracle, StreamingOracle};
use crate::patch::{apply_unified_diff, PatchOutcome};
use crate::report::{FileReport, PatchStatus, TriageOutcome, TriageReport};
use crate::selector::{build_repo_tree, load_candidates, select_files, FileCandidate};

/// Everything one run needs: the host, both model endpoints, the local
/// checkout and the policy knobs.
#[derive(Clone)]
pub struct TriageContext {
    pub host: Arc<dyn RepoHost>,
    pub decision_oracle: Arc<dyn StreamingOracle>,
    pub completion_oracle: Arc<dyn CompletionOracle>,
    /// Local checkout the file tree is built from
    pub workdir: PathBuf,
    pub config: TriageConfig,
}

impl TriageContext {
    pub fn new(
        host: Arc<dyn RepoHost>,
        decision_oracle: Arc<dyn StreamingOracle>,
        completion_oracle: Arc<dyn CompletionOracle>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host,
            decision_oracle,
            completion_oracle,
            workdir: workdir.into(),
            config: TriageConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TriageConfig) -> Self {
        self.config = config;
        self
    }
}

/// Dispatch one trigger event and report what happened.
pub async fn handle_event(ctx: &TriageContext, event: TriggerEvent) -> Result<TriageReport> {
    let run_id = Uuid::new_v4().to_string();
    let Some(issue_number) = event.issue_number() else {
        info!(event_name = %event.name(), "no handler defined for event");
        return Ok(TriageReport::new(run_id, event, TriageOutcome::Ignored));
    };

    let span = obs::triage_span(&run_id, issue_number);
    async move {
        let started = Instant::now();
        obs::emit_triage_started(&run_id, event.name(), issue_number);

        let mut report = TriageReport::new(run_id.clone(), event.clone(), TriageOutcome::Ignored);
        let result = match &event {
            TriggerEvent::IssueOpened { .. } => offer_help(ctx, issue_number)
                .await
                .map(|outcome| report.outcome = outcome),
            TriggerEvent::IssueComment { .. } => run_triage(ctx, issue_number, &mut report).await,
            TriggerEvent::Unsupported { .. } => Ok(()),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                obs::emit_triage_finished(&run_id, report.outcome.as_str(), duration_ms);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "triage run failed");
                obs::emit_triage_finished(&run_id, "failed", duration_ms);
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Post one random offer unless the bot's latest comment already is one.
pub async fn offer_help(ctx: &TriageContext, issue_number: u64) -> Result<TriageOutcome> {
    let login = ctx.host.authenticated_login().await?;
    let comments = ctx.host.list_comments(issue_number).await?;
    if has_duplicate_comment(&comments, &login, &CANNED_MESSAGES) {
        obs::emit_duplicate_skipped(issue_number);
        return Ok(TriageOutcome::DuplicateSkipped);
    }

    let offer = pick_canned(&mut rand::thread_rng());
    let comment = ctx.host.create_comment(issue_number, offer).await?;
    obs::emit_offer_posted(issue_number, comment.id);
    Ok(TriageOutcome::OfferPosted)
}

/// Decide from the thread whether to help and, if so, modify and commit
/// the files the completion model selects.
pub async fn run_triage(
    ctx: &TriageContext,
    issue_number: u64,
    report: &mut TriageReport,
) -> Result<()> {
    let login = ctx.host.authenticated_login().await?;
    let comments = ctx.host.list_comments(issue_number).await?;
    if has_duplicate_comment(&comments, &login, &CANNED_MESSAGES) {
        obs::emit_duplicate_skipped(issue_number);
        report.outcome = TriageOutcome::DuplicateSkipped;
        return Ok(());
    }

    let issue = ctx.host.get_issue(issue_number).await?;
    let conversation = build_conversation(
        &issue,
        &comments,
        ctx.config.trim_keep,
        &mut rand::thread_rng(),
    );

    let verdict = decide(
        ctx.decision_oracle.as_ref(),
        &conversation,
        ctx.config.decision_timeout,
    )
    .await?;
    obs::emit_decision(verdict.decision, verdict.reply.chars().count());
    report.decision = Some(verdict.decision);
    match verdict.decision {
        Decision::Affirmative => {}
        Decision::Negative => {
            info!("decision was not affirmative, no modifications will be made");
            report.outcome = TriageOutcome::DecisionNegative;
            return Ok(());
        }
        Decision::Unknown => {
            info!("decision could not be read from the reply, no modifications will be made");
            report.outcome = TriageOutcome::DecisionUnknown;
            return Ok(());
        }
    }

    let tree = build_repo_tree(&ctx.workdir, &ctx.config.excluded_extension)?;
    let issue_body = issue.body.as_deref().unwrap_or_default();
    let selected = select_files(ctx.completion_oracle.as_ref(), &tree, issue_body).await?;
    obs::emit_files_selected(&selected);

    let (candidates, unreadable) = load_candidates(&ctx.workdir, &selected).await;
    for (path, error) in unreadable {
        obs::emit_file_failed(&path, "read", &error);
        report.files.push(FileReport::failed(path, error));
    }

    let name = branch_name(
        &ctx.config.branch_prefix,
        Utc::now().timestamp(),
        &mut rand::thread_rng(),
    );
    let (base_branch, branch) = create_run_branch(ctx.host.as_ref(), &name).await?;
    report.branch = Some(branch.name.clone());

    let identity = Identity::noreply(&login);
    for candidate in &candidates {
        let file = process_file(ctx, &conversation, candidate, &identity, &base_branch, &branch.name)
            .await;
        report.files.push(file);
    }

    report.outcome = TriageOutcome::Modified;
    Ok(())
}

/// Modify, resolve and commit a single file.
async fn process_file(
    ctx: &TriageContext,
    conversation: &[ConversationMessage],
    candidate: &FileCandidate,
    identity: &Identity,
    base_branch: &str,
    target_branch: &str,
) -> FileReport {
    let path = candidate.path.as_str();
    let modification = match modify_file(
        ctx.completion_oracle.as_ref(),
        conversation,
        candidate,
        ctx.config.size_threshold,
    )
    .await
    {
        Ok(modification) => modification,
        Err(e) => {
            obs::emit_file_failed(path, "modify", &e);
            return FileReport::failed(path, e.to_string());
        }
    };

    let mode = modification.outcome.mode();
    let FileModification {
        outcome,
        description,
        ..
    } = modification;
    let (content, patch) = match outcome {
        ModificationOutcome::FullContent(content) => (content, None),
        ModificationOutcome::UnifiedDiff(diff) => {
            match apply_unified_diff(&candidate.content, &diff).await {
                PatchOutcome::Applied(content) => (content, Some(PatchStatus::Applied)),
                PatchOutcome::FailedFallback { content, reason } => {
                    obs::emit_patch_fallback(path, &reason);
                    (content, Some(PatchStatus::FailedFallback))
                }
            }
        }
    };
    obs::emit_file_modified(path, mode.as_str(), &description);

    let error = match commit_one(ctx.host.as_ref(), identity, base_branch, target_branch, path, &content)
        .await
    {
        Ok(_) => None,
        Err(e) => {
            obs::emit_commit_failed(path, &e);
            Some(e.to_string())
        }
    };

    FileReport {
        path: path.to_string(),
        mode: Some(mode),
        patch,
        committed: error.is_none(),
        error,
    }
}
