//! Triage Core Library
//!
//! The decision-and-modification pipeline behind the `issue-triage` binary:
//! idempotency guard, decision conversation, streamed yes/no decision,
//! model-driven file selection, per-file modification with diff fallback,
//! and branch/commit orchestration.

pub mod commit;
pub mod config;
pub mod conversation;
pub mod decision;
pub mod error;
pub mod event;
pub mod fakes;
pub mod guard;
pub mod modify;
pub mod obs;
pub mod oracle;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod selector;
pub mod telemetry;

pub use config::{CompletionConfig, DecisionConfig, TriageConfig};
pub use conversation::{ConversationMessage, Role, CANNED_MESSAGES};
pub use decision::{Decision, DecisionOutcome};
pub use error::{OracleError, Result, TriageError};
pub use event::TriggerEvent;
pub use modify::{Mode, ModificationOutcome};
pub use oracle::{ChatCompletionClient, CompletionOracle, InferenceStreamClient, StreamingOracle};
pub use patch::PatchOutcome;
pub use pipeline::{handle_event, TriageContext};
pub use report::{FileReport, PatchStatus, TriageOutcome, TriageReport};
pub use selector::{build_repo_tree, FileCandidate, FileTree};
pub use telemetry::init_tracing;

pub use triage_store::{GithubRepoHost, RepoHost, RepoSlug};
