pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use errors::*;
pub use logging::{init_logging, LogFormat};
pub use models::{
    AggregateReport, Artifact, Bin, CommitState, CommitStatus, FailureRecord, IssueComment, Job,
    JobOmission, JobStatus, Manifest, OrphanArtifact, Pipeline, PollOutcome, PollReason,
    ProjectSlug, PullRequestRef, RunIdentity, TestItem, TestOutcome, TestResult, Workflow,
};
pub use traits::{CiProvider, CodeHost};

/// 统一的Result类型
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
