pub mod code_host;
pub mod failure;
pub mod run;
pub mod test_item;
pub mod test_result;

pub use code_host::{CommitState, CommitStatus, IssueComment, PullRequestRef};
pub use failure::{AggregateReport, FailureRecord, JobOmission, OrphanArtifact};
pub use run::{Job, JobStatus, Pipeline, PollOutcome, PollReason, ProjectSlug, RunIdentity, Workflow};
pub use test_item::{Bin, Manifest, TestItem};
pub use test_result::{Artifact, TestOutcome, TestResult};
