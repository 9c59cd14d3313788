pub mod aggregator;
pub mod correlation;
pub mod poller;
pub mod run_resolver;

pub use aggregator::FailureAggregator;
pub use correlation::{correlate, derived_basename, is_diagnostic, normalize, JobCorrelation};
pub use poller::{CompletionPoller, PollerOptions};
pub use run_resolver::{resolve_run, ResolvedRun, RunTarget};
