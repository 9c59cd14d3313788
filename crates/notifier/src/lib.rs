pub mod notifier;
pub mod pull_request;

pub use notifier::{NotifyOutcome, NotifyPhase, NotifyRequest, PrNotifier};
pub use pull_request::pr_number_from_urls;
