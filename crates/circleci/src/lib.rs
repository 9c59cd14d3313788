pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod slug;

pub use client::CircleCiClient;
pub use error::CiError;
pub use http::{fetch_all_pages, with_retry, Page, RetryPolicy};
pub use slug::{parse_remote_url, SlugResolver, SlugSources};
