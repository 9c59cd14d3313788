//! 运行结果的报告渲染：JSON 摘要、静态 HTML 页面以及 PR 评论用的 Markdown。
//!
//! 这里只做纯投影，不访问网络。

pub mod html;
pub mod markdown;
pub mod summary;
pub mod writer;

pub use html::render_html;
pub use markdown::{escape_markdown, render_results_comment, render_started_comment};
pub use summary::{FailureEntry, OmittedJob, RunSummary};
pub use writer::{read_poll_outcome, read_summary, write_html, write_poll_outcome, write_summary};
