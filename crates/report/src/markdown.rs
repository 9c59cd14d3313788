use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::summary::RunSummary;

/// 单条评论里最多列出的失败数量，超出部分只给出计数
const MAX_LISTED_FAILURES: usize = 50;

/// 转义 Markdown 特殊字符，换行折叠为空格
pub fn escape_markdown(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '(' | ')' | '#' | '|' | '<' | '>' | '~' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\r' => {}
            '\n' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn link(label: &str, url: Option<&str>) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(url) => format!("[{}]({})", escape_markdown(label), url.replace(')', "%29")),
        None => escape_markdown(label),
    }
}

/// 运行开始时的评论
pub fn render_started_comment(
    marker: &str,
    started_at: DateTime<Utc>,
    build_url: Option<&str>,
) -> String {
    format!(
        "{marker}\n### E2E tests started\n\n:hourglass_flowing_sand: {} started at {}. This comment is updated when results are available.\n",
        link("The run", build_url),
        timestamp(started_at)
    )
}

/// 运行结束后的结果评论
pub fn render_results_comment(
    marker: &str,
    summary: &RunSummary,
    build_url: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(marker);
    out.push('\n');

    let headline = if summary.is_green() {
        ":white_check_mark: E2E tests passed"
    } else if summary.failures.is_empty() {
        ":warning: E2E results are incomplete"
    } else {
        ":x: E2E tests failed"
    };
    out.push_str(&format!("### {headline}\n\n"));

    let run_label = format!(
        "{} #{}",
        summary.workflow_name, summary.pipeline_number
    );
    out.push_str(&format!(
        "{} on `{}` finished with status **{}** ({} failing tests). Updated {}.\n",
        link(&run_label, build_url),
        summary.branch.as_deref().unwrap_or("unknown").replace('`', "'"),
        escape_markdown(&summary.workflow_status),
        summary.failures.len(),
        timestamp(summary.generated_at)
    ));

    if summary.incomplete {
        out.push_str("\n> Some jobs were still running when waiting timed out, results may be partial.\n");
    }

    if !summary.failures.is_empty() {
        out.push_str("\n| Job | File | Test | Screenshot |\n| --- | --- | --- | --- |\n");
        let mut by_job: BTreeMap<u64, Vec<_>> = BTreeMap::new();
        for failure in &summary.failures {
            by_job.entry(failure.job_number).or_default().push(failure);
        }
        for failure in by_job.values().flatten().take(MAX_LISTED_FAILURES) {
            let job = if failure.job_name.is_empty() {
                format!("#{}", failure.job_number)
            } else {
                format!("{} \\#{}", escape_markdown(&failure.job_name), failure.job_number)
            };
            let image = failure
                .image
                .as_deref()
                .map(|url| format!("[view]({})", url.replace(')', "%29")))
                .unwrap_or_else(|| "none".to_string());
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                job,
                escape_markdown(&failure.file),
                escape_markdown(&failure.name),
                image
            ));
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "\n…and {} more failures, see the full report.\n",
                summary.failures.len() - MAX_LISTED_FAILURES
            ));
        }
    }

    if !summary.omitted_jobs.is_empty() {
        out.push_str("\n**Jobs with missing data:**\n\n");
        for omitted in &summary.omitted_jobs {
            out.push_str(&format!(
                "- {}: {}\n",
                escape_markdown(&omitted.job_name),
                escape_markdown(&omitted.reason)
            ));
        }
    }

    out
}
