use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use pipeline_core::{AggregateReport, FailureRecord, PollOutcome, RunIdentity};

const STYLE: &str = r#"
    body { font-family: -apple-system, Segoe UI, Helvetica, Arial, sans-serif; margin: 2rem; color: #1f2328; }
    h1 { font-size: 1.5rem; }
    h2 { border-bottom: 1px solid #d0d7de; padding-bottom: .3rem; margin-top: 2rem; }
    .meta { color: #59636e; }
    .notice { background: #fff8c5; border: 1px solid #d4a72c; padding: .75rem 1rem; border-radius: 6px; }
    .failure { border: 1px solid #d0d7de; border-radius: 6px; padding: .75rem 1rem; margin: .75rem 0; }
    .failure pre { white-space: pre-wrap; background: #f6f8fa; padding: .5rem; }
    .failure img, .orphans img { max-width: 480px; display: block; margin-top: .5rem; }
    .ok { color: #1a7f37; }
"#;

/// 渲染静态 HTML 报告
///
/// 所有插入的文本都经过 HTML 转义，图片地址按属性值转义。
pub fn render_html(
    identity: &RunIdentity,
    report: &AggregateReport,
    outcome: Option<&PollOutcome>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut body = String::new();

    let title = format!(
        "E2E results: {} #{}",
        identity.workflow_name, identity.pipeline_number
    );
    let _ = writeln!(body, "<h1>{}</h1>", text(&title));
    let _ = writeln!(
        body,
        "<p class=\"meta\">branch <code>{}</code> · workflow status <strong>{}</strong> · generated {}</p>",
        text(identity.branch.as_deref().unwrap_or("unknown")),
        text(&identity.workflow_status),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(outcome) = outcome.filter(|o| o.is_incomplete()) {
        let _ = writeln!(
            body,
            "<p class=\"notice\">Incomplete run: {} of {} jobs were still running when waiting timed out. Results below may be partial.</p>",
            outcome.pending, outcome.total
        );
    }

    render_failures(&mut body, report);
    render_orphans(&mut body, report);
    render_omissions(&mut body, report);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        text(&title),
        STYLE,
        body
    )
}

fn render_failures(body: &mut String, report: &AggregateReport) {
    let _ = writeln!(body, "<h2>Failures ({})</h2>", report.records.len());
    if report.records.is_empty() {
        let _ = writeln!(
            body,
            "<p class=\"ok\">No failing tests in {} examined jobs.</p>",
            report.jobs_examined
        );
        return;
    }

    let mut by_job: BTreeMap<u64, Vec<&FailureRecord>> = BTreeMap::new();
    for record in &report.records {
        by_job
            .entry(record.job.number.unwrap_or_default())
            .or_default()
            .push(record);
    }

    for (number, records) in by_job {
        let job_name = records.first().map(|r| r.job.name.as_str()).unwrap_or("");
        let _ = writeln!(
            body,
            "<section class=\"job\">\n<h3>{} <span class=\"meta\">#{}</span></h3>",
            text(job_name),
            number
        );
        for record in records {
            let _ = writeln!(
                body,
                "<div class=\"failure\">\n<div><strong>{}</strong></div>\n<div class=\"meta\">{}</div>",
                text(&record.test.name),
                text(&record.test.file)
            );
            if !record.test.message.is_empty() {
                let _ = writeln!(body, "<pre>{}</pre>", text(&record.test.message));
            }
            match &record.image {
                Some(image) => {
                    let _ = writeln!(
                        body,
                        "<a href=\"{url}\"><img src=\"{url}\" alt=\"{alt}\"></a>",
                        url = attr(&image.url),
                        alt = attr(image.file_name())
                    );
                }
                None => {
                    let _ = writeln!(body, "<div class=\"meta\">No screenshot found.</div>");
                }
            }
            let _ = writeln!(body, "</div>");
        }
        let _ = writeln!(body, "</section>");
    }
}

fn render_orphans(body: &mut String, report: &AggregateReport) {
    if report.orphans.is_empty() {
        return;
    }
    let _ = writeln!(
        body,
        "<h2>Orphan diagnostics ({})</h2>\n<div class=\"orphans\">",
        report.orphans.len()
    );
    for orphan in &report.orphans {
        let _ = writeln!(
            body,
            "<figure><figcaption>{} #{}: {}</figcaption><a href=\"{url}\"><img src=\"{url}\" alt=\"{alt}\"></a></figure>",
            text(&orphan.job_name),
            orphan.job_number,
            text(&orphan.artifact.path),
            url = attr(&orphan.artifact.url),
            alt = attr(orphan.artifact.file_name())
        );
    }
    let _ = writeln!(body, "</div>");
}

fn render_omissions(body: &mut String, report: &AggregateReport) {
    if report.omissions.is_empty() {
        return;
    }
    let _ = writeln!(
        body,
        "<h2>Omitted jobs ({})</h2>\n<ul>",
        report.omissions.len()
    );
    for omission in &report.omissions {
        let number = omission
            .job_number
            .map(|n| format!(" #{n}"))
            .unwrap_or_default();
        let _ = writeln!(
            body,
            "<li>{}{}: {}</li>",
            text(&omission.job_name),
            number,
            text(&omission.reason)
        );
    }
    let _ = writeln!(body, "</ul>");
}
