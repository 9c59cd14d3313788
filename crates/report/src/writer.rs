use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use pipeline_core::{PipelineError, PipelineResult, PollOutcome};

use crate::summary::RunSummary;

fn ensure_parent(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    ensure_parent(path)?;
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> PipelineResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!("无法读取{what} {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        PipelineError::Configuration(format!("{what}格式错误 {}: {e}", path.display()))
    })
}

/// 写入 JSON 摘要
pub fn write_summary(path: &Path, summary: &RunSummary) -> PipelineResult<()> {
    write_json(path, summary)?;
    info!(
        "摘要已写入 {}，共 {} 个失败",
        path.display(),
        summary.failures.len()
    );
    Ok(())
}

pub fn read_summary(path: &Path) -> PipelineResult<RunSummary> {
    read_json(path, "摘要")
}

/// 写入 HTML 报告
pub fn write_html(path: &Path, html: &str) -> PipelineResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, html)?;
    info!("HTML 报告已写入 {}", path.display());
    Ok(())
}

pub fn write_poll_outcome(path: &Path, outcome: &PollOutcome) -> PipelineResult<()> {
    write_json(path, outcome)
}

pub fn read_poll_outcome(path: &Path) -> PipelineResult<PollOutcome> {
    read_json(path, "轮询结果")
}
