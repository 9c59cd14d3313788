//! Project slug discovery.
//!
//! The CI project a run belongs to can be named in several places and they do not always
//! agree (forks, renamed repos, mirrors). Candidates are collected in priority order and the
//! first one with pipelines on the branch is adopted for the rest of the invocation.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};
use url::Url;

use pipeline_core::{
    config::CircleCiConfig, CiProvider, Pipeline, PipelineError, PipelineResult, ProjectSlug,
};

/// Raw slug hints, highest priority first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlugSources {
    pub explicit: Option<String>,
    pub env_owner: Option<String>,
    pub env_repo: Option<String>,
    pub remote_url: Option<String>,
    pub package_repository: Option<String>,
}

impl SlugSources {
    /// Gather hints from config, the CircleCI environment, the git remote and `package.json`.
    pub fn from_environment(config: &CircleCiConfig, workdir: &Path) -> Self {
        Self {
            explicit: config.project_slug.clone(),
            env_owner: std::env::var("CIRCLE_PROJECT_USERNAME").ok(),
            env_repo: std::env::var("CIRCLE_PROJECT_REPONAME").ok(),
            remote_url: git_remote_url(workdir),
            package_repository: package_repository(&workdir.join("package.json")),
        }
    }

    /// Distinct candidate slugs in priority order.
    pub fn candidates(&self, default_vcs: &str) -> Vec<ProjectSlug> {
        let mut found: Vec<ProjectSlug> = Vec::new();
        let mut push = |slug: Option<ProjectSlug>| {
            if let Some(slug) = slug {
                if !found.contains(&slug) {
                    found.push(slug);
                }
            }
        };

        push(
            self.explicit
                .as_deref()
                .and_then(|raw| ProjectSlug::parse(raw, default_vcs)),
        );

        if let (Some(owner), Some(repo)) = (self.env_owner.as_deref(), self.env_repo.as_deref()) {
            if !owner.trim().is_empty() && !repo.trim().is_empty() {
                push(ProjectSlug::parse(
                    &format!("{}/{}", owner.trim(), repo.trim()),
                    default_vcs,
                ));
            }
        }

        for raw in [&self.remote_url, &self.package_repository]
            .into_iter()
            .flatten()
        {
            push(parse_remote_url(raw, default_vcs));
        }

        found
    }
}

/// Turn a git remote or npm `repository` value into a slug.
///
/// Handles `git@host:org/repo.git`, `https://host/org/repo(.git)`, `ssh://git@host/org/repo`,
/// `git+https://...`, `github:org/repo` and bare `org/repo`.
pub fn parse_remote_url(raw: &str, default_vcs: &str) -> Option<ProjectSlug> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (vcs, path) = if let Some(rest) = raw.strip_prefix("github:") {
        ("gh", rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("bitbucket:") {
        ("bb", rest.to_string())
    } else if raw.contains("://") {
        let url = Url::parse(raw.trim_start_matches("git+")).ok()?;
        (vcs_for_host(url.host_str()?, default_vcs), url.path().to_string())
    } else if let Some((user_host, path)) = raw.split_once(':') {
        let host = user_host.rsplit('@').next().unwrap_or(user_host);
        (vcs_for_host(host, default_vcs), path.to_string())
    } else {
        (default_vcs, raw.to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo] => ProjectSlug::parse(&format!("{vcs}/{owner}/{repo}"), default_vcs),
        _ => None,
    }
}

fn vcs_for_host<'a>(host: &str, default_vcs: &'a str) -> &'a str {
    if host.contains("github") {
        "gh"
    } else if host.contains("bitbucket") {
        "bb"
    } else {
        default_vcs
    }
}

fn git_remote_url(workdir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(workdir)
        .output()
        .map_err(|e| debug!("git is not available: {}", e))
        .ok()?;
    if !output.status.success() {
        debug!("No origin remote in {}", workdir.display());
        return None;
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!url.is_empty()).then_some(url)
}

fn package_repository(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| warn!("Ignoring unreadable {}: {}", path.display(), e))
        .ok()?;
    match manifest.get("repository")? {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Object(fields) => fields
            .get("url")
            .and_then(|url| url.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Memoised slug choice, passed explicitly through each stage.
#[derive(Debug, Clone)]
pub struct SlugResolver {
    candidates: Vec<ProjectSlug>,
    resolved: Option<ProjectSlug>,
}

impl SlugResolver {
    pub fn new(candidates: Vec<ProjectSlug>) -> Self {
        Self {
            candidates,
            resolved: None,
        }
    }

    pub fn from_sources(sources: &SlugSources, default_vcs: &str) -> Self {
        Self::new(sources.candidates(default_vcs))
    }

    pub fn candidates(&self) -> &[ProjectSlug] {
        &self.candidates
    }

    pub fn resolved(&self) -> Option<&ProjectSlug> {
        self.resolved.as_ref()
    }

    /// Adopt a slug the CI told us directly (e.g. a workflow's `project_slug`).
    pub fn adopt(&mut self, slug: ProjectSlug) {
        info!("Using project slug {}", slug);
        self.resolved = Some(slug);
    }

    /// The adopted slug, or the highest-priority candidate when nothing was adopted yet.
    pub fn current(&self) -> PipelineResult<&ProjectSlug> {
        self.resolved
            .as_ref()
            .or_else(|| self.candidates.first())
            .ok_or_else(no_candidates)
    }

    /// List pipelines for `branch`, trying candidates until one has any.
    ///
    /// The winning slug is memoised. When every candidate comes back empty the first one is
    /// returned with an empty listing; when all of them fail the last error is returned.
    pub async fn pipelines_for_branch(
        &mut self,
        ci: &dyn CiProvider,
        branch: &str,
    ) -> PipelineResult<(ProjectSlug, Vec<Pipeline>)> {
        if let Some(slug) = &self.resolved {
            let pipelines = ci.list_pipelines(slug, branch).await?;
            return Ok((slug.clone(), pipelines));
        }
        if self.candidates.is_empty() {
            return Err(no_candidates());
        }

        let mut any_answered = false;
        let mut last_error = None;
        for slug in self.candidates.clone() {
            match ci.list_pipelines(&slug, branch).await {
                Ok(pipelines) if !pipelines.is_empty() => {
                    debug!("{} has {} pipelines on {}", slug, pipelines.len(), branch);
                    self.adopt(slug.clone());
                    return Ok((slug, pipelines));
                }
                Ok(_) => {
                    any_answered = true;
                    debug!("{} has no pipelines on {}", slug, branch);
                }
                Err(err) if err.is_not_found() => {
                    any_answered = true;
                    debug!("{} is not a known project", slug);
                }
                Err(err) => {
                    warn!("Listing pipelines for {} failed: {}", slug, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !any_answered => Err(err),
            _ => {
                warn!("No candidate project has pipelines on branch {}", branch);
                Ok((self.candidates[0].clone(), Vec::new()))
            }
        }
    }
}

fn no_candidates() -> PipelineError {
    PipelineError::Configuration(
        "Cannot determine the CI project: set circleci.project_slug or CIRCLE_PROJECT_USERNAME/CIRCLE_PROJECT_REPONAME"
            .to_string(),
    )
}
