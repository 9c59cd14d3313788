use pipeline_core::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request {path} failed with HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("GitHub request {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected GitHub response for {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Cannot sign GitHub App token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("GitHub credentials are not configured (GitHub App id, installation id and private key, or GITHUB_TOKEN)")]
    MissingCredentials,

    #[error("GitHub repository is not configured (github.owner / github.repo)")]
    MissingRepository,
}

impl From<GitHubError> for PipelineError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Status { path, status, .. } if status == 404 => {
                PipelineError::NotFound(path)
            }
            // GitHub answers 422 for a commit it has never seen
            GitHubError::Status { path, status, body }
                if status == 422 && body.contains("No commit found") =>
            {
                PipelineError::NotFound(path)
            }
            GitHubError::Status { path, status, body } if status == 401 || status == 403 => {
                PipelineError::Authentication(format!("{path} (HTTP {status}): {body}"))
            }
            GitHubError::Status { path, status, body } => PipelineError::Remote {
                path,
                status: Some(status),
                message: body,
            },
            GitHubError::Transport { path, source } => PipelineError::Remote {
                path,
                status: source.status().map(|s| s.as_u16()),
                message: source.to_string(),
            },
            GitHubError::Decode { path, message } => PipelineError::Remote {
                path,
                status: None,
                message,
            },
            GitHubError::Jwt(e) => PipelineError::Authentication(e.to_string()),
            err @ (GitHubError::MissingCredentials | GitHubError::MissingRepository) => {
                PipelineError::Configuration(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        assert!(PipelineError::from(GitHubError::MissingCredentials).is_configuration());
        assert!(PipelineError::from(GitHubError::MissingRepository).is_configuration());
        let not_found = PipelineError::from(GitHubError::Status {
            path: "/repos/o/r/issues/1/comments".into(),
            status: 404,
            body: String::new(),
        });
        assert!(not_found.is_not_found());
        let server_error = PipelineError::from(GitHubError::Status {
            path: "/repos/o/r/statuses/abc".into(),
            status: 502,
            body: "bad gateway".into(),
        });
        assert!(matches!(
            server_error,
            PipelineError::Remote {
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn test_auth_statuses_are_authentication_errors() {
        for status in [401, 403] {
            let err = PipelineError::from(GitHubError::Status {
                path: "/app/installations/99/access_tokens".into(),
                status,
                body: "Bad credentials".into(),
            });
            assert!(matches!(err, PipelineError::Authentication(_)), "{status}");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_unknown_commit_is_not_found() {
        let err = PipelineError::from(GitHubError::Status {
            path: "/repos/o/r/commits/deadbeef/pulls".into(),
            status: 422,
            body: r#"{"message":"No commit found for SHA: deadbeef"}"#.into(),
        });
        assert!(err.is_not_found());

        let validation = PipelineError::from(GitHubError::Status {
            path: "/repos/o/r/statuses/abc".into(),
            status: 422,
            body: r#"{"message":"Validation Failed"}"#.into(),
        });
        assert!(matches!(validation, PipelineError::Remote { status: Some(422), .. }));
    }
}
