use std::fmt;

use serde::{Deserialize, Serialize};

/// 单条测试结果的判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestOutcome {
    Success,
    Failure,
    Skipped,
    Other(String),
}

impl TestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TestOutcome::Success => "success",
            TestOutcome::Failure => "failure",
            TestOutcome::Skipped => "skipped",
            TestOutcome::Other(raw) => raw,
        }
    }
}

impl From<String> for TestOutcome {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "success" | "passed" => TestOutcome::Success,
            "failure" | "failed" => TestOutcome::Failure,
            "skipped" => TestOutcome::Skipped,
            _ => TestOutcome::Other(raw),
        }
    }
}

impl From<TestOutcome> for String {
    fn from(outcome: TestOutcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 作业上报的一条测试结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub file: String,
    pub name: String,
    pub result: TestOutcome,
    pub message: String,
}

/// 作业附带的产物（截图、日志等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub url: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }

    /// 路径最后一段
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(TestOutcome::from("success".to_string()), TestOutcome::Success);
        assert_eq!(TestOutcome::from("FAILURE".to_string()), TestOutcome::Failure);
        assert_eq!(TestOutcome::from("skipped".to_string()), TestOutcome::Skipped);
        assert_eq!(
            TestOutcome::from("flaky".to_string()),
            TestOutcome::Other("flaky".into())
        );
    }

    #[test]
    fn test_artifact_file_name() {
        let artifact = Artifact::new("artifacts/ios/login_FAILED.png", "https://x/1");
        assert_eq!(artifact.file_name(), "login_FAILED.png");
        assert_eq!(Artifact::new("plain.png", "").file_name(), "plain.png");
    }
}
