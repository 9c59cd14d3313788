//! 失败测试与诊断截图的关联
//!
//! 截图文件名通常由测试文件名派生（`login.e2e.ts` → `login_FAILED.png`），
//! 这里用宽松的子串匹配加打分来为每个失败测试挑一张最可能的图片。

use pipeline_core::{
    config::{AggregatorConfig, ScoringPolicy},
    Artifact, TestResult,
};

/// 转小写并去掉所有非字母数字字符
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 测试的派生基名：文件名去掉目录和所有扩展名，文件为空时退回测试名
pub fn derived_basename(test: &TestResult) -> String {
    let file = test.file.trim();
    if file.is_empty() {
        return test.name.clone();
    }
    let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
    base.split('.').next().unwrap_or(base).to_string()
}

fn stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// 是否为诊断图片：路径中某一段包含诊断目录标记，且扩展名是图片
pub fn is_diagnostic(artifact: &Artifact, config: &AggregatorConfig) -> bool {
    let path = artifact.path.to_lowercase();
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();

    let under_marker = segments.iter().any(|segment| {
        config
            .path_markers
            .iter()
            .any(|marker| segment.contains(&marker.to_lowercase()))
    });
    let is_image = extension(artifact.file_name()).is_some_and(|ext| {
        config
            .image_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    });

    under_marker && is_image
}

/// 单个作业的关联结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobCorrelation {
    /// 与失败测试一一对应，顺序不变
    pub images: Vec<Option<Artifact>>,
    /// 被选中但没有分配给任何失败测试的产物
    pub orphans: Vec<Artifact>,
}

struct Candidate<'a> {
    artifact: &'a Artifact,
    name: String,
}

fn score(candidate: &Candidate<'_>, derived: &str, display: &str, policy: &ScoringPolicy) -> i32 {
    let mut total = 0;
    if !derived.is_empty() && candidate.name.contains(derived) {
        total += policy.derived_name_weight;
    }
    if !display.is_empty() && candidate.name.contains(display) {
        total += policy.display_name_weight;
    }
    if policy
        .hints
        .iter()
        .map(|hint| normalize(hint))
        .any(|hint| !hint.is_empty() && candidate.name.contains(&hint))
    {
        total += policy.hint_weight;
    }
    total
}

/// 为一个作业的失败测试挑选图片
///
/// 先筛出被选中的诊断产物（名字包含任一失败测试的派生基名，或原始名字带失败标记），
/// 再按打分为每个失败测试选出得分最高者；平局保留先出现的，全部为零分时退回第一张。
pub fn correlate(
    failing: &[TestResult],
    artifacts: &[Artifact],
    config: &AggregatorConfig,
) -> JobCorrelation {
    let needles: Vec<String> = failing
        .iter()
        .map(|test| normalize(&derived_basename(test)))
        .collect();

    let selected: Vec<Candidate<'_>> = artifacts
        .iter()
        .filter(|artifact| is_diagnostic(artifact, config))
        .filter_map(|artifact| {
            let name = normalize(stem(artifact.file_name()));
            let by_name = needles
                .iter()
                .any(|needle| !needle.is_empty() && name.contains(needle.as_str()));
            let by_marker = !config.failed_marker.is_empty()
                && artifact.file_name().contains(config.failed_marker.as_str());
            (by_name || by_marker).then_some(Candidate { artifact, name })
        })
        .collect();

    let mut used = vec![false; selected.len()];
    let images = failing
        .iter()
        .zip(&needles)
        .map(|(test, derived)| {
            let display = normalize(&test.name);
            let mut best: Option<(usize, i32)> = None;
            for (index, candidate) in selected.iter().enumerate() {
                let points = score(candidate, derived, &display, &config.scoring);
                if points > 0 && best.map_or(true, |(_, top)| points > top) {
                    best = Some((index, points));
                }
            }
            let chosen = best.map(|(index, _)| index).or_else(|| {
                if selected.is_empty() {
                    None
                } else {
                    Some(0)
                }
            });
            chosen.map(|index| {
                used[index] = true;
                selected[index].artifact.clone()
            })
        })
        .collect();

    let orphans = selected
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(candidate, _)| candidate.artifact.clone())
        .collect();

    JobCorrelation { images, orphans }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::TestOutcome;

    fn failing(file: &str, name: &str) -> TestResult {
        TestResult {
            file: file.into(),
            name: name.into(),
            result: TestOutcome::Failure,
            message: String::new(),
        }
    }

    fn artifact(path: &str) -> Artifact {
        Artifact::new(path, format!("https://cdn/{path}"))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Login_Flow-2.e2e"), "loginflow2e2e");
        assert_eq!(normalize("--__--"), "");
    }

    #[test]
    fn test_derived_basename() {
        assert_eq!(
            derived_basename(&failing("e2e/test/auth/login.e2e.ts", "x")),
            "login"
        );
        assert_eq!(derived_basename(&failing("", "signs out")), "signs out");
    }

    #[test]
    fn test_diagnostic_filter() {
        let config = AggregatorConfig::default();
        assert!(is_diagnostic(&artifact("Artifacts/ios/login.PNG"), &config));
        assert!(is_diagnostic(&artifact("build/screenshots/a.webp"), &config));
        assert!(!is_diagnostic(&artifact("artifacts/ios/log.txt"), &config));
        assert!(!is_diagnostic(&artifact("login.png"), &config));
        assert!(!is_diagnostic(&artifact("videos/artifacts.png"), &config));
    }

    #[test]
    fn test_best_match_and_orphans() {
        let config = AggregatorConfig::default();
        let tests = vec![
            failing("e2e/login.e2e.ts", "logs in"),
            failing("e2e/search.e2e.ts", "finds channel"),
        ];
        let artifacts = vec![
            artifact("artifacts/unrelated_FAILED.png"),
            artifact("artifacts/login_logs_in_FAILED.png"),
            artifact("artifacts/login_before.png"),
            artifact("artifacts/notes.txt"),
        ];

        let result = correlate(&tests, &artifacts, &config);
        assert_eq!(
            result.images[0].as_ref().map(|a| a.path.as_str()),
            Some("artifacts/login_logs_in_FAILED.png")
        );
        // search 没有匹配的图，只有 hint 得分，取第一张带 FAILED 的
        assert_eq!(
            result.images[1].as_ref().map(|a| a.path.as_str()),
            Some("artifacts/unrelated_FAILED.png")
        );
        let orphan_paths: Vec<&str> = result.orphans.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(orphan_paths, vec!["artifacts/login_before.png"]);
    }

    #[test]
    fn test_empty_needles_never_match() {
        let config = AggregatorConfig::default();
        let tests = vec![failing("", "!!!")];
        let result = correlate(&tests, &[artifact("artifacts/anything.png")], &config);
        assert_eq!(result.images, vec![None]);
        assert!(result.orphans.is_empty());
    }

    #[test]
    fn test_no_failures_leaves_marked_artifacts_orphaned() {
        let config = AggregatorConfig::default();
        let result = correlate(&[], &[artifact("screenshots/crash_FAILED.jpg")], &config);
        assert!(result.images.is_empty());
        assert_eq!(result.orphans.len(), 1);
    }
}
