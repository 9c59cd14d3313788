use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use pipeline_circleci::{SlugResolver, SlugSources};
use pipeline_core::{init_logging, AppConfig, LogFormat, PipelineError, PipelineResult};

/// 通用的启动参数
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub config_path: Option<String>,
    pub log_level: String,
    pub log_format: String,
}

/// 初始化日志并加载配置
pub fn bootstrap(startup: &StartupConfig) -> Result<AppConfig> {
    let format: LogFormat = startup.log_format.parse()?;
    init_logging(&startup.log_level, format)?;

    let config = AppConfig::load(startup.config_path.as_deref())?;
    debug!("配置加载完成: {:?}", startup.config_path);
    Ok(config)
}

/// 解析换行分隔的测试名，忽略空行与首尾空白
pub fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 从文件或标准输入读取测试名
pub fn read_names(input: Option<&Path>) -> Result<Vec<String>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("无法读取测试列表 {}: {e}", path.display()))
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("读取标准输入失败")?;
            buffer
        }
    };
    let names = parse_names(&raw);
    info!("读取到 {} 个测试名", names.len());
    Ok(names)
}

/// 按配置、CI 环境、git remote、package.json 的顺序收集项目 slug
pub fn slug_resolver(config: &AppConfig) -> SlugResolver {
    let workdir = std::env::current_dir().unwrap_or_else(|_| ".".into());
    let sources = SlugSources::from_environment(&config.circleci, &workdir);
    let resolver = SlugResolver::from_sources(&sources, &config.circleci.vcs_type);
    debug!(
        "项目 slug 候选: {:?}",
        resolver
            .candidates()
            .iter()
            .map(|slug| slug.as_str())
            .collect::<Vec<_>>()
    );
    resolver
}

/// GitHub 仓库：配置优先，否则取第一个 slug 候选的 org/repo
pub fn github_repository(
    config: &AppConfig,
    slugs: &SlugResolver,
) -> PipelineResult<(String, String)> {
    let configured = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let (Some(owner), Some(repo)) = (
        configured(&config.github.owner),
        configured(&config.github.repo),
    ) {
        return Ok((owner, repo));
    }

    slugs
        .resolved()
        .into_iter()
        .chain(slugs.candidates())
        .map(|slug| slug.owner_and_repo())
        .find(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .map(|(owner, repo)| (owner.to_string(), repo.to_string()))
        .ok_or_else(|| {
            PipelineError::Configuration(
                "无法确定 GitHub 仓库，请配置 github.owner 与 github.repo".to_string(),
            )
        })
}

/// 进程退出码：配置或认证错误为 2，其他错误为 1
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let configuration = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<PipelineError>())
        .any(PipelineError::is_configuration);
    if configuration {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::ProjectSlug;

    #[test]
    fn test_parse_names_skips_blank_lines() {
        let names = parse_names("  e2e/login.e2e.ts\n\n\te2e/home.e2e.ts  \r\n");
        assert_eq!(names, vec!["e2e/login.e2e.ts", "e2e/home.e2e.ts"]);
        assert!(parse_names("\n \n").is_empty());
    }

    #[test]
    fn test_read_names_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.txt");
        std::fs::write(&path, "a\nb\n").unwrap();
        assert_eq!(read_names(Some(&path)).unwrap(), vec!["a", "b"]);

        let err = read_names(Some(&dir.path().join("missing.txt"))).unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn test_github_repository_prefers_config() {
        let mut config = AppConfig::default();
        config.github.owner = Some("acme".to_string());
        config.github.repo = Some("mobile".to_string());
        let slugs = SlugResolver::new(vec![ProjectSlug::parse("gh/other/app", "gh").unwrap()]);

        let (owner, repo) = github_repository(&config, &slugs).unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("acme", "mobile"));
    }

    #[test]
    fn test_github_repository_falls_back_to_slug() {
        let config = AppConfig::default();
        let slugs = SlugResolver::new(vec![ProjectSlug::parse("gh/other/app", "gh").unwrap()]);
        let (owner, repo) = github_repository(&config, &slugs).unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("other", "app"));

        let err = github_repository(&config, &SlugResolver::new(Vec::new())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_exit_codes() {
        let config_err = anyhow::Error::new(PipelineError::Authentication("bad key".into()));
        assert_eq!(exit_code_for(&config_err), 2);

        let wrapped = anyhow::Error::new(PipelineError::Configuration("missing".into()))
            .context("加载配置失败");
        assert_eq!(exit_code_for(&wrapped), 2);

        let remote = anyhow::Error::new(PipelineError::Internal("boom".into()));
        assert_eq!(exit_code_for(&remote), 1);
        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }
}
