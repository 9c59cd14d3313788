pub mod sections;
pub mod validation;

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use sections::{
    AggregatorConfig, CircleCiConfig, GitHubConfig, PlannerConfig, PollerConfig, ScoringPolicy,
};
pub use validation::{ConfigValidator, ValidationUtils};

use crate::{PipelineError, PipelineResult};

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/e2e-pipeline.toml", "e2e-pipeline.toml"];

const ENV_PREFIX: &str = "E2E_PIPELINE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub planner: PlannerConfig,
    pub circleci: CircleCiConfig,
    pub poller: PollerConfig,
    pub aggregator: AggregatorConfig,
    pub github: GitHubConfig,
}

impl AppConfig {
    /// 加载配置：TOML 文件 → `E2E_PIPELINE_` 环境变量 → CI 约定环境变量
    pub fn load(config_path: Option<&str>) -> PipelineResult<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(PipelineError::Configuration(format!(
                    "配置文件不存在: {path}"
                )));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            debug!("使用默认配置文件: {path}");
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("poller.job_prefixes")
                .with_list_parse_key("aggregator.job_prefixes")
                .with_list_parse_key("aggregator.path_markers")
                .with_list_parse_key("aggregator.image_extensions")
                .with_list_parse_key("aggregator.scoring.hints"),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_ci_environment(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// 用 CI 平台约定的环境变量补齐未配置的凭据
    pub fn apply_ci_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
                if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                    *slot = Some(value);
                }
            }
        };

        fill(&mut self.circleci.token, "CIRCLE_TOKEN");
        fill(&mut self.github.token, "GITHUB_TOKEN");
        fill(&mut self.github.app_id, "GITHUB_APP_ID");
        fill(&mut self.github.installation_id, "GITHUB_APP_INSTALLATION_ID");
        fill(&mut self.github.private_key, "GITHUB_APP_PRIVATE_KEY");
    }

    pub fn from_toml(toml_str: &str) -> PipelineResult<Self> {
        let config: AppConfig = toml::from_str(toml_str)
            .map_err(|e| PipelineError::Configuration(format!("解析TOML配置失败: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> PipelineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Serialization(format!("序列化配置为TOML失败: {e}")))
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> PipelineResult<()> {
        self.planner.validate()?;
        self.circleci.validate()?;
        self.poller.validate()?;
        self.aggregator.validate()?;
        self.github.validate()?;
        Ok(())
    }
}
