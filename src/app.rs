use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use pipeline_circleci::CircleCiClient;
use pipeline_core::{AppConfig, CiProvider, PipelineError, PollOutcome};
use pipeline_github::GitHubClient;
use pipeline_monitor::{
    resolve_run, CompletionPoller, FailureAggregator, PollerOptions, ResolvedRun, RunTarget,
};
use pipeline_notifier::{NotifyOutcome, NotifyPhase, NotifyRequest, PrNotifier};
use pipeline_planner::{
    read_manifest, write_manifest, write_shard_lists, ManifestOverview, ShardPlanner, TimingTable,
};
use pipeline_report::{
    read_poll_outcome, read_summary, render_html, write_html, write_poll_outcome, write_summary,
    RunSummary,
};

use crate::common::{github_repository, read_names, slug_resolver};

/// `plan` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct PlanArgs {
    pub shards: usize,
    pub index: usize,
    pub timings: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub manifest_out: Option<PathBuf>,
    pub lists_dir: Option<PathBuf>,
}

/// `wait` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct WaitArgs {
    pub target: RunTarget,
    pub outcome_out: Option<PathBuf>,
}

/// `report` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    pub target: RunTarget,
    pub summary_out: PathBuf,
    pub html_out: Option<PathBuf>,
    pub poll_outcome: Option<PathBuf>,
}

/// `notify` 的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Started,
    Results,
}

/// `notify` 子命令参数
#[derive(Debug, Clone)]
pub struct NotifyArgs {
    pub phase: PhaseKind,
    pub summary: Option<PathBuf>,
    pub request: NotifyRequest,
}

/// 运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    Plan(PlanArgs),
    Overview { manifest: PathBuf },
    Wait(WaitArgs),
    Report(ReportArgs),
    Notify(NotifyArgs),
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, mode: AppMode) -> Result<()> {
        match mode {
            AppMode::Plan(args) => self.run_plan(&args),
            AppMode::Overview { manifest } => self.run_overview(&manifest),
            AppMode::Wait(args) => self.run_wait(&args).await,
            AppMode::Report(args) => self.run_report(&args).await,
            AppMode::Notify(args) => self.run_notify(&args).await,
        }
    }

    /// 规划分片并把当前分片的测试名逐行输出到 stdout
    fn run_plan(&self, args: &PlanArgs) -> Result<()> {
        let timings = match &args.timings {
            Some(path) => TimingTable::load(path)?,
            None => TimingTable::empty(),
        };
        let names = read_names(args.input.as_deref())?;

        let planner = ShardPlanner::new(self.config.planner.clone(), timings);
        let manifest = planner.plan(&names, args.shards, args.index)?;

        if let Some(path) = &args.manifest_out {
            write_manifest(path, &manifest)?;
        }
        if let Some(dir) = &args.lists_dir {
            write_shard_lists(dir, &manifest)?;
        }

        if let Some(bin) = manifest.selected_bin() {
            for name in bin.names() {
                println!("{name}");
            }
        }
        Ok(())
    }

    fn run_overview(&self, manifest: &std::path::Path) -> Result<()> {
        let manifest = read_manifest(manifest)?;
        print!("{}", ManifestOverview::from_manifest(&manifest));
        Ok(())
    }

    fn ci_client(&self) -> Result<CircleCiClient> {
        Ok(CircleCiClient::new(&self.config.circleci).map_err(PipelineError::from)?)
    }

    async fn resolve(&self, ci: &dyn CiProvider, target: &RunTarget) -> Result<Option<ResolvedRun>> {
        let mut slugs = slug_resolver(&self.config);
        let run = resolve_run(ci, &mut slugs, target, &self.config.circleci.vcs_type).await?;
        Ok(run)
    }

    /// 等待匹配的作业结束；超时或没有作业都不算失败
    async fn run_wait(&self, args: &WaitArgs) -> Result<()> {
        let client = self.ci_client()?;

        let workflow_id = match args.target.workflow_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => match self.resolve(&client, &args.target).await? {
                Some(run) => run.identity.workflow_id,
                None => {
                    info!("没有找到要等待的运行");
                    return Ok(());
                }
            },
        };

        let poller = CompletionPoller::new(&client, PollerOptions::from(&self.config.poller));
        let outcome = poller.wait(&workflow_id).await;
        info!(
            "等待结束: {:?}，{} 个作业中 {} 个未完成",
            outcome.reason, outcome.total, outcome.pending
        );

        if let Some(path) = &args.outcome_out {
            write_poll_outcome(path, &outcome)?;
        }
        Ok(())
    }

    fn load_poll_outcome(&self, path: Option<&std::path::Path>) -> Result<Option<PollOutcome>> {
        let Some(path) = path else {
            return Ok(None);
        };
        if !path.exists() {
            warn!("轮询结果文件 {} 不存在，按完整运行处理", path.display());
            return Ok(None);
        }
        Ok(Some(read_poll_outcome(path)?))
    }

    /// 聚合失败并写出 JSON 摘要与 HTML 报告
    async fn run_report(&self, args: &ReportArgs) -> Result<()> {
        let client = self.ci_client()?;
        let outcome = self.load_poll_outcome(args.poll_outcome.as_deref())?;

        let Some(run) = self.resolve(&client, &args.target).await? else {
            info!("没有找到可汇报的运行");
            return Ok(());
        };

        let jobs = match client.list_jobs(&run.identity.workflow_id).await {
            Ok(jobs) => jobs,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err).context("拉取作业列表失败"),
        };

        let aggregator = FailureAggregator::new(&client, self.config.aggregator.clone());
        let report = aggregator.aggregate(&run.slug, &jobs).await;

        let generated_at = Utc::now();
        let summary = RunSummary::build(&run.identity, &report, outcome.as_ref(), generated_at);
        write_summary(&args.summary_out, &summary)?;

        if let Some(path) = &args.html_out {
            let html = render_html(&run.identity, &report, outcome.as_ref(), generated_at);
            write_html(path, &html)?;
        }
        Ok(())
    }

    /// 更新 PR 置顶评论与提交状态
    async fn run_notify(&self, args: &NotifyArgs) -> Result<()> {
        let phase = match args.phase {
            PhaseKind::Started => NotifyPhase::Started,
            PhaseKind::Results => {
                let path = args.summary.as_deref().ok_or_else(|| {
                    PipelineError::Configuration("results 阶段需要 --summary".to_string())
                })?;
                if !path.exists() {
                    warn!("摘要文件 {} 不存在，跳过通知", path.display());
                    return Ok(());
                }
                NotifyPhase::Results(read_summary(path)?)
            }
        };

        let slugs = slug_resolver(&self.config);
        let (owner, repo) = github_repository(&self.config, &slugs)?;
        let host = GitHubClient::connect(&self.config.github, &owner, &repo)
            .await
            .map_err(PipelineError::from)?;

        let notifier = PrNotifier::new(&host, self.config.github.clone());
        match notifier.notify(&args.request, &phase).await? {
            NotifyOutcome::NoPullRequest => info!("没有关联的 PR，无需通知"),
            NotifyOutcome::Created { pr_number, .. } | NotifyOutcome::Updated { pr_number, .. } => {
                info!("已通知 {}#{}", host.repository(), pr_number)
            }
        }
        Ok(())
    }
}
