use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use e2e_pipeline::app::{
    AppMode, Application, NotifyArgs, PhaseKind, PlanArgs, ReportArgs, WaitArgs,
};
use e2e_pipeline::common::{bootstrap, exit_code_for, StartupConfig};
use pipeline_monitor::RunTarget;
use pipeline_notifier::NotifyRequest;

/// E2E 测试分片与 CI 结果汇报流水线
#[derive(Parser, Debug)]
#[command(name = "e2e-pipeline")]
#[command(version)]
#[command(about = "E2E测试分片、CI结果聚合与PR通知")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径，缺省时依次查找默认位置
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别，RUST_LOG 优先
    #[arg(short, long, global = true, default_value = "info",
          value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,

    /// 日志格式
    #[arg(long, global = true, default_value = "pretty", value_parser = ["json", "pretty"])]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 规划分片并输出当前分片的测试名
    Plan {
        /// 分片数量
        #[arg(long, env = "CIRCLE_NODE_TOTAL")]
        shards: usize,
        /// 当前分片索引
        #[arg(long, env = "CIRCLE_NODE_INDEX")]
        index: usize,
        /// 历史耗时文件
        #[arg(long)]
        timings: Option<PathBuf>,
        /// 测试列表文件，缺省读标准输入
        #[arg(long)]
        input: Option<PathBuf>,
        /// 清单输出路径
        #[arg(long)]
        manifest_out: Option<PathBuf>,
        /// 每个分片的测试列表输出目录
        #[arg(long)]
        lists_dir: Option<PathBuf>,
    },
    /// 打印清单的分片统计
    Overview {
        #[arg(long)]
        manifest: PathBuf,
    },
    /// 等待匹配的作业结束
    Wait {
        #[command(flatten)]
        target: TargetArgs,
        /// 轮询结果输出路径
        #[arg(long)]
        outcome_out: Option<PathBuf>,
    },
    /// 聚合失败并生成报告
    Report {
        #[command(flatten)]
        target: TargetArgs,
        /// JSON 摘要输出路径
        #[arg(long, default_value = "e2e-summary.json")]
        summary_out: PathBuf,
        /// HTML 报告输出路径
        #[arg(long)]
        html_out: Option<PathBuf>,
        /// wait 阶段写出的轮询结果
        #[arg(long)]
        poll_outcome: Option<PathBuf>,
    },
    /// 更新 PR 评论与提交状态
    Notify {
        #[arg(long, value_enum)]
        phase: PhaseArg,
        /// report 阶段写出的 JSON 摘要
        #[arg(long)]
        summary: Option<PathBuf>,
        /// 逗号分隔的 PR 地址
        #[arg(long, env = "CIRCLE_PULL_REQUESTS")]
        pr_url: Option<String>,
        #[arg(long, env = "CIRCLE_SHA1")]
        sha: Option<String>,
        #[arg(long, env = "CIRCLE_BUILD_URL")]
        build_url: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// 工作流 ID
    #[arg(long, env = "CIRCLE_WORKFLOW_ID")]
    workflow_id: Option<String>,
    /// 没有工作流 ID 时按分支取最新运行
    #[arg(long, env = "CIRCLE_BRANCH")]
    branch: Option<String>,
    /// 按分支查找时要匹配的工作流名
    #[arg(long)]
    workflow_name: Option<String>,
}

impl From<TargetArgs> for RunTarget {
    fn from(args: TargetArgs) -> Self {
        RunTarget {
            workflow_id: args.workflow_id,
            branch: args.branch,
            workflow_name: args.workflow_name,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PhaseArg {
    Started,
    Results,
}

impl From<Commands> for AppMode {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Plan {
                shards,
                index,
                timings,
                input,
                manifest_out,
                lists_dir,
            } => AppMode::Plan(PlanArgs {
                shards,
                index,
                timings,
                input,
                manifest_out,
                lists_dir,
            }),
            Commands::Overview { manifest } => AppMode::Overview { manifest },
            Commands::Wait {
                target,
                outcome_out,
            } => AppMode::Wait(WaitArgs {
                target: target.into(),
                outcome_out,
            }),
            Commands::Report {
                target,
                summary_out,
                html_out,
                poll_outcome,
            } => AppMode::Report(ReportArgs {
                target: target.into(),
                summary_out,
                html_out,
                poll_outcome,
            }),
            Commands::Notify {
                phase,
                summary,
                pr_url,
                sha,
                build_url,
            } => AppMode::Notify(NotifyArgs {
                phase: match phase {
                    PhaseArg::Started => PhaseKind::Started,
                    PhaseArg::Results => PhaseKind::Results,
                },
                summary,
                request: NotifyRequest {
                    pr_urls: pr_url,
                    sha,
                    build_url,
                },
            }),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let startup = StartupConfig {
        config_path: cli.config,
        log_level: cli.log_level,
        log_format: cli.log_format,
    };

    let result = match bootstrap(&startup) {
        Ok(config) => {
            info!("启动 e2e-pipeline");
            Application::new(config).run(cli.command.into()).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("e2e-pipeline: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
