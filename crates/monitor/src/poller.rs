use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use pipeline_core::{config::PollerConfig, CiProvider, Job, PollOutcome, PollReason};

/// 完成轮询参数
#[derive(Debug, Clone, PartialEq)]
pub struct PollerOptions {
    /// 作业名前缀，为空时匹配全部作业
    pub prefixes: Vec<String>,
    /// 两次轮询之间的间隔
    pub poll_interval: Duration,
    /// 总等待时间上限，超时后尽力继续
    pub timeout: Duration,
    /// 连续多少次没有匹配作业后放弃等待
    pub max_empty_polls: u32,
}

impl From<&PollerConfig> for PollerOptions {
    fn from(config: &PollerConfig) -> Self {
        Self {
            prefixes: config.job_prefixes.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            timeout: Duration::from_secs(config.timeout_seconds),
            max_empty_polls: config.max_empty_polls.max(1),
        }
    }
}

/// 完成轮询器
///
/// 周期性拉取工作流的作业列表，直到所有匹配前缀的作业都进入终态、长时间没有匹配作业，
/// 或者超过截止时间。拉取失败只记录警告，下一轮继续。
pub struct CompletionPoller<'a> {
    ci: &'a dyn CiProvider,
    options: PollerOptions,
}

impl<'a> CompletionPoller<'a> {
    pub fn new(ci: &'a dyn CiProvider, options: PollerOptions) -> Self {
        Self { ci, options }
    }

    /// 等待工作流中匹配的作业全部结束
    pub async fn wait(&self, workflow_id: &str) -> PollOutcome {
        let deadline = Instant::now() + self.options.timeout;
        let mut ticks = 0u32;
        let mut empty_polls = 0u32;
        let mut last_jobs: Vec<Job> = Vec::new();

        info!(
            "开始等待工作流 {} 的作业完成，前缀: {:?}，间隔 {:?}，超时 {:?}",
            workflow_id, self.options.prefixes, self.options.poll_interval, self.options.timeout
        );

        loop {
            ticks += 1;

            match self.ci.list_jobs(workflow_id).await {
                Ok(jobs) => {
                    let matching: Vec<Job> = jobs
                        .into_iter()
                        .filter(|job| job.matches_prefix(&self.options.prefixes))
                        .collect();

                    if matching.is_empty() {
                        empty_polls += 1;
                        debug!(
                            "第 {} 次轮询没有匹配的作业 ({}/{})",
                            ticks, empty_polls, self.options.max_empty_polls
                        );
                        if empty_polls >= self.options.max_empty_polls {
                            info!("连续 {} 次没有匹配的作业，停止等待", empty_polls);
                            return Self::outcome(PollReason::NoJobs, ticks, last_jobs);
                        }
                    } else {
                        empty_polls = 0;
                        let pending = Self::pending(&matching);
                        last_jobs = matching;
                        if pending == 0 {
                            info!(
                                "全部 {} 个作业已结束，共轮询 {} 次",
                                last_jobs.len(),
                                ticks
                            );
                            return Self::outcome(PollReason::Completed, ticks, last_jobs);
                        }
                        info!(
                            "仍有 {}/{} 个作业未结束，{:?} 后再次检查",
                            pending,
                            last_jobs.len(),
                            self.options.poll_interval
                        );
                    }
                }
                Err(err) if err.is_not_found() => {
                    empty_polls += 1;
                    debug!("工作流 {} 暂时没有作业列表: {}", workflow_id, err);
                    if empty_polls >= self.options.max_empty_polls {
                        return Self::outcome(PollReason::NoJobs, ticks, last_jobs);
                    }
                }
                Err(err) => {
                    warn!("第 {} 次拉取作业列表失败，将继续轮询: {}", ticks, err);
                }
            }

            tokio::time::sleep(self.options.poll_interval).await;

            if Instant::now() >= deadline {
                let outcome = Self::outcome(PollReason::TimedOut, ticks, last_jobs);
                warn!(
                    "等待超时，仍有 {} 个作业未结束，继续生成报告",
                    outcome.pending
                );
                return outcome;
            }
        }
    }

    fn pending(jobs: &[Job]) -> usize {
        jobs.iter().filter(|job| !job.status.is_terminal()).count()
    }

    fn outcome(reason: PollReason, ticks: u32, jobs: Vec<Job>) -> PollOutcome {
        PollOutcome {
            reason,
            total: jobs.len(),
            pending: Self::pending(&jobs),
            ticks,
            jobs,
        }
    }
}
