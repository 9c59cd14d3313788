use chrono::Utc;
use tracing::{debug, error, info, warn};

use pipeline_core::{
    config::GitHubConfig, CodeHost, CommitState, CommitStatus, IssueComment, PipelineResult,
};
use pipeline_report::{render_results_comment, render_started_comment, RunSummary};

use crate::pull_request::pr_number_from_urls;

/// GitHub 对状态描述的长度限制
const MAX_STATUS_DESCRIPTION: usize = 140;

/// 通知阶段
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyPhase {
    Started,
    Results(RunSummary),
}

/// 通知的输入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyRequest {
    /// 逗号分隔的 PR 地址列表
    pub pr_urls: Option<String>,
    pub sha: Option<String>,
    /// 状态与评论中链接到的构建地址
    pub build_url: Option<String>,
}

/// 通知结果
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// 没有关联的 PR，什么也没做
    NoPullRequest,
    Created { pr_number: u64, comment_id: u64 },
    Updated { pr_number: u64, comment_id: u64 },
}

/// PR 通知器
///
/// 每个 PR 只维护一条带标记的置顶评论：存在则原地更新，否则新建。
/// 提交状态与评论相互独立，两者都尝试之后再返回第一个错误。
pub struct PrNotifier<'a> {
    host: &'a dyn CodeHost,
    config: GitHubConfig,
}

impl<'a> PrNotifier<'a> {
    pub fn new(host: &'a dyn CodeHost, config: GitHubConfig) -> Self {
        Self { host, config }
    }

    /// 确定目标 PR：显式地址优先，其次按提交查询第一个打开的 PR
    pub async fn resolve_pr(&self, request: &NotifyRequest) -> PipelineResult<Option<u64>> {
        if let Some(number) = request.pr_urls.as_deref().and_then(pr_number_from_urls) {
            debug!("使用显式指定的 PR #{}", number);
            return Ok(Some(number));
        }

        let Some(sha) = request.sha.as_deref().filter(|s| !s.is_empty()) else {
            debug!("没有 PR 地址也没有提交 SHA，无法确定 PR");
            return Ok(None);
        };

        let pulls = match self.host.pull_requests_for_commit(sha).await {
            Ok(pulls) => pulls,
            Err(err) if err.is_not_found() => {
                debug!("提交 {} 在代码托管端不存在: {}", sha, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let number = pulls.iter().find(|pr| pr.is_open()).map(|pr| pr.number);
        match number {
            Some(number) => debug!("提交 {} 对应 PR #{}", sha, number),
            None => debug!("提交 {} 没有打开的 PR", sha),
        }
        Ok(number)
    }

    /// 查找带标记的已有评论
    pub async fn find_existing(&self, pr_number: u64) -> PipelineResult<Option<IssueComment>> {
        let comments = self.host.list_issue_comments(pr_number).await?;
        Ok(comments
            .into_iter()
            .find(|comment| comment.body.contains(&self.config.marker)))
    }

    /// 新建或更新置顶评论
    pub async fn upsert(&self, pr_number: u64, body: &str) -> PipelineResult<NotifyOutcome> {
        match self.find_existing(pr_number).await? {
            Some(existing) => {
                let comment = self.host.update_issue_comment(existing.id, body).await?;
                info!("已更新 PR #{} 的评论 {}", pr_number, comment.id);
                Ok(NotifyOutcome::Updated {
                    pr_number,
                    comment_id: comment.id,
                })
            }
            None => {
                let comment = self.host.create_issue_comment(pr_number, body).await?;
                info!("已在 PR #{} 新建评论 {}", pr_number, comment.id);
                Ok(NotifyOutcome::Created {
                    pr_number,
                    comment_id: comment.id,
                })
            }
        }
    }

    fn render(&self, phase: &NotifyPhase, request: &NotifyRequest) -> String {
        let build_url = request.build_url.as_deref();
        match phase {
            NotifyPhase::Started => render_started_comment(&self.config.marker, Utc::now(), build_url),
            NotifyPhase::Results(summary) => {
                render_results_comment(&self.config.marker, summary, build_url)
            }
        }
    }

    /// 阶段对应的提交状态
    pub fn status_for(&self, phase: &NotifyPhase, request: &NotifyRequest) -> CommitStatus {
        let (state, description) = match phase {
            NotifyPhase::Started => (CommitState::Pending, "E2E tests are running".to_string()),
            NotifyPhase::Results(summary) if summary.is_green() => {
                (CommitState::Success, "All E2E tests passed".to_string())
            }
            NotifyPhase::Results(summary) if !summary.failures.is_empty() => (
                CommitState::Failure,
                format!("{} failing E2E tests", summary.failures.len()),
            ),
            NotifyPhase::Results(_) => (
                CommitState::Error,
                "E2E results are incomplete".to_string(),
            ),
        };
        CommitStatus {
            state,
            description: description.chars().take(MAX_STATUS_DESCRIPTION).collect(),
            context: self.config.status_context.clone(),
            target_url: request.build_url.clone(),
        }
    }

    async fn set_status(&self, phase: &NotifyPhase, request: &NotifyRequest) -> PipelineResult<()> {
        if !self.config.status_enabled {
            return Ok(());
        }
        let Some(sha) = request.sha.as_deref().filter(|s| !s.is_empty()) else {
            warn!("已启用提交状态但缺少提交 SHA，跳过");
            return Ok(());
        };
        let status = self.status_for(phase, request);
        self.host.create_commit_status(sha, &status).await?;
        info!("提交 {} 的状态已设置为 {:?}", sha, status.state);
        Ok(())
    }

    /// 执行一次通知
    pub async fn notify(
        &self,
        request: &NotifyRequest,
        phase: &NotifyPhase,
    ) -> PipelineResult<NotifyOutcome> {
        let Some(pr_number) = self.resolve_pr(request).await? else {
            info!("没有关联的 PR，跳过通知");
            return Ok(NotifyOutcome::NoPullRequest);
        };

        let body = self.render(phase, request);
        let comment = self.upsert(pr_number, &body).await;
        let status = self.set_status(phase, request).await;

        if let Err(err) = &comment {
            error!("更新 PR #{} 评论失败: {}", pr_number, err);
        }
        if let Err(err) = &status {
            error!("设置提交状态失败: {}", err);
        }

        let outcome = comment?;
        status?;
        Ok(outcome)
    }
}
