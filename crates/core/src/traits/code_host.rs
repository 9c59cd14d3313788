use async_trait::async_trait;

use crate::{
    models::{CommitStatus, IssueComment, PullRequestRef},
    PipelineResult,
};

/// 代码托管平台接口
///
/// 任何非2xx响应都直接返回错误，不做重试。
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// 列出 PR 下的全部评论
    async fn list_issue_comments(&self, pr_number: u64) -> PipelineResult<Vec<IssueComment>>;

    /// 新建评论
    async fn create_issue_comment(&self, pr_number: u64, body: &str)
        -> PipelineResult<IssueComment>;

    /// 原地更新评论
    async fn update_issue_comment(&self, comment_id: u64, body: &str)
        -> PipelineResult<IssueComment>;

    /// 查询包含某次提交的 PR
    async fn pull_requests_for_commit(&self, sha: &str) -> PipelineResult<Vec<PullRequestRef>>;

    /// 为提交设置状态
    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> PipelineResult<()>;
}
