use tracing::{debug, info, warn};

use pipeline_circleci::SlugResolver;
use pipeline_core::{
    CiProvider, Pipeline, PipelineError, PipelineResult, ProjectSlug, RunIdentity, Workflow,
};

/// 要定位的运行：优先使用工作流 ID，否则按分支取最新流水线
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTarget {
    pub workflow_id: Option<String>,
    pub branch: Option<String>,
    /// 按分支查找时用于挑选工作流，为空时取第一个
    pub workflow_name: Option<String>,
}

/// 已定位的运行
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub identity: RunIdentity,
    pub slug: ProjectSlug,
}

fn identity(workflow: &Workflow, pipeline: Option<&Pipeline>) -> RunIdentity {
    RunIdentity {
        pipeline_id: workflow.pipeline_id.clone(),
        pipeline_number: pipeline
            .map(|p| p.number)
            .unwrap_or(workflow.pipeline_number),
        workflow_id: workflow.id.clone(),
        workflow_name: workflow.name.clone(),
        workflow_status: workflow.status.clone(),
        branch: pipeline.and_then(|p| p.branch.clone()),
        revision: pipeline.and_then(|p| p.revision.clone()),
    }
}

/// 定位运行；目标不存在时返回 `None`，调用方按"无事可做"处理
pub async fn resolve_run(
    ci: &dyn CiProvider,
    slugs: &mut SlugResolver,
    target: &RunTarget,
    default_vcs: &str,
) -> PipelineResult<Option<ResolvedRun>> {
    if let Some(workflow_id) = target.workflow_id.as_deref().filter(|id| !id.is_empty()) {
        return resolve_by_workflow(ci, slugs, workflow_id, default_vcs).await;
    }

    let branch = target
        .branch
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            PipelineError::Configuration("需要指定工作流 ID 或分支".to_string())
        })?;

    let (slug, pipelines) = slugs.pipelines_for_branch(ci, branch).await?;
    for pipeline in &pipelines {
        let workflows = match ci.list_workflows(&pipeline.id).await {
            Ok(workflows) => workflows,
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err),
        };
        let chosen = workflows.iter().find(|w| {
            target
                .workflow_name
                .as_deref()
                .map_or(true, |name| w.name == name)
        });
        if let Some(workflow) = chosen {
            info!(
                "分支 {} 定位到流水线 #{} 的工作流 {} ({})",
                branch, pipeline.number, workflow.name, workflow.id
            );
            return Ok(Some(ResolvedRun {
                identity: identity(workflow, Some(pipeline)),
                slug,
            }));
        }
        debug!("流水线 #{} 没有匹配的工作流", pipeline.number);
    }

    warn!("分支 {} 上没有找到可用的运行", branch);
    Ok(None)
}

async fn resolve_by_workflow(
    ci: &dyn CiProvider,
    slugs: &mut SlugResolver,
    workflow_id: &str,
    default_vcs: &str,
) -> PipelineResult<Option<ResolvedRun>> {
    let workflow = match ci.get_workflow(workflow_id).await {
        Ok(workflow) => workflow,
        Err(err) if err.is_not_found() => {
            warn!("工作流 {} 不存在", workflow_id);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    if let Some(slug) = workflow
        .project_slug
        .as_deref()
        .and_then(|raw| ProjectSlug::parse(raw, default_vcs))
    {
        slugs.adopt(slug);
    }

    let pipeline = match ci.get_pipeline(&workflow.pipeline_id).await {
        Ok(pipeline) => Some(pipeline),
        Err(err) if err.is_not_found() => {
            warn!("工作流 {} 的流水线 {} 不存在", workflow_id, workflow.pipeline_id);
            None
        }
        Err(err) => return Err(err),
    };

    let slug = slugs.current()?.clone();
    Ok(Some(ResolvedRun {
        identity: identity(&workflow, pipeline.as_ref()),
        slug,
    }))
}
