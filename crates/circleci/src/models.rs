//! Wire records for the CircleCI v2 API.
//!
//! Every field is defaulted so unknown or missing keys never fail a whole listing.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use pipeline_core::{Artifact, Job, JobStatus, Pipeline, TestOutcome, TestResult, Workflow};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VcsDto {
    pub branch: Option<String>,
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineDto {
    pub id: String,
    pub number: u64,
    pub state: String,
    pub created_at: Option<DateTime<Utc>>,
    pub vcs: VcsDto,
}

impl From<PipelineDto> for Pipeline {
    fn from(dto: PipelineDto) -> Self {
        Pipeline {
            id: dto.id,
            number: dto.number,
            state: dto.state,
            branch: dto.vcs.branch,
            revision: dto.vcs.revision,
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowDto {
    pub id: String,
    pub name: String,
    pub status: String,
    pub pipeline_id: String,
    pub pipeline_number: u64,
    pub project_slug: Option<String>,
}

impl From<WorkflowDto> for Workflow {
    fn from(dto: WorkflowDto) -> Self {
        Workflow {
            id: dto.id,
            name: dto.name,
            status: dto.status,
            pipeline_id: dto.pipeline_id,
            pipeline_number: dto.pipeline_number,
            project_slug: dto.project_slug,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobDto {
    pub id: Option<String>,
    pub name: String,
    pub job_number: Option<u64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl From<JobDto> for Job {
    fn from(dto: JobDto) -> Self {
        Job {
            id: dto.id,
            name: dto.name,
            number: dto.job_number,
            status: JobStatus::from(dto.status.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestDto {
    pub file: Option<String>,
    pub name: String,
    pub classname: Option<String>,
    pub result: String,
    pub message: Option<String>,
    pub run_time: Option<f64>,
}

impl From<TestDto> for TestResult {
    fn from(dto: TestDto) -> Self {
        TestResult {
            file: dto.file.unwrap_or_default(),
            name: dto.name,
            result: TestOutcome::from(dto.result),
            message: dto.message.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactDto {
    pub path: String,
    pub url: String,
    pub node_index: Option<u32>,
}

impl From<ArtifactDto> for Artifact {
    fn from(dto: ArtifactDto) -> Self {
        Artifact::new(dto.path, dto.url)
    }
}
