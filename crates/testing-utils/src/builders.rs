//! Test data builders with sensible defaults

use pipeline_core::{
    Artifact, Job, JobStatus, Pipeline, TestOutcome, TestResult, Workflow,
};

pub fn job(name: &str, number: u64, status: &str) -> Job {
    Job {
        id: Some(format!("job-{number}")),
        name: name.to_string(),
        number: Some(number),
        status: JobStatus::from(status),
    }
}

pub fn unnumbered_job(name: &str, status: &str) -> Job {
    Job {
        id: None,
        name: name.to_string(),
        number: None,
        status: JobStatus::from(status),
    }
}

pub fn test_result(file: &str, name: &str, outcome: &str) -> TestResult {
    TestResult {
        file: file.to_string(),
        name: name.to_string(),
        result: TestOutcome::from(outcome.to_string()),
        message: if outcome == "success" {
            String::new()
        } else {
            format!("{name} did not pass")
        },
    }
}

pub fn artifact(path: &str) -> Artifact {
    Artifact::new(path, format!("https://artifacts.example.com/{path}"))
}

pub fn pipeline(id: &str, number: u64, branch: &str) -> Pipeline {
    Pipeline {
        id: id.to_string(),
        number,
        state: "created".to_string(),
        branch: Some(branch.to_string()),
        revision: Some(format!("{id}-sha")),
        created_at: None,
    }
}

pub fn workflow(id: &str, name: &str, pipeline: &Pipeline, status: &str) -> Workflow {
    Workflow {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        pipeline_id: pipeline.id.clone(),
        pipeline_number: pipeline.number,
        project_slug: None,
    }
}
