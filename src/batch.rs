//! Batch job payloads and the submission seam.
//!
//! A run is one single-task job: a container that mounts the bucket, copies
//! the project's base files into a scratch folder, fills the case's template
//! tokens, runs the user's script, and copies the result back into the
//! case's `runs/<run>` folder.
use crate::layout::{self, fill_tool_key};
use crate::settings::Settings;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

mod spool;

pub use spool::SpoolBatch;

pub const LABEL_PROJECT: &str = "project";
pub const LABEL_STUDY: &str = "parameter_study";
pub const LABEL_CASE: &str = "case_name";
const ENTRYPOINT: &str = "/bin/bash";
/// Bucket mounts expose objects without the exec bit, so the fill tool is
/// installed off the mount before it runs.
pub const STAGED_FILL_TOOL: &str = "/tmp/foamcloud-fill";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub parent: String,
    pub job_id: String,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub task_groups: Vec<TaskGroup>,
    pub allocation_policy: AllocationPolicy,
    pub labels: BTreeMap<String, String>,
    pub logs_policy: LogsPolicy,
}

impl Job {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    pub task_count: u32,
    pub task_spec: TaskSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub runnables: Vec<Runnable>,
    pub volumes: Vec<Volume>,
    pub compute_resource: ComputeResource,
    pub max_retry_count: u32,
    /// Duration string in seconds, e.g. `600s`.
    pub max_run_duration: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Runnable {
    pub container: Container,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub image_uri: String,
    pub entrypoint: String,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub gcs: GcsVolume,
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsVolume {
    pub remote_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResource {
    pub cpu_milli: u32,
    pub memory_mib: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AllocationPolicy {
    pub instances: Vec<InstancePolicyOrTemplate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InstancePolicyOrTemplate {
    pub policy: InstancePolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePolicy {
    pub machine_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsPolicy {
    pub destination: LogDestination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogDestination {
    /// A `log.txt` file in the run folder on the bucket.
    Path,
    CloudLogging,
}

/// Lifecycle of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Scheduled => "scheduled",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "queued" => Ok(JobState::Queued),
            "scheduled" => Ok(JobState::Scheduled),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state {other:?}")),
        }
    }
}

/// A job as the backend knows it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobRecord {
    pub request: JobRequest,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn job_id(&self) -> &str {
        &self.request.job_id
    }

    /// True when the job is labelled with `project` and `study`.
    pub fn belongs_to(&self, project: &str, study: &str) -> bool {
        self.request.job.label(LABEL_PROJECT) == Some(project)
            && self.request.job.label(LABEL_STUDY) == Some(study)
    }
}

pub trait BatchBackend {
    fn submit(&self, request: &JobRequest) -> Result<JobRecord>;

    /// Every job below `parent`.
    fn list_jobs(&self, parent: &str) -> Result<Vec<JobRecord>>;
}

/// Inputs for one run of one case.
#[derive(Debug, Clone)]
pub struct RunSpec<'a> {
    pub project: &'a str,
    pub study: &'a str,
    pub case: &'a str,
    pub run_name: &'a str,
    pub run_script: &'a str,
    pub destination: LogDestination,
}

/// Absolute path of a bucket key as seen from inside the container.
pub fn mounted_path(settings: &Settings, key: &str) -> String {
    format!("{}/{}", settings.mountpoint.trim_end_matches('/'), key)
}

/// The `&&`-chained shell program the container runs.
pub fn run_command(settings: &Settings, spec: &RunSpec<'_>) -> String {
    let case_key = layout::case_path(spec.project, spec.study, spec.case);
    let base_path = mounted_path(settings, &layout::base_files_path(spec.project));
    let run_path = mounted_path(settings, &layout::run_path_in(&case_key, spec.run_name));
    let case_config = mounted_path(settings, &layout::config_key(&case_key));
    let fill_tool = mounted_path(settings, &fill_tool_key());
    let work = quote(&settings.work_folder);

    let mut steps = vec![
        format!("source {}", quote(&settings.environment_script)),
        "echo 'Run script:'".to_string(),
        format!("echo {}", quote(spec.run_script)),
        format!("mkdir -p {}", quote(&run_path)),
        format!("cd {}", quote(&base_path)),
        format!("cp -r \"$(ls | head -n 1)\" {work}"),
        format!("cd {work}"),
    ];
    steps.extend(fill_tool_steps(
        &fill_tool,
        STAGED_FILL_TOOL,
        &case_config,
        &settings.work_folder,
    ));
    steps.extend([
        spec.run_script.to_string(),
        format!("echo {}", quote(&format!("copy from {} to {run_path}", settings.work_folder))),
        format!("cp -r {work} {}", quote(&run_path)),
    ]);
    steps.join(" && ")
}

/// Copy the published fill tool to `staged` as an executable and run it on
/// the case config.
pub fn fill_tool_steps(
    published: &str,
    staged: &str,
    case_config: &str,
    work: &str,
) -> [String; 2] {
    [
        format!("install -m 755 {} {}", quote(published), quote(staged)),
        format!("{} {} {}", quote(staged), quote(case_config), quote(work)),
    ]
}

/// Build the submission payload for one run.
pub fn build_job_request(settings: &Settings, spec: &RunSpec<'_>) -> JobRequest {
    let case_key = layout::case_path(spec.project, spec.study, spec.case);
    let run_key = layout::run_path_in(&case_key, spec.run_name);
    let logs_path = match spec.destination {
        LogDestination::Path => Some(mounted_path(settings, &layout::run_log_key(&run_key))),
        LogDestination::CloudLogging => None,
    };

    let task_spec = TaskSpec {
        runnables: vec![Runnable {
            container: Container {
                image_uri: settings.image_uri.clone(),
                entrypoint: ENTRYPOINT.to_string(),
                commands: vec!["-c".to_string(), run_command(settings, spec)],
            },
        }],
        volumes: vec![Volume {
            gcs: GcsVolume {
                remote_path: settings.bucket.clone(),
            },
            mount_path: settings.mountpoint.clone(),
        }],
        compute_resource: ComputeResource {
            cpu_milli: settings.cpu_milli,
            memory_mib: settings.memory_mib,
        },
        max_retry_count: settings.max_retry_count,
        max_run_duration: format!("{}s", settings.max_run_duration_secs),
    };

    let labels = BTreeMap::from([
        (LABEL_PROJECT.to_string(), spec.project.to_string()),
        (LABEL_STUDY.to_string(), spec.study.to_string()),
        (LABEL_CASE.to_string(), spec.case.to_string()),
    ]);

    JobRequest {
        parent: settings.job_parent(),
        job_id: spec.run_name.to_string(),
        job: Job {
            task_groups: vec![TaskGroup {
                task_count: 1,
                task_spec,
            }],
            allocation_policy: AllocationPolicy {
                instances: vec![InstancePolicyOrTemplate {
                    policy: InstancePolicy {
                        machine_type: settings.machine_type.clone(),
                    },
                }],
            },
            labels,
            logs_policy: LogsPolicy {
                destination: spec.destination,
                logs_path,
            },
        },
    }
}

/// Jobs currently executing.
pub fn active_runs<B>(backend: &B, parent: &str) -> Result<Vec<JobRecord>>
where
    B: BatchBackend + ?Sized,
{
    Ok(backend
        .list_jobs(parent)?
        .into_iter()
        .filter(|record| record.state == JobState::Running)
        .collect())
}

/// Executing jobs labelled with `project` and `study`.
pub fn active_runs_for_study<B>(
    backend: &B,
    parent: &str,
    project: &str,
    study: &str,
) -> Result<Vec<JobRecord>>
where
    B: BatchBackend + ?Sized,
{
    Ok(active_runs(backend, parent)?
        .into_iter()
        .filter(|record| record.belongs_to(project, study))
        .collect())
}

fn quote(raw: &str) -> String {
    shell_words::quote(raw).into_owned()
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
