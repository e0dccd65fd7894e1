//! Projects, parameter studies, and cases stored in a bucket.
//!
//! Every operation is a short sequence of store calls. Existence checks run
//! before writes; nothing is retried or rolled back.
use crate::batch::{self, BatchBackend, JobRecord, JobRequest, LogDestination, RunSpec};
use crate::error::SweepError;
use crate::expand::{build_study, case_count};
use crate::ids::{self, ExcludingIds, IdSource};
use crate::layout::{self, CONFIG_FILE, PROJECTS_FOLDER, SCRIPTS_FOLDER};
use crate::model::{Case, InputParameter, ParameterStudy, Project};
use crate::settings::Settings;
use crate::store::{child_names, get_json, put_json, upload_dir, ObjectStore};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub struct Workspace<S> {
    store: S,
    settings: Settings,
}

/// Options for submitting one case.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replaces the run script stored with the case.
    pub run_script: Option<String>,
    /// Send logs to the batch service instead of `runs/<run>/log.txt`.
    pub cloud_logging: bool,
}

impl<S: ObjectStore> Workspace<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create the top-level folders and publish the fill tool to `scripts/`.
    pub fn initialize(&self, fill_tool: Option<&Path>) -> Result<()> {
        for folder in [PROJECTS_FOLDER, SCRIPTS_FOLDER] {
            if self.store.exists(folder)? {
                continue;
            }
            tracing::info!(folder, "creating folder");
            self.store.put(folder, b"")?;
        }
        if let Some(tool) = fill_tool {
            let bytes = fs::read(tool).map_err(|err| SweepError::io(tool, err))?;
            let key = layout::fill_tool_key();
            self.store.put(&key, &bytes)?;
            tracing::info!(source = %tool.display(), key = %key, "published fill tool");
        }
        Ok(())
    }

    /// Register a project and upload its base case files.
    pub fn create_project(&self, name: &str, source_dir: &Path) -> Result<Project> {
        validate_name(name, "project name")?;
        let project_path = layout::project_path(name);
        let config_key = layout::config_key(&project_path);
        if self.store.exists(&config_key)? {
            return Err(anyhow!(SweepError::Conflict(format!("project {name}"))));
        }
        if !source_dir.is_dir() {
            return Err(anyhow!(SweepError::NotFound(format!(
                "source directory {}",
                source_dir.display()
            ))));
        }
        let source_name = source_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("source directory {} has no name", source_dir.display()))?;
        let files_path = layout::join_key(&[&layout::base_files_path(name), source_name]);

        let project = Project {
            id: Uuid::new_v4(),
            path: project_path,
            created_at: Utc::now(),
            files_path,
            name: name.to_string(),
        };
        tracing::info!(key = %config_key, "uploading project config");
        put_json(&self.store, &config_key, &project)?;

        let uploaded = upload_dir(&self.store, source_dir, &project.files_path)
            .with_context(|| format!("upload {}", source_dir.display()))?;
        tracing::info!(
            project = name,
            files = uploaded.len(),
            target = %project.files_path,
            "uploaded base files"
        );
        Ok(project)
    }

    pub fn project_ids(&self) -> Result<Vec<String>> {
        child_names(&self.store, PROJECTS_FOLDER)
    }

    pub fn project(&self, name: &str) -> Result<Project> {
        let key = layout::config_key(&layout::project_path(name));
        self.read_record(&key, || format!("project {name}"))
    }

    /// Expand `parameters` into a new study and persist every case record.
    pub fn create_parameter_study(
        &self,
        project: &str,
        name: &str,
        run_script: &str,
        parameters: &[InputParameter],
        id_source: &mut dyn IdSource,
    ) -> Result<ParameterStudy> {
        validate_name(name, "parameter study name")?;
        if !self.project_ids()?.iter().any(|id| id == project) {
            return Err(anyhow!(SweepError::NotFound(format!("project {project}"))));
        }
        let study_path = layout::study_path(project, name);
        let config_key = layout::config_key(&study_path);
        if self.store.exists(&config_key)? {
            return Err(anyhow!(SweepError::Conflict(format!(
                "parameter study {name} in project {project}"
            ))));
        }
        validate_parameters(parameters)?;

        let existing = self.case_names(project, name)?;
        let mut case_ids = ExcludingIds::new(id_source, existing);
        tracing::debug!(
            project,
            study = name,
            cases = case_count(parameters),
            "expanding parameters"
        );
        let study = build_study(name, &study_path, parameters, run_script, &mut case_ids);
        if let Some(id) = case_ids.unresolved().first() {
            return Err(anyhow!(SweepError::Conflict(format!(
                "case {id} in parameter study {name}"
            ))));
        }
        for case in &study.cases {
            put_json(&self.store, &layout::config_key(&case.path), case)?;
        }
        put_json(&self.store, &config_key, &study)?;
        tracing::info!(
            project,
            study = name,
            cases = study.cases.len(),
            "created parameter study"
        );
        Ok(study)
    }

    pub fn parameter_study_ids(&self, project: &str) -> Result<Vec<String>> {
        child_names(&self.store, &folder_prefix(&layout::studies_path(project)))
    }

    pub fn parameter_study(&self, project: &str, study: &str) -> Result<ParameterStudy> {
        let key = layout::config_key(&layout::study_path(project, study));
        self.read_record(&key, || format!("parameter study {study} in project {project}"))
    }

    pub fn case_names(&self, project: &str, study: &str) -> Result<Vec<String>> {
        let names = child_names(&self.store, &folder_prefix(&layout::cases_path(project, study)))?;
        Ok(names.into_iter().filter(|name| name != CONFIG_FILE).collect())
    }

    pub fn case_config(&self, project: &str, study: &str, case: &str) -> Result<Case> {
        let key = layout::config_key(&layout::case_path(project, study, case));
        self.read_record(&key, || format!("case {case} in {project}/{study}"))
    }

    /// Remove run outputs of a case, keeping its `config.json`.
    pub fn delete_case_files(&self, project: &str, study: &str, case: &str) -> Result<usize> {
        let case_path = layout::case_path(project, study, case);
        let config_key = layout::config_key(&case_path);
        let mut deleted = 0;
        for key in self.store.list(&folder_prefix(&case_path))? {
            if key == config_key {
                continue;
            }
            self.store.delete(&key)?;
            deleted += 1;
        }
        tracing::info!(project, study, case, deleted, "deleted case files");
        Ok(deleted)
    }

    /// Build the job request for one run of a case without submitting it.
    pub fn prepare_run(
        &self,
        project: &str,
        study: &str,
        case: &str,
        options: &RunOptions,
    ) -> Result<JobRequest> {
        let stored = self.case_config(project, study, case)?;
        let run_script = options.run_script.clone().unwrap_or(stored.run_script);
        let run_name = ids::run_name(case);
        let spec = RunSpec {
            project,
            study,
            case,
            run_name: &run_name,
            run_script: &run_script,
            destination: if options.cloud_logging {
                LogDestination::CloudLogging
            } else {
                LogDestination::Path
            },
        };
        Ok(batch::build_job_request(&self.settings, &spec))
    }

    /// Submit one run of a case.
    pub fn run_case<B>(
        &self,
        backend: &B,
        project: &str,
        study: &str,
        case: &str,
        options: &RunOptions,
    ) -> Result<JobRecord>
    where
        B: BatchBackend + ?Sized,
    {
        let request = self.prepare_run(project, study, case, options)?;
        let record = backend
            .submit(&request)
            .with_context(|| format!("submit run of case {case}"))?;
        tracing::info!(project, study, case, job_id = %request.job_id, "submitted run");
        Ok(record)
    }

    fn read_record<T, F>(&self, key: &str, describe: F) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        F: FnOnce() -> String,
    {
        if !self.store.exists(key)? {
            return Err(anyhow!(SweepError::NotFound(describe())));
        }
        get_json(&self.store, key)
    }
}

fn folder_prefix(key: &str) -> String {
    format!("{key}/")
}

fn validate_name(name: &str, label: &str) -> Result<()> {
    let valid = !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && name != CONFIG_FILE;
    if !valid {
        return Err(anyhow!(SweepError::Malformed(format!(
            "{label} {name:?} must be a single non-empty path segment"
        ))));
    }
    Ok(())
}

fn validate_parameters(parameters: &[InputParameter]) -> Result<()> {
    for (idx, parameter) in parameters.iter().enumerate() {
        if parameter.path.trim().is_empty() {
            return Err(anyhow!(SweepError::Malformed(format!(
                "parameter {idx} has an empty path"
            ))));
        }
        if parameter.variable_name.is_empty() {
            return Err(anyhow!(SweepError::Malformed(format!(
                "parameter {idx} has an empty variable_name"
            ))));
        }
        if parameter.values.is_empty() {
            return Err(anyhow!(SweepError::Malformed(format!(
                "parameter {} ({}) has no values",
                idx, parameter.variable_name
            ))));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
