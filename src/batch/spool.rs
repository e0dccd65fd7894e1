//! File-drop job queue.
//!
//! Each submitted job is one `<job id>.json` record in the spool directory.
//! Whatever executes the jobs advances `state` in place; `foamcloud runs
//! mark` does the same by hand.
use super::{BatchBackend, JobRecord, JobRequest, JobState};
use crate::error::SweepError;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct SpoolBatch {
    dir: PathBuf,
}

impl SpoolBatch {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, job_id: &str) -> Result<PathBuf> {
        let valid = !job_id.is_empty()
            && job_id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(anyhow!(SweepError::Malformed(format!(
                "job id {job_id:?} must be ASCII alphanumeric"
            ))));
        }
        Ok(self.dir.join(format!("{job_id}.json")))
    }

    pub fn job(&self, job_id: &str) -> Result<JobRecord> {
        let path = self.record_path(job_id)?;
        if !path.is_file() {
            return Err(anyhow!(SweepError::NotFound(format!("job {job_id}"))));
        }
        read_record(&path)
    }

    /// Move a job to `state`.
    pub fn set_state(&self, job_id: &str, state: JobState) -> Result<JobRecord> {
        let mut record = self.job(job_id)?;
        record.state = state;
        record.updated_at = Utc::now();
        self.write_record(&record)?;
        tracing::info!(job_id, state = %state, "job state updated");
        Ok(record)
    }

    fn write_record(&self, record: &JobRecord) -> Result<()> {
        let path = self.record_path(record.job_id())?;
        fs::create_dir_all(&self.dir).map_err(|err| SweepError::io(&self.dir, err))?;
        let bytes = serde_json::to_vec_pretty(record).context("serialize job record")?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|err| SweepError::io(&self.dir, err))?;
        tmp.write_all(&bytes)
            .map_err(|err| SweepError::io(tmp.path(), err))?;
        tmp.persist(&path)
            .map_err(|err| SweepError::io(&path, err.error))?;
        Ok(())
    }
}

impl BatchBackend for SpoolBatch {
    fn submit(&self, request: &JobRequest) -> Result<JobRecord> {
        let path = self.record_path(&request.job_id)?;
        if path.exists() {
            return Err(anyhow!(SweepError::Conflict(format!(
                "job {}",
                request.job_id
            ))));
        }
        let now = Utc::now();
        let record = JobRecord {
            request: request.clone(),
            state: JobState::Queued,
            submitted_at: now,
            updated_at: now,
        };
        self.write_record(&record)?;
        tracing::info!(
            job_id = %request.job_id,
            spool = %self.dir.display(),
            "job queued"
        );
        Ok(record)
    }

    fn list_jobs(&self, parent: &str) -> Result<Vec<JobRecord>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let record = read_record(&path)?;
            if record.request.parent == parent {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.job_id().cmp(b.job_id()))
        });
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<JobRecord> {
    let bytes = fs::read(path).map_err(|err| SweepError::io(path, err))?;
    let record = serde_json::from_slice(&bytes)
        .map_err(|err| SweepError::Malformed(format!("job record {}: {err}", path.display())))?;
    Ok(record)
}
