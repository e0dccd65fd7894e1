//! Deployment settings.
//!
//! Settings live in a single pretty-printed JSON file. A missing file means
//! defaults, so a fresh checkout works against a local bucket without setup.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;
const APP_DIR: &str = "foamcloud";
const SETTINGS_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub schema_version: u32,
    /// Bucket name the batch volume mounts.
    pub bucket: String,
    /// Local directory backing the bucket.
    pub bucket_root: PathBuf,
    /// Cloud project that owns batch jobs.
    pub gcp_project: String,
    pub region: String,
    /// Where the bucket appears inside the job container.
    pub mountpoint: String,
    /// Scratch directory the case files are copied into before running.
    pub work_folder: String,
    /// Shell file sourced before anything else in the job.
    pub environment_script: String,
    pub image_uri: String,
    pub machine_type: String,
    pub cpu_milli: u32,
    pub memory_mib: u32,
    pub max_run_duration_secs: u64,
    pub max_retry_count: u32,
    /// Directory holding submitted job records.
    pub spool_dir: PathBuf,
}

impl Settings {
    /// `projects/<gcp project>/locations/<region>`, the parent of every job.
    pub fn job_parent(&self) -> String {
        format!("projects/{}/locations/{}", self.gcp_project, self.region)
    }
}

/// Defaults that match the stock OpenFOAM 11 deployment.
pub fn default_settings() -> Settings {
    let data_dir = default_data_dir();
    Settings {
        schema_version: SETTINGS_SCHEMA_VERSION,
        bucket: "openfoam-default-bucket".to_string(),
        bucket_root: data_dir.join("bucket"),
        gcp_project: "openfoam-cloud".to_string(),
        region: "europe-west6".to_string(),
        mountpoint: "/mnt/disks/share".to_string(),
        work_folder: "/home/openfoam/case_files".to_string(),
        environment_script: "/opt/openfoam11/etc/bashrc".to_string(),
        image_uri: "openfoam/openfoam11-paraview510".to_string(),
        machine_type: "e2-standard-4".to_string(),
        cpu_milli: 4000,
        memory_mib: 14000,
        max_run_duration_secs: 600,
        max_retry_count: 0,
        spool_dir: data_dir.join("jobs"),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `<config dir>/foamcloud/config.json`.
pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load settings from `path`, falling back to defaults when it is absent.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(default_settings());
    }
    let bytes = fs::read(path).with_context(|| format!("read settings {}", path.display()))?;
    let settings: Settings =
        serde_json::from_slice(&bytes).context("parse settings JSON")?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create settings dir")?;
    }
    let text = serde_json::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.schema_version != SETTINGS_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported settings schema_version {}",
            settings.schema_version
        ));
    }
    let required = [
        ("bucket", &settings.bucket),
        ("gcp_project", &settings.gcp_project),
        ("region", &settings.region),
        ("work_folder", &settings.work_folder),
        ("image_uri", &settings.image_uri),
        ("machine_type", &settings.machine_type),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if !settings.mountpoint.starts_with('/') {
        return Err(anyhow!(
            "mountpoint must be an absolute path (got {:?})",
            settings.mountpoint
        ));
    }
    if settings.cpu_milli == 0 || settings.memory_mib == 0 {
        return Err(anyhow!("cpu_milli and memory_mib must be positive"));
    }
    if settings.max_run_duration_secs == 0 {
        return Err(anyhow!("max_run_duration_secs must be positive"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
