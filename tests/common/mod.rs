//! Shared test infrastructure for integration tests.

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway deployment: settings file, local bucket, and job spool.
pub struct Sandbox {
    pub root: TempDir,
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct CliResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Non-empty stdout lines.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}):\n{}", self.stdout))
    }
}

impl Sandbox {
    /// Fresh sandbox with a settings file pointing into the temp dir.
    pub fn create() -> Self {
        let root = TempDir::new().expect("create sandbox dir");
        let sandbox = Self { root };
        let settings = json!({
            "schema_version": 1,
            "bucket": "sandbox-bucket",
            "bucket_root": sandbox.bucket_root(),
            "gcp_project": "sandbox-project",
            "region": "europe-west6",
            "mountpoint": "/mnt/disks/share",
            "work_folder": "/home/openfoam/case_files",
            "environment_script": "/opt/openfoam11/etc/bashrc",
            "image_uri": "openfoam/openfoam11-paraview510",
            "machine_type": "e2-standard-4",
            "cpu_milli": 4000,
            "memory_mib": 14000,
            "max_run_duration_secs": 600,
            "max_retry_count": 0,
            "spool_dir": sandbox.spool_dir(),
        });
        let text = serde_json::to_string_pretty(&settings).expect("serialize settings");
        fs::write(sandbox.settings_path(), text).expect("write settings");
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path().join("config.json")
    }

    pub fn bucket_root(&self) -> PathBuf {
        self.path().join("bucket")
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.path().join("jobs")
    }

    /// Write `contents` below the sandbox, creating parent folders.
    pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Run `foamcloud` against this sandbox's settings.
    pub fn run(&self, args: &[&str]) -> CliResult {
        let output = Command::new(env!("CARGO_BIN_EXE_foamcloud"))
            .arg("--config")
            .arg(self.settings_path())
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn foamcloud");
        CliResult::from_output(output)
    }

    /// Like [`Sandbox::run`], panicking with stderr when the command fails.
    pub fn run_ok(&self, args: &[&str]) -> CliResult {
        let result = self.run(args);
        assert!(
            result.success,
            "foamcloud {:?} failed:\n{}",
            args, result.stderr
        );
        result
    }

    /// A two-file OpenFOAM-style case directory with `@endTime@` and `@nu@` tokens.
    pub fn cavity_case(&self) -> PathBuf {
        self.write_file(
            "cavity/system/controlDict",
            "application icoFoam;\nendTime @endTime@;\n",
        );
        self.write_file(
            "cavity/constant/transportProperties",
            "nu [0 2 -1 0 0 0 0] @nu@;\n",
        );
        self.path().join("cavity")
    }
}
