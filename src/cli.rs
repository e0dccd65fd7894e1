//! CLI argument parsing for the study workflow.
//!
//! Every command maps onto one workspace or batch operation; output meant
//! for scripts goes to stdout, diagnostics go to the log on stderr.
use clap::{Args, Parser, Subcommand};
use foamcloud::batch::JobState;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "foamcloud",
    version,
    about = "Parameter studies for OpenFOAM cases on a bucket and a batch service",
    after_help = "Examples:\n  foamcloud config init\n  foamcloud init\n  foamcloud project create --name pipe --files ./cavity\n  foamcloud study create --project pipe --name re --run-script ./Allrun --parameters sweep.json\n  foamcloud case list --project pipe --study re\n  foamcloud run --project pipe --study re --case c0a1b2c3d4e5f\n  foamcloud runs list --project pipe --study re",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Settings file (defaults to <config dir>/foamcloud/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write or print the settings file
    #[command(subcommand)]
    Config(ConfigCommand),
    Init(InitArgs),
    /// Create and inspect projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Create and inspect parameter studies
    #[command(subcommand)]
    Study(StudyCommand),
    /// Inspect and clean cases
    #[command(subcommand)]
    Case(CaseCommand),
    Run(RunArgs),
    /// Inspect submitted runs
    #[command(subcommand)]
    Runs(RunsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write default settings
    Init(ConfigInitArgs),
    /// Print the effective settings as JSON
    Show,
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing settings file
    #[arg(long)]
    pub force: bool,
}

/// Bucket bootstrap inputs.
#[derive(Args, Debug)]
#[command(about = "Create bucket folders and publish the fill tool")]
pub struct InitArgs {
    /// Fill tool binary to publish (defaults to foamcloud-fill on PATH)
    #[arg(long, value_name = "PATH")]
    pub fill_binary: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Register a project and upload its base case directory
    Create(ProjectCreateArgs),
    /// List project names
    List,
    /// Print a project record
    Show(ProjectRef),
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project name (a single path segment)
    #[arg(long)]
    pub name: String,

    /// OpenFOAM case directory holding the base files
    #[arg(long, value_name = "DIR")]
    pub files: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProjectRef {
    #[arg(long)]
    pub project: String,
}

#[derive(Subcommand, Debug)]
pub enum StudyCommand {
    /// Expand input parameters into a new parameter study
    Create(StudyCreateArgs),
    /// List parameter studies of a project
    List(ProjectRef),
    /// Print a parameter study record
    Show(StudyRef),
}

#[derive(Args, Debug)]
pub struct StudyCreateArgs {
    #[arg(long)]
    pub project: String,

    /// Study name (a single path segment)
    #[arg(long)]
    pub name: String,

    /// Shell command each case runs after filling
    #[arg(long)]
    pub run_script: String,

    /// JSON array of {path, variable_name, values}
    #[arg(long, value_name = "PATH")]
    pub parameters: PathBuf,
}

#[derive(Args, Debug)]
pub struct StudyRef {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub study: String,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
    /// List case ids of a study
    List(StudyRef),
    /// Print a case record
    Show(CaseRef),
    /// Delete a case's run outputs, keeping its config
    Clean(CaseRef),
}

#[derive(Args, Debug)]
pub struct CaseRef {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub study: String,

    #[arg(long)]
    pub case: String,
}

/// Submission inputs for one case.
#[derive(Args, Debug)]
#[command(about = "Submit one case as a batch job")]
pub struct RunArgs {
    #[command(flatten)]
    pub case: CaseRef,

    /// Run this command instead of the case's stored run script
    #[arg(long)]
    pub run_script: Option<String>,

    /// Send job logs to the batch service instead of the run folder
    #[arg(long)]
    pub cloud_logging: bool,

    /// Print the job request without submitting it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum RunsCommand {
    /// List running jobs, optionally for one study
    List(RunsListArgs),
    /// Set the state of a submitted job
    Mark(RunsMarkArgs),
}

#[derive(Args, Debug)]
pub struct RunsListArgs {
    #[arg(long, requires = "study")]
    pub project: Option<String>,

    #[arg(long, requires = "project")]
    pub study: Option<String>,

    /// Include jobs in every state
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct RunsMarkArgs {
    #[arg(long, value_name = "ID")]
    pub job: String,

    /// queued, scheduled, running, succeeded, or failed
    #[arg(long)]
    pub state: JobState,
}
