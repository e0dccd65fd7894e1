use crate::cli::{
    CaseCommand, ConfigCommand, ConfigInitArgs, InitArgs, ProjectCommand, ProjectCreateArgs,
    RunArgs, RunsCommand, RunsListArgs, RunsMarkArgs, StudyCommand, StudyCreateArgs,
};
use anyhow::{anyhow, Context, Result};
use foamcloud::batch::{active_runs, active_runs_for_study, BatchBackend, JobRecord, SpoolBatch};
use foamcloud::ids::RandomCaseIds;
use foamcloud::layout::FILL_TOOL_NAME;
use foamcloud::model::InputParameter;
use foamcloud::settings::{self, Settings};
use foamcloud::store::LocalStore;
use foamcloud::workspace::{RunOptions, Workspace};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved settings plus the handles every command works through.
pub struct AppContext {
    settings_path: PathBuf,
    settings: Settings,
}

impl AppContext {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => settings::default_settings_path()?,
        };
        let settings = settings::load_settings(&settings_path)?;
        Ok(Self {
            settings_path,
            settings,
        })
    }

    fn workspace(&self) -> Result<Workspace<LocalStore>> {
        let store = LocalStore::open(&self.settings.bucket_root)?;
        Ok(Workspace::new(store, self.settings.clone()))
    }

    fn backend(&self) -> SpoolBatch {
        SpoolBatch::new(&self.settings.spool_dir)
    }
}

pub fn run_config(ctx: &AppContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init(args) => run_config_init(ctx, args),
        ConfigCommand::Show => print_json(&ctx.settings),
    }
}

fn run_config_init(ctx: &AppContext, args: ConfigInitArgs) -> Result<()> {
    if ctx.settings_path.is_file() && !args.force {
        return Err(anyhow!(
            "settings already exist at {} (use --force to overwrite)",
            ctx.settings_path.display()
        ));
    }
    let defaults = settings::default_settings();
    settings::write_settings(&ctx.settings_path, &defaults)?;
    println!("wrote {}", ctx.settings_path.display());
    Ok(())
}

pub fn run_init(ctx: &AppContext, args: InitArgs) -> Result<()> {
    let fill_binary = match args.fill_binary {
        Some(path) => Some(path),
        None => match which::which(FILL_TOOL_NAME) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(
                    tool = FILL_TOOL_NAME,
                    error = %err,
                    "fill tool not found on PATH; jobs will fail until it is published"
                );
                None
            }
        },
    };
    let ws = ctx.workspace()?;
    ws.initialize(fill_binary.as_deref())?;
    println!("initialized bucket at {}", ctx.settings.bucket_root.display());
    Ok(())
}

pub fn run_project(ctx: &AppContext, command: ProjectCommand) -> Result<()> {
    let ws = ctx.workspace()?;
    match command {
        ProjectCommand::Create(ProjectCreateArgs { name, files }) => {
            let project = ws.create_project(&name, &files)?;
            println!("created project {} ({})", project.name, project.id);
            Ok(())
        }
        ProjectCommand::List => print_lines(&ws.project_ids()?),
        ProjectCommand::Show(args) => print_json(&ws.project(&args.project)?),
    }
}

pub fn run_study(ctx: &AppContext, command: StudyCommand) -> Result<()> {
    let ws = ctx.workspace()?;
    match command {
        StudyCommand::Create(args) => run_study_create(&ws, args),
        StudyCommand::List(args) => print_lines(&ws.parameter_study_ids(&args.project)?),
        StudyCommand::Show(args) => print_json(&ws.parameter_study(&args.project, &args.study)?),
    }
}

fn run_study_create(ws: &Workspace<LocalStore>, args: StudyCreateArgs) -> Result<()> {
    let parameters = read_parameters(&args.parameters)?;
    let study = ws.create_parameter_study(
        &args.project,
        &args.name,
        &args.run_script,
        &parameters,
        &mut RandomCaseIds,
    )?;
    println!(
        "created parameter study {} with {} cases",
        study.name,
        study.cases.len()
    );
    for case in &study.cases {
        println!("{}", case.id);
    }
    Ok(())
}

fn read_parameters(path: &Path) -> Result<Vec<InputParameter>> {
    let bytes = fs::read(path).with_context(|| format!("read parameters {}", path.display()))?;
    let parameters = serde_json::from_slice(&bytes).map_err(|err| {
        foamcloud::SweepError::Malformed(format!("parameters {}: {err}", path.display()))
    })?;
    Ok(parameters)
}

pub fn run_case(ctx: &AppContext, command: CaseCommand) -> Result<()> {
    let ws = ctx.workspace()?;
    match command {
        CaseCommand::List(args) => print_lines(&ws.case_names(&args.project, &args.study)?),
        CaseCommand::Show(args) => {
            print_json(&ws.case_config(&args.project, &args.study, &args.case)?)
        }
        CaseCommand::Clean(args) => {
            // Confirm the case exists before deleting anything under it.
            ws.case_config(&args.project, &args.study, &args.case)?;
            let deleted = ws.delete_case_files(&args.project, &args.study, &args.case)?;
            println!("deleted {deleted} files from case {}", args.case);
            Ok(())
        }
    }
}

pub fn run_submit(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let options = RunOptions {
        run_script: args.run_script,
        cloud_logging: args.cloud_logging,
    };
    let case = &args.case;
    if args.dry_run {
        let request = ws.prepare_run(&case.project, &case.study, &case.case, &options)?;
        return print_json(&request);
    }
    let record = ws.run_case(&ctx.backend(), &case.project, &case.study, &case.case, &options)?;
    println!("{}", record.job_id());
    Ok(())
}

pub fn run_runs(ctx: &AppContext, command: RunsCommand) -> Result<()> {
    match command {
        RunsCommand::List(args) => run_runs_list(ctx, args),
        RunsCommand::Mark(RunsMarkArgs { job, state }) => {
            let record = ctx.backend().set_state(&job, state)?;
            println!("{} {}", record.job_id(), record.state);
            Ok(())
        }
    }
}

fn run_runs_list(ctx: &AppContext, args: RunsListArgs) -> Result<()> {
    let backend = ctx.backend();
    let parent = ctx.settings.job_parent();
    let records: Vec<JobRecord> = match (args.project.as_deref(), args.study.as_deref()) {
        (Some(project), Some(study)) if !args.all => {
            active_runs_for_study(&backend, &parent, project, study)?
        }
        (Some(project), Some(study)) => backend
            .list_jobs(&parent)?
            .into_iter()
            .filter(|record| record.belongs_to(project, study))
            .collect(),
        _ if args.all => backend.list_jobs(&parent)?,
        _ => active_runs(&backend, &parent)?,
    };
    for record in &records {
        println!(
            "{}\t{}\t{}",
            record.job_id(),
            record.state,
            record.submitted_at.to_rfc3339()
        );
    }
    Ok(())
}

fn print_lines(lines: &[String]) -> Result<()> {
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}
