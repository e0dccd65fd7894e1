use anyhow::Result;
use clap::Parser;

mod cli;
mod workflow;

use cli::{Command, RootArgs};
use workflow::AppContext;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    foamcloud::logging::init_logging(args.verbose);

    let ctx = AppContext::load(args.config.as_deref())?;
    match args.command {
        Command::Config(command) => workflow::run_config(&ctx, command),
        Command::Init(args) => workflow::run_init(&ctx, args),
        Command::Project(command) => workflow::run_project(&ctx, command),
        Command::Study(command) => workflow::run_study(&ctx, command),
        Command::Case(command) => workflow::run_case(&ctx, command),
        Command::Run(args) => workflow::run_submit(&ctx, args),
        Command::Runs(command) => workflow::run_runs(&ctx, command),
    }
}
