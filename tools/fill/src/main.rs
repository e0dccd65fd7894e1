//! Runs inside the batch container: reads the case record from the mounted
//! bucket and substitutes its parameter values into the copied case files.
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "foamcloud-fill",
    version,
    about = "Substitute a case's @name@ tokens into its working directory"
)]
struct Cli {
    /// Case config.json written when the parameter study was created
    #[arg(value_name = "CASE_CONFIG")]
    case_config: PathBuf,

    /// Working directory holding the copied case files
    #[arg(value_name = "BASE_DIR")]
    base_dir: PathBuf,

    /// Emit debug logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    foamcloud::logging::init_logging(cli.verbose);

    let case = foamcloud::fill::fill_from_config(&cli.case_config, &cli.base_dir)?;
    tracing::info!(
        case_id = %case.id,
        settings = case.parameter_settings.len(),
        "case filled"
    );
    Ok(())
}
