//! Typed object keys for the bucket layout.
//!
//! ```text
//! projects/<project>/config.json
//! projects/<project>/base_files/<source dir>/...
//! projects/<project>/studies/<study>/config.json
//! projects/<project>/studies/<study>/cases/<case>/config.json
//! projects/<project>/studies/<study>/cases/<case>/runs/<run>/...
//! scripts/foamcloud-fill
//! ```

pub const PROJECTS_FOLDER: &str = "projects/";
pub const SCRIPTS_FOLDER: &str = "scripts/";
pub const CONFIG_FILE: &str = "config.json";
pub const FILL_TOOL_NAME: &str = "foamcloud-fill";
const BASE_FILES_FOLDER: &str = "base_files";
const STUDIES_FOLDER: &str = "studies";
const CASES_FOLDER: &str = "cases";
const RUNS_FOLDER: &str = "runs";
const LOG_FILE: &str = "log.txt";

/// Join key segments with `/`, ignoring empty segments and doubled slashes.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Key of the case folder below a parameter study folder.
pub fn case_path_in(study_path: &str, case_id: &str) -> String {
    join_key(&[study_path, CASES_FOLDER, case_id])
}

/// Key of the `config.json` record inside a folder.
pub fn config_key(folder: &str) -> String {
    join_key(&[folder, CONFIG_FILE])
}

/// Key of a run folder below a case folder.
pub fn run_path_in(case_path: &str, run_name: &str) -> String {
    join_key(&[case_path, RUNS_FOLDER, run_name])
}

/// Key of the batch log inside a run folder.
pub fn run_log_key(run_path: &str) -> String {
    join_key(&[run_path, LOG_FILE])
}

pub fn project_path(project: &str) -> String {
    join_key(&[PROJECTS_FOLDER, project])
}

pub fn base_files_path(project: &str) -> String {
    join_key(&[&project_path(project), BASE_FILES_FOLDER])
}

pub fn studies_path(project: &str) -> String {
    join_key(&[&project_path(project), STUDIES_FOLDER])
}

pub fn study_path(project: &str, study: &str) -> String {
    join_key(&[&studies_path(project), study])
}

pub fn cases_path(project: &str, study: &str) -> String {
    join_key(&[&study_path(project, study), CASES_FOLDER])
}

pub fn case_path(project: &str, study: &str, case: &str) -> String {
    case_path_in(&study_path(project, study), case)
}

pub fn fill_tool_key() -> String {
    join_key(&[SCRIPTS_FOLDER, FILL_TOOL_NAME])
}
