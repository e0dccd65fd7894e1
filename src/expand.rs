//! Parameter-study expansion.
//!
//! Cases are the Cartesian product of every input parameter's `values`,
//! iterated with the first parameter varying slowest. An empty parameter
//! list yields a single baseline case with no settings; any empty `values`
//! list yields no cases at all.
use crate::ids::IdSource;
use crate::layout::case_path_in;
use crate::model::{Case, InputParameter, ParameterSet, ParameterStudy, ParameterValue};

/// Expand `parameters` into one case per value combination.
pub fn expand_cases(
    study_path: &str,
    parameters: &[InputParameter],
    run_script: &str,
    ids: &mut dyn IdSource,
) -> Vec<Case> {
    combinations(parameters)
        .into_iter()
        .map(|combination| {
            let id = ids.next_id();
            let parameter_settings = parameters
                .iter()
                .zip(combination)
                .map(|(parameter, value)| ParameterSet {
                    path: parameter.path.clone(),
                    variable_name: parameter.variable_name.clone(),
                    value: value.render(),
                })
                .collect();
            Case {
                path: case_path_in(study_path, &id),
                id,
                last_run: None,
                parameter_settings,
                run_script: run_script.to_string(),
            }
        })
        .collect()
}

/// Expand `parameters` and wrap the cases in a named study.
pub fn build_study(
    name: &str,
    study_path: &str,
    parameters: &[InputParameter],
    run_script: &str,
    ids: &mut dyn IdSource,
) -> ParameterStudy {
    ParameterStudy {
        name: name.to_string(),
        path: study_path.to_string(),
        cases: expand_cases(study_path, parameters, run_script, ids),
    }
}

/// Number of cases `parameters` expands to.
pub fn case_count(parameters: &[InputParameter]) -> usize {
    parameters
        .iter()
        .map(|parameter| parameter.values.len())
        .product()
}

fn combinations(parameters: &[InputParameter]) -> Vec<Vec<&ParameterValue>> {
    let mut combos: Vec<Vec<&ParameterValue>> = vec![Vec::new()];
    for parameter in parameters {
        combos = combos
            .into_iter()
            .flat_map(move |prefix| {
                parameter.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value);
                    next
                })
            })
            .collect();
    }
    combos
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
