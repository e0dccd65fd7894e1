use super::{
    active_runs, active_runs_for_study, build_job_request, mounted_path, run_command,
    BatchBackend, JobState, LogDestination, RunSpec, SpoolBatch, LABEL_CASE, LABEL_PROJECT,
    LABEL_STUDY,
};
use crate::error::SweepError;
use crate::settings::default_settings;

fn spec<'a>(case: &'a str, run_name: &'a str, destination: LogDestination) -> RunSpec<'a> {
    RunSpec {
        project: "pipe",
        study: "re",
        case,
        run_name,
        run_script: "./Allrun",
        destination,
    }
}

#[test]
fn payload_carries_resources_labels_and_volume() {
    let settings = default_settings();
    let request = build_job_request(
        &settings,
        &spec("caaaaaaaaaaaa", "caaaaaaaaaaaa0123456789abcdef0123", LogDestination::Path),
    );

    assert_eq!(request.parent, "projects/openfoam-cloud/locations/europe-west6");
    assert_eq!(request.job_id, "caaaaaaaaaaaa0123456789abcdef0123");
    let group = &request.job.task_groups[0];
    assert_eq!(group.task_count, 1);
    assert_eq!(group.task_spec.compute_resource.cpu_milli, 4000);
    assert_eq!(group.task_spec.compute_resource.memory_mib, 14000);
    assert_eq!(group.task_spec.max_retry_count, 0);
    assert_eq!(group.task_spec.max_run_duration, "600s");
    assert_eq!(group.task_spec.volumes[0].gcs.remote_path, "openfoam-default-bucket");
    assert_eq!(group.task_spec.volumes[0].mount_path, "/mnt/disks/share");
    let container = &group.task_spec.runnables[0].container;
    assert_eq!(container.image_uri, "openfoam/openfoam11-paraview510");
    assert_eq!(container.entrypoint, "/bin/bash");
    assert_eq!(container.commands[0], "-c");
    assert_eq!(
        request.job.allocation_policy.instances[0].policy.machine_type,
        "e2-standard-4"
    );
    assert_eq!(request.job.label(LABEL_PROJECT), Some("pipe"));
    assert_eq!(request.job.label(LABEL_STUDY), Some("re"));
    assert_eq!(request.job.label(LABEL_CASE), Some("caaaaaaaaaaaa"));
    assert_eq!(request.job.logs_policy.destination, LogDestination::Path);
    assert_eq!(
        request.job.logs_policy.logs_path.as_deref(),
        Some(
            "/mnt/disks/share/projects/pipe/studies/re/cases/caaaaaaaaaaaa/runs/caaaaaaaaaaaa0123456789abcdef0123/log.txt"
        )
    );
}

#[test]
fn cloud_logging_has_no_log_path() {
    let request = build_job_request(
        &default_settings(),
        &spec("caaaaaaaaaaaa", "run1", LogDestination::CloudLogging),
    );
    assert_eq!(request.job.logs_policy.logs_path, None);
    let json = serde_json::to_value(&request).expect("serialize request");
    assert_eq!(json["job"]["logsPolicy"]["destination"], "CLOUD_LOGGING");
    assert!(json["job"]["logsPolicy"].get("logsPath").is_none());
    assert_eq!(json["jobId"], "run1");
    assert_eq!(
        json["job"]["taskGroups"][0]["taskSpec"]["computeResource"]["cpuMilli"],
        4000
    );
}

#[test]
fn command_fills_before_running_the_script() {
    let settings = default_settings();
    let command = run_command(&settings, &spec("caaaaaaaaaaaa", "run1", LogDestination::Path));
    let steps: Vec<&str> = command.split(" && ").collect();

    assert_eq!(steps[0], "source /opt/openfoam11/etc/bashrc");
    assert_eq!(
        steps[3],
        "mkdir -p /mnt/disks/share/projects/pipe/studies/re/cases/caaaaaaaaaaaa/runs/run1"
    );
    assert_eq!(steps[4], "cd /mnt/disks/share/projects/pipe/base_files");
    let install = steps
        .iter()
        .position(|step| step.starts_with("install -m 755 "))
        .expect("install step present");
    assert_eq!(
        steps[install],
        "install -m 755 /mnt/disks/share/scripts/foamcloud-fill /tmp/foamcloud-fill"
    );
    let fill = install + 1;
    let script = steps
        .iter()
        .position(|step| *step == "./Allrun")
        .expect("run script step present");
    assert!(fill < script);
    assert_eq!(
        steps[fill],
        "/tmp/foamcloud-fill /mnt/disks/share/projects/pipe/studies/re/cases/caaaaaaaaaaaa/config.json /home/openfoam/case_files"
    );
    assert!(
        !steps.iter().any(|step| step.starts_with("/mnt/disks/share/scripts/")),
        "the published tool must not be executed from the mount"
    );
    assert_eq!(
        steps.last().copied(),
        Some("cp -r /home/openfoam/case_files /mnt/disks/share/projects/pipe/studies/re/cases/caaaaaaaaaaaa/runs/run1")
    );
}

#[test]
fn command_quotes_paths_with_spaces() {
    let mut settings = default_settings();
    settings.work_folder = "/home/openfoam/case files".to_string();
    let command = run_command(&settings, &spec("caaaaaaaaaaaa", "run1", LogDestination::Path));
    assert!(command.contains("cd '/home/openfoam/case files'"));
}

#[test]
fn mounted_paths_join_without_double_slashes() {
    let mut settings = default_settings();
    settings.mountpoint = "/mnt/share/".to_string();
    assert_eq!(mounted_path(&settings, "scripts/x"), "/mnt/share/scripts/x");
}

#[test]
fn job_states_parse_case_insensitively() {
    assert_eq!("RUNNING".parse::<JobState>(), Ok(JobState::Running));
    assert_eq!("succeeded".parse::<JobState>(), Ok(JobState::Succeeded));
    assert!("paused".parse::<JobState>().is_err());
}

#[test]
fn spool_lists_only_running_jobs_as_active() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let spool = SpoolBatch::new(dir.path().join("jobs"));
    let settings = default_settings();
    let parent = settings.job_parent();

    let first = build_job_request(&settings, &spec("caaaaaaaaaaaa", "runa", LogDestination::Path));
    let second = build_job_request(&settings, &spec("cbbbbbbbbbbbb", "runb", LogDestination::Path));
    let mut other_study = build_job_request(&settings, &spec("ccccccccccccc", "runc", LogDestination::Path));
    other_study
        .job
        .labels
        .insert(LABEL_STUDY.to_string(), "mesh".to_string());

    for request in [&first, &second, &other_study] {
        let record = spool.submit(request).expect("submit job");
        assert_eq!(record.state, JobState::Queued);
    }
    assert_eq!(spool.list_jobs(&parent).expect("list jobs").len(), 3);
    assert!(active_runs(&spool, &parent).expect("active").is_empty());

    spool.set_state("runa", JobState::Running).expect("mark runa");
    spool.set_state("runc", JobState::Running).expect("mark runc");
    spool.set_state("runb", JobState::Succeeded).expect("mark runb");

    let active: Vec<String> = active_runs(&spool, &parent)
        .expect("active")
        .iter()
        .map(|record| record.job_id().to_string())
        .collect();
    assert_eq!(active.len(), 2);
    assert!(active.contains(&"runa".to_string()));
    assert!(active.contains(&"runc".to_string()));

    let for_study = active_runs_for_study(&spool, &parent, "pipe", "re").expect("study runs");
    assert_eq!(for_study.len(), 1);
    assert_eq!(for_study[0].job_id(), "runa");

    assert!(spool
        .list_jobs("projects/elsewhere/locations/us-east1")
        .expect("list other parent")
        .is_empty());
}

#[test]
fn spool_rejects_duplicate_and_unknown_jobs() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let spool = SpoolBatch::new(dir.path());
    let request = build_job_request(
        &default_settings(),
        &spec("caaaaaaaaaaaa", "runa", LogDestination::Path),
    );
    spool.submit(&request).expect("submit job");

    let err = spool.submit(&request).expect_err("duplicate submit");
    assert!(matches!(
        err.downcast_ref::<SweepError>(),
        Some(SweepError::Conflict(_))
    ));

    let err = spool
        .set_state("missing", JobState::Running)
        .expect_err("unknown job");
    assert!(matches!(
        err.downcast_ref::<SweepError>(),
        Some(SweepError::NotFound(_))
    ));

    assert!(spool.job("../escape").is_err());
}
