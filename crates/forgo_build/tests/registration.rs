mod common;

use std::fs;

use common::{copy_step, Project};
use forgo_build::BuildError;
use forgo_workspace::ResourceStatus;

#[test]
fn registration_is_idempotent() {
    let project = Project::new();
    let file = project.write("src/a.txt", "a");

    let mut ctx = project.context();
    let first = ctx.register_input(&file).unwrap();
    let second = ctx.register_input(&file).unwrap();
    assert_eq!(first, second);
    let processed = ctx.process_input(&file).unwrap();
    assert_eq!(processed, Some(first));
    // Already processed in this session: still the same entity.
    assert_eq!(ctx.process_input(&file).unwrap(), Some(first));
}

#[test]
fn registering_missing_file_fails() {
    let project = Project::new();
    let mut ctx = project.context();
    let err = ctx.register_input(project.path("src/missing.txt")).unwrap_err();
    match err {
        BuildError::InvalidInput { path } => assert_eq!(path, project.path("src/missing.txt")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn status_round_trip() {
    let project = Project::new();
    let file = project.write("src/a.txt", "a");
    let mut ctx = project.context();
    let input = ctx.register_input(&file).unwrap();
    assert_eq!(ctx.status(input), ResourceStatus::New);
    ctx.process(input).unwrap();
    ctx.commit().unwrap();

    let mut ctx = project.context();
    let input = ctx.register_input(&file).unwrap();
    assert_eq!(ctx.status(input), ResourceStatus::Unmodified);
    assert_eq!(ctx.process_input(&file).unwrap(), None);
    ctx.commit().unwrap();

    project.write("src/a.txt", "a, longer");
    let mut ctx = project.context();
    let input = ctx.register_input(&file).unwrap();
    assert_eq!(ctx.status(input), ResourceStatus::Modified);
    ctx.process(input).unwrap();
    ctx.commit().unwrap();

    project.remove("src/a.txt");
    let ctx = project.context();
    let id = ctx.old_state().id(&file).unwrap();
    assert_eq!(ctx.status(id), ResourceStatus::Removed);
}

#[test]
fn unchanged_tree_processes_nothing() {
    let project = Project::new();
    project.write("src/a.txt", "alpha");
    project.write("src/b.txt", "beta");

    let (processed, summary) = copy_step(&project);
    assert_eq!(processed, vec!["a.txt", "b.txt"]);
    assert_eq!(summary.written_outputs.len(), 2);
    assert_eq!(project.read("out/a.txt"), "ALPHA");

    let (processed, summary) = copy_step(&project);
    assert!(processed.is_empty());
    assert_eq!(summary.carried_inputs, 2);
    assert!(summary.written_outputs.is_empty());
    assert!(project.exists("out/b.txt"));
}

#[test]
fn modified_input_is_reprocessed_alone() {
    let project = Project::new();
    project.write("src/a.txt", "alpha");
    project.write("src/b.txt", "beta");
    copy_step(&project);

    project.write("src/b.txt", "beta, again");
    let (processed, _) = copy_step(&project);
    assert_eq!(processed, vec!["b.txt"]);
    assert_eq!(project.read("out/b.txt"), "BETA, AGAIN");
}

#[test]
fn deleted_output_forces_reprocessing() {
    let project = Project::new();
    project.write("src/a.txt", "alpha");
    copy_step(&project);

    project.remove("out/a.txt");
    let (processed, _) = copy_step(&project);
    assert_eq!(processed, vec!["a.txt"]);
    assert!(project.exists("out/a.txt"));
}

#[test]
fn identical_rewrite_keeps_modification_time() {
    let project = Project::new();
    project.write("src/a.txt", "alpha");
    copy_step(&project);
    let before = fs::metadata(project.path("out/a.txt")).unwrap().modified().unwrap();

    // Escalating reprocesses everything, but the bytes are unchanged.
    let mut ctx = project.context_with(&forgo_config::ConfigurationDigest::new().with("v", 2));
    assert!(ctx.is_escalated());
    let input = ctx.process_input(project.path("src/a.txt")).unwrap().unwrap();
    common::copy_upper(&mut ctx, &project, input).unwrap();
    ctx.commit().unwrap();

    let after = fs::metadata(project.path("out/a.txt")).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[test]
fn old_output_view_reports_previous_record() {
    let project = Project::new();
    project.write("src/a.txt", "alpha");
    copy_step(&project);

    let ctx = project.context();
    let old = ctx.get_old_output(project.path("out/a.txt")).unwrap();
    assert_eq!(old.path(), project.path("out/a.txt"));
    assert_eq!(
        old.inputs().collect::<Vec<_>>(),
        vec![project.path("src/a.txt").as_path()]
    );
    assert!(ctx.get_old_output(project.path("out/missing.txt")).is_none());
}
