//! End-to-end runs of the timing scenario against the fake engine.

mod common;

use std::time::Duration;

use common::{FakeEngine, Faults, PNG_BYTES};
use timing_diagram_mcp::api::{ApiClient, ElementKind};
use timing_diagram_mcp::harness::scenarios::timing;
use timing_diagram_mcp::harness::{
    run_test, HarnessError, RunOptions, ScenarioContext, StepStatus, TestReport,
};

async fn run_timing(engine: &FakeEngine, work_dir: &std::path::Path) -> TestReport {
    run_test(
        timing::NAME,
        work_dir,
        engine.client(),
        RunOptions::default(),
        timing::run,
    )
    .await
}

fn failure_reason(report: &TestReport) -> &str {
    match &report.failed_step().expect("a failed step").status {
        StepStatus::Failed(reason) => reason,
        other => panic!("unexpected status {other:?}"),
    }
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn timing_scenario_passes_every_step() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert!(report.passed(), "report: {report:?}");
    assert_eq!(report.exit_status(), 0);
    assert_eq!(report.passed_count(), timing::STEPS.len());

    let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, timing::STEPS);
    assert!(report.steps.iter().all(|s| s.elapsed.is_some()));
}

#[tokio::test]
async fn exported_image_lands_in_work_dir() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    run_timing(&engine, dir.path()).await;

    let image = dir.path().join("timing-export-timing-image.png");
    assert_eq!(std::fs::read(image).unwrap(), PNG_BYTES);
}

#[tokio::test]
async fn diagram_is_deleted_with_its_children() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;
    assert!(report.passed());

    assert_eq!(engine.count("diagrams"), 0);
    assert_eq!(engine.count("lifelines"), 0);
    assert_eq!(engine.count("timing-states"), 0);
    assert_eq!(engine.count("time-segments"), 0);
    assert_eq!(engine.view_count(), 0);

    // Cascade is trusted, not verified: the last request is the delete.
    let requests = engine.requests();
    assert!(requests.last().unwrap().starts_with("DELETE /api/timing/diagrams/"));
    assert!(report.notes.iter().any(|n| n.contains("cascade")));
}

#[tokio::test]
async fn timing_states_are_anchored_to_views() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    run_timing(&engine, dir.path()).await;

    let requests = engine.requests();
    let views_read = requests
        .iter()
        .position(|r| r.ends_with("/views"))
        .unwrap();
    let first_state = requests
        .iter()
        .position(|r| r == "POST /api/timing/timing-states")
        .unwrap();
    assert!(views_read < first_state);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn missing_lifeline_view_fails_the_view_step() {
    let engine = FakeEngine::with_faults(Faults {
        skip_lifeline_views: true,
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert!(!report.passed());
    assert_eq!(report.exit_status(), 1);
    assert_eq!(report.failed_step().unwrap().name, "Get lifeline view IDs");
    assert_eq!(failure_reason(&report), "Clock lifeline view not found");

    // Fail-fast: nothing after the failing step starts.
    assert_eq!(report.steps.len(), 4);
    assert!(!engine
        .requests()
        .iter()
        .any(|r| r.contains("timing-states")));
}

#[tokio::test]
async fn duplicate_lifeline_views_are_ambiguous() {
    let engine = FakeEngine::with_faults(Faults {
        duplicate_lifeline_views: true,
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert_eq!(
        failure_reason(&report),
        "Clock lifeline has 2 views, expected exactly one"
    );
}

#[tokio::test]
async fn unpersisted_rename_is_detected() {
    let engine = FakeEngine::with_faults(Faults {
        forget_renames: true,
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert_eq!(report.failed_step().unwrap().name, "Update lifeline name");
    let reason = failure_reason(&report);
    assert!(reason.contains("not persisted"), "{reason}");
    assert!(reason.contains("System Clock"), "{reason}");
}

#[tokio::test]
async fn short_segment_listing_fails_the_cardinality_floor() {
    let engine = FakeEngine::with_faults(Faults {
        drop_segments_from_listing: true,
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert_eq!(report.exit_status(), 1);
    assert_eq!(report.failed_step().unwrap().name, "List time segments");
    assert_eq!(failure_reason(&report), "Expected 5 time segments, got 4");

    // Fail-fast: the point reads never start.
    assert_eq!(report.steps.len(), 16);
    assert!(!engine
        .requests()
        .iter()
        .any(|r| r.starts_with("GET /api/timing/lifelines/")));
}

#[tokio::test]
async fn segment_read_without_id_is_not_found() {
    let engine = FakeEngine::with_faults(Faults {
        empty_segment_reads: true,
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_timing(&engine, dir.path()).await;

    assert_eq!(report.failed_step().unwrap().name, "Get time segment by ID");
    assert_eq!(failure_reason(&report), "Time segment not found");
    assert_eq!(report.steps.len(), 19);
}

#[tokio::test]
async fn slow_export_times_out() {
    let engine = FakeEngine::with_faults(Faults {
        export_delay: Some(Duration::from_secs(3)),
        ..Faults::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_test(
        timing::NAME,
        dir.path(),
        engine.client_with_timeout(Duration::from_secs(1)),
        RunOptions::default(),
        timing::run,
    )
    .await;

    assert_eq!(report.failed_step().unwrap().name, "Export timing image");
    let reason = failure_reason(&report);
    assert!(reason.contains("/export timed out after 1s"), "{reason}");
    assert!(!dir.path().join("timing-export-timing-image.png").exists());
}

#[tokio::test]
async fn unreachable_engine_fails_the_first_step() {
    let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let report = run_test(
        timing::NAME,
        dir.path(),
        client,
        RunOptions::default(),
        timing::run,
    )
    .await;

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.failed_step().unwrap().name, "Create timing diagram");
    assert!(failure_reason(&report).contains("POST /api/timing/diagrams"));
    assert!(report.error.is_some());
}

// =============================================================================
// Custom scenarios
// =============================================================================

#[tokio::test]
async fn anchoring_a_state_to_a_model_id_is_rejected() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_test(
        "invalid-anchor",
        dir.path(),
        engine.client(),
        RunOptions::default(),
        |ctx: ScenarioContext| async move {
            let api = ctx.timing().clone();
            let diagram = ctx.check("Create diagram", api.create_diagram("Anchors")).await?;
            let (name, bounds) = timing::CLOCK;
            let lifeline = ctx
                .check("Create lifeline", api.create_lifeline(&diagram.id, name, bounds))
                .await?;

            // The lifeline's model id is not a valid tail.
            ctx.check(
                "Create timing state on model id",
                api.create_timing_state(&diagram.id, "High", &lifeline.id),
            )
            .await?;
            Ok::<(), HarnessError>(())
        },
    )
    .await;

    assert!(!report.passed());
    assert_eq!(
        report.failed_step().unwrap().name,
        "Create timing state on model id"
    );
    let reason = failure_reason(&report);
    assert!(reason.contains("status 400"), "{reason}");
    assert!(reason.contains("tailViewId"), "{reason}");
    assert_eq!(engine.count("timing-states"), 0);
}

#[tokio::test]
async fn abandoned_steps_fail_only_in_strict_mode() {
    let engine = FakeEngine::start().await;

    let scenario = |ctx: ScenarioContext| async move {
        let _left_open = ctx.step("Never resolved");
        ctx.check("Count diagrams", async {
            let diagrams = ctx.timing().list_diagrams().await?;
            Ok::<_, HarnessError>(diagrams.len())
        })
        .await?;
        Ok::<(), HarnessError>(())
    };

    let lenient = run_test(
        "abandon",
        ".",
        engine.client(),
        RunOptions::default(),
        scenario,
    )
    .await;
    assert!(lenient.passed());
    assert_eq!(lenient.abandoned_count(), 1);
    assert_eq!(lenient.steps[0].status, StepStatus::Abandoned);

    let strict = run_test(
        "abandon",
        ".",
        engine.client(),
        RunOptions { strict_steps: true },
        scenario,
    )
    .await;
    assert!(!strict.passed());
    assert_eq!(strict.exit_status(), 1);
}

#[tokio::test]
async fn listings_are_scoped_to_the_diagram() {
    let engine = FakeEngine::start().await;
    let dir = tempfile::tempdir().unwrap();

    let report = run_test(
        "scoping",
        dir.path(),
        engine.client(),
        RunOptions::default(),
        |ctx: ScenarioContext| async move {
            let api = ctx.timing().clone();
            let first = api.create_diagram("First").await?;
            let second = api.create_diagram("Second").await?;
            let (name, bounds) = timing::DATA;
            api.create_lifeline(&first.id, name, bounds).await?;

            ctx.check("Second diagram has no lifelines", async {
                let lifelines = api.list(ElementKind::Lifeline, &second.id).await?;
                timing_diagram_mcp::harness::ensure(lifelines.is_empty(), || {
                    format!("Expected 0 lifelines, got {}", lifelines.len())
                })
            })
            .await?;
            Ok::<(), HarnessError>(())
        },
    )
    .await;

    assert!(report.passed(), "report: {report:?}");
}
