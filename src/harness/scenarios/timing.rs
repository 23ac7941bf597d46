//! Timing diagram regression scenario.
//!
//! An "Elevator Timing" editing session: two lifelines, four timing states
//! anchored to the lifelines' views, a clock square wave and a data pulse,
//! then reads, renames, layout, export and teardown. Every step depends on
//! identifiers captured by earlier ones, so the steps run strictly in order
//! and the first failure ends the run.

use crate::api::{Bounds, Element, ElementKind, TimingApi, ViewIndex};
use crate::harness::context::ScenarioContext;
use crate::harness::error::{ensure, HarnessError, HarnessResult};

/// Scenario name used for the report and artifact file names.
pub const NAME: &str = "timing";

/// Name of the diagram the scenario creates.
pub const DIAGRAM_NAME: &str = "Elevator Timing";

/// Clock lifeline: name and bounds.
pub const CLOCK: (&str, Bounds) = ("Clock", Bounds::new(5, 30, 700, 150));

/// Data lifeline: name and bounds.
pub const DATA: (&str, Bounds) = ("Data", Bounds::new(5, 150, 700, 270));

/// Minimum list sizes after the creation phase. The engine may add
/// defaults, so these are floors.
pub const MIN_LIFELINES: usize = 2;
/// See [`MIN_LIFELINES`].
pub const MIN_TIMING_STATES: usize = 4;
/// See [`MIN_LIFELINES`].
pub const MIN_TIME_SEGMENTS: usize = 5;

/// Every step name, in execution order.
pub const STEPS: [&str; 24] = [
    "Create timing diagram",
    "Create lifeline (Clock)",
    "Create lifeline (Data)",
    "Get lifeline view IDs",
    "Create timing state (Clock: High)",
    "Create timing state (Clock: Low)",
    "Create timing state (Data: Valid)",
    "Create timing state (Data: Invalid)",
    "Create time segment: Clock High → Low",
    "Create time segment: Clock Low → High",
    "Create time segment: Clock High → Low (2nd)",
    "Create time segment: Data Invalid → Valid",
    "Create time segment: Data Valid → Invalid",
    "List lifelines",
    "List timing states",
    "List time segments",
    "Get lifeline by ID",
    "Get timing state by ID",
    "Get time segment by ID",
    "Update lifeline name",
    "Update timing state name",
    "Layout diagram",
    "Export timing image",
    "Delete diagram",
];

/// Identifiers captured as the session progresses.
#[derive(Debug, Clone, Default)]
pub struct TimingSession {
    /// Diagram model id.
    pub diagram_id: String,
    /// Clock lifeline model id.
    pub clock_lifeline_id: String,
    /// Data lifeline model id.
    pub data_lifeline_id: String,
    /// Clock lifeline view id.
    pub clock_view_id: String,
    /// Data lifeline view id.
    pub data_view_id: String,
    /// Clock "High" timing state.
    pub high_id: String,
    /// Clock "Low" timing state.
    pub low_id: String,
    /// Data "Valid" timing state.
    pub valid_id: String,
    /// Data "Invalid" timing state.
    pub invalid_id: String,
    /// First clock segment, read back later.
    pub first_segment_id: String,
}

/// Runs the whole scenario.
///
/// # Errors
///
/// Returns the first step error.
pub async fn run(ctx: ScenarioContext) -> HarnessResult<()> {
    let api = ctx.timing().clone();
    let mut s = TimingSession::default();

    s.diagram_id = ctx
        .check(STEPS[0], api.create_diagram(DIAGRAM_NAME))
        .await?
        .id;

    create_lifelines(&ctx, &api, &mut s).await?;
    resolve_lifeline_views(&ctx, &api, &mut s).await?;
    create_timing_states(&ctx, &api, &mut s).await?;
    create_time_segments(&ctx, &api, &mut s).await?;
    check_listings(&ctx, &api, &s).await?;
    check_point_reads(&ctx, &api, &s).await?;
    check_renames(&ctx, &api, &s).await?;

    ctx.layout_diagram(&s.diagram_id).await?;
    ctx.export_diagram(&s.diagram_id, STEPS[22]).await?;

    ctx.check(STEPS[23], api.delete_diagram(&s.diagram_id)).await?;
    ctx.note("diagram delete cascade is trusted, children are not re-fetched");

    Ok(())
}

async fn create_lifelines(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &mut TimingSession,
) -> HarnessResult<()> {
    let (clock, clock_bounds) = CLOCK;
    let (data, data_bounds) = DATA;

    s.clock_lifeline_id = ctx
        .check(STEPS[1], api.create_lifeline(&s.diagram_id, clock, clock_bounds))
        .await?
        .id;
    s.data_lifeline_id = ctx
        .check(STEPS[2], api.create_lifeline(&s.diagram_id, data, data_bounds))
        .await?
        .id;
    Ok(())
}

/// The engine creates one view per lifeline model; timing states must be
/// anchored to that view, not to the model.
async fn resolve_lifeline_views(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &mut TimingSession,
) -> HarnessResult<()> {
    let (clock_view, data_view) = ctx
        .check(STEPS[3], async {
            let index = api.view_index(&s.diagram_id).await?;
            let clock = lifeline_view(&index, CLOCK.0, &s.clock_lifeline_id)?;
            let data = lifeline_view(&index, DATA.0, &s.data_lifeline_id)?;
            Ok::<_, HarnessError>((clock, data))
        })
        .await?;

    tracing::debug!(clock_view = %clock_view, data_view = %data_view, "Resolved lifeline views");
    s.clock_view_id = clock_view;
    s.data_view_id = data_view;
    Ok(())
}

fn lifeline_view(index: &ViewIndex, label: &str, model_id: &str) -> HarnessResult<String> {
    if index.duplicates().contains(&model_id) {
        return Err(HarnessError::assertion(format!(
            "{label} lifeline has {} views, expected exactly one",
            index.views_for(model_id).len()
        )));
    }
    index
        .view_for(model_id)
        .map(|view| view.id.clone())
        .ok_or_else(|| HarnessError::assertion(format!("{label} lifeline view not found")))
}

async fn create_timing_states(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &mut TimingSession,
) -> HarnessResult<()> {
    let d = s.diagram_id.as_str();
    s.high_id = ctx
        .check(STEPS[4], api.create_timing_state(d, "High", &s.clock_view_id))
        .await?
        .id;
    s.low_id = ctx
        .check(STEPS[5], api.create_timing_state(d, "Low", &s.clock_view_id))
        .await?
        .id;
    s.valid_id = ctx
        .check(STEPS[6], api.create_timing_state(d, "Valid", &s.data_view_id))
        .await?
        .id;
    s.invalid_id = ctx
        .check(STEPS[7], api.create_timing_state(d, "Invalid", &s.data_view_id))
        .await?
        .id;
    Ok(())
}

async fn create_time_segments(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &mut TimingSession,
) -> HarnessResult<()> {
    let d = s.diagram_id.as_str();

    // Clock square wave: High → Low → High → Low
    let first = ctx
        .check(
            STEPS[8],
            api.create_time_segment(d, &s.high_id, &s.low_id, Bounds::new(150, 50, 350, 80)),
        )
        .await?;
    ctx.check(
        STEPS[9],
        api.create_time_segment(d, &s.low_id, &s.high_id, Bounds::new(350, 80, 550, 50)),
    )
    .await?;
    ctx.check(
        STEPS[10],
        api.create_time_segment(d, &s.high_id, &s.low_id, Bounds::new(550, 50, 700, 80)),
    )
    .await?;

    // Data pulse: Invalid → Valid → Invalid
    ctx.check(
        STEPS[11],
        api.create_time_segment(d, &s.invalid_id, &s.valid_id, Bounds::new(150, 220, 400, 190)),
    )
    .await?;
    ctx.check(
        STEPS[12],
        api.create_time_segment(d, &s.valid_id, &s.invalid_id, Bounds::new(400, 190, 700, 220)),
    )
    .await?;

    s.first_segment_id = first.id;
    Ok(())
}

async fn check_listings(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &TimingSession,
) -> HarnessResult<()> {
    let floors = [
        (STEPS[13], ElementKind::Lifeline, MIN_LIFELINES),
        (STEPS[14], ElementKind::TimingState, MIN_TIMING_STATES),
        (STEPS[15], ElementKind::TimeSegment, MIN_TIME_SEGMENTS),
    ];

    for (step, kind, floor) in floors {
        ctx.check(step, async {
            let items = api.list(kind, &s.diagram_id).await?;
            ensure(items.len() >= floor, || {
                format!("Expected {floor} {}, got {}", kind.plural(), items.len())
            })
        })
        .await?;
    }
    Ok(())
}

async fn check_point_reads(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &TimingSession,
) -> HarnessResult<()> {
    ctx.check(STEPS[16], async {
        let lifeline = api.get(ElementKind::Lifeline, &s.clock_lifeline_id).await?;
        expect_name(&lifeline, CLOCK.0)
    })
    .await?;

    ctx.check(STEPS[17], async {
        let state = api.get(ElementKind::TimingState, &s.high_id).await?;
        expect_name(&state, "High")
    })
    .await?;

    ctx.check(STEPS[18], async {
        let segment = api.get(ElementKind::TimeSegment, &s.first_segment_id).await?;
        ensure(!segment.id.is_empty(), || "Time segment not found".to_string())
    })
    .await
}

/// Renames must be visible in the PUT response and in a follow-up read.
async fn check_renames(
    ctx: &ScenarioContext,
    api: &TimingApi,
    s: &TimingSession,
) -> HarnessResult<()> {
    let renames = [
        (STEPS[19], ElementKind::Lifeline, s.clock_lifeline_id.as_str(), "System Clock"),
        (STEPS[20], ElementKind::TimingState, s.high_id.as_str(), "H"),
    ];

    for (step, kind, id, new_name) in renames {
        ctx.check(step, async {
            let updated = api.rename(kind, id, new_name).await?;
            expect_name(&updated, new_name)?;

            let reread = api.get(kind, id).await?;
            ensure(reread.has_name(new_name), || {
                format!(
                    "Rename of {kind} not persisted: expected \"{new_name}\", got \"{}\"",
                    reread.display_name()
                )
            })
        })
        .await?;
    }
    Ok(())
}

fn expect_name(element: &Element, expected: &str) -> HarnessResult<()> {
    ensure(element.has_name(expected), || {
        format!(
            "Expected name \"{expected}\", got \"{}\"",
            element.display_name()
        )
    })
}
