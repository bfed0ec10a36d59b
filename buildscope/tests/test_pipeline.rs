use buildscope::analysis::fit_timeline;
use buildscope::config::BuildMetadata;
use buildscope::domain::{Lane, NodeId, TraceError};
use buildscope::event_log::EventLog;
use buildscope::mining::MinerRegistry;
use buildscope::pipeline::TraceBuilder;
use buildscope::timeline::{EntryKind, Timeline};
use buildscope_common::{Duration, Event, EventContext, EventKind, Timestamp};

fn ms(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn find<'a>(timeline: &'a Timeline, name: &str) -> &'a buildscope::timeline::TimelineEntry {
    timeline
        .iter()
        .map(|(_, entry)| entry)
        .find(|entry| entry.name == name)
        .unwrap_or_else(|| panic!("no entry named {name}"))
}

fn build_started() -> Event {
    Event::new(EventKind::BuildStarted, None, ms(0))
}

fn build_finished(at: i64) -> Event {
    Event::new(EventKind::BuildFinished { succeeded: true }, None, ms(at))
}

fn project_started(ctx: EventContext, file: &str, parent: Option<EventContext>, at: i64) -> Event {
    Event::new(
        EventKind::ProjectStarted {
            project_file: file.to_string(),
            parent_context: parent,
        },
        Some(ctx),
        ms(at),
    )
}

fn project_finished(ctx: EventContext, file: &str, at: i64) -> Event {
    Event::new(
        EventKind::ProjectFinished {
            project_file: file.to_string(),
            succeeded: true,
        },
        Some(ctx),
        ms(at),
    )
}

fn target_started(ctx: EventContext, name: &str, at: i64) -> Event {
    Event::new(
        EventKind::TargetStarted {
            target_name: name.to_string(),
            project_file: String::new(),
        },
        Some(ctx),
        ms(at),
    )
}

fn target_finished(ctx: EventContext, name: &str, at: i64) -> Event {
    Event::new(
        EventKind::TargetFinished {
            target_name: name.to_string(),
            project_file: String::new(),
            succeeded: true,
        },
        Some(ctx),
        ms(at),
    )
}

fn task_started(ctx: EventContext, name: &str, at: i64) -> Event {
    Event::new(
        EventKind::TaskStarted {
            task_name: name.to_string(),
            project_file: String::new(),
        },
        Some(ctx),
        ms(at),
    )
}

fn task_finished(ctx: EventContext, name: &str, at: i64) -> Event {
    Event::new(
        EventKind::TaskFinished {
            task_name: name.to_string(),
            succeeded: true,
        },
        Some(ctx),
        ms(at),
    )
}

fn assert_trace_invariants(timeline: &Timeline) {
    assert!(
        timeline.containment_violations().is_empty(),
        "containment violated by {:?}",
        timeline.containment_violations()
    );
    assert!(
        timeline.lane_conflicts().is_empty(),
        "lane conflicts {:?}",
        timeline.lane_conflicts()
    );
}

#[test]
fn test_simple_build_fixture() {
    let log = EventLog::from_file("tests/fixtures/simple_build.json").unwrap();
    let timeline = TraceBuilder::new(log.metadata).build(log.events).unwrap();

    assert_trace_invariants(&timeline);

    // Build on node 0, app on node 1, lib handed off to node 2
    assert_eq!(timeline.roots_on(NodeId(0)).len(), 1);
    assert_eq!(timeline.roots_on(NodeId(1)).len(), 1);
    assert_eq!(timeline.roots_on(NodeId(2)).len(), 1);

    let build = timeline.entry(timeline.roots_on(NodeId(0))[0]);
    assert_eq!(
        build.name,
        "Build Build Debug|x64 (parallel projects: 2, parallel compiles: 4)"
    );
    assert_eq!(timeline.entry(timeline.roots_on(NodeId(1))[0]).name, r"app\app.vcxproj");
    assert_eq!(timeline.entry(timeline.roots_on(NodeId(2))[0]).name, r"lib\lib.vcxproj");

    // Sequential compile: front-end then back-end, chained
    let front_end = find(&timeline, "c1xx.dll");
    assert_eq!((front_end.start, front_end.end), (ms(1500), ms(2500)));
    let back_end = find(&timeline, "c2.dll");
    assert_eq!((back_end.start, back_end.end), (ms(2500), ms(4500)));
    let file = find(&timeline, "a.cpp");
    assert_eq!((file.start, file.end), (ms(1300), ms(4500)));

    // Link passes overflow the task and are squeezed into it
    let link_task = timeline
        .iter()
        .map(|(_, e)| e)
        .find(|e| e.name == "Link" && e.kind == EntryKind::Task)
        .unwrap();
    let pass_2 = find(&timeline, "Pass 2");
    assert_eq!(pass_2.end, link_task.end);
    assert_eq!(find(&timeline, "Pass 1").start, link_task.start);
    assert_eq!(find(&timeline, "OptRef").start, pass_2.start);

    // Nothing ran concurrently on one node
    assert!(timeline.iter().all(|(_, e)| e.lane.lane == Lane(0)));
}

#[test]
fn test_fitting_finished_trace_is_idempotent() {
    let log = EventLog::from_file("tests/fixtures/simple_build.json").unwrap();
    let mut timeline = TraceBuilder::new(log.metadata).build(log.events).unwrap();
    let before: Vec<_> = timeline.iter().map(|(_, e)| (e.start, e.end)).collect();

    assert_eq!(fit_timeline(&mut timeline), 0);

    let after: Vec<_> = timeline.iter().map(|(_, e)| (e.start, e.end)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_no_mining_keeps_task_granularity() {
    let log = EventLog::from_file("tests/fixtures/simple_build.json").unwrap();
    let timeline = TraceBuilder::new(log.metadata)
        .with_miners(MinerRegistry::empty())
        .build(log.events)
        .unwrap();

    assert!(timeline.iter().all(|(_, e)| e.kind != EntryKind::Synthetic));
    assert_trace_invariants(&timeline);
}

#[test]
fn test_single_project_chain_is_lane_zero() {
    let project = EventContext::project(1, 1, 1);
    let target = project.with_target(1);
    let task = target.with_task(1);
    let events = vec![
        build_started(),
        project_started(project, "a.proj", None, 100),
        target_started(target, "Build", 200),
        task_started(task, "Exec", 300),
        task_finished(task, "Exec", 400),
        target_finished(target, "Build", 500),
        project_finished(project, "a.proj", 600),
        build_finished(700),
    ];

    let timeline = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();

    assert_eq!(timeline.len(), 4);
    assert!(timeline.iter().all(|(_, e)| e.lane.lane == Lane(0)));
}

#[test]
fn test_overlapping_targets_get_separate_lanes() {
    let project = EventContext::project(1, 1, 1);
    let first = project.with_target(1);
    let second = project.with_target(2);
    let events = vec![
        build_started(),
        project_started(project, "a.proj", None, 0),
        target_started(first, "First", 0),
        target_started(second, "Second", 5_000),
        target_finished(first, "First", 10_000),
        target_finished(second, "Second", 15_000),
        project_finished(project, "a.proj", 20_000),
        build_finished(20_000),
    ];

    let timeline = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();

    assert_eq!(find(&timeline, "First").lane.lane, Lane(0));
    assert_eq!(find(&timeline, "Second").lane.lane, Lane(1));
    assert_eq!(timeline.lane_count(NodeId(1)), 2);
    assert_trace_invariants(&timeline);
}

#[test]
fn test_project_falls_back_to_open_project() {
    let outer = EventContext::project(1, 1, 1);
    let target = outer.with_target(1);
    let task = target.with_task(1);
    let inner = EventContext::project(1, 2, 2);
    let events = vec![
        build_started(),
        project_started(outer, "outer.proj", None, 100),
        target_started(target, "Build", 200),
        task_started(task, "MSBuild", 300),
        task_finished(task, "MSBuild", 400),
        // Requested by the closed task, while its project is still open
        project_started(inner, "inner.proj", Some(task), 500),
        project_finished(inner, "inner.proj", 600),
        target_finished(target, "Build", 700),
        project_finished(outer, "outer.proj", 800),
        build_finished(900),
    ];

    let timeline = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();

    let outer_id = timeline.roots_on(NodeId(1))[0];
    assert_eq!(timeline.roots_on(NodeId(1)).len(), 1);
    let children: Vec<&str> = timeline
        .entry(outer_id)
        .children
        .iter()
        .map(|&c| timeline.entry(c).name.as_str())
        .collect();
    assert_eq!(children, vec!["Build", "inner.proj"]);
}

#[test]
fn test_single_threaded_compile_scenario() {
    let project = EventContext::project(1, 1, 1);
    let target = project.with_target(1);
    let task = target.with_task(1);
    let events = vec![
        build_started(),
        project_started(project, "a.vcxproj", None, 0),
        target_started(target, "ClCompile", 0),
        task_started(task, "CL", 0),
        Event::message(Some(task), ms(500), "a.cpp"),
        Event::message(Some(task), ms(1500), r"time(C:\bin\c1xx.dll)=1.0s < 1 - 2 > BB [a.cpp]"),
        Event::message(Some(task), ms(1600), "Generating Code..."),
        Event::message(Some(task), ms(3600), r"time(C:\bin\c2.dll)=2.0s < 3 - 4 > BB [a.cpp]"),
        task_finished(task, "CL", 4_000),
        target_finished(target, "ClCompile", 4_000),
        project_finished(project, "a.vcxproj", 4_000),
        build_finished(4_000),
    ];

    let timeline = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();

    let file = find(&timeline, "a.cpp");
    assert_eq!(file.children.len(), 2);
    let front_end = timeline.entry(file.children[0]);
    let back_end = timeline.entry(file.children[1]);
    assert_eq!(front_end.duration(), Duration::from_secs(1));
    assert_eq!(back_end.duration(), Duration::from_secs(2));
    assert_eq!(back_end.start, front_end.end);
    assert_trace_invariants(&timeline);
}

#[test]
fn test_concurrent_compile_with_report_sections() {
    let project = EventContext::project(1, 1, 1);
    let target = project.with_target(1);
    let task = target.with_task(1);
    let message = |at: i64, text: &str| Event::message(Some(task), ms(at), text);
    let events = vec![
        build_started(),
        project_started(project, "a.vcxproj", None, 0),
        target_started(target, "ClCompile", 0),
        task_started(task, "CL", 0),
        message(0, "a.cpp"),
        message(100, "b.cpp"),
        message(2_000, "time(c1xx.dll)=2.0s < 1 - 2 > BB [a.cpp]"),
        message(2_100, "time(c1xx.dll)=1.5s < 1 - 2 > BB [b.cpp]"),
        message(2_200, "Class Definitions:"),
        message(2_200, "\tWidget: 1.0s"),
        message(2_200, "Function Definitions:"),
        message(2_200, "\tmain: 0.5s"),
        message(3_000, "time(c2.dll)=0.8s < 3 - 4 > BB [a.cpp]"),
        message(3_500, "time(c2.dll)=1.0s < 3 - 4 > BB [b.cpp]"),
        task_finished(task, "CL", 4_000),
        target_finished(target, "ClCompile", 4_000),
        project_finished(project, "a.vcxproj", 4_000),
        build_finished(4_000),
    ];

    let timeline = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();

    let a = find(&timeline, "a.cpp");
    let classes = find(&timeline, "Class Definitions");
    let functions = find(&timeline, "Function Definitions");
    assert!(functions.overlaps(a));
    assert_ne!(functions.lane.lane, a.lane.lane);
    assert_ne!(classes.lane.lane, a.lane.lane);
    assert_ne!(functions.lane.lane, classes.lane.lane);
    assert_trace_invariants(&timeline);
}

#[test]
fn test_malformed_log_produces_no_trace() {
    let project = EventContext::project(1, 1, 1);
    let events = vec![
        build_started(),
        project_finished(project, "a.proj", 100),
        build_finished(200),
    ];

    let err = TraceBuilder::new(BuildMetadata::default())
        .build(events)
        .unwrap_err();

    assert!(matches!(err, TraceError::UnmatchedFinish { .. }));
    assert!(err.to_string().starts_with("malformed build log"));
}

#[test]
fn test_second_build_is_rejected() {
    let events = vec![build_started(), build_started(), build_finished(100)];

    let err = TraceBuilder::new(BuildMetadata::default())
        .build(events)
        .unwrap_err();

    assert!(matches!(err, TraceError::DuplicateBuild { .. }));
}
