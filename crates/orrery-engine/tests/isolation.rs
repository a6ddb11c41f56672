//! Integration test: one failing body never disturbs its siblings.
//!
//! A body whose rule rejects, panics, or produces NaN keeps its previous
//! committed position for that tick and is reported as a warning. Every
//! other body keeps moving normally in that tick and all later ones, and
//! the loop itself never stops because of it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use orrery_core::{BodyFault, BodyId, BodySpec, CircularOrbit, MotionRule, Position, TickId};
use orrery_engine::{
    BodySystem, BodyWarning, EngineConfig, Frame, Scheduler, SchedulerState, TickEngine,
};
use orrery_test_utils::{FaultAfterRule, NanRule, PanickingRule, RejectingRule};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

fn siblings_with(rule: Arc<dyn MotionRule>) -> Vec<BodySpec> {
    vec![
        BodySpec::root(0.0, 0.0, 0.0).named("sun"),
        BodySpec::root(0.05, 100.0, 0.0).named("left"),
        BodySpec::root(0.05, 150.0, 0.0).named("faulty").with_rule(rule),
        BodySpec::satellite(BodyId(2), 0.2, 10.0, 0.0).named("faulty-moon"),
        BodySpec::root(0.05, 200.0, 0.0).named("right"),
    ]
}

#[test]
fn failing_body_freezes_while_siblings_move() {
    init_tracing();
    let rule = Arc::new(FaultAfterRule::new(5));
    let system = BodySystem::new(siblings_with(rule.clone())).unwrap();
    let config = EngineConfig {
        worker_count: Some(3),
        ..EngineConfig::default()
    };
    let mut engine = TickEngine::new(system, &config).unwrap();

    let mut frozen_at: Option<Position> = None;
    for n in 1..=20u64 {
        let out = engine.step();
        for sibling in [BodyId(1), BodyId(4)] {
            assert_ne!(
                out.snapshot.get(sibling),
                out.previous.get(sibling),
                "sibling {sibling} did not move at tick {n}"
            );
        }
        let faulty = out.snapshot.get(BodyId(2)).unwrap();
        if n <= 5 {
            assert!(out.warnings.is_empty());
        } else {
            assert_eq!(
                out.warnings,
                vec![BodyWarning {
                    body: BodyId(2),
                    tick: TickId(n),
                    fault: BodyFault::Rejected {
                        reason: format!("fault_after: call {} exceeds 5", n - 1),
                    },
                }]
            );
            let frozen = *frozen_at.get_or_insert(faulty);
            assert_eq!(faulty, frozen);
        }
    }
    assert_eq!(rule.calls(), 20);
    assert_eq!(engine.fault_events(), 15);

    // The moon keeps orbiting the frozen owner.
    let out = engine.step();
    let moon = out.snapshot.get(BodyId(3)).unwrap();
    let owner = out.previous.get(BodyId(2)).unwrap();
    assert!((moon.distance(owner) - 10.0).abs() < 1e-9);
}

#[test]
fn every_fault_kind_is_contained() {
    init_tracing();
    let cases: [(Arc<dyn MotionRule>, fn(&BodyFault) -> bool); 3] = [
        (Arc::new(RejectingRule), |f: &BodyFault| {
            matches!(f, BodyFault::Rejected { .. })
        }),
        (Arc::new(PanickingRule), |f: &BodyFault| {
            matches!(f, BodyFault::Panicked { message } if message == "fixture panic")
        }),
        (Arc::new(NanRule), |f: &BodyFault| {
            matches!(f, BodyFault::NonFinite { .. })
        }),
    ];

    for (rule, is_expected) in cases {
        let system = BodySystem::new(siblings_with(rule)).unwrap();
        let config = EngineConfig {
            worker_count: Some(2),
            ..EngineConfig::default()
        };
        let mut engine = TickEngine::new(system, &config).unwrap();
        let start = engine.store().latest();
        for _ in 0..10 {
            let out = engine.step();
            assert_eq!(out.warnings.len(), 1);
            assert!(is_expected(&out.warnings[0].fault), "{:?}", out.warnings[0]);
            assert_eq!(out.snapshot.get(BodyId(2)), start.get(BodyId(2)));
            assert_eq!(out.metrics.bodies_faulted, 1);
        }
        assert_eq!(
            engine.system().get(BodyId(2)).unwrap().angle(),
            0.0,
            "faulty body's angle must not advance"
        );
    }
}

#[test]
fn scheduler_reports_faults_and_keeps_running() {
    init_tracing();
    let warnings: Arc<Mutex<Vec<BodyWarning>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&warnings);
    let mut scheduler = Scheduler::new(
        siblings_with(Arc::new(PanickingRule)),
        EngineConfig {
            target_interval: Duration::from_micros(200),
            worker_count: Some(2),
            max_ticks: Some(50),
            ..EngineConfig::default()
        },
        move |frame: &Frame| sink.lock().unwrap().extend(frame.warnings.iter().cloned()),
    )
    .unwrap();
    scheduler.start().unwrap();
    let report = scheduler.await_stopped().unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(report.ticks_completed, 50);
    assert_eq!(report.body_fault_events, 50);
    let warnings = warnings.lock().unwrap();
    assert_eq!(warnings.len(), 50);
    assert!(warnings.iter().all(|w| w.body == BodyId(2)));
    let ticks: Vec<u64> = warnings.iter().map(|w| w.tick.0).collect();
    assert_eq!(ticks, (1..=50).collect::<Vec<_>>());
}

#[test]
fn panicking_observer_does_not_stop_the_loop() {
    init_tracing();
    let delivered = Arc::new(Mutex::new(0u64));
    let sink = Arc::clone(&delivered);
    let mut scheduler = Scheduler::new(
        siblings_with(Arc::new(CircularOrbit)),
        EngineConfig {
            target_interval: Duration::from_micros(200),
            worker_count: Some(1),
            max_ticks: Some(30),
            ..EngineConfig::default()
        },
        move |frame: &Frame| {
            *sink.lock().unwrap() += 1;
            if frame.tick.0 % 10 == 0 {
                panic!("observer failure at {}", frame.tick);
            }
        },
    )
    .unwrap();
    scheduler.start().unwrap();
    let report = scheduler.await_stopped().unwrap();
    assert_eq!(report.ticks_completed, 30);
    assert!(report.publisher_joined);
    assert_eq!(*delivered.lock().unwrap(), 30);
}
