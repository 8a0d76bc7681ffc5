use pacer::config::ExecutorConfig;
use pacer::events::{RecordingSink, deliver};
use pacer::executor::{ScenarioExecutor, TickInput};
use pacer::pacing::{EndReport, IntervalHint};
use pacer::phrases::Phrase;
use pacer::{CoachingEvent, ComboBlock, ComboScenario, IntervalPlan, Scenario, Segment};

fn run_steady(scenario: Scenario, pace_sec_per_km: f64, seconds: u32) -> Vec<CoachingEvent> {
    let speed = 1000.0 / pace_sec_per_km;
    let mut executor = ScenarioExecutor::new(scenario, ExecutorConfig::default(), TickInput {
        elapsed_sec: 0,
        distance_m: 0.0,
    });
    (1..=seconds)
        .flat_map(|t| {
            executor.tick(TickInput {
                elapsed_sec: t,
                distance_m: speed * t as f64,
            })
        })
        .collect()
}

#[test]
fn steady_runner_through_work_and_rest() {
    let scenario = Scenario::new(vec![
        Segment::Work {
            duration_sec: 180,
            target_pace_sec_per_km: Some(270),
        },
        Segment::Rest {
            duration_sec: 60,
            target_pace_sec_per_km: None,
        },
    ]);
    let events = run_steady(scenario, 275.0, 245);

    let timeline: Vec<(u32, &Phrase)> = events.iter().map(|e| (e.elapsed_sec, &e.phrase)).collect();
    let at = |sec: u32| -> Vec<&Phrase> {
        timeline.iter().filter(|(t, _)| *t == sec).map(|(_, p)| *p).collect()
    };

    assert!(matches!(at(1).as_slice(), [Phrase::SegmentStart { .. }]));
    assert_eq!(at(33), vec![&Phrase::IntervalHint(IntervalHint::Praise { alternate: false })]);
    assert_eq!(at(93), vec![&Phrase::IntervalHint(IntervalHint::Praise { alternate: true })]);
    assert_eq!(at(153), vec![&Phrase::IntervalHint(IntervalHint::Praise { alternate: false })]);
    assert_eq!(at(170), vec![&Phrase::ChangingSoon { in_sec: 10 }]);
    assert_eq!(at(180), vec![&Phrase::EndReport(EndReport::OnTarget)]);
    assert!(matches!(at(181).as_slice(), [Phrase::SegmentStart { .. }]));
    assert!(matches!(at(220).as_slice(), [Phrase::RestRead { pace: Some(p) }] if (273..=277).contains(p)));
    assert_eq!(at(230), vec![&Phrase::ChangingSoon { in_sec: 10 }]);
    assert_eq!(at(240), vec![&Phrase::WorkoutComplete]);
    assert_eq!(events.len(), 10);

    let hints = events
        .iter()
        .filter(|e| matches!(e.phrase, Phrase::IntervalHint(_)))
        .count();
    assert_eq!(hints, 3);
}

#[test]
fn phrases_render_for_speech() {
    let scenario = IntervalPlan::new()
        .work(180, 270)
        .rest(60, None)
        .build()
        .unwrap();
    let events = run_steady(scenario, 275.0, 240);
    let mut sink = RecordingSink::default();
    deliver(&events, &mut sink);

    assert_eq!(sink.phrases.first().map(String::as_str), Some("Work. 3 minutes. Pace 4 30."));
    assert!(sink.phrases.contains(&"Rest. 1 minute.".to_string()));
    assert_eq!(sink.phrases.last().map(String::as_str), Some("Workout complete."));
}

#[test]
fn combo_runs_every_block_in_order() {
    let combo = ComboScenario::new(vec![
        ComboBlock::Warmup {
            duration_sec: 60,
            pace_sec_per_km: None,
        },
        ComboBlock::Pace {
            distance_km: Some(0.5),
            pace_sec_per_km: 300,
        },
        ComboBlock::Cooldown {
            duration_sec: 60,
            pace_sec_per_km: None,
        },
    ]);
    let events = run_steady(combo.flatten(), 300.0, 400);

    let starts = events
        .iter()
        .filter(|e| matches!(e.phrase, Phrase::SegmentStart { .. }))
        .count();
    assert_eq!(starts, 3);
    assert!(events
        .iter()
        .any(|e| matches!(e.phrase, Phrase::DistanceComplete { distance_km } if (distance_km - 0.5).abs() < 1e-9)));
    assert_eq!(events.last().map(|e| &e.phrase), Some(&Phrase::WorkoutComplete));
}

#[test]
fn corrupt_scenario_runs_nothing() {
    let scenario = Scenario::load_or_empty(Some("{\"segments\": oops"));
    assert!(scenario.is_empty());
    assert!(run_steady(scenario, 300.0, 30).is_empty());
}
