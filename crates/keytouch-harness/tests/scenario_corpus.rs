//! Replays the bundled scenario corpus and checks each trace.

use std::path::PathBuf;

use keytouch_harness::{Scenario, Summary, replay};
use serde_json::Value;

fn corpus_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn load(name: &str) -> Scenario {
    Scenario::from_json_file(corpus_dir().join(format!("{name}.json")))
        .unwrap_or_else(|e| panic!("{name}: {e}"))
}

/// Gesture records only, as `(event, disposition)` pairs.
fn gesture_events(records: &[Value]) -> Vec<(String, Option<String>)> {
    records
        .iter()
        .filter(|r| r["source"] == "gesture")
        .map(|r| {
            (
                r["event"].as_str().unwrap_or_default().to_string(),
                r["disposition"].as_str().map(str::to_string),
            )
        })
        .collect()
}

fn assert_lifecycles_close(name: &str, records: &[Value]) {
    let mut open = false;
    let mut releases = 0;
    for (event, _) in gesture_events(records) {
        match event.as_str() {
            "press" => {
                assert!(!open, "{name}: nested press");
                open = true;
                releases = 0;
            }
            "release_inside" | "release_outside" => releases += 1,
            "end" => {
                assert!(open, "{name}: end without press");
                assert_eq!(releases, 1, "{name}: releases per press");
                open = false;
            }
            _ => assert!(open, "{name}: {event} outside a press"),
        }
    }
    assert!(!open, "{name}: unterminated press");
}

#[test]
fn every_bundled_scenario_is_deterministic_and_well_formed() {
    let mut seen = 0;
    for entry in std::fs::read_dir(corpus_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let scenario = Scenario::from_json_file(&path).unwrap();
        let first = replay(&scenario);
        let second = replay(&scenario);
        assert_eq!(first.digest(), second.digest(), "{}", scenario.name);
        assert_eq!(first.to_jsonl(), second.to_jsonl());
        assert_lifecycles_close(&scenario.name, &first.records);
        seen += 1;
    }
    assert!(seen >= 8, "corpus has {seen} scenarios");
}

#[test]
fn summaries_match_expected_behaviour() {
    let cases = [
        (
            "tap",
            Summary {
                presses: 1,
                releases_inside: 1,
                commits: 1,
                ..Summary::default()
            },
        ),
        (
            "double_tap",
            Summary {
                presses: 3,
                releases_inside: 3,
                double_taps: 1,
                commits: 2,
                ..Summary::default()
            },
        ),
        (
            "long_press_popup",
            Summary {
                presses: 1,
                releases_inside: 1,
                long_presses: 1,
                repeat_ticks: 1,
                popup_commits: 1,
                ..Summary::default()
            },
        ),
        (
            "slide_down_cancel",
            Summary {
                presses: 1,
                releases_inside: 1,
                long_presses: 1,
                repeat_ticks: 1,
                commits: 1,
                ..Summary::default()
            },
        ),
        (
            "backspace_repeat",
            Summary {
                presses: 1,
                releases_inside: 1,
                long_presses: 1,
                repeat_ticks: 5,
                commits: 1,
                ..Summary::default()
            },
        ),
        (
            "stuck_press",
            Summary {
                presses: 1,
                releases_inside: 1,
                long_presses: 1,
                repeat_ticks: 24,
                cancelled: 1,
                ..Summary::default()
            },
        ),
        (
            "scroll_deferral",
            Summary {
                presses: 1,
                releases_inside: 1,
                commits: 1,
                ..Summary::default()
            },
        ),
        (
            "release_outside",
            Summary {
                presses: 1,
                releases_outside: 1,
                commits: 1,
                ..Summary::default()
            },
        ),
    ];
    for (name, expected) in cases {
        assert_eq!(replay(&load(name)).summary, expected, "{name}");
    }
}

#[test]
fn trailing_popup_commits_outermost_alternate() {
    let result = replay(&load("long_press_popup"));
    let opened = result
        .records
        .iter()
        .find(|r| r["event"] == "opened")
        .unwrap();
    assert_eq!(opened["alignment"], "trailing");
    assert_eq!(opened["at_ms"], 500);

    let selections: Vec<u64> = result
        .records
        .iter()
        .filter(|r| r["event"] == "selection_changed")
        .map(|r| r["index"].as_u64().unwrap())
        .collect();
    assert_eq!(selections, vec![2, 1, 0]);

    let alternate = result
        .records
        .iter()
        .find(|r| r["event"] == "alternate")
        .unwrap();
    assert_eq!(alternate["value"], "c");
}

#[test]
fn double_tap_suppresses_second_commit() {
    let result = replay(&load("double_tap"));
    let dispositions: Vec<Option<String>> = gesture_events(&result.records)
        .into_iter()
        .filter(|(event, _)| event.starts_with("release"))
        .map(|(_, d)| d)
        .collect();
    assert_eq!(
        dispositions,
        vec![
            Some("commit".to_string()),
            Some("double_tap".to_string()),
            Some("commit".to_string()),
        ]
    );
}

#[test]
fn deferred_events_carry_deferred_times() {
    let result = replay(&load("scroll_deferral"));
    let times: Vec<(String, u64)> = result
        .records
        .iter()
        .filter(|r| r["source"] == "gesture")
        .map(|r| {
            (
                r["event"].as_str().unwrap().to_string(),
                r["at_ms"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(times[0], ("press".to_string(), 100));
    assert_eq!(times.last(), Some(&("end".to_string(), 240)));
}

#[test]
fn stuck_press_ends_at_safety_deadline() {
    let result = replay(&load("stuck_press"));
    let end = result
        .records
        .iter()
        .find(|r| r["event"] == "end")
        .unwrap();
    assert_eq!(end["at_ms"], 3000);
    let release = result
        .records
        .iter()
        .find(|r| r["event"] == "release_inside")
        .unwrap();
    assert_eq!(release["disposition"], "cancelled");
}
