#![no_main]

use arbitrary::Arbitrary;
use keytouch_core::{
    GestureConfig, GestureEngine, GestureEvent, PointerInput, PopupSelection, Rect,
    ScrollCoordination,
};
use libfuzzer_sys::fuzz_target;
use web_time::{Duration, Instant};

#[derive(Debug, Arbitrary)]
enum Op {
    Down(i16, i16),
    Move(i16, i16),
    Up(i16, i16),
    Wait(u16),
    Scroll(bool),
    OpenPopup(u8),
    Cancel,
}

#[derive(Debug, Arbitrary)]
struct Input {
    in_scroll_container: bool,
    tolerance_tenths: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let config = GestureConfig {
        release_outside_tolerance: f32::from(input.tolerance_tenths % 30) / 10.0,
        ..GestureConfig::default()
    };
    let frame = Rect::new(0.0, 0.0, 40.0, 40.0);
    let scroll = ScrollCoordination::new();
    let mut engine = GestureEngine::new(config).with_frame(frame);
    if input.in_scroll_container {
        engine = engine.with_scroll(scroll.clone());
    }
    let mut popup: PopupSelection<u8> = PopupSelection::default();

    let t0 = Instant::now();
    let mut now = t0;
    let mut events = Vec::new();
    for op in input.ops.iter().take(512) {
        now += Duration::from_millis(3);
        let p = |x: i16, y: i16| (f32::from(x) / 64.0, f32::from(y) / 64.0);
        match *op {
            Op::Down(x, y) => {
                events.extend(engine.process(PointerInput::down(p(x, y), now), &mut popup));
            }
            Op::Move(x, y) => {
                events.extend(engine.process(PointerInput::moved(p(x, y), now), &mut popup));
            }
            Op::Up(x, y) => {
                events.extend(engine.process(PointerInput::up(p(x, y), now), &mut popup));
            }
            Op::Wait(ms) => {
                now += Duration::from_millis(u64::from(ms));
                events.extend(engine.advance(now, &mut popup));
            }
            Op::Scroll(on) => {
                scroll.set_scrolling(on);
            }
            Op::OpenPopup(n) => popup.open((0..n % 8).collect(), frame, 390.0, None),
            Op::Cancel => events.extend(engine.cancel(&mut popup)),
        }
        if let Some(i) = popup.selected_index() {
            assert!(i < popup.actions().len(), "popup selection out of range");
        }
    }
    events.extend(engine.cancel(&mut popup));
    events.extend(engine.advance(now + Duration::from_secs(60), &mut popup));

    // Post-conditions: presses and ends pair up, one release per press.
    let mut open = false;
    let mut releases = 0;
    for event in &events {
        match event {
            GestureEvent::Press { .. } => {
                assert!(!open, "nested press");
                open = true;
                releases = 0;
            }
            GestureEvent::End => {
                assert!(open, "end without press");
                assert_eq!(releases, 1, "release count");
                open = false;
            }
            e if e.is_release() => releases += 1,
            _ => assert!(open, "event outside a press"),
        }
    }
    assert!(!open, "press left open");
    assert!(!scroll.is_gesture_disabled(), "scroll gesture never returned");
    assert!(engine.next_deadline().is_none(), "timers left armed");
});
