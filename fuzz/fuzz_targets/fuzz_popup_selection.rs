#![no_main]

use arbitrary::Arbitrary;
use keytouch_core::{Alignment, Point, PopupConfig, PopupSelection, Rect};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    count: u8,
    x: u16,
    width: u8,
    height: u8,
    trailing: Option<bool>,
    max_slot_width: u8,
    drags: Vec<(f32, f32)>,
    commit: bool,
}

fuzz_target!(|input: Input| {
    let config = PopupConfig {
        max_slot_width: f32::from(input.max_slot_width.max(1)),
    };
    let frame = Rect::new(
        f32::from(input.x),
        0.0,
        f32::from(input.width.max(1)),
        f32::from(input.height.max(1)),
    );
    let preferred = input.trailing.map(|t| {
        if t {
            Alignment::Trailing
        } else {
            Alignment::Leading
        }
    });
    let count = usize::from(input.count % 16);

    let mut popup = PopupSelection::new(config);
    popup.open((0..count).collect(), frame, 390.0, preferred);
    assert_eq!(popup.is_active(), count > 0);

    for &(dx, dy) in input.drags.iter().take(256) {
        popup.update_selection(Point::new(dx, dy));
        match popup.selected_index() {
            Some(i) => assert!(i < popup.actions().len()),
            None => assert!(!popup.is_active()),
        }
        if dy > frame.height {
            assert!(!popup.is_active(), "drag below the key must close");
        }
    }

    if input.commit {
        let expected = popup.selected_action().copied();
        assert_eq!(popup.commit(), expected.is_some());
        assert_eq!(popup.take_committed(), expected);
    }
    popup.reset();
    popup.reset();
    assert!(!popup.is_active());
});
