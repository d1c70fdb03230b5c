//! Property-based tests for the session state machine.
//!
//! Uses proptest to generate random key sequences and verify machine invariants.

use proptest::prelude::*;
use std::sync::Arc;

use yoshimi_core::{Dimensions, FeatureSet, Key, Stage};
use yoshimi_session::{render, Effect, Focus, InputEvent, MachineConfig, SessionMachine};

const SECRET: &str = "open-sesame";

fn machine(has_menu: bool) -> SessionMachine {
    let features = FeatureSet {
        has_menu,
        multiline_body: false,
    };
    SessionMachine::new(Arc::new(MachineConfig::new(SECRET, features)))
}

fn unlocked() -> SessionMachine {
    let mut m = machine(false);
    for c in SECRET.chars() {
        m.handle(InputEvent::KeyPress(Key::Char(c)));
    }
    m.handle(InputEvent::KeyPress(Key::Enter));
    m
}

/// Any key except Ctrl+C.
fn key() -> impl Strategy<Value = Key> {
    prop_oneof![
        4 => proptest::char::range('a', 'z').prop_map(Key::Char),
        1 => Just(Key::Char(' ')),
        1 => Just(Key::Enter),
        2 => Just(Key::Tab),
        1 => Just(Key::Shift(Box::new(Key::Tab))),
        1 => Just(Key::Backspace),
        1 => Just(Key::Delete),
        1 => Just(Key::Left),
        1 => Just(Key::Right),
        1 => Just(Key::Up),
        1 => Just(Key::Down),
        1 => Just(Key::Home),
        1 => Just(Key::End),
    ]
}

fn dimensions() -> impl Strategy<Value = Dimensions> {
    (1u16..200, 1u16..400).prop_map(|(rows, cols)| Dimensions::new(rows, cols))
}

proptest! {
    /// Tab and Shift+Tab cycle focus with wraparound.
    #[test]
    fn focus_follows_tab_count(forward in proptest::collection::vec(any::<bool>(), 0..40)) {
        let mut m = unlocked();
        let mut expected = Focus::Title;
        for is_forward in forward {
            let key = if is_forward { Key::Tab } else { Key::Shift(Box::new(Key::Tab)) };
            m.handle(InputEvent::KeyPress(key));
            expected = if is_forward { expected.next() } else { expected.prev() };
            prop_assert_eq!(m.focus(), Some(expected));
        }
    }

    /// Three tabs always come back to the starting element.
    #[test]
    fn three_tabs_round_trip(start in 0usize..3) {
        let mut m = unlocked();
        for _ in 0..start {
            m.handle(InputEvent::KeyPress(Key::Tab));
        }
        let before = m.focus();
        for _ in 0..3 {
            m.handle(InputEvent::KeyPress(Key::Tab));
        }
        prop_assert_eq!(m.focus(), before);
    }

    /// A wrong phrase never leaves the gate and always clears the attempt.
    #[test]
    fn wrong_secret_stays_at_gate(guess in "[ -~]{0,40}", has_menu in any::<bool>()) {
        prop_assume!(guess != SECRET);
        let mut m = machine(has_menu);
        for _ in 0..3 {
            for c in guess.chars() {
                m.handle(InputEvent::KeyPress(Key::Char(c)));
            }
            prop_assert_eq!(m.handle(InputEvent::KeyPress(Key::Enter)), None);
            prop_assert_eq!(m.stage(), Stage::AwaitingSecret);
            prop_assert_eq!(m.secret_attempt(), "");
        }
    }

    /// Resizes only change the recorded size.
    #[test]
    fn resize_is_neutral(
        keys in proptest::collection::vec(key(), 0..60),
        sizes in proptest::collection::vec(dimensions(), 1..10),
    ) {
        let mut plain = unlocked();
        let mut resized = unlocked();

        for (i, key) in keys.iter().enumerate() {
            let a = plain.handle(InputEvent::KeyPress(key.clone()));
            if let Some(dims) = sizes.get(i % (sizes.len() + 1)) {
                prop_assert_eq!(resized.handle(InputEvent::Resize(*dims)), None);
            }
            let b = resized.handle(InputEvent::KeyPress(key.clone()));
            prop_assert_eq!(a, b);
        }

        prop_assert_eq!(plain.stage(), resized.stage());
        prop_assert_eq!(plain.focus(), resized.focus());
        prop_assert_eq!(plain.title(), resized.title());
        prop_assert_eq!(plain.body(), resized.body());
    }

    /// The script is only requested by Enter on the submit control.
    #[test]
    fn script_only_from_submit(keys in proptest::collection::vec(key(), 0..80)) {
        let mut m = unlocked();
        for key in keys {
            let focus = m.focus();
            let is_enter = key == Key::Enter;
            match m.handle(InputEvent::KeyPress(key)) {
                Some(Effect::RunScript { title, body }) => {
                    prop_assert_eq!(focus, Some(Focus::Submit));
                    prop_assert!(is_enter);
                    prop_assert_eq!(title, m.title());
                    prop_assert_eq!(body, m.body());
                    break;
                }
                Some(other) => prop_assert!(false, "unexpected effect {:?}", other),
                None => prop_assert_eq!(m.stage(), Stage::EditingForm),
            }
        }
    }

    /// Rendering never panics and stays inside the terminal when it fits.
    #[test]
    fn render_stays_on_screen(
        keys in proptest::collection::vec(key(), 0..40),
        dims in dimensions(),
    ) {
        let mut m = unlocked();
        m.handle(InputEvent::Resize(dims));
        for key in keys {
            m.handle(InputEvent::KeyPress(key));
        }

        let frame = render(&m);
        let height = frame.rows().len();
        let width = frame.rows().iter().map(|(_, line)| line.width()).max().unwrap_or(0);
        for (pos, _) in frame.rows() {
            if height <= dims.rows as usize {
                prop_assert!(pos.row < dims.rows);
            }
            if width <= dims.cols as usize {
                prop_assert!(pos.col < dims.cols);
            }
        }
        let _ = frame.to_ansi();
    }
}
