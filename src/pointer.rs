use macroquad::input::{Touch, TouchPhase};
use macroquad::prelude::*;

use crate::dispatch::{InputEvent, PointerButton};

const MOUSE_BUTTONS: [(MouseButton, PointerButton); 3] = [
    (MouseButton::Left, PointerButton::Primary),
    (MouseButton::Right, PointerButton::Secondary),
    (MouseButton::Middle, PointerButton::Middle),
];

/// Mouse and touch state for one frame, in window coordinates.
#[derive(Clone, Debug, Default)]
pub struct PointerFrame {
    pub mouse: Vec2,
    pub pressed: Vec<PointerButton>,
    pub primary_down: bool,
    /// Any button went up this frame.
    pub released: bool,
    pub touches: Vec<Touch>,
}

impl PointerFrame {
    pub fn poll() -> Self {
        let (x, y) = mouse_position();
        Self {
            mouse: vec2(x, y),
            pressed: MOUSE_BUTTONS
                .iter()
                .filter(|(button, _)| is_mouse_button_pressed(*button))
                .map(|(_, kind)| *kind)
                .collect(),
            primary_down: is_mouse_button_down(MouseButton::Left),
            released: MOUSE_BUTTONS
                .iter()
                .any(|(button, _)| is_mouse_button_released(*button)),
            touches: touches(),
        }
    }
}

/// Turns per-frame pointer state into pad-relative events.
#[derive(Default)]
pub struct PointerTracker {
    last_mouse: Option<Vec2>,
    touch: Option<u64>,
}

impl PointerTracker {
    pub fn collect(&mut self, pad: Rect, frame: PointerFrame) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let origin = pad.point();
        let mouse = frame.mouse;

        if pad.contains(mouse) {
            for button in frame.pressed {
                events.push(InputEvent::PointerDown {
                    button,
                    position: mouse - origin,
                });
            }
        }
        let moved = self.last_mouse.is_some_and(|last| last != mouse);
        if moved && pad.contains(mouse) {
            events.push(InputEvent::PointerMove {
                primary_held: frame.primary_down,
                position: mouse - origin,
            });
        }
        self.last_mouse = Some(mouse);
        if frame.released {
            events.push(InputEvent::PointerUp);
        }

        for touch in frame.touches {
            let position = touch.position - origin;
            let tracked = self.touch == Some(touch.id);
            match touch.phase {
                TouchPhase::Started => {
                    if self.touch.is_none() && pad.contains(touch.position) {
                        self.touch = Some(touch.id);
                        events.push(InputEvent::TouchStart { position });
                    }
                }
                TouchPhase::Moved if tracked => events.push(InputEvent::TouchMove { position }),
                TouchPhase::Ended if tracked => {
                    self.touch = None;
                    events.push(InputEvent::TouchEnd);
                }
                TouchPhase::Cancelled if tracked => {
                    self.touch = None;
                    events.push(InputEvent::TouchCancel);
                }
                _ => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: Rect = Rect {
        x: 50.0,
        y: 40.0,
        w: 900.0,
        h: 300.0,
    };

    fn mouse_at(x: f32, y: f32) -> PointerFrame {
        PointerFrame {
            mouse: vec2(x, y),
            ..Default::default()
        }
    }

    fn touch(id: u64, phase: TouchPhase, x: f32, y: f32) -> Touch {
        Touch {
            id,
            phase,
            position: vec2(x, y),
        }
    }

    fn touching(touches: Vec<Touch>) -> PointerFrame {
        PointerFrame {
            mouse: vec2(0.0, 0.0),
            touches,
            ..Default::default()
        }
    }

    #[test]
    fn press_over_the_pad_is_pad_relative() {
        let mut tracker = PointerTracker::default();
        let frame = PointerFrame {
            pressed: vec![PointerButton::Primary],
            primary_down: true,
            ..mouse_at(150.0, 90.0)
        };
        assert_eq!(
            tracker.collect(PAD, frame),
            vec![InputEvent::PointerDown {
                button: PointerButton::Primary,
                position: vec2(100.0, 50.0),
            }]
        );
    }

    #[test]
    fn press_outside_the_pad_does_not_start() {
        let mut tracker = PointerTracker::default();
        let frame = PointerFrame {
            pressed: vec![PointerButton::Primary],
            primary_down: true,
            ..mouse_at(10.0, 10.0)
        };
        assert!(tracker.collect(PAD, frame).is_empty());
    }

    #[test]
    fn release_anywhere_stops_the_tone() {
        let mut tracker = PointerTracker::default();
        tracker.collect(PAD, mouse_at(10.0, 10.0));
        let frame = PointerFrame {
            released: true,
            ..mouse_at(10.0, 10.0)
        };
        assert_eq!(tracker.collect(PAD, frame), vec![InputEvent::PointerUp]);
    }

    #[test]
    fn mouse_moves_are_dispatched_only_over_the_pad() {
        let mut tracker = PointerTracker::default();
        assert!(tracker.collect(PAD, mouse_at(100.0, 100.0)).is_empty());

        let held = PointerFrame {
            primary_down: true,
            ..mouse_at(200.0, 100.0)
        };
        assert_eq!(
            tracker.collect(PAD, held),
            vec![InputEvent::PointerMove {
                primary_held: true,
                position: vec2(150.0, 60.0),
            }]
        );

        let outside = PointerFrame {
            primary_down: true,
            ..mouse_at(10.0, 100.0)
        };
        assert!(tracker.collect(PAD, outside).is_empty());
        assert!(tracker.collect(PAD, mouse_at(10.0, 100.0)).is_empty());
    }

    #[test]
    fn only_the_first_touch_on_the_pad_is_tracked() {
        let mut tracker = PointerTracker::default();
        let events = tracker.collect(
            PAD,
            touching(vec![
                touch(1, TouchPhase::Started, 150.0, 140.0),
                touch(2, TouchPhase::Started, 500.0, 140.0),
            ]),
        );
        assert_eq!(
            events,
            vec![InputEvent::TouchStart {
                position: vec2(100.0, 100.0)
            }]
        );

        let events = tracker.collect(
            PAD,
            touching(vec![
                touch(2, TouchPhase::Moved, 600.0, 140.0),
                touch(2, TouchPhase::Ended, 600.0, 140.0),
            ]),
        );
        assert!(events.is_empty());

        let events = tracker.collect(PAD, touching(vec![touch(1, TouchPhase::Ended, 150.0, 140.0)]));
        assert_eq!(events, vec![InputEvent::TouchEnd]);
    }

    #[test]
    fn touch_starting_off_the_pad_is_ignored() {
        let mut tracker = PointerTracker::default();
        let events = tracker.collect(PAD, touching(vec![touch(3, TouchPhase::Started, 5.0, 5.0)]));
        assert!(events.is_empty());
        let events = tracker.collect(PAD, touching(vec![touch(3, TouchPhase::Moved, 150.0, 140.0)]));
        assert!(events.is_empty());

        let events = tracker.collect(
            PAD,
            touching(vec![touch(4, TouchPhase::Started, 150.0, 140.0)]),
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn tracked_touch_moves_off_the_pad_are_dispatched() {
        let mut tracker = PointerTracker::default();
        tracker.collect(PAD, touching(vec![touch(7, TouchPhase::Started, 150.0, 140.0)]));
        let events = tracker.collect(PAD, touching(vec![touch(7, TouchPhase::Moved, 1_000.0, 20.0)]));
        assert_eq!(
            events,
            vec![InputEvent::TouchMove {
                position: vec2(950.0, -20.0)
            }]
        );

        let events = tracker.collect(
            PAD,
            touching(vec![touch(7, TouchPhase::Cancelled, 1_000.0, 20.0)]),
        );
        assert_eq!(events, vec![InputEvent::TouchCancel]);
    }
}
