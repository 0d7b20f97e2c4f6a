use macroquad::prelude::*;

use crate::mapping::{PadGeometry, ToneParameters};

pub const AMBER: Color = Color {
    r: 0.98,
    g: 0.66,
    b: 0.12,
    a: 1.0,
};
pub const AMBER_DIM: Color = Color {
    r: 0.78,
    g: 0.52,
    b: 0.08,
    a: 0.4,
};
pub const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
const PAD_FILL: Color = Color {
    r: 0.05,
    g: 0.03,
    b: 0.02,
    a: 1.0,
};
const ERROR_RED: Color = Color {
    r: 0.95,
    g: 0.25,
    b: 0.2,
    a: 1.0,
};

const MARGIN: f32 = 36.0;
const HEADER_HEIGHT: f32 = 40.0;
const FOOTER_HEIGHT: f32 = 84.0;
const STATUS_FONT_SIZE: f32 = 24.0;
const NOTICE_FONT_SIZE: f32 = 18.0;

pub const IDLE_PROMPT: &str = "Touch or click and drag";

#[derive(Clone, Debug, PartialEq)]
pub enum MidiNotice {
    Error(String),
    Devices(Vec<String>),
}

impl MidiNotice {
    pub fn text(&self) -> String {
        match self {
            MidiNotice::Error(message) => format!("MIDI error: {message}"),
            MidiNotice::Devices(names) => format!(
                "MIDI: {} | CC1 pitch, CC2 volume",
                names.join(", ")
            ),
        }
    }
}

/// What the pad shows: crosshair, status line and MIDI notice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PadView {
    crosshair: Option<Vec2>,
    tone: Option<ToneParameters>,
    audio_error: Option<String>,
    midi_notice: Option<MidiNotice>,
}

impl PadView {
    pub fn crosshair(&self) -> Option<Vec2> {
        self.crosshair
    }

    pub fn midi_notice(&self) -> Option<&MidiNotice> {
        self.midi_notice.as_ref()
    }

    pub fn show_tone(&mut self, params: ToneParameters, crosshair: Vec2) {
        self.tone = Some(params);
        self.crosshair = Some(crosshair);
    }

    pub fn show_idle(&mut self) {
        self.tone = None;
        self.crosshair = None;
    }

    pub fn show_audio_error(&mut self, message: String) {
        self.audio_error = Some(message);
    }

    pub fn set_midi_notice(&mut self, notice: Option<MidiNotice>) {
        self.midi_notice = notice;
    }

    pub fn status_text(&self) -> String {
        match self.tone {
            Some(params) => format!(
                "Freq: {:.1} Hz | Volume: {:.2}",
                params.frequency, params.volume
            ),
            None => IDLE_PROMPT.to_string(),
        }
    }

    pub fn draw(&self, rect: Rect) {
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, PAD_FILL);
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, AMBER);
        draw_axis_labels(rect);

        if let Some(point) = self.crosshair() {
            let x = rect.x + point.x.clamp(0.0, rect.w);
            let y = rect.y + point.y.clamp(0.0, rect.h);
            draw_line(rect.x, y, rect.x + rect.w, y, 1.0, AMBER);
            draw_line(x, rect.y, x, rect.y + rect.h, 1.0, AMBER);
            draw_circle_lines(x, y, 8.0, 1.0, AMBER);
        }

        let status_y = rect.y + rect.h + 32.0;
        draw_text(&self.status_text(), rect.x, status_y, STATUS_FONT_SIZE, AMBER);

        let mut notice_y = status_y + 24.0;
        if let Some(message) = &self.audio_error {
            draw_text(
                &format!("Audio error: {message}"),
                rect.x,
                notice_y,
                NOTICE_FONT_SIZE,
                ERROR_RED,
            );
            notice_y += 22.0;
        }
        if let Some(notice) = self.midi_notice() {
            let color = match notice {
                MidiNotice::Error(_) => ERROR_RED,
                MidiNotice::Devices(_) => AMBER_DIM,
            };
            draw_text(&notice.text(), rect.x, notice_y, NOTICE_FONT_SIZE, color);
        }
    }
}

/// Pad rectangle for the current screen size.
pub fn pad_rect(screen_width: f32, screen_height: f32) -> Rect {
    Rect::new(
        MARGIN,
        HEADER_HEIGHT,
        (screen_width - MARGIN * 2.0).max(1.0),
        (screen_height - HEADER_HEIGHT - FOOTER_HEIGHT).max(1.0),
    )
}

pub fn geometry_of(rect: Rect) -> PadGeometry {
    PadGeometry::new(rect.w, rect.h)
}

pub fn draw_header(title: &str) {
    draw_text(title, MARGIN, HEADER_HEIGHT - 12.0, 24.0, AMBER);
    let version = format!("Version: {}", env!("CARGO_PKG_VERSION"));
    let measure = measure_text(&version, None, 16, 1.0);
    draw_text(
        &version,
        screen_width() - MARGIN - measure.width,
        screen_height() - 10.0,
        16.0,
        AMBER_DIM,
    );
    draw_text(
        "Esc quit",
        MARGIN,
        screen_height() - 10.0,
        16.0,
        AMBER_DIM,
    );
}

fn draw_axis_labels(rect: Rect) {
    draw_text("PITCH >", rect.x + rect.w - 70.0, rect.y + rect.h - 8.0, 16.0, AMBER_DIM);
    draw_text("VOLUME ^", rect.x + 8.0, rect.y + 18.0, 16.0, AMBER_DIM);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_tone_and_idle() {
        let mut view = PadView::default();
        assert_eq!(view.status_text(), IDLE_PROMPT);

        view.show_tone(ToneParameters::new(1_049.96, 0.996), vec2(10.0, 20.0));
        assert_eq!(view.status_text(), "Freq: 1050.0 Hz | Volume: 1.00");
        assert_eq!(view.crosshair(), Some(vec2(10.0, 20.0)));

        view.show_idle();
        assert_eq!(view.status_text(), IDLE_PROMPT);
        assert_eq!(view.crosshair(), None);
    }

    #[test]
    fn device_notice_lists_names() {
        let notice = MidiNotice::Devices(vec!["Knobs".into(), "Pads".into()]);
        assert_eq!(notice.text(), "MIDI: Knobs, Pads | CC1 pitch, CC2 volume");
    }

    #[test]
    fn pad_fills_the_window_inside_margins() {
        let rect = pad_rect(800.0, 600.0);
        assert_eq!(rect.x, MARGIN);
        assert_eq!(rect.w, 800.0 - 2.0 * MARGIN);
        assert_eq!(geometry_of(rect), PadGeometry::new(rect.w, rect.h));
        assert!(pad_rect(10.0, 10.0).w >= 1.0);
    }
}
