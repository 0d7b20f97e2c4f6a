use macroquad::prelude::Vec2;

pub const MIN_FREQ: f32 = 100.0;
pub const MAX_FREQ: f32 = 2_000.0;

/// Size of the interactive pad at the time of an event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PadGeometry {
    pub width: f32,
    pub height: f32,
}

impl PadGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneParameters {
    pub frequency: f32,
    pub volume: f32,
}

impl ToneParameters {
    pub fn new(frequency: f32, volume: f32) -> Self {
        Self { frequency, volume }
    }

    /// Pitch from the horizontal position, volume from the vertical one.
    pub fn from_position(position: Vec2, geometry: PadGeometry) -> Self {
        Self {
            frequency: frequency_from_x(position.x, geometry.width),
            volume: volume_from_y(position.y, geometry.height),
        }
    }

    /// Where the crosshair goes for these parameters.
    pub fn position(&self, geometry: PadGeometry) -> Vec2 {
        Vec2::new(
            x_from_frequency(self.frequency, geometry.width),
            y_from_volume(self.volume, geometry.height),
        )
    }
}

/// Not clamped: a drag that leaves the pad may go past either end.
pub fn frequency_from_x(x: f32, width: f32) -> f32 {
    let percent = x / width;
    MIN_FREQ + percent * (MAX_FREQ - MIN_FREQ)
}

pub fn volume_from_y(y: f32, height: f32) -> f32 {
    (1.0 - y / height).clamp(0.0, 1.0)
}

pub fn x_from_frequency(frequency: f32, width: f32) -> f32 {
    (frequency - MIN_FREQ) / (MAX_FREQ - MIN_FREQ) * width
}

pub fn y_from_volume(volume: f32, height: f32) -> f32 {
    (1.0 - volume) * height
}

/// Linear remap of `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
/// The input bounds must differ.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    debug_assert!(in_min != in_max, "map_range needs distinct input bounds");
    let ratio = (value - in_min) / (in_max - in_min);
    out_min + ratio * (out_max - out_min)
}
