use clap::Parser;
use macroquad::prelude::Conf;

pub const WINDOW_TITLE: &str = "Theremin Pad";

#[derive(Parser, Debug, Clone)]
#[command(name = "theremin-pad", version)]
#[command(about = "A touch and mouse theremin with optional MIDI controller input")]
pub struct Settings {
    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: i32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: i32,

    /// Do not request MIDI access
    #[arg(long)]
    pub no_midi: bool,

    /// Client name announced to the MIDI backend
    #[arg(long, default_value = "theremin-pad")]
    pub midi_client: String,
}

impl Settings {
    pub fn window_conf(&self) -> Conf {
        Conf {
            window_title: WINDOW_TITLE.into(),
            fullscreen: false,
            sample_count: 1,
            window_width: self.width.max(320),
            window_height: self.height.max(240),
            window_resizable: true,
            high_dpi: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_800_by_600_window() {
        let settings = Settings::parse_from(["theremin-pad"]);
        assert_eq!((settings.width, settings.height), (800, 600));
        assert!(!settings.no_midi);
        assert_eq!(settings.midi_client, "theremin-pad");
    }

    #[test]
    fn flags_override_defaults() {
        let settings = Settings::parse_from([
            "theremin-pad",
            "--width",
            "1024",
            "--no-midi",
            "--midi-client",
            "lab",
        ]);
        assert_eq!(settings.width, 1024);
        assert!(settings.no_midi);
        assert_eq!(settings.midi_client, "lab");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Settings::try_parse_from(["theremin-pad", "--scope"]).is_err());
    }

    #[test]
    fn window_conf_enforces_a_minimum_size() {
        let settings = Settings::parse_from(["theremin-pad", "--width", "10", "--height", "10"]);
        let conf = settings.window_conf();
        assert_eq!((conf.window_width, conf.window_height), (320, 240));
        assert_eq!(conf.window_title, WINDOW_TITLE);
    }
}
