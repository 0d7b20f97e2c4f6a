use macroquad::prelude::Vec2;

use crate::engine::{AudioContext, SoundEngine};
use crate::mapping::{PadGeometry, ToneParameters};
use crate::midi::{ControllerState, MidiAccess, MidiInputEvent, PortState};
use crate::pad::{MidiNotice, PadView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pad-relative input, one variant per start/move/end of each source.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown { button: PointerButton, position: Vec2 },
    PointerMove { primary_held: bool, position: Vec2 },
    /// A release anywhere in the window, not only over the pad.
    PointerUp,
    TouchStart { position: Vec2 },
    TouchMove { position: Vec2 },
    TouchEnd,
    TouchCancel,
    Midi(MidiInputEvent),
}

/// Everything that outlives a single input event.
pub struct SoundEngineState<C> {
    pub engine: SoundEngine<C>,
    pub controller: ControllerState,
}

pub struct InputDispatch<C> {
    state: SoundEngineState<C>,
    view: PadView,
}

impl<C: AudioContext> InputDispatch<C> {
    pub fn new(engine: SoundEngine<C>) -> Self {
        Self {
            state: SoundEngineState {
                engine,
                controller: ControllerState::default(),
            },
            view: PadView::default(),
        }
    }

    pub fn view(&self) -> &PadView {
        &self.view
    }

    #[cfg(test)]
    pub fn state(&self) -> &SoundEngineState<C> {
        &self.state
    }

    pub fn handle(&mut self, event: InputEvent, geometry: PadGeometry) {
        match event {
            InputEvent::PointerDown { button, position } => {
                if button == PointerButton::Primary {
                    self.begin(ToneParameters::from_position(position, geometry), position);
                }
            }
            InputEvent::PointerMove {
                primary_held,
                position,
            } => {
                if primary_held {
                    self.retune(ToneParameters::from_position(position, geometry), position);
                }
            }
            InputEvent::TouchStart { position } => {
                self.begin(ToneParameters::from_position(position, geometry), position);
            }
            InputEvent::TouchMove { position } => {
                self.retune(ToneParameters::from_position(position, geometry), position);
            }
            InputEvent::PointerUp | InputEvent::TouchEnd | InputEvent::TouchCancel => {
                self.end();
            }
            InputEvent::Midi(message) => {
                let Some(params) = self.state.controller.apply(&message) else {
                    return;
                };
                log::trace!(
                    "cc{} = {} from {} at {:.1} ms",
                    message.data1,
                    message.data2,
                    message.device_name,
                    message.timestamp_ms
                );
                let position = params.position(geometry);
                self.begin(params, position);
            }
        }
    }

    /// Shows the outcome of the MIDI access request.
    pub fn on_midi_access(&mut self, access: MidiAccess) {
        let notice = match access {
            Err(err) => {
                log::warn!("MIDI unavailable: {err}");
                Some(MidiNotice::Error(err.message))
            }
            Ok(ports) => {
                let names: Vec<String> = ports
                    .into_iter()
                    .filter(|port| port.state == PortState::Connected)
                    .inspect(|port| log::info!("MIDI input {} ({})", port.name, port.id))
                    .map(|port| port.name)
                    .collect();
                if names.is_empty() {
                    None
                } else {
                    Some(MidiNotice::Devices(names))
                }
            }
        };
        self.view.set_midi_notice(notice);
    }

    /// Starts a tone, or retunes the one already sounding.
    fn begin(&mut self, params: ToneParameters, crosshair: Vec2) {
        if self.state.engine.is_playing() {
            self.retune(params, crosshair);
            return;
        }
        match self.state.engine.start(params) {
            Ok(_) => self.view.show_tone(params, crosshair),
            Err(err) => self.view.show_audio_error(format!("{err:#}")),
        }
    }

    fn retune(&mut self, params: ToneParameters, crosshair: Vec2) {
        match self.state.engine.update(params) {
            Ok(true) => self.view.show_tone(params, crosshair),
            Ok(false) => {}
            Err(err) => log::warn!("tone update failed: {err:#}"),
        }
    }

    fn end(&mut self) {
        match self.state.engine.stop() {
            Ok(true) => self.view.show_idle(),
            Ok(false) => {}
            Err(err) => {
                log::warn!("tone release failed: {err:#}");
                self.view.show_idle();
            }
        }
    }
}
