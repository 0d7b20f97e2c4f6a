use anyhow::{Result, anyhow};

use crate::graph::{GainId, OscillatorId};
use crate::mapping::ToneParameters;

/// The operations the sound engine needs from an audio backend.
///
/// Parameter setters are time-stamped on the backend's audio clock. The engine
/// only ever schedules changes at [`AudioContext::current_time`].
pub trait AudioContext {
    fn current_time(&self) -> Result<f64>;
    fn create_oscillator(&mut self) -> Result<OscillatorId>;
    fn create_gain(&mut self) -> Result<GainId>;
    /// Routes `oscillator -> gain -> destination`.
    fn connect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()>;
    fn start(&mut self, oscillator: OscillatorId) -> Result<()>;
    fn stop(&mut self, oscillator: OscillatorId) -> Result<()>;
    /// Detaches both nodes from the graph and releases them.
    fn disconnect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()>;
    /// Releases an oscillator that never got a gain stage.
    fn release_oscillator(&mut self, oscillator: OscillatorId) -> Result<()>;
    fn set_frequency_at(&mut self, oscillator: OscillatorId, hz: f32, time: f64) -> Result<()>;
    fn set_gain_at(&mut self, gain: GainId, level: f32, time: f64) -> Result<()>;
}

pub type ContextOpener<C> = Box<dyn FnMut() -> Result<C>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveTone {
    oscillator: OscillatorId,
    gain: GainId,
    params: ToneParameters,
}

#[cfg(test)]
impl ActiveTone {
    pub fn oscillator(&self) -> OscillatorId {
        self.oscillator
    }

    pub fn params(&self) -> ToneParameters {
        self.params
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyPlaying,
}

enum ContextSlot<C> {
    Unopened,
    Open(C),
    Failed(String),
}

/// Drives at most one sine tone through a lazily opened audio context.
pub struct SoundEngine<C> {
    open_context: ContextOpener<C>,
    context: ContextSlot<C>,
    active: Option<ActiveTone>,
}

impl<C: AudioContext> SoundEngine<C> {
    pub fn new(open_context: ContextOpener<C>) -> Self {
        Self {
            open_context,
            context: ContextSlot::Unopened,
            active: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    #[cfg(test)]
    pub fn active_tone(&self) -> Option<&ActiveTone> {
        self.active.as_ref()
    }

    #[cfg(test)]
    pub fn context(&self) -> Option<&C> {
        match &self.context {
            ContextSlot::Open(context) => Some(context),
            _ => None,
        }
    }

    pub fn start(&mut self, params: ToneParameters) -> Result<StartOutcome> {
        if self.active.is_some() {
            log::warn!("start ignored, a tone is already playing");
            return Ok(StartOutcome::AlreadyPlaying);
        }
        let context = self.ensure_context()?;
        let oscillator = context.create_oscillator()?;
        let gain = match context.create_gain() {
            Ok(gain) => gain,
            Err(err) => {
                if let Err(release) = context.release_oscillator(oscillator) {
                    log::warn!("could not release oscillator: {release:#}");
                }
                return Err(err);
            }
        };
        if let Err(err) = wire_tone(context, oscillator, gain, params) {
            if let Err(release) = context.disconnect(oscillator, gain) {
                log::warn!("could not release tone nodes: {release:#}");
            }
            return Err(err);
        }
        self.active = Some(ActiveTone {
            oscillator,
            gain,
            params,
        });
        log::debug!(
            "tone started at {:.1} Hz, volume {:.2}",
            params.frequency,
            params.volume
        );
        Ok(StartOutcome::Started)
    }

    /// Retunes the playing tone. Returns `false` when idle.
    pub fn update(&mut self, params: ToneParameters) -> Result<bool> {
        let Some(tone) = self.active.as_mut() else {
            return Ok(false);
        };
        let ContextSlot::Open(context) = &mut self.context else {
            return Ok(false);
        };
        let now = context.current_time()?;
        context.set_frequency_at(tone.oscillator, params.frequency, now)?;
        context.set_gain_at(tone.gain, params.volume, now)?;
        tone.params = params;
        Ok(true)
    }

    /// Releases the playing tone. Returns `false` when idle.
    pub fn stop(&mut self) -> Result<bool> {
        let Some(tone) = self.active.take() else {
            return Ok(false);
        };
        let ContextSlot::Open(context) = &mut self.context else {
            return Ok(true);
        };
        let stopped = context.stop(tone.oscillator);
        let released = context.disconnect(tone.oscillator, tone.gain);
        stopped?;
        released?;
        log::debug!("tone stopped");
        Ok(true)
    }

    fn ensure_context(&mut self) -> Result<&mut C> {
        if let ContextSlot::Unopened = self.context {
            self.context = match (self.open_context)() {
                Ok(context) => {
                    log::info!("audio context opened");
                    ContextSlot::Open(context)
                }
                Err(err) => {
                    log::error!("audio context unavailable: {err:#}");
                    ContextSlot::Failed(format!("{err:#}"))
                }
            };
        }
        match &mut self.context {
            ContextSlot::Open(context) => Ok(context),
            ContextSlot::Failed(message) => Err(anyhow!("audio unavailable: {message}")),
            ContextSlot::Unopened => Err(anyhow!("audio context not opened")),
        }
    }
}

fn wire_tone<C: AudioContext>(
    context: &mut C,
    oscillator: OscillatorId,
    gain: GainId,
    params: ToneParameters,
) -> Result<()> {
    let now = context.current_time()?;
    context.set_frequency_at(oscillator, params.frequency, now)?;
    context.set_gain_at(gain, params.volume, now)?;
    context.connect(oscillator, gain)?;
    context.start(oscillator)
}
