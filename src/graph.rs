use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};

use crate::engine::AudioContext;

pub type SharedGraph = Arc<Mutex<ToneGraph>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OscillatorId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GainId(u32);

/// A parameter driven by set-value-at-time events on the audio clock.
#[derive(Debug)]
struct AudioParam {
    value: f32,
    events: Vec<(f64, f32)>,
}

impl AudioParam {
    fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.events.retain(|(at, _)| *at != time);
        self.events.push((time, value));
        self.events.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    fn advance(&mut self, now: f64) -> f32 {
        let due = self.events.iter().take_while(|(at, _)| *at <= now).count();
        if let Some((_, value)) = self.events.drain(..due).last() {
            self.value = value;
        }
        self.value
    }
}

#[derive(Debug)]
struct OscillatorNode {
    frequency: AudioParam,
    phase: f32,
    started: bool,
    stopped: bool,
    output: Option<GainId>,
}

#[derive(Debug)]
struct GainNode {
    level: AudioParam,
    to_destination: bool,
}

/// Sine oscillators routed through gain stages into a single mono destination.
pub struct ToneGraph {
    sample_rate: f32,
    frame: u64,
    next_id: u32,
    oscillators: HashMap<OscillatorId, OscillatorNode>,
    gains: HashMap<GainId, GainNode>,
}

impl ToneGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            frame: 0,
            next_id: 0,
            oscillators: HashMap::new(),
            gains: HashMap::new(),
        }
    }

    pub fn shared(sample_rate: f32) -> SharedGraph {
        Arc::new(Mutex::new(Self::new(sample_rate)))
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
    }

    /// Oscillators that are started and reach the destination.
    #[cfg(test)]
    pub fn audible_voices(&self) -> usize {
        self.oscillators
            .values()
            .filter(|node| node.started && !node.stopped)
            .filter(|node| {
                node.output
                    .and_then(|id| self.gains.get(&id))
                    .is_some_and(|gain| gain.to_destination)
            })
            .count()
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.oscillators.len() + self.gains.len()
    }

    pub fn next_sample(&mut self) -> f32 {
        let now = self.clock();
        for gain in self.gains.values_mut() {
            gain.level.advance(now);
        }
        let mut mixed = 0.0;
        for node in self.oscillators.values_mut() {
            let frequency = node.frequency.advance(now);
            if !node.started || node.stopped {
                continue;
            }
            let Some(gain) = node.output.and_then(|id| self.gains.get(&id)) else {
                continue;
            };
            let phase_delta = frequency / self.sample_rate;
            node.phase = (node.phase + phase_delta).rem_euclid(1.0);
            if gain.to_destination {
                mixed += (node.phase * std::f32::consts::TAU).sin() * gain.level.value;
            }
        }
        self.frame += 1;
        mixed
    }

    fn clock(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn oscillator_mut(&mut self, id: OscillatorId) -> Result<&mut OscillatorNode> {
        self.oscillators
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown oscillator {id:?}"))
    }

    fn gain_mut(&mut self, id: GainId) -> Result<&mut GainNode> {
        self.gains
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown gain stage {id:?}"))
    }
}

impl AudioContext for ToneGraph {
    fn current_time(&self) -> Result<f64> {
        Ok(self.clock())
    }

    fn create_oscillator(&mut self) -> Result<OscillatorId> {
        let id = OscillatorId(self.allocate_id());
        self.oscillators.insert(
            id,
            OscillatorNode {
                frequency: AudioParam::new(440.0),
                phase: 0.0,
                started: false,
                stopped: false,
                output: None,
            },
        );
        Ok(id)
    }

    fn create_gain(&mut self) -> Result<GainId> {
        let id = GainId(self.allocate_id());
        self.gains.insert(
            id,
            GainNode {
                level: AudioParam::new(1.0),
                to_destination: false,
            },
        );
        Ok(id)
    }

    fn connect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()> {
        self.gain_mut(gain)?.to_destination = true;
        self.oscillator_mut(oscillator)?.output = Some(gain);
        Ok(())
    }

    fn start(&mut self, oscillator: OscillatorId) -> Result<()> {
        let node = self.oscillator_mut(oscillator)?;
        if node.started {
            bail!("oscillator {oscillator:?} already started");
        }
        node.started = true;
        Ok(())
    }

    fn stop(&mut self, oscillator: OscillatorId) -> Result<()> {
        self.oscillator_mut(oscillator)?.stopped = true;
        Ok(())
    }

    fn disconnect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()> {
        let removed_oscillator = self.oscillators.remove(&oscillator);
        let removed_gain = self.gains.remove(&gain);
        if removed_oscillator.is_none() || removed_gain.is_none() {
            bail!("disconnecting unknown nodes {oscillator:?} / {gain:?}");
        }
        Ok(())
    }

    fn release_oscillator(&mut self, oscillator: OscillatorId) -> Result<()> {
        self.oscillators
            .remove(&oscillator)
            .map(|_| ())
            .ok_or_else(|| anyhow!("releasing unknown oscillator {oscillator:?}"))
    }

    fn set_frequency_at(&mut self, oscillator: OscillatorId, hz: f32, time: f64) -> Result<()> {
        self.oscillator_mut(oscillator)?
            .frequency
            .set_value_at_time(hz, time);
        Ok(())
    }

    fn set_gain_at(&mut self, gain: GainId, level: f32, time: f64) -> Result<()> {
        self.gain_mut(gain)?.level.set_value_at_time(level, time);
        Ok(())
    }
}
