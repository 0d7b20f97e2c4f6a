use std::sync::{MutexGuard, PoisonError};

use anyhow::{Result, anyhow};
use cpal::{
    SampleFormat, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::engine::AudioContext;
use crate::graph::{GainId, OscillatorId, SharedGraph, ToneGraph};

/// Keeps the cpal stream that renders the shared graph alive.
pub struct AudioOutput {
    _stream: Stream,
}

impl AudioOutput {
    pub fn start(graph: SharedGraph) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0 as f32;
        graph.lock().map_err(poisoned)?.set_sample_rate(sample_rate);
        log::info!(
            "audio output on {} at {} Hz, {} channel(s), {:?}",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            config.sample_rate.0,
            config.channels,
            supported.sample_format()
        );
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream_f32(&device, &config, graph)?,
            SampleFormat::I16 => build_stream_i16(&device, &config, graph)?,
            SampleFormat::U16 => build_stream_u16(&device, &config, graph)?,
            _ => build_stream_f32(&device, &config, graph)?,
        };
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

/// Audio context backed by the default output device.
pub struct DeviceContext {
    graph: SharedGraph,
    _output: AudioOutput,
}

impl DeviceContext {
    pub fn open() -> Result<Self> {
        let graph = ToneGraph::shared(44_100.0);
        let output = AudioOutput::start(graph.clone())?;
        Ok(Self {
            graph,
            _output: output,
        })
    }

    fn graph(&self) -> Result<MutexGuard<'_, ToneGraph>> {
        self.graph.lock().map_err(poisoned)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> anyhow::Error {
    anyhow!("audio graph lock poisoned")
}

impl AudioContext for DeviceContext {
    fn current_time(&self) -> Result<f64> {
        self.graph()?.current_time()
    }

    fn create_oscillator(&mut self) -> Result<OscillatorId> {
        self.graph()?.create_oscillator()
    }

    fn create_gain(&mut self) -> Result<GainId> {
        self.graph()?.create_gain()
    }

    fn connect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()> {
        self.graph()?.connect(oscillator, gain)
    }

    fn start(&mut self, oscillator: OscillatorId) -> Result<()> {
        self.graph()?.start(oscillator)
    }

    fn stop(&mut self, oscillator: OscillatorId) -> Result<()> {
        self.graph()?.stop(oscillator)
    }

    fn disconnect(&mut self, oscillator: OscillatorId, gain: GainId) -> Result<()> {
        self.graph()?.disconnect(oscillator, gain)
    }

    fn release_oscillator(&mut self, oscillator: OscillatorId) -> Result<()> {
        self.graph()?.release_oscillator(oscillator)
    }

    fn set_frequency_at(&mut self, oscillator: OscillatorId, hz: f32, time: f64) -> Result<()> {
        self.graph()?.set_frequency_at(oscillator, hz, time)
    }

    fn set_gain_at(&mut self, gain: GainId, level: f32, time: f64) -> Result<()> {
        self.graph()?.set_gain_at(gain, level, time)
    }
}

fn build_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
) -> Result<Stream> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [f32], _| {
            fill_output_buffer(output, channels, &graph, |sample| sample);
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_stream_i16(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
) -> Result<Stream> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [i16], _| {
            fill_output_buffer(output, channels, &graph, |sample| {
                (sample * i16::MAX as f32) as i16
            });
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn build_stream_u16(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
) -> Result<Stream> {
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [u16], _| {
            fill_output_buffer(output, channels, &graph, |sample| {
                let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
                (scaled * u16::MAX as f32) as u16
            });
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

/// Renders the graph into an interleaved buffer, writing silence if the graph
/// lock is poisoned.
fn fill_output_buffer<T, F>(output: &mut [T], channels: usize, graph: &SharedGraph, mut convert: F)
where
    F: FnMut(f32) -> T,
    T: Copy,
{
    let Ok(mut graph) = graph.lock() else {
        output.fill(convert(0.0));
        return;
    };
    for frame in output.chunks_mut(channels.max(1)) {
        let sample = graph.next_sample().clamp(-0.98, 0.98);
        frame.fill(convert(sample));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn playing_graph() -> SharedGraph {
        let graph = ToneGraph::shared(48_000.0);
        {
            let mut graph = graph.lock().unwrap();
            let osc = graph.create_oscillator().unwrap();
            let gain = graph.create_gain().unwrap();
            graph.connect(osc, gain).unwrap();
            graph.set_frequency_at(osc, 1_000.0, 0.0).unwrap();
            graph.set_gain_at(gain, 1.0, 0.0).unwrap();
            graph.start(osc).unwrap();
        }
        graph
    }

    #[test]
    fn every_channel_of_a_frame_gets_the_same_sample() {
        let graph = playing_graph();
        let mut output = vec![0.0f32; 64];
        fill_output_buffer(&mut output, 2, &graph, |sample| sample);
        assert!(output.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(output.iter().any(|sample| sample.abs() > 0.1));
        assert!(output.iter().all(|sample| sample.abs() <= 0.98));
    }

    #[test]
    fn poisoned_graph_renders_silence() {
        let graph = playing_graph();
        let holder = graph.clone();
        let _ = thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("render thread died");
        })
        .join();
        assert!(graph.is_poisoned());

        let mut output = vec![7i16; 16];
        fill_output_buffer(&mut output, 2, &graph, |sample| {
            (sample * i16::MAX as f32) as i16
        });
        assert!(output.iter().all(|sample| *sample == 0));
    }
}
