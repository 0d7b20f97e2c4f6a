use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use midir::{MidiInput, MidiInputConnection};
use tokio::runtime::Runtime;

use crate::mapping::{MAX_FREQ, MIN_FREQ, ToneParameters, map_range};

const STATUS_MASK: u8 = 0xF0;
const CONTROL_CHANGE: u8 = 0xB0;
const DATA_MAX: f32 = 127.0;

pub const FREQUENCY_CONTROLLER: u8 = 1;
pub const VOLUME_CONTROLLER: u8 = 2;

pub const DEFAULT_FREQUENCY: f32 = 440.0;
pub const DEFAULT_VOLUME: f32 = 0.5;

/// One raw message from an input port.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiInputEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub timestamp_ms: f64,
    pub device_name: String,
}

impl MidiInputEvent {
    /// Missing data bytes read as zero. Returns `None` for an empty message.
    pub fn from_raw(bytes: &[u8], timestamp_us: u64, device_name: &str) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        Some(Self {
            status,
            data1: data.first().copied().unwrap_or(0),
            data2: data.get(1).copied().unwrap_or(0),
            timestamp_ms: timestamp_us as f64 / 1_000.0,
            device_name: device_name.to_string(),
        })
    }

    /// Control change on any channel.
    pub fn is_control_change(&self) -> bool {
        self.status & STATUS_MASK == CONTROL_CHANGE
    }
}

/// Last value seen on each axis. Controllers send one axis per message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerState {
    pub frequency: f32,
    pub volume: f32,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl ControllerState {
    /// Folds a message into the remembered axes and returns the combined tone,
    /// or `None` when the message does not drive the theremin.
    pub fn apply(&mut self, event: &MidiInputEvent) -> Option<ToneParameters> {
        if !event.is_control_change() {
            return None;
        }
        let value = event.data2 as f32;
        match event.data1 {
            FREQUENCY_CONTROLLER => {
                self.frequency = map_range(value, 0.0, DATA_MAX, MIN_FREQ, MAX_FREQ);
            }
            VOLUME_CONTROLLER => {
                self.volume = map_range(value, 0.0, DATA_MAX, 0.0, 1.0);
            }
            _ => return None,
        }
        Some(self.params())
    }

    pub fn params(&self) -> ToneParameters {
        ToneParameters::new(self.frequency, self.volume)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortState {
    Connected,
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub id: String,
    pub name: String,
    pub state: PortState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiAccessError {
    pub message: String,
}

impl MidiAccessError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MidiAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MidiAccessError {}

pub type MidiAccess = Result<Vec<MidiPortInfo>, MidiAccessError>;

/// Lists the input ports visible to a new client.
pub fn request_access(client_name: &str) -> MidiAccess {
    let midi_input = MidiInput::new(client_name)
        .map_err(|err| MidiAccessError::new(format!("MIDI is not available: {err}")))?;
    let ports = midi_input
        .ports()
        .iter()
        .filter_map(|port| {
            let name = midi_input.port_name(port).ok()?;
            Some(MidiPortInfo {
                id: port.id(),
                name,
                state: PortState::Connected,
            })
        })
        .collect();
    Ok(ports)
}

/// Receiving ends of the MIDI listener task. Dropping it closes every port.
pub struct MidiLink {
    access: Receiver<MidiAccess>,
    events: Receiver<MidiInputEvent>,
    _shutdown: Sender<()>,
}

impl MidiLink {
    /// The access result, once the listener has produced it.
    pub fn poll_access(&self) -> Option<MidiAccess> {
        match self.access.try_recv() {
            Ok(access) => Some(access),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn poll_events(&self) -> Vec<MidiInputEvent> {
        self.events.try_iter().collect()
    }
}

/// Requests access and subscribes to every input port on a blocking task.
/// Messages flow until the returned link is dropped.
pub fn spawn_midi_listener(runtime: &Runtime, client_name: &str) -> MidiLink {
    let (access_tx, access_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let client_name = client_name.to_string();

    runtime.spawn_blocking(move || {
        let mut access = request_access(&client_name);
        let mut connections: Vec<MidiInputConnection<()>> = Vec::new();
        if let Ok(ports) = access.as_mut() {
            for port in ports.iter_mut() {
                match subscribe(&client_name, port, event_tx.clone()) {
                    Ok(connection) => connections.push(connection),
                    Err(err) => {
                        log::warn!("could not open MIDI port {}: {err}", port.name);
                        port.state = PortState::Disconnected;
                    }
                }
            }
        }
        if access_tx.send(access).is_err() {
            return;
        }
        log::info!("listening on {} MIDI port(s)", connections.len());
        while shutdown_rx.recv().is_ok() {}
        for connection in connections {
            connection.close();
        }
    });

    MidiLink {
        access: access_rx,
        events: event_rx,
        _shutdown: shutdown_tx,
    }
}

fn subscribe(
    client_name: &str,
    port: &MidiPortInfo,
    sender: Sender<MidiInputEvent>,
) -> anyhow::Result<MidiInputConnection<()>> {
    let midi_input = MidiInput::new(client_name)?;
    let input_port = midi_input
        .find_port_by_id(port.id.clone())
        .ok_or_else(|| anyhow::anyhow!("port {} is gone", port.id))?;
    let device_name = port.name.clone();
    let connection_name = format!("{client_name} {}", port.name);
    midi_input
        .connect(
            &input_port,
            &connection_name,
            move |timestamp_us, message, &mut ()| {
                let Some(event) = MidiInputEvent::from_raw(message, timestamp_us, &device_name)
                else {
                    return;
                };
                if sender.send(event).is_err() {
                    log::error!("failed to send message from live midi thread");
                }
            },
            (),
        )
        .map_err(|_| anyhow::anyhow!("Failed to connect to midi port"))
}
