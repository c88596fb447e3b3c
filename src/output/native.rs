use midir::{MidiOutput, MidiOutputConnection};
use thiserror::Error;

use super::{CHANNELS, MidiSink};
use crate::message::MidiMessage;

/// Failures while opening a native output port.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The platform MIDI API could not be initialised
    #[error("Could not initialise MIDI output: {0}")]
    Init(#[from] midir::InitError),
    /// No port matched the request
    #[error("No MIDI output port matches {0:?}")]
    NoSuchPort(String),
    /// The port exists but refused the connection
    #[error("Could not connect to {port:?}: {reason}")]
    Connect {
        /// port name
        port: String,
        /// platform error
        reason: String,
    },
}

/// A [`MidiSink`] writing to a native output port through `midir`.
pub struct MidirSink {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirSink {
    /// Names of the output ports currently available.
    pub fn port_names(client_name: &str) -> Result<Vec<String>, OutputError> {
        let output = MidiOutput::new(client_name)?;
        Ok(output
            .ports()
            .iter()
            .filter_map(|port| output.port_name(port).ok())
            .collect())
    }

    /// Connect to the port at `index`.
    pub fn connect_index(client_name: &str, index: usize) -> Result<Self, OutputError> {
        Self::connect_where(client_name, &index.to_string(), |i, _| i == index)
    }

    /// Connect to the first port whose name contains `name`.
    pub fn connect_named(client_name: &str, name: &str) -> Result<Self, OutputError> {
        Self::connect_where(client_name, name, |_, port| port.contains(name))
    }

    fn connect_where<F>(client_name: &str, wanted: &str, matches: F) -> Result<Self, OutputError>
    where
        F: Fn(usize, &str) -> bool,
    {
        let output = MidiOutput::new(client_name)?;
        let ports = output.ports();
        let found = ports.iter().enumerate().find_map(|(i, port)| {
            let name = output.port_name(port).ok()?;
            matches(i, &name).then(|| (port.clone(), name))
        });
        let Some((port, port_name)) = found else {
            return Err(OutputError::NoSuchPort(wanted.to_string()));
        };

        let connection = output
            .connect(&port, client_name)
            .map_err(|e| OutputError::Connect {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        #[cfg(feature = "tracing")]
        tracing::info!("connected to MIDI output {port_name:?}");

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn write(&mut self, bytes: &[u8]) {
        if let Err(_e) = self.connection.send(bytes) {
            #[cfg(feature = "tracing")]
            tracing::warn!("dropped MIDI message on {:?}: {_e}", self.port_name);
        }
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, packed: u32) {
        let (bytes, len) = MidiMessage::from_packed(packed).to_bytes();
        self.write(&bytes[..len]);
    }

    /// All sound off, reset all controllers and all notes off on every channel.
    fn reset(&mut self) {
        for channel in 0..CHANNELS {
            let status = 0xB0 | channel;
            for controller in [120, 121, 123] {
                self.write(&[status, controller, 0]);
            }
        }
    }
}
