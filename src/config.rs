//! Host configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Highest event-bus count scanned for MIDI controller mappings.
pub const MAX_MIDI_MAPPING_BUSES: usize = 4;
/// MIDI channels per bus.
pub const MAX_MIDI_CHANNELS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Name reported to plugins through the host-application callback.
    pub host_name: String,
    /// Tempo written into the timing context at initialization.
    pub default_tempo: f64,
    /// Parameter changes buffered per block before further ones are dropped.
    pub max_parameter_changes: usize,
    pub event_capacity: usize,
    pub midi_mapping_buses: usize,
    pub midi_channels: usize,
    /// Distance between note on and note off for notes of indefinite duration.
    pub indefinite_note_seconds: f64,
    /// Use 64-bit buffers when the processor supports them.
    pub prefer_double_precision: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host_name: "plughost".to_string(),
            default_tempo: 60.0,
            max_parameter_changes: 1000,
            event_capacity: 512,
            midi_mapping_buses: MAX_MIDI_MAPPING_BUSES,
            midi_channels: MAX_MIDI_CHANNELS,
            indefinite_note_seconds: 1_000_000.0,
            prefer_double_precision: false,
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.default_tempo > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "default_tempo {} must be positive",
                self.default_tempo
            )));
        }
        if self.max_parameter_changes == 0 || self.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "max_parameter_changes and event_capacity must be non-zero".into(),
            ));
        }
        if !(1..=MAX_MIDI_MAPPING_BUSES).contains(&self.midi_mapping_buses) {
            return Err(Error::InvalidConfig(format!(
                "midi_mapping_buses {} out of range (1-{MAX_MIDI_MAPPING_BUSES})",
                self.midi_mapping_buses
            )));
        }
        if !(1..=MAX_MIDI_CHANNELS).contains(&self.midi_channels) {
            return Err(Error::InvalidConfig(format!(
                "midi_channels {} out of range (1-{MAX_MIDI_CHANNELS})",
                self.midi_channels
            )));
        }
        if !(self.indefinite_note_seconds > 0.0) {
            return Err(Error::InvalidConfig(
                "indefinite_note_seconds must be positive".into(),
            ));
        }
        Ok(())
    }
}
