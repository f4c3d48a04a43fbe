//! Process setup, timing context, and per-block process data.

use crate::event::EventList;
use crate::params::ParameterChanges;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessMode {
    Realtime,
    Prefetch,
    Offline,
}

/// Sample word width of the audio buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSize {
    Sample32,
    Sample64,
}

impl SampleSize {
    pub fn bits(self) -> u32 {
        match self {
            SampleSize::Sample32 => 32,
            SampleSize::Sample64 => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSetup {
    pub process_mode: ProcessMode,
    pub sample_size: SampleSize,
    pub max_samples_per_block: i32,
    pub sample_rate: f64,
}

/// Timing context flags.
pub mod context_flags {
    pub const PLAYING: u32 = 1 << 1;
    pub const PROJECT_TIME_MUSIC_VALID: u32 = 1 << 9;
    pub const TEMPO_VALID: u32 = 1 << 10;
    pub const TIME_SIG_VALID: u32 = 1 << 13;
    pub const CONT_TIME_VALID: u32 = 1 << 17;
}

/// Transport and timing information for the next block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessContext {
    pub state: u32,
    pub sample_rate: f64,
    pub project_time_samples: i64,
    pub continuous_time_samples: i64,
    pub project_time_music: f64,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self {
            state: 0,
            sample_rate: 0.0,
            project_time_samples: 0,
            continuous_time_samples: 0,
            project_time_music: 0.0,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelBuffers {
    Sample32(Vec<Vec<f32>>),
    Sample64(Vec<Vec<f64>>),
}

/// Host-owned audio buffers for one bus.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBusBuffers {
    pub silence_flags: u64,
    pub channels: ChannelBuffers,
}

impl AudioBusBuffers {
    pub fn new(num_channels: usize, block_size: usize, sample_size: SampleSize) -> Self {
        let channels = match sample_size {
            SampleSize::Sample32 => ChannelBuffers::Sample32(vec![vec![0.0; block_size]; num_channels]),
            SampleSize::Sample64 => ChannelBuffers::Sample64(vec![vec![0.0; block_size]; num_channels]),
        };
        Self {
            silence_flags: 0,
            channels,
        }
    }

    pub fn num_channels(&self) -> usize {
        match &self.channels {
            ChannelBuffers::Sample32(c) => c.len(),
            ChannelBuffers::Sample64(c) => c.len(),
        }
    }

    pub fn block_size(&self) -> usize {
        match &self.channels {
            ChannelBuffers::Sample32(c) => c.first().map_or(0, Vec::len),
            ChannelBuffers::Sample64(c) => c.first().map_or(0, Vec::len),
        }
    }

    pub fn sample_size(&self) -> SampleSize {
        match &self.channels {
            ChannelBuffers::Sample32(_) => SampleSize::Sample32,
            ChannelBuffers::Sample64(_) => SampleSize::Sample64,
        }
    }

    /// Resize every channel to `block_size` frames and zero it.
    pub fn resize(&mut self, block_size: usize) {
        match &mut self.channels {
            ChannelBuffers::Sample32(channels) => {
                for channel in channels {
                    channel.clear();
                    channel.resize(block_size, 0.0);
                }
            }
            ChannelBuffers::Sample64(channels) => {
                for channel in channels {
                    channel.clear();
                    channel.resize(block_size, 0.0);
                }
            }
        }
    }
}

/// Everything the processor sees for one block.
pub struct ProcessData<'a> {
    pub process_mode: ProcessMode,
    pub sample_size: SampleSize,
    pub num_samples: i32,
    pub inputs: &'a mut [AudioBusBuffers],
    pub outputs: &'a mut [AudioBusBuffers],
    pub input_parameter_changes: &'a ParameterChanges,
    pub input_events: &'a EventList,
    pub process_context: &'a ProcessContext,
}
