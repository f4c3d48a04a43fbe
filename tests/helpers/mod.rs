//! Test helpers and fixtures for plughost integration tests
//!
//! A [`FakeEngine`] stands in for the synthesis engine with manual cycle
//! control, and [`test_registry`] serves mock plugins from a fixed path.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT32_EPSILON`: Round trip through 32-bit plugin buffers
//! - `EXACT`: Round trip through 64-bit plugin buffers

#![allow(dead_code)]

pub mod tolerances;

use plughost::abi::mock::{MockLoader, MockPlugin};
use plughost::prelude::*;
use plughost::ContextId;
use std::cell::Cell;
use std::sync::Arc;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Frames per control period
pub const TEST_BLOCK_SIZE: usize = 64;

/// Path the mock loader serves plugins from
pub const MODULE_PATH: &str = "/plugins/effect.vst3";

/// Engine stand-in whose clock only moves when told to.
pub struct FakeEngine {
    id: ContextId,
    frames: Cell<i64>,
    cycle: Cell<i64>,
    score_time: Cell<f64>,
}

impl FakeEngine {
    pub fn new(id: ContextId) -> Self {
        Self {
            id,
            frames: Cell::new(0),
            cycle: Cell::new(0),
            score_time: Cell::new(0.0),
        }
    }

    /// Move to the next control period.
    pub fn advance(&self) {
        self.frames.set(self.frames.get() + TEST_BLOCK_SIZE as i64);
        self.cycle.set(self.cycle.get() + 1);
    }

    pub fn set_frames(&self, frames: i64) {
        self.frames.set(frames);
    }

    /// Start time of the calling instrument, in seconds.
    pub fn set_score_time(&self, seconds: f64) {
        self.score_time.set(seconds);
    }
}

impl EngineContext for FakeEngine {
    fn id(&self) -> ContextId {
        self.id
    }

    fn sample_rate(&self) -> f64 {
        TEST_SAMPLE_RATE
    }

    fn block_size(&self) -> usize {
        TEST_BLOCK_SIZE
    }

    fn current_time_frames(&self) -> i64 {
        self.frames.get()
    }

    fn control_cycle(&self) -> i64 {
        self.cycle.get()
    }

    fn score_time(&self) -> f64 {
        self.score_time.get()
    }
}

/// Registry whose loader serves `plugins` at [`MODULE_PATH`].
pub fn test_registry(plugins: Vec<MockPlugin>) -> (Arc<MockLoader>, HostRegistry) {
    test_registry_with(plugins, HostConfig::default())
}

pub fn test_registry_with(
    plugins: Vec<MockPlugin>,
    config: HostConfig,
) -> (Arc<MockLoader>, HostRegistry) {
    let loader = Arc::new(MockLoader::new().with_module(MODULE_PATH, plugins));
    let registry = HostRegistry::builder()
        .loader(Arc::clone(&loader))
        .config(config)
        .build()
        .expect("Failed to build test registry");
    (loader, registry)
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f64> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f64> {
    vec![0.0; num_samples]
}
