//! # plughost - plugin host for synthesis engines
//!
//! Loads binary audio plugins, runs them on an engine's fixed-size blocks
//! and feeds them notes, MIDI and parameter automation, all behind small
//! integer handles that an engine's scripting layer can pass around.
//!
//! ## Architecture
//!
//! plughost is an umbrella crate over:
//! - **plughost-abi** - The plugin capability interface (classes, buses, events, automation queues)
//! - **plughost-vst3** - VST3 backend (module loading, COM adapters), behind the `vst3` feature
//!
//! The core is organized as:
//! - [`registry`] - Module cache and per-engine handle lists
//! - [`instance`] - One plugin instance and its processing state machine
//! - [`midi`], [`note`], [`transfer`] - Event and parameter bridging
//! - [`audio`] - Block copy between engine channels and plugin buffers
//! - [`preset`] - `.vstpreset` load and save
//! - [`opcodes`] - Engine-facing entry points
//!
//! ## Quick Start
//!
//! ```ignore
//! use plughost::prelude::*;
//!
//! let mut registry = HostRegistry::builder().build()?;
//! let handle = PluginInit::init(&mut registry, &engine, "/plugins/Delay.vst3", "Delay", false);
//!
//! let mut audio = PluginAudio::init(&registry, &engine, handle, 2, 2).unwrap();
//! audio.audio(&engine, &[&left, &right], &mut [&mut out_l, &mut out_r]);
//! ```
//!
//! ## Feature Flags
//!
//! - `vst3` - Load VST3 modules with the default registry loader

pub use plughost_abi as abi;

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod info;
pub mod instance;
pub mod midi;
pub mod note;
pub mod opcodes;
pub mod preset;
pub mod provider;
pub mod registry;
pub mod transfer;

pub use config::HostConfig;
pub use engine::{ContextId, EngineContext};
pub use error::{Error, Result, Stage};
pub use instance::{InstanceState, PluginInstance};
pub use midi::{MidiCcMap, MidiMessage};
pub use note::{NoteRequest, ScheduledNote};
pub use preset::{PresetError, PresetFile};
pub use provider::{PluginProvider, ProvidedPlugin};
pub use registry::{HostRegistry, HostRegistryBuilder, SharedInstance};

#[cfg(feature = "vst3")]
pub use plughost_vst3 as vst3;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::opcodes::{
        PluginAudio, PluginInfo, PluginInit, PluginMidiOut, PluginNote, PluginParamGet,
        PluginParamSet, PluginPresetLoad, PluginPresetSave, PluginTempo,
    };
    pub use crate::{EngineContext, HostConfig, HostRegistry, PluginInstance};
}
