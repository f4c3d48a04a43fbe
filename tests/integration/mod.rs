//! Integration test modules for plughost
//!
//! - registry: Loading, handles, module sharing, teardown
//! - lifecycle: Sample rate, block size and processing state
//! - audio: Pass-through round trips and channel matching
//! - events: Notes, MIDI translation, parameter automation
//! - presets: Preset files through the opcodes

pub mod audio;
pub mod events;
pub mod lifecycle;
pub mod presets;
pub mod registry;
