//! Plugin capability interface consumed by the plughost core.
//!
//! A plugin binary is seen only through the traits in [`plugin`]: a
//! [`ModuleLoader`] opens a [`PluginModule`], the module describes its
//! classes with [`ClassInfo`] and creates [`Component`]s and
//! [`EditController`]s, and a component optionally exposes an
//! [`AudioProcessor`]. Everything the host passes across that boundary
//! (events, automation queues, audio buffers, timing) is a plain value type
//! defined here, so a backend only has to translate these into its native
//! structures.
//!
//! The `mock` feature provides a configurable in-memory plugin used by tests.

pub mod bus;
pub mod class;
pub mod error;
pub mod event;
pub mod params;
pub mod plugin;
pub mod process;

#[cfg(feature = "mock")]
pub mod mock;

pub use bus::{BusDirection, BusInfo, BusType, MediaType};
pub use class::{ClassId, ClassInfo, AUDIO_MODULE_CLASS, COMPONENT_CONTROLLER_CLASS};
pub use error::{ModuleError, PluginResult, ResultCode};
pub use event::{Event, EventKind, EventList};
pub use params::{
    ParamId, ParamValue, ParameterChanges, ParameterInfo, ParameterPoint, ParameterQueue,
    ProgramListId, ProgramListInfo, UnitId, UnitInfo, NO_PARAM_ID,
};
pub use plugin::{
    AudioProcessor, Component, EditController, MidiMapping, ModuleLoader, PluginModule,
    UnitInfoSource, CTRL_AFTER_TOUCH, CTRL_COUNT, CTRL_PITCH_BEND,
};
pub use process::{
    AudioBusBuffers, ChannelBuffers, ProcessContext, ProcessData, ProcessMode, ProcessSetup,
    SampleSize,
};
