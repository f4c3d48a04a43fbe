//! Capability traits a plugin backend implements.
//!
//! Optional capabilities are returned as `Option`, so callers check for
//! presence and degrade instead of assuming support.

use crate::bus::{BusDirection, BusInfo, MediaType};
use crate::class::{ClassId, ClassInfo};
use crate::error::{ModuleError, PluginResult};
use crate::params::{ParamId, ParamValue, ParameterInfo, ProgramListId, ProgramListInfo, UnitInfo};
use crate::process::{ProcessData, ProcessSetup, SampleSize};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

/// Controller number for channel aftertouch in MIDI mapping queries.
pub const CTRL_AFTER_TOUCH: u16 = 128;
/// Controller number for pitch bend in MIDI mapping queries.
pub const CTRL_PITCH_BEND: u16 = 129;
/// Controller numbers 0..=127 plus aftertouch and pitch bend.
pub const CTRL_COUNT: usize = 130;

/// Opens plugin modules from the filesystem.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, ModuleError>;
}

impl<T: ModuleLoader + ?Sized> ModuleLoader for Arc<T> {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, ModuleError> {
        (**self).load(path)
    }
}

/// A loaded plugin binary.
pub trait PluginModule: Send + Sync {
    fn path(&self) -> &Path;

    /// Classes in the order the module reports them. Each call re-reads the
    /// factory, so the sequence can be walked any number of times.
    fn class_infos(&self) -> Vec<ClassInfo>;

    /// Create and initialize the component for an audio-module class.
    fn create_component(&self, class_id: &ClassId) -> PluginResult<Box<dyn Component>>;

    /// Create and initialize a separate edit controller.
    fn create_controller(&self, class_id: &ClassId) -> PluginResult<Box<dyn EditController>>;
}

/// The processing half of a plugin: buses, activation, and state.
pub trait Component: Send {
    fn controller_class_id(&self) -> PluginResult<ClassId>;

    fn bus_count(&self, media_type: MediaType, direction: BusDirection) -> i32;

    fn bus_info(
        &self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
    ) -> PluginResult<BusInfo>;

    fn activate_bus(
        &mut self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
        active: bool,
    ) -> PluginResult;

    fn set_active(&mut self, active: bool) -> PluginResult;

    fn get_state(&mut self) -> PluginResult<Vec<u8>>;

    fn set_state(&mut self, state: &[u8]) -> PluginResult;

    /// The audio-processor interface of this component, if it has one.
    fn audio_processor(&self) -> Option<Box<dyn AudioProcessor>>;

    /// Present when the component also acts as its own edit controller.
    fn edit_controller(&self) -> Option<Box<dyn EditController>>;

    /// Link the component to a separately created controller so the two can
    /// exchange private messages. Backends without such a channel accept it.
    fn connect(&mut self, _controller: &dyn EditController) -> PluginResult {
        Ok(())
    }

    fn terminate(&mut self) -> PluginResult;
}

pub trait AudioProcessor: Send {
    fn can_process_sample_size(&self, sample_size: SampleSize) -> bool;

    fn latency_samples(&self) -> u32;

    fn setup_processing(&mut self, setup: &ProcessSetup) -> PluginResult;

    fn set_processing(&mut self, processing: bool) -> PluginResult;

    fn process(&mut self, data: &mut ProcessData<'_>) -> PluginResult;
}

/// The parameter and state half of a plugin.
pub trait EditController: Send {
    fn set_component_state(&mut self, state: &[u8]) -> PluginResult;

    fn get_state(&mut self) -> PluginResult<Vec<u8>>;

    fn set_state(&mut self, state: &[u8]) -> PluginResult;

    fn parameter_count(&self) -> i32;

    fn parameter_info(&self, index: i32) -> PluginResult<ParameterInfo>;

    fn param_normalized(&self, id: ParamId) -> ParamValue;

    fn set_param_normalized(&mut self, id: ParamId, value: ParamValue) -> PluginResult;

    fn midi_mapping(&self) -> Option<&dyn MidiMapping> {
        None
    }

    fn unit_info(&self) -> Option<&dyn UnitInfoSource> {
        None
    }

    /// Backend-specific access, used when pairing a controller with its component.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn terminate(&mut self) -> PluginResult;
}

/// Maps MIDI controllers to parameters.
pub trait MidiMapping {
    fn midi_controller_assignment(
        &self,
        bus_index: i32,
        channel: i16,
        controller: u16,
    ) -> Option<ParamId>;
}

/// Unit and program-list hierarchy.
pub trait UnitInfoSource {
    fn unit_count(&self) -> i32;

    fn unit_info(&self, index: i32) -> PluginResult<UnitInfo>;

    fn program_list_count(&self) -> i32;

    fn program_list_info(&self, index: i32) -> PluginResult<ProgramListInfo>;

    fn program_name(&self, list_id: ProgramListId, index: i32) -> PluginResult<String>;
}
