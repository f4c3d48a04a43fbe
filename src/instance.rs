//! One running plugin instance and its processing state machine.
//!
//! ```text
//! Uninitialized --initialize--> Configured --sample rate + block size--> Processing
//!                                   ^                                        |
//!                                   +---------- reconfiguration failure -----+
//! any state --terminate--> Terminated
//! ```
//!
//! Sample rate and block size may be set in either order. Once both are
//! known, any change re-runs the reconfiguration protocol: stop processing,
//! deactivate, apply the new setup, activate, start processing.

use crate::config::HostConfig;
use crate::error::{Error, Result, Stage};
use crate::midi::MidiCcMap;
use crate::provider::PluginProvider;
use crate::transfer::ParameterTransfer;
use plughost_abi::process::context_flags;
use plughost_abi::{
    AudioBusBuffers, AudioProcessor, BusDirection, ClassInfo, Component, EditController, Event,
    EventList, MediaType, ParamId, ParamValue, ParameterChanges, PluginModule, ProcessContext,
    ProcessData, ProcessMode, ProcessSetup, ResultCode, SampleSize,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Uninitialized,
    Configured,
    Processing,
    Terminated,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Uninitialized => write!(f, "uninitialized"),
            InstanceState::Configured => write!(f, "configured"),
            InstanceState::Processing => write!(f, "processing"),
            InstanceState::Terminated => write!(f, "terminated"),
        }
    }
}

pub struct PluginInstance {
    // Drop order matters: plugin objects go before the module that created them.
    pub(crate) controller: Option<Box<dyn EditController>>,
    pub(crate) processor: Option<Box<dyn AudioProcessor>>,
    pub(crate) component: Option<Box<dyn Component>>,
    pub(crate) separate_controller: bool,
    pub(crate) class_info: Option<ClassInfo>,
    pub(crate) config: HostConfig,
    state: InstanceState,
    sample_rate: Option<f64>,
    block_size: Option<usize>,
    sample_size: SampleSize,
    pub(crate) inputs: Vec<AudioBusBuffers>,
    pub(crate) outputs: Vec<AudioBusBuffers>,
    events: EventList,
    pub(crate) transfer: ParameterTransfer,
    input_changes: ParameterChanges,
    context: ProcessContext,
    pub(crate) midi_map: MidiCcMap,
    note_id: i32,
    module: Option<Arc<dyn PluginModule>>,
    // What the plugin side has actually switched on, which can lag `state`
    // after a failed reconfiguration.
    switched: Switched,
}

#[derive(Debug, Default, Clone, Copy)]
struct Switched {
    active: bool,
    processing: bool,
}

impl PluginInstance {
    pub fn new(config: HostConfig) -> Self {
        let context = ProcessContext {
            state: context_flags::PLAYING
                | context_flags::TEMPO_VALID
                | context_flags::CONT_TIME_VALID,
            tempo: config.default_tempo,
            ..ProcessContext::default()
        };
        Self {
            controller: None,
            processor: None,
            component: None,
            separate_controller: false,
            class_info: None,
            events: EventList::with_capacity(config.event_capacity),
            transfer: ParameterTransfer::with_capacity(config.max_parameter_changes),
            input_changes: ParameterChanges::with_capacity(16),
            config,
            state: InstanceState::Uninitialized,
            sample_rate: None,
            block_size: None,
            sample_size: SampleSize::Sample32,
            inputs: Vec::new(),
            outputs: Vec::new(),
            context,
            midi_map: MidiCcMap::empty(),
            note_id: 0,
            module: None,
            switched: Switched::default(),
        }
    }

    /// Obtain the plugin's capabilities from `provider` and prepare buffers,
    /// queues and the MIDI controller map.
    pub fn initialize(&mut self, provider: &PluginProvider) -> Result<()> {
        if self.state != InstanceState::Uninitialized {
            return Err(Error::InvalidConfig(format!(
                "cannot initialize an instance that is {}",
                self.state
            )));
        }

        let provided = provider.provide()?;
        let mut component = provided.component;

        self.sample_size = match &provided.processor {
            Some(p)
                if self.config.prefer_double_precision
                    && p.can_process_sample_size(SampleSize::Sample64) =>
            {
                SampleSize::Sample64
            }
            _ => SampleSize::Sample32,
        };

        let block = self.block_size.unwrap_or(0);
        self.inputs = audio_buses(component.as_ref(), BusDirection::Input, block, self.sample_size);
        self.outputs =
            audio_buses(component.as_ref(), BusDirection::Output, block, self.sample_size);
        activate_main_buses(component.as_mut());

        if let Some(mapping) = provided
            .controller
            .as_ref()
            .and_then(|c| c.midi_mapping())
        {
            let event_buses = component
                .bus_count(MediaType::Event, BusDirection::Input)
                .max(0) as usize;
            self.midi_map = MidiCcMap::build(
                mapping,
                event_buses.min(self.config.midi_mapping_buses),
                self.config.midi_channels,
            );
        }

        tracing::debug!(
            plugin = %provider.class_info().name,
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            sample_bits = self.sample_size.bits(),
            midi_mappings = self.midi_map.mapped_count(),
            "Initialized plugin instance"
        );

        self.component = Some(component);
        self.processor = provided.processor;
        self.controller = provided.controller;
        self.separate_controller = provided.separate_controller;
        self.class_info = Some(provider.class_info().clone());
        self.module = Some(Arc::clone(provider.module()));
        self.state = InstanceState::Configured;

        if self.sample_rate.is_some() && self.block_size.is_some() {
            self.reconfigure()?;
        }
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<()> {
        if self.sample_rate == Some(sample_rate) {
            return Ok(());
        }
        self.sample_rate = Some(sample_rate);
        self.context.sample_rate = sample_rate;
        if self.block_size.is_some() {
            self.reconfigure()?;
        }
        Ok(())
    }

    pub fn set_block_size(&mut self, block_size: usize) -> Result<()> {
        if self.block_size == Some(block_size) {
            return Ok(());
        }
        self.block_size = Some(block_size);
        for bus in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            bus.resize(block_size);
        }
        if self.sample_rate.is_some() {
            self.reconfigure()?;
        }
        Ok(())
    }

    fn reconfigure(&mut self) -> Result<()> {
        match self.state {
            // Values are kept and applied once the instance is initialized.
            InstanceState::Uninitialized => return Ok(()),
            InstanceState::Terminated => return Err(Error::NotProcessing),
            InstanceState::Configured | InstanceState::Processing => {}
        }
        let (Some(sample_rate), Some(block_size)) = (self.sample_rate, self.block_size) else {
            return Ok(());
        };
        let (Some(processor), Some(component)) =
            (self.processor.as_mut(), self.component.as_mut())
        else {
            return Err(Error::NoProcessor);
        };

        self.state = InstanceState::Configured;

        let setup = ProcessSetup {
            process_mode: ProcessMode::Realtime,
            sample_size: self.sample_size,
            max_samples_per_block: block_size as i32,
            sample_rate,
        };
        let result = apply_setup(
            processor.as_mut(),
            component.as_mut(),
            &setup,
            &mut self.switched,
        );
        match &result {
            Ok(()) => {
                self.state = InstanceState::Processing;
                tracing::debug!(sample_rate, block_size, "Plugin processing");
            }
            Err(e) => tracing::warn!(sample_rate, block_size, "Plugin reconfiguration failed: {e}"),
        }
        result
    }

    /// Process one block of `block_size` frames.
    ///
    /// Buffered parameter changes are moved into the input queue first. The
    /// input events and parameter queue are cleared only when the plugin
    /// reports success.
    pub fn process(&mut self, current_time_frames: i64) -> Result<()> {
        if self.state != InstanceState::Processing {
            tracing::warn!(state = %self.state, "Plugin process called while not processing");
            return Err(Error::NotProcessing);
        }
        let Some(processor) = self.processor.as_mut() else {
            return Err(Error::NoProcessor);
        };
        let block_size = self.block_size.unwrap_or(0);

        self.context.continuous_time_samples = current_time_frames;
        self.context.project_time_samples = current_time_frames;
        self.transfer.transfer_to(&mut self.input_changes);

        let mut data = ProcessData {
            process_mode: ProcessMode::Realtime,
            sample_size: self.sample_size,
            num_samples: block_size as i32,
            inputs: &mut self.inputs,
            outputs: &mut self.outputs,
            input_parameter_changes: &self.input_changes,
            input_events: &self.events,
            process_context: &self.context,
        };
        if let Err(code) = processor.process(&mut data) {
            tracing::warn!(current_time_frames, "Plugin process failed: {code}");
            return Err(Error::Process(code));
        }

        self.events.clear();
        self.input_changes.clear();
        Ok(())
    }

    /// Buffer a parameter change for the next block.
    pub fn set_parameter(&mut self, id: ParamId, value: ParamValue, sample_offset: i32) -> bool {
        self.transfer.add_change(id, value, sample_offset)
    }

    /// Normalized value read from the controller.
    pub fn parameter(&self, id: ParamId) -> Option<ParamValue> {
        self.controller.as_ref().map(|c| c.param_normalized(id))
    }

    pub fn add_event(&mut self, event: Event) -> Result<()> {
        self.events.add(event).map_err(|_| {
            let capacity = self.events.capacity();
            tracing::warn!(capacity, "Input event list full, dropping event");
            Error::EventListFull { capacity }
        })
    }

    pub fn next_note_id(&mut self) -> i32 {
        self.note_id = self.note_id.wrapping_add(1);
        self.note_id
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.context.tempo = bpm;
    }

    /// Stop processing and deactivate. Errors are ignored; calling it again
    /// does nothing.
    pub fn terminate(&mut self) {
        if self.state == InstanceState::Terminated {
            return;
        }
        self.state = InstanceState::Terminated;
        if let Some(processor) = self.processor.as_mut() {
            if self.switched.processing {
                let _ = processor.set_processing(false);
            }
            if let (true, Some(component)) = (self.switched.active, self.component.as_mut()) {
                let _ = component.set_active(false);
            }
        }
        self.switched = Switched::default();
        tracing::debug!("Plugin instance terminated");
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        self.state == InstanceState::Processing
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    pub fn block_size(&self) -> Option<usize> {
        self.block_size
    }

    pub fn sample_size(&self) -> SampleSize {
        self.sample_size
    }

    pub fn tempo(&self) -> f64 {
        self.context.tempo
    }

    pub fn class_info(&self) -> Option<&ClassInfo> {
        self.class_info.as_ref()
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    pub fn main_input_channels(&self) -> usize {
        self.inputs.first().map_or(0, AudioBusBuffers::num_channels)
    }

    pub fn main_output_channels(&self) -> usize {
        self.outputs.first().map_or(0, AudioBusBuffers::num_channels)
    }

    pub fn pending_events(&self) -> &EventList {
        &self.events
    }

    pub fn input_parameter_changes(&self) -> &ParameterChanges {
        &self.input_changes
    }

    pub fn midi_map(&self) -> &MidiCcMap {
        &self.midi_map
    }
}

impl Drop for PluginInstance {
    fn drop(&mut self) {
        self.terminate();
        if self.separate_controller {
            if let Some(controller) = self.controller.as_mut() {
                let _ = controller.terminate();
            }
        }
        if let Some(component) = self.component.as_mut() {
            let _ = component.terminate();
        }
    }
}

fn apply_setup(
    processor: &mut dyn AudioProcessor,
    component: &mut dyn Component,
    setup: &ProcessSetup,
    switched: &mut Switched,
) -> Result<()> {
    // Undo whatever is still on, including leftovers of an earlier failure.
    if switched.processing {
        processor
            .set_processing(false)
            .map_err(step(Stage::StopProcessing))?;
        switched.processing = false;
    }
    if switched.active {
        component.set_active(false).map_err(step(Stage::Deactivate))?;
        switched.active = false;
    }
    processor
        .setup_processing(setup)
        .map_err(step(Stage::SetupProcessing))?;
    component.set_active(true).map_err(step(Stage::Activate))?;
    switched.active = true;
    processor
        .set_processing(true)
        .map_err(step(Stage::StartProcessing))?;
    switched.processing = true;
    Ok(())
}

fn step(stage: Stage) -> impl Fn(ResultCode) -> Error {
    move |code| Error::Setup { stage, code }
}

fn audio_buses(
    component: &dyn Component,
    direction: BusDirection,
    block_size: usize,
    sample_size: SampleSize,
) -> Vec<AudioBusBuffers> {
    (0..component.bus_count(MediaType::Audio, direction))
        .map(|index| {
            let channels = component
                .bus_info(MediaType::Audio, direction, index)
                .map_or(0, |info| info.channel_count.max(0) as usize);
            AudioBusBuffers::new(channels, block_size, sample_size)
        })
        .collect()
}

fn activate_main_buses(component: &mut dyn Component) {
    let main_buses = [
        (MediaType::Audio, BusDirection::Input),
        (MediaType::Audio, BusDirection::Output),
        (MediaType::Event, BusDirection::Input),
    ];
    for (media_type, direction) in main_buses {
        if component.bus_count(media_type, direction) > 0 {
            if let Err(code) = component.activate_bus(media_type, direction, 0, true) {
                tracing::debug!(%media_type, %direction, "Bus activation failed: {code}");
            }
        }
    }
}
