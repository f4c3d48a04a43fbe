//! In-memory pass-through plugin for tests.
//!
//! A [`MockLoader`] serves [`MockModule`]s for registered paths. Every
//! component a module creates shares a [`MockHandle`] with its processor and
//! controller, so tests can inspect the calls the host made, flip injected
//! failures on and off, and read back what the processor received.
//!
//! The processor copies each input bus to the output bus with the same index.

use crate::bus::{BusDirection, BusInfo, MediaType};
use crate::class::{ClassId, ClassInfo, COMPONENT_CONTROLLER_CLASS};
use crate::error::{ModuleError, PluginResult, ResultCode};
use crate::event::Event;
use crate::params::{
    ParamId, ParamValue, ParameterChanges, ParameterInfo, ProgramListId, ProgramListInfo,
    UnitInfo,
};
use crate::plugin::{
    AudioProcessor, Component, EditController, MidiMapping, ModuleLoader, PluginModule,
    UnitInfoSource,
};
use crate::process::{ChannelBuffers, ProcessContext, ProcessData, ProcessSetup, SampleSize};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    ActivateBus,
    SetActive(bool),
    SetupProcessing,
    SetProcessing(bool),
    Process,
    GetState,
    SetState,
    Terminate,
    SetComponentState,
    ControllerGetState,
    ControllerSetState,
    ControllerTerminate,
}

/// How the mock exposes its edit controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    None,
    SingleComponent,
    Separate,
}

/// Description of one mock plugin class.
#[derive(Debug, Clone)]
pub struct MockPlugin {
    pub info: ClassInfo,
    pub audio_inputs: Vec<i32>,
    pub audio_outputs: Vec<i32>,
    pub event_inputs: i32,
    pub supports_64bit: bool,
    pub has_processor: bool,
    pub controller: ControllerKind,
    pub parameters: Vec<ParameterInfo>,
    pub midi_mappings: HashMap<(i32, i16, u16), ParamId>,
    pub units: Vec<UnitInfo>,
    pub program_lists: Vec<(ProgramListInfo, Vec<String>)>,
    pub failures: Vec<MockCall>,
}

impl MockPlugin {
    /// Stereo in, stereo out effect with one event input and a separate controller.
    pub fn effect(name: &str) -> Self {
        Self {
            info: ClassInfo::new(class_id_for(name), name).vendor("Mock Audio"),
            audio_inputs: vec![2],
            audio_outputs: vec![2],
            event_inputs: 1,
            supports_64bit: false,
            has_processor: true,
            controller: ControllerKind::Separate,
            parameters: Vec::new(),
            midi_mappings: HashMap::new(),
            units: Vec::new(),
            program_lists: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn class_id(mut self, class_id: ClassId) -> Self {
        self.info.class_id = class_id;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.info.category = category.to_string();
        self
    }

    pub fn buses(mut self, inputs: &[i32], outputs: &[i32]) -> Self {
        self.audio_inputs = inputs.to_vec();
        self.audio_outputs = outputs.to_vec();
        self
    }

    pub fn event_inputs(mut self, count: i32) -> Self {
        self.event_inputs = count;
        self
    }

    pub fn supports_64bit(mut self, supported: bool) -> Self {
        self.supports_64bit = supported;
        self
    }

    pub fn without_processor(mut self) -> Self {
        self.has_processor = false;
        self
    }

    pub fn controller(mut self, kind: ControllerKind) -> Self {
        self.controller = kind;
        self
    }

    pub fn parameter(mut self, info: ParameterInfo) -> Self {
        self.parameters.push(info);
        self
    }

    pub fn midi_mapping(mut self, bus: i32, channel: i16, controller: u16, id: ParamId) -> Self {
        self.midi_mappings.insert((bus, channel, controller), id);
        self
    }

    pub fn unit(mut self, unit: UnitInfo) -> Self {
        self.units.push(unit);
        self
    }

    pub fn program_list(mut self, info: ProgramListInfo, names: &[&str]) -> Self {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.program_lists.push((info, names));
        self
    }

    pub fn fail_on(mut self, call: MockCall) -> Self {
        self.failures.push(call);
        self
    }

    pub fn controller_class_id(&self) -> ClassId {
        let mut bytes = *self.info.class_id.as_bytes();
        bytes[0] ^= 0xFF;
        ClassId::new(bytes)
    }
}

fn class_id_for(name: &str) -> ClassId {
    let mut bytes = [0u8; 16];
    for (i, c) in name.bytes().enumerate() {
        bytes[i % 16] ^= c.wrapping_add(i as u8);
    }
    bytes[15] |= 1;
    ClassId::new(bytes)
}

/// Everything observed by one mock instance.
#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<MockCall>,
    pub failures: HashSet<MockCall>,
    pub active: bool,
    pub processing: bool,
    pub setup: Option<ProcessSetup>,
    pub active_buses: Vec<(MediaType, BusDirection, i32)>,
    pub params: HashMap<ParamId, ParamValue>,
    pub component_state: Vec<u8>,
    pub controller_state: Vec<u8>,
    pub synced_component_state: Option<Vec<u8>>,
    pub events: Vec<Event>,
    pub parameter_changes: Vec<ParameterChanges>,
    pub contexts: Vec<ProcessContext>,
}

impl MockState {
    pub fn count(&self, call: MockCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn process_count(&self) -> usize {
        self.count(MockCall::Process)
    }

    fn record(&mut self, call: MockCall) -> PluginResult {
        self.calls.push(call);
        if self.failures.contains(&call) {
            Err(ResultCode::False)
        } else {
            Ok(())
        }
    }
}

pub type MockHandle = Arc<Mutex<MockState>>;

struct MockComponent {
    plugin: Arc<MockPlugin>,
    state: MockHandle,
}

impl MockComponent {
    fn bus_channels(&self, media_type: MediaType, direction: BusDirection) -> Vec<i32> {
        match (media_type, direction) {
            (MediaType::Audio, BusDirection::Input) => self.plugin.audio_inputs.clone(),
            (MediaType::Audio, BusDirection::Output) => self.plugin.audio_outputs.clone(),
            (MediaType::Event, BusDirection::Input) => vec![16; self.plugin.event_inputs as usize],
            (MediaType::Event, BusDirection::Output) => Vec::new(),
        }
    }
}

impl Component for MockComponent {
    fn controller_class_id(&self) -> PluginResult<ClassId> {
        match self.plugin.controller {
            ControllerKind::Separate => Ok(self.plugin.controller_class_id()),
            _ => Err(ResultCode::NotImplemented),
        }
    }

    fn bus_count(&self, media_type: MediaType, direction: BusDirection) -> i32 {
        self.bus_channels(media_type, direction).len() as i32
    }

    fn bus_info(
        &self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
    ) -> PluginResult<BusInfo> {
        let channels = self.bus_channels(media_type, direction);
        let count = *channels
            .get(index as usize)
            .ok_or(ResultCode::InvalidArgument)?;
        let name = format!("{media_type} {direction} {index}");
        Ok(match media_type {
            MediaType::Audio => BusInfo::audio(direction, count, name),
            MediaType::Event => BusInfo::event(direction, count, name),
        })
    }

    fn activate_bus(
        &mut self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
        active: bool,
    ) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::ActivateBus)?;
        if active {
            state.active_buses.push((media_type, direction, index));
        }
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::SetActive(active))?;
        state.active = active;
        Ok(())
    }

    fn get_state(&mut self) -> PluginResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.record(MockCall::GetState)?;
        Ok(state.component_state.clone())
    }

    fn set_state(&mut self, data: &[u8]) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::SetState)?;
        state.component_state = data.to_vec();
        Ok(())
    }

    fn audio_processor(&self) -> Option<Box<dyn AudioProcessor>> {
        if !self.plugin.has_processor {
            return None;
        }
        Some(Box::new(MockProcessor {
            plugin: Arc::clone(&self.plugin),
            state: Arc::clone(&self.state),
        }))
    }

    fn edit_controller(&self) -> Option<Box<dyn EditController>> {
        match self.plugin.controller {
            ControllerKind::SingleComponent => Some(Box::new(MockController {
                plugin: Arc::clone(&self.plugin),
                state: Arc::clone(&self.state),
            })),
            _ => None,
        }
    }

    fn terminate(&mut self) -> PluginResult {
        self.state.lock().record(MockCall::Terminate)
    }
}

struct MockProcessor {
    plugin: Arc<MockPlugin>,
    state: MockHandle,
}

impl AudioProcessor for MockProcessor {
    fn can_process_sample_size(&self, sample_size: SampleSize) -> bool {
        match sample_size {
            SampleSize::Sample32 => true,
            SampleSize::Sample64 => self.plugin.supports_64bit,
        }
    }

    fn latency_samples(&self) -> u32 {
        0
    }

    fn setup_processing(&mut self, setup: &ProcessSetup) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::SetupProcessing)?;
        state.setup = Some(*setup);
        Ok(())
    }

    fn set_processing(&mut self, processing: bool) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::SetProcessing(processing))?;
        state.processing = processing;
        Ok(())
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::Process)?;
        if !state.active || !state.processing {
            return Err(ResultCode::NotInitialized);
        }

        let frames = data.num_samples.max(0) as usize;
        for (input, output) in data.inputs.iter().zip(data.outputs.iter_mut()) {
            match (&input.channels, &mut output.channels) {
                (ChannelBuffers::Sample32(src), ChannelBuffers::Sample32(dst)) => {
                    for (s, d) in src.iter().zip(dst.iter_mut()) {
                        d[..frames].copy_from_slice(&s[..frames]);
                    }
                }
                (ChannelBuffers::Sample64(src), ChannelBuffers::Sample64(dst)) => {
                    for (s, d) in src.iter().zip(dst.iter_mut()) {
                        d[..frames].copy_from_slice(&s[..frames]);
                    }
                }
                _ => return Err(ResultCode::InvalidArgument),
            }
        }

        state.events.extend(data.input_events.iter().copied());
        for queue in data.input_parameter_changes.iter() {
            if let Some(value) = queue.last_value() {
                state.params.insert(queue.param_id, value);
            }
        }
        state
            .parameter_changes
            .push(data.input_parameter_changes.clone());
        state.contexts.push(*data.process_context);
        Ok(())
    }
}

struct MockController {
    plugin: Arc<MockPlugin>,
    state: MockHandle,
}

impl EditController for MockController {
    fn set_component_state(&mut self, data: &[u8]) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::SetComponentState)?;
        state.synced_component_state = Some(data.to_vec());
        Ok(())
    }

    fn get_state(&mut self) -> PluginResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.record(MockCall::ControllerGetState)?;
        Ok(state.controller_state.clone())
    }

    fn set_state(&mut self, data: &[u8]) -> PluginResult {
        let mut state = self.state.lock();
        state.record(MockCall::ControllerSetState)?;
        state.controller_state = data.to_vec();
        Ok(())
    }

    fn parameter_count(&self) -> i32 {
        self.plugin.parameters.len() as i32
    }

    fn parameter_info(&self, index: i32) -> PluginResult<ParameterInfo> {
        self.plugin
            .parameters
            .get(index as usize)
            .cloned()
            .ok_or(ResultCode::InvalidArgument)
    }

    fn param_normalized(&self, id: ParamId) -> ParamValue {
        if let Some(value) = self.state.lock().params.get(&id) {
            return *value;
        }
        self.plugin
            .parameters
            .iter()
            .find(|p| p.id == id)
            .map_or(0.0, |p| p.default_normalized_value)
    }

    fn set_param_normalized(&mut self, id: ParamId, value: ParamValue) -> PluginResult {
        self.state.lock().params.insert(id, value);
        Ok(())
    }

    fn midi_mapping(&self) -> Option<&dyn MidiMapping> {
        if self.plugin.midi_mappings.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    fn unit_info(&self) -> Option<&dyn UnitInfoSource> {
        if self.plugin.units.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    fn terminate(&mut self) -> PluginResult {
        self.state.lock().record(MockCall::ControllerTerminate)
    }
}

impl MidiMapping for MockController {
    fn midi_controller_assignment(
        &self,
        bus_index: i32,
        channel: i16,
        controller: u16,
    ) -> Option<ParamId> {
        self.plugin
            .midi_mappings
            .get(&(bus_index, channel, controller))
            .copied()
    }
}

impl UnitInfoSource for MockController {
    fn unit_count(&self) -> i32 {
        self.plugin.units.len() as i32
    }

    fn unit_info(&self, index: i32) -> PluginResult<UnitInfo> {
        self.plugin
            .units
            .get(index as usize)
            .cloned()
            .ok_or(ResultCode::InvalidArgument)
    }

    fn program_list_count(&self) -> i32 {
        self.plugin.program_lists.len() as i32
    }

    fn program_list_info(&self, index: i32) -> PluginResult<ProgramListInfo> {
        self.plugin
            .program_lists
            .get(index as usize)
            .map(|(info, _)| info.clone())
            .ok_or(ResultCode::InvalidArgument)
    }

    fn program_name(&self, list_id: ProgramListId, index: i32) -> PluginResult<String> {
        self.plugin
            .program_lists
            .iter()
            .find(|(info, _)| info.id == list_id)
            .and_then(|(_, names)| names.get(index as usize).cloned())
            .ok_or(ResultCode::InvalidArgument)
    }
}

/// A module whose classes are [`MockPlugin`]s.
pub struct MockModule {
    path: PathBuf,
    plugins: Vec<Arc<MockPlugin>>,
    instances: Mutex<Vec<(ClassId, MockHandle)>>,
}

impl MockModule {
    pub fn new(path: impl Into<PathBuf>, plugins: Vec<MockPlugin>) -> Self {
        Self {
            path: path.into(),
            plugins: plugins.into_iter().map(Arc::new).collect(),
            instances: Mutex::new(Vec::new()),
        }
    }

    /// State handles of every component created so far, oldest first.
    pub fn instances(&self) -> Vec<MockHandle> {
        self.instances
            .lock()
            .iter()
            .map(|(_, handle)| Arc::clone(handle))
            .collect()
    }

    pub fn last_instance(&self) -> Option<MockHandle> {
        self.instances
            .lock()
            .last()
            .map(|(_, handle)| Arc::clone(handle))
    }
}

impl PluginModule for MockModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn class_infos(&self) -> Vec<ClassInfo> {
        let mut infos = Vec::new();
        for plugin in &self.plugins {
            infos.push(plugin.info.clone());
            if plugin.controller == ControllerKind::Separate {
                infos.push(
                    ClassInfo::new(
                        plugin.controller_class_id(),
                        format!("{} Controller", plugin.info.name),
                    )
                    .category(COMPONENT_CONTROLLER_CLASS),
                );
            }
        }
        infos
    }

    fn create_component(&self, class_id: &ClassId) -> PluginResult<Box<dyn Component>> {
        let plugin = self
            .plugins
            .iter()
            .find(|p| p.info.class_id == *class_id)
            .ok_or(ResultCode::NoInterface)?;

        let mut state = MockState {
            failures: plugin.failures.iter().copied().collect(),
            ..MockState::default()
        };
        for param in &plugin.parameters {
            state.params.insert(param.id, param.default_normalized_value);
        }
        let handle = Arc::new(Mutex::new(state));
        self.instances.lock().push((*class_id, Arc::clone(&handle)));

        Ok(Box::new(MockComponent {
            plugin: Arc::clone(plugin),
            state: handle,
        }))
    }

    fn create_controller(&self, class_id: &ClassId) -> PluginResult<Box<dyn EditController>> {
        let plugin = self
            .plugins
            .iter()
            .find(|p| {
                p.controller == ControllerKind::Separate && p.controller_class_id() == *class_id
            })
            .ok_or(ResultCode::NoInterface)?;
        let handle = self
            .instances
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == plugin.info.class_id)
            .map(|(_, handle)| Arc::clone(handle))
            .ok_or(ResultCode::NotInitialized)?;

        Ok(Box::new(MockController {
            plugin: Arc::clone(plugin),
            state: handle,
        }))
    }
}

/// Serves [`MockModule`]s for registered paths; any other path fails to open.
#[derive(Default)]
pub struct MockLoader {
    modules: HashMap<PathBuf, Vec<MockPlugin>>,
    loaded: Mutex<Vec<Arc<MockModule>>>,
    load_count: AtomicUsize,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, path: impl Into<PathBuf>, plugins: Vec<MockPlugin>) -> Self {
        self.modules.insert(path.into(), plugins);
        self
    }

    /// Number of successful loads.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Most recently loaded module for `path`.
    pub fn loaded_module(&self, path: &Path) -> Option<Arc<MockModule>> {
        self.loaded
            .lock()
            .iter()
            .rev()
            .find(|m| m.path() == path)
            .cloned()
    }
}

impl ModuleLoader for MockLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, ModuleError> {
        let plugins = self.modules.get(path).ok_or_else(|| ModuleError::Open {
            path: path.to_path_buf(),
            reason: "no such file".to_string(),
        })?;
        let module = Arc::new(MockModule::new(path, plugins.clone()));
        self.loaded.lock().push(Arc::clone(&module));
        self.load_count.fetch_add(1, Ordering::SeqCst);
        Ok(module as Arc<dyn PluginModule>)
    }
}
