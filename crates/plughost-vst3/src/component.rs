//! Adapters from the VST3 COM interfaces to the plughost-abi traits.

use crate::convert::{self, check, string128_to_string, tuid_to_class_id};
use crate::host::{ComponentHandler, HostEventList, HostParameterChanges, MemoryStream};
use crate::module::LibraryGuard;
use plughost_abi::{
    AudioProcessor, BusDirection, BusInfo, ChannelBuffers, ClassId, Component, EditController,
    MediaType, MidiMapping, ParamId, ParamValue, ParameterInfo, PluginResult, ProcessData,
    ProcessSetup, ProgramListId, ProgramListInfo, ResultCode, SampleSize, UnitInfo,
    UnitInfoSource,
};
use std::any::Any;
use std::sync::Arc;
use vst3::Steinberg::Vst::{
    AudioBusBuffers, AudioBusBuffers__type0, BusInfo as VstBusInfo, IAudioProcessor,
    IAudioProcessorTrait, IComponent, IComponentHandler, IComponentTrait, IConnectionPoint,
    IConnectionPointTrait, IEditController, IEditControllerTrait, IEventList, IMidiMapping,
    IMidiMappingTrait, IParameterChanges, IUnitInfo, IUnitInfoTrait,
    ParameterInfo as VstParameterInfo, ProcessContext as VstProcessContext,
    ProcessData as VstProcessData, ProcessSetup as VstProcessSetup,
    ProgramListInfo as VstProgramListInfo, String128, UnitInfo as VstUnitInfo,
};
use vst3::Steinberg::{self, kResultOk, tresult, IBStream, IPluginBaseTrait};
use vst3::{ComPtr, ComWrapper};

// Sized for the host's default parameter-change cap.
const INPUT_QUEUE_POOL: usize = 1024;
const OUTPUT_QUEUE_POOL: usize = 128;
const EVENT_LIST_CAPACITY: usize = 512;

fn read_state(call: impl FnOnce(*mut IBStream) -> tresult) -> PluginResult<Vec<u8>> {
    let stream = ComWrapper::new(MemoryStream::new());
    let ptr = stream
        .as_com_ref::<IBStream>()
        .ok_or(ResultCode::NoInterface)?
        .as_ptr();
    check(call(ptr))?;
    Ok(stream.bytes())
}

fn write_state(state: &[u8], call: impl FnOnce(*mut IBStream) -> tresult) -> PluginResult {
    let stream = ComWrapper::new(MemoryStream::from_bytes(state.to_vec()));
    let ptr = stream
        .as_com_ref::<IBStream>()
        .ok_or(ResultCode::NoInterface)?
        .as_ptr();
    check(call(ptr))
}

pub(crate) struct Vst3Component {
    component: ComPtr<IComponent>,
    connection: Option<(ComPtr<IConnectionPoint>, ComPtr<IConnectionPoint>)>,
    library: Arc<LibraryGuard>,
}

// SAFETY: the component is owned by one plugin instance and only touched
// while that instance's lock is held.
unsafe impl Send for Vst3Component {}

impl Vst3Component {
    pub(crate) fn new(component: ComPtr<IComponent>, library: Arc<LibraryGuard>) -> Self {
        Self {
            component,
            connection: None,
            library,
        }
    }

    fn disconnect(&mut self) {
        if let Some((component, controller)) = self.connection.take() {
            unsafe {
                component.disconnect(controller.as_ptr());
                controller.disconnect(component.as_ptr());
            }
        }
    }
}

impl Component for Vst3Component {
    fn controller_class_id(&self) -> PluginResult<ClassId> {
        let mut tuid: Steinberg::TUID = [0; 16];
        check(unsafe { self.component.getControllerClassId(&mut tuid) })?;
        Ok(tuid_to_class_id(&tuid))
    }

    fn bus_count(&self, media_type: MediaType, direction: BusDirection) -> i32 {
        unsafe {
            self.component.getBusCount(
                convert::media_type(media_type),
                convert::bus_direction(direction),
            )
        }
    }

    fn bus_info(
        &self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
    ) -> PluginResult<BusInfo> {
        let mut info: VstBusInfo = unsafe { std::mem::zeroed() };
        check(unsafe {
            self.component.getBusInfo(
                convert::media_type(media_type),
                convert::bus_direction(direction),
                index,
                &mut info,
            )
        })?;
        Ok(convert::bus_info(&info))
    }

    fn activate_bus(
        &mut self,
        media_type: MediaType,
        direction: BusDirection,
        index: i32,
        active: bool,
    ) -> PluginResult {
        check(unsafe {
            self.component.activateBus(
                convert::media_type(media_type),
                convert::bus_direction(direction),
                index,
                active as u8,
            )
        })
    }

    fn set_active(&mut self, active: bool) -> PluginResult {
        check(unsafe { self.component.setActive(active as u8) })
    }

    fn get_state(&mut self) -> PluginResult<Vec<u8>> {
        read_state(|stream| unsafe { self.component.getState(stream) })
    }

    fn set_state(&mut self, state: &[u8]) -> PluginResult {
        write_state(state, |stream| unsafe { self.component.setState(stream) })
    }

    fn audio_processor(&self) -> Option<Box<dyn AudioProcessor>> {
        let processor = self.component.cast::<IAudioProcessor>()?;
        Some(Box::new(Vst3Processor::new(
            processor,
            self.library.clone(),
        )))
    }

    fn edit_controller(&self) -> Option<Box<dyn EditController>> {
        let controller = self.component.cast::<IEditController>()?;
        Some(Box::new(Vst3Controller::new(
            controller,
            false,
            self.library.clone(),
        )))
    }

    fn connect(&mut self, controller: &dyn EditController) -> PluginResult {
        let Some(controller) = controller
            .as_any()
            .and_then(|any| any.downcast_ref::<Vst3Controller>())
        else {
            return Ok(());
        };
        let pair = (
            self.component.cast::<IConnectionPoint>(),
            controller.controller.cast::<IConnectionPoint>(),
        );
        if let (Some(component), Some(controller)) = pair {
            unsafe {
                component.connect(controller.as_ptr());
                controller.connect(component.as_ptr());
            }
            tracing::debug!("Connected VST3 component and controller");
            self.connection = Some((component, controller));
        }
        Ok(())
    }

    fn terminate(&mut self) -> PluginResult {
        self.disconnect();
        check(unsafe { self.component.terminate() })
    }
}

pub(crate) struct Vst3Processor {
    processor: ComPtr<IAudioProcessor>,
    events: ComWrapper<HostEventList>,
    input_changes: ComWrapper<HostParameterChanges>,
    output_changes: ComWrapper<HostParameterChanges>,
    _library: Arc<LibraryGuard>,
}

// SAFETY: see `Vst3Component`.
unsafe impl Send for Vst3Processor {}

impl Vst3Processor {
    fn new(processor: ComPtr<IAudioProcessor>, library: Arc<LibraryGuard>) -> Self {
        Self {
            processor,
            events: ComWrapper::new(HostEventList::with_capacity(EVENT_LIST_CAPACITY)),
            input_changes: ComWrapper::new(HostParameterChanges::with_capacity(INPUT_QUEUE_POOL)),
            output_changes: ComWrapper::new(HostParameterChanges::with_capacity(
                OUTPUT_QUEUE_POOL,
            )),
            _library: library,
        }
    }
}

/// Per-bus channel pointer table, kept alive for the duration of one call.
enum ChannelPointers {
    Sample32(Vec<*mut f32>),
    Sample64(Vec<*mut f64>),
}

impl ChannelPointers {
    fn collect(channels: &mut ChannelBuffers) -> Self {
        match channels {
            ChannelBuffers::Sample32(buffers) => {
                Self::Sample32(buffers.iter_mut().map(|b| b.as_mut_ptr()).collect())
            }
            ChannelBuffers::Sample64(buffers) => {
                Self::Sample64(buffers.iter_mut().map(|b| b.as_mut_ptr()).collect())
            }
        }
    }

    fn bus(&mut self, silence_flags: u64) -> AudioBusBuffers {
        match self {
            Self::Sample32(ptrs) => AudioBusBuffers {
                numChannels: ptrs.len() as i32,
                silenceFlags: silence_flags,
                __field0: AudioBusBuffers__type0 {
                    channelBuffers32: ptrs.as_mut_ptr(),
                },
            },
            Self::Sample64(ptrs) => AudioBusBuffers {
                numChannels: ptrs.len() as i32,
                silenceFlags: silence_flags,
                __field0: AudioBusBuffers__type0 {
                    channelBuffers64: ptrs.as_mut_ptr(),
                },
            },
        }
    }
}

impl AudioProcessor for Vst3Processor {
    fn can_process_sample_size(&self, sample_size: SampleSize) -> bool {
        let result =
            unsafe { self.processor.canProcessSampleSize(convert::sample_size(sample_size)) };
        result == kResultOk
    }

    fn latency_samples(&self) -> u32 {
        unsafe { self.processor.getLatencySamples() }
    }

    fn setup_processing(&mut self, setup: &ProcessSetup) -> PluginResult {
        let mut vst_setup = VstProcessSetup {
            processMode: convert::process_mode(setup.process_mode),
            symbolicSampleSize: convert::sample_size(setup.sample_size),
            maxSamplesPerBlock: setup.max_samples_per_block,
            sampleRate: setup.sample_rate,
        };
        check(unsafe { self.processor.setupProcessing(&mut vst_setup) })
    }

    fn set_processing(&mut self, processing: bool) -> PluginResult {
        check(unsafe { self.processor.setProcessing(processing as u8) })
    }

    fn process(&mut self, data: &mut ProcessData<'_>) -> PluginResult {
        self.events
            .fill(data.input_events.iter().map(convert::event));
        let dropped = self.input_changes.load(data.input_parameter_changes);
        if dropped > 0 {
            tracing::warn!(dropped, "VST3 parameter queue pool exhausted");
        }
        self.output_changes.clear();

        let mut input_ptrs: Vec<ChannelPointers> = data
            .inputs
            .iter_mut()
            .map(|bus| ChannelPointers::collect(&mut bus.channels))
            .collect();
        let mut output_ptrs: Vec<ChannelPointers> = data
            .outputs
            .iter_mut()
            .map(|bus| ChannelPointers::collect(&mut bus.channels))
            .collect();
        let mut inputs: Vec<AudioBusBuffers> = input_ptrs
            .iter_mut()
            .zip(data.inputs.iter())
            .map(|(ptrs, bus)| ptrs.bus(bus.silence_flags))
            .collect();
        let mut outputs: Vec<AudioBusBuffers> = output_ptrs
            .iter_mut()
            .zip(data.outputs.iter())
            .map(|(ptrs, bus)| ptrs.bus(bus.silence_flags))
            .collect();

        let ctx = data.process_context;
        let mut context: VstProcessContext = unsafe { std::mem::zeroed() };
        context.state = ctx.state;
        context.sampleRate = ctx.sample_rate;
        context.projectTimeSamples = ctx.project_time_samples;
        context.continousTimeSamples = ctx.continuous_time_samples;
        context.projectTimeMusic = ctx.project_time_music;
        context.tempo = ctx.tempo;
        context.timeSigNumerator = ctx.time_sig_numerator;
        context.timeSigDenominator = ctx.time_sig_denominator;

        let input_changes = self
            .input_changes
            .as_com_ref::<IParameterChanges>()
            .ok_or(ResultCode::NoInterface)?
            .as_ptr();
        let output_changes = self
            .output_changes
            .as_com_ref::<IParameterChanges>()
            .ok_or(ResultCode::NoInterface)?
            .as_ptr();
        let events = self
            .events
            .as_com_ref::<IEventList>()
            .ok_or(ResultCode::NoInterface)?
            .as_ptr();

        let mut vst_data = VstProcessData {
            processMode: convert::process_mode(data.process_mode),
            symbolicSampleSize: convert::sample_size(data.sample_size),
            numSamples: data.num_samples,
            numInputs: inputs.len() as i32,
            numOutputs: outputs.len() as i32,
            inputs: if inputs.is_empty() {
                std::ptr::null_mut()
            } else {
                inputs.as_mut_ptr()
            },
            outputs: if outputs.is_empty() {
                std::ptr::null_mut()
            } else {
                outputs.as_mut_ptr()
            },
            inputParameterChanges: input_changes,
            outputParameterChanges: output_changes,
            inputEvents: events,
            outputEvents: std::ptr::null_mut(),
            processContext: &mut context,
        };

        let result = check(unsafe { self.processor.process(&mut vst_data) });

        for (bus, vst_bus) in data.outputs.iter_mut().zip(outputs.iter()) {
            bus.silence_flags = vst_bus.silenceFlags;
        }
        result
    }
}

struct Vst3MidiMapping(ComPtr<IMidiMapping>);

impl MidiMapping for Vst3MidiMapping {
    fn midi_controller_assignment(
        &self,
        bus_index: i32,
        channel: i16,
        controller: u16,
    ) -> Option<ParamId> {
        let mut id = 0;
        let result = unsafe {
            self.0
                .getMidiControllerAssignment(bus_index, channel, controller as i16, &mut id)
        };
        (result == kResultOk).then_some(id)
    }
}

struct Vst3UnitInfo(ComPtr<IUnitInfo>);

impl UnitInfoSource for Vst3UnitInfo {
    fn unit_count(&self) -> i32 {
        unsafe { self.0.getUnitCount() }
    }

    fn unit_info(&self, index: i32) -> PluginResult<UnitInfo> {
        let mut info: VstUnitInfo = unsafe { std::mem::zeroed() };
        check(unsafe { self.0.getUnitInfo(index, &mut info) })?;
        Ok(convert::unit_info(&info))
    }

    fn program_list_count(&self) -> i32 {
        unsafe { self.0.getProgramListCount() }
    }

    fn program_list_info(&self, index: i32) -> PluginResult<ProgramListInfo> {
        let mut info: VstProgramListInfo = unsafe { std::mem::zeroed() };
        check(unsafe { self.0.getProgramListInfo(index, &mut info) })?;
        Ok(convert::program_list_info(&info))
    }

    fn program_name(&self, list_id: ProgramListId, index: i32) -> PluginResult<String> {
        let mut name: String128 = [0; 128];
        check(unsafe { self.0.getProgramName(list_id, index, &mut name) })?;
        Ok(string128_to_string(&name))
    }
}

pub(crate) struct Vst3Controller {
    controller: ComPtr<IEditController>,
    midi_mapping: Option<Vst3MidiMapping>,
    unit_info: Option<Vst3UnitInfo>,
    // False when the controller is the component itself.
    owns_lifecycle: bool,
    _handler: ComWrapper<ComponentHandler>,
    _library: Arc<LibraryGuard>,
}

// SAFETY: see `Vst3Component`.
unsafe impl Send for Vst3Controller {}

impl Vst3Controller {
    pub(crate) fn new(
        controller: ComPtr<IEditController>,
        owns_lifecycle: bool,
        library: Arc<LibraryGuard>,
    ) -> Self {
        let handler = ComWrapper::new(ComponentHandler);
        if let Some(ptr) = handler.as_com_ref::<IComponentHandler>() {
            unsafe { controller.setComponentHandler(ptr.as_ptr()) };
        }
        Self {
            midi_mapping: controller.cast::<IMidiMapping>().map(Vst3MidiMapping),
            unit_info: controller.cast::<IUnitInfo>().map(Vst3UnitInfo),
            controller,
            owns_lifecycle,
            _handler: handler,
            _library: library,
        }
    }
}

impl EditController for Vst3Controller {
    fn set_component_state(&mut self, state: &[u8]) -> PluginResult {
        write_state(state, |stream| unsafe {
            self.controller.setComponentState(stream)
        })
    }

    fn get_state(&mut self) -> PluginResult<Vec<u8>> {
        read_state(|stream| unsafe { self.controller.getState(stream) })
    }

    fn set_state(&mut self, state: &[u8]) -> PluginResult {
        write_state(state, |stream| unsafe { self.controller.setState(stream) })
    }

    fn parameter_count(&self) -> i32 {
        unsafe { self.controller.getParameterCount() }
    }

    fn parameter_info(&self, index: i32) -> PluginResult<ParameterInfo> {
        let mut info: VstParameterInfo = unsafe { std::mem::zeroed() };
        check(unsafe { self.controller.getParameterInfo(index, &mut info) })?;
        Ok(convert::parameter_info(&info))
    }

    fn param_normalized(&self, id: ParamId) -> ParamValue {
        unsafe { self.controller.getParamNormalized(id) }
    }

    fn set_param_normalized(&mut self, id: ParamId, value: ParamValue) -> PluginResult {
        check(unsafe { self.controller.setParamNormalized(id, value) })
    }

    fn midi_mapping(&self) -> Option<&dyn MidiMapping> {
        self.midi_mapping.as_ref().map(|m| m as &dyn MidiMapping)
    }

    fn unit_info(&self) -> Option<&dyn UnitInfoSource> {
        self.unit_info.as_ref().map(|u| u as &dyn UnitInfoSource)
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn terminate(&mut self) -> PluginResult {
        unsafe { self.controller.setComponentHandler(std::ptr::null_mut()) };
        if self.owns_lifecycle {
            check(unsafe { self.controller.terminate() })
        } else {
            Ok(())
        }
    }
}
