//! Conversions between VST3 structures and plughost-abi value types.

use plughost_abi::{
    BusDirection, BusInfo, BusType, ClassId, ClassInfo, Event, EventKind, MediaType,
    ParameterInfo, PluginResult, ProcessMode, ProgramListInfo, ResultCode, SampleSize, UnitInfo,
};
use std::ffi::c_char;
use vst3::Steinberg::Vst::BusDirections_::{kInput, kOutput};
use vst3::Steinberg::Vst::BusTypes_::kMain;
use vst3::Steinberg::Vst::Event_::EventTypes_::{kNoteOffEvent, kNoteOnEvent, kPolyPressureEvent};
use vst3::Steinberg::Vst::MediaTypes_::{kAudio, kEvent};
use vst3::Steinberg::Vst::ProcessModes_::{kOffline, kPrefetch, kRealtime};
use vst3::Steinberg::Vst::SymbolicSampleSizes_::{kSample32, kSample64};
use vst3::Steinberg::Vst::{
    BusInfo as VstBusInfo, Event as VstEvent, Event__type0, NoteOffEvent, NoteOnEvent,
    ParameterInfo as VstParameterInfo, PolyPressureEvent, ProgramListInfo as VstProgramListInfo,
    String128, UnitInfo as VstUnitInfo,
};
use vst3::Steinberg::{
    self, kInternalError, kInvalidArgument, kNoInterface, kNotImplemented, kNotInitialized,
    kOutOfMemory, kResultFalse, kResultOk, tresult, PClassInfo, PClassInfo2,
};

pub(crate) fn check(result: tresult) -> PluginResult {
    match result {
        r if r == kResultOk => Ok(()),
        r if r == kResultFalse => Err(ResultCode::False),
        r if r == kNoInterface => Err(ResultCode::NoInterface),
        r if r == kInvalidArgument => Err(ResultCode::InvalidArgument),
        r if r == kNotImplemented => Err(ResultCode::NotImplemented),
        r if r == kInternalError => Err(ResultCode::InternalError),
        r if r == kNotInitialized => Err(ResultCode::NotInitialized),
        r if r == kOutOfMemory => Err(ResultCode::OutOfMemory),
        other => Err(ResultCode::Other(other)),
    }
}

pub(crate) fn string128_to_string(s: &String128) -> String {
    let end = s.iter().position(|&c| c == 0).unwrap_or(s.len());
    String::from_utf16_lossy(&s[..end])
}

pub(crate) fn string_to_string128(s: &str) -> String128 {
    let mut buf: String128 = [0u16; 128];
    for (i, ch) in s.encode_utf16().take(127).enumerate() {
        buf[i] = ch;
    }
    buf
}

pub(crate) fn char_array_to_string(s: &[c_char]) -> String {
    let end = s.iter().position(|&c| c == 0).unwrap_or(s.len());
    let bytes: Vec<u8> = s[..end].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub(crate) fn tuid_to_class_id(tuid: &Steinberg::TUID) -> ClassId {
    let mut bytes = [0u8; 16];
    for (dst, src) in bytes.iter_mut().zip(tuid.iter()) {
        *dst = *src as u8;
    }
    ClassId::new(bytes)
}

pub(crate) fn class_id_to_tuid(id: &ClassId) -> Steinberg::TUID {
    let mut tuid: Steinberg::TUID = [0; 16];
    for (dst, src) in tuid.iter_mut().zip(id.as_bytes().iter()) {
        *dst = *src as c_char;
    }
    tuid
}

/// Convert an interface `Guid` to the TUID expected by `createInstance`.
pub(crate) fn guid_to_tuid(guid: &vst3::com_scrape_types::Guid) -> Steinberg::TUID {
    let mut tuid: Steinberg::TUID = [0; 16];
    for (dst, src) in tuid.iter_mut().zip(guid.iter()) {
        *dst = *src as c_char;
    }
    tuid
}

pub(crate) fn class_info(info: &PClassInfo) -> ClassInfo {
    let mut class = ClassInfo::new(tuid_to_class_id(&info.cid), char_array_to_string(&info.name));
    class.cardinality = info.cardinality;
    class.category = char_array_to_string(&info.category);
    class
}

pub(crate) fn class_info2(info: &PClassInfo2) -> ClassInfo {
    let mut class = ClassInfo::new(tuid_to_class_id(&info.cid), char_array_to_string(&info.name))
        .category(char_array_to_string(&info.category))
        .vendor(char_array_to_string(&info.vendor))
        .version(char_array_to_string(&info.version))
        .sub_categories(char_array_to_string(&info.subCategories));
    class.cardinality = info.cardinality;
    class.sdk_version = char_array_to_string(&info.sdkVersion);
    class.class_flags = info.classFlags;
    class
}

pub(crate) fn media_type(media_type: MediaType) -> i32 {
    match media_type {
        MediaType::Audio => kAudio as i32,
        MediaType::Event => kEvent as i32,
    }
}

pub(crate) fn bus_direction(direction: BusDirection) -> i32 {
    match direction {
        BusDirection::Input => kInput as i32,
        BusDirection::Output => kOutput as i32,
    }
}

pub(crate) fn sample_size(size: SampleSize) -> i32 {
    match size {
        SampleSize::Sample32 => kSample32 as i32,
        SampleSize::Sample64 => kSample64 as i32,
    }
}

pub(crate) fn process_mode(mode: ProcessMode) -> i32 {
    match mode {
        ProcessMode::Realtime => kRealtime as i32,
        ProcessMode::Prefetch => kPrefetch as i32,
        ProcessMode::Offline => kOffline as i32,
    }
}

pub(crate) fn bus_info(info: &VstBusInfo) -> BusInfo {
    BusInfo {
        media_type: if info.mediaType == kAudio as i32 {
            MediaType::Audio
        } else {
            MediaType::Event
        },
        direction: if info.direction == kInput as i32 {
            BusDirection::Input
        } else {
            BusDirection::Output
        },
        channel_count: info.channelCount,
        name: string128_to_string(&info.name),
        bus_type: if info.busType == kMain as i32 {
            BusType::Main
        } else {
            BusType::Aux
        },
        flags: info.flags,
    }
}

pub(crate) fn parameter_info(info: &VstParameterInfo) -> ParameterInfo {
    ParameterInfo {
        id: info.id,
        title: string128_to_string(&info.title),
        short_title: string128_to_string(&info.shortTitle),
        units: string128_to_string(&info.units),
        step_count: info.stepCount,
        default_normalized_value: info.defaultNormalizedValue,
        unit_id: info.unitId,
        flags: info.flags as u32,
    }
}

pub(crate) fn unit_info(info: &VstUnitInfo) -> UnitInfo {
    UnitInfo {
        id: info.id,
        parent_unit_id: info.parentUnitId,
        name: string128_to_string(&info.name),
        program_list_id: info.programListId,
    }
}

pub(crate) fn program_list_info(info: &VstProgramListInfo) -> ProgramListInfo {
    ProgramListInfo {
        id: info.id,
        name: string128_to_string(&info.name),
        program_count: info.programCount,
    }
}

pub(crate) fn event(event: &Event) -> VstEvent {
    let (r#type, payload) = match event.kind {
        EventKind::NoteOn {
            channel,
            pitch,
            tuning,
            velocity,
            length,
            note_id,
        } => (
            kNoteOnEvent,
            Event__type0 {
                noteOn: NoteOnEvent {
                    channel,
                    pitch,
                    tuning,
                    velocity,
                    length,
                    noteId: note_id,
                },
            },
        ),
        EventKind::NoteOff {
            channel,
            pitch,
            velocity,
            note_id,
            tuning,
        } => (
            kNoteOffEvent,
            Event__type0 {
                noteOff: NoteOffEvent {
                    channel,
                    pitch,
                    velocity,
                    noteId: note_id,
                    tuning,
                },
            },
        ),
        EventKind::PolyPressure {
            channel,
            pitch,
            pressure,
            note_id,
        } => (
            kPolyPressureEvent,
            Event__type0 {
                polyPressure: PolyPressureEvent {
                    channel,
                    pitch,
                    pressure,
                    noteId: note_id,
                },
            },
        ),
    };
    VstEvent {
        busIndex: event.bus_index,
        sampleOffset: event.sample_offset,
        ppqPosition: event.ppq_position,
        flags: event.flags,
        r#type: r#type as u16,
        __field0: payload,
    }
}
