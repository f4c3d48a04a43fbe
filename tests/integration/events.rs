//! Event integration tests
//!
//! Notes, MIDI channel messages and parameter automation, checked against
//! what the mock plugin received in its process call.

use crate::helpers::*;
use approx::assert_relative_eq;
use plughost::abi::event::EventKind;
use plughost::abi::mock::{MockHandle, MockPlugin};
use plughost::abi::{ParameterInfo, CTRL_AFTER_TOUCH, CTRL_PITCH_BEND};
use plughost::prelude::*;
use plughost::MidiMessage;
use std::path::Path;

struct Rig {
    registry: HostRegistry,
    engine: FakeEngine,
    audio: PluginAudio,
    state: MockHandle,
    handle: i32,
}

impl Rig {
    fn new(plugin: MockPlugin) -> Self {
        let name = plugin.info.name.clone();
        let (loader, mut registry) = test_registry(vec![plugin]);
        let engine = FakeEngine::new(1);
        let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, &name, false);
        let audio = PluginAudio::init(&registry, &engine, handle, 2, 2).unwrap();
        let state = loader
            .loaded_module(Path::new(MODULE_PATH))
            .unwrap()
            .last_instance()
            .unwrap();
        Self {
            registry,
            engine,
            audio,
            state,
            handle,
        }
    }

    fn run_block(&mut self) {
        let input = generate_silence(TEST_BLOCK_SIZE);
        let mut left = generate_silence(TEST_BLOCK_SIZE);
        let mut right = generate_silence(TEST_BLOCK_SIZE);
        let inputs = [&input[..], &input[..]];
        assert!(self.audio.audio(
            &self.engine,
            &inputs,
            &mut [&mut left[..], &mut right[..]]
        ));
        self.engine.advance();
    }
}

/// The note on carries the id the opcode reports and the off comes later.
#[test]
fn test_scenario_d_note_lifecycle() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    rig.engine.set_frames(12000);
    rig.engine.set_score_time(0.25);

    let mut note = PluginNote::init(&rig.registry, &rig.engine, rig.handle, 0, 60.0, 100.0, 0.5)
        .unwrap();
    assert_eq!(note.note_id(), 1);
    assert_relative_eq!(note.off_time().unwrap(), 0.75);
    rig.run_block();

    {
        let state = rig.state.lock();
        assert_eq!(state.events.len(), 1);
        let on = state.events[0];
        assert_eq!(on.sample_offset, 0);
        match on.kind {
            EventKind::NoteOn {
                pitch,
                velocity,
                length,
                note_id,
                ..
            } => {
                assert_eq!(pitch, 60);
                assert_relative_eq!(velocity, 100.0 / 127.0);
                assert_eq!(length, 24000);
                assert_eq!(note_id, note.note_id());
            }
            other => panic!("expected note on, got {other:?}"),
        }
    }

    assert!(note.release());
    assert!(!note.release());
    rig.run_block();

    let state = rig.state.lock();
    assert_eq!(state.events.len(), 2);
    assert!(matches!(
        state.events[1].kind,
        EventKind::NoteOff { pitch: 60, note_id: 1, .. }
    ));
}

#[test]
fn test_note_ids_are_unique_per_instance() {
    let rig = Rig::new(MockPlugin::effect("Synth"));
    let ids: Vec<i32> = [60.0, 62.0, 64.0]
        .into_iter()
        .map(|key| {
            let note = PluginNote::init(&rig.registry, &rig.engine, rig.handle, 0, key, 90.0, 1.0);
            note.unwrap().note_id()
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_zero_duration_note_schedules_nothing() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut note =
        PluginNote::init(&rig.registry, &rig.engine, rig.handle, 0, 60.0, 100.0, 0.0).unwrap();
    assert_eq!(note.note_id(), 0);
    assert!(note.off_time().is_none());
    assert!(!note.release());
    rig.run_block();
    assert!(rig.state.lock().events.is_empty());
}

/// An unmapped controller change produces neither an event nor a change.
#[test]
fn test_scenario_e_unmapped_controller_is_dropped() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut midi = PluginMidiOut::init(&rig.registry, &rig.engine, rig.handle).unwrap();
    assert!(!midi.send(0xB0, 0, 7, 100));
    rig.run_block();

    let state = rig.state.lock();
    assert!(state.events.is_empty());
    assert!(state.parameter_changes.iter().all(|c| c.is_empty()));
}

#[test]
fn test_mapped_controllers_become_parameter_changes() {
    let plugin = MockPlugin::effect("Synth")
        .parameter(ParameterInfo::new(42, "Volume", 0.0))
        .midi_mapping(0, 0, 7, 42)
        .midi_mapping(0, 0, CTRL_PITCH_BEND, 43)
        .midi_mapping(0, 0, CTRL_AFTER_TOUCH, 44);
    let mut rig = Rig::new(plugin);
    let mut midi = PluginMidiOut::init(&rig.registry, &rig.engine, rig.handle).unwrap();

    assert!(midi.send(0xB0, 0, 7, 127));
    assert!(midi.send(0xE0, 0, 0, 64));
    assert!(midi.send(0xD0, 0, 64, 0));
    // Same controller on another channel has no mapping.
    assert!(!midi.send(0xB0, 1, 7, 127));
    rig.run_block();

    let state = rig.state.lock();
    assert!(state.events.is_empty());
    assert_relative_eq!(state.params[&42], 1.0);
    assert_relative_eq!(state.params[&43], 8192.0 / 16383.0);
    assert_relative_eq!(state.params[&44], 64.0 / 127.0);
    drop(state);

    let get = PluginParamGet::init(&rig.registry, &rig.engine, rig.handle).unwrap();
    assert_relative_eq!(get.value(42), 1.0);
}

#[test]
fn test_midi_messages_become_events() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut midi = PluginMidiOut::init(&rig.registry, &rig.engine, rig.handle).unwrap();

    assert!(midi.send(0x90, 3, 64, 127));
    assert!(midi.send(0x90, 3, 64, 0));
    assert!(midi.send(0xA0, 3, 64, 50));
    assert!(midi.send(0x80, 3, 65, 10));
    rig.run_block();

    let state = rig.state.lock();
    let kinds: Vec<EventKind> = state.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds.len(), 4);
    assert!(matches!(
        kinds[0],
        EventKind::NoteOn { channel: 3, pitch: 64, note_id: -1, .. }
    ));
    // Velocity zero is a note off.
    assert!(matches!(kinds[1], EventKind::NoteOff { channel: 3, pitch: 64, .. }));
    assert!(matches!(kinds[2], EventKind::PolyPressure { pitch: 64, .. }));
    assert!(matches!(kinds[3], EventKind::NoteOff { pitch: 65, .. }));
    assert!(state.events.iter().all(|e| e.bus_index == 0));
}

#[test]
fn test_midi_on_missing_bus_is_dropped() {
    let rig = Rig::new(MockPlugin::effect("Synth").midi_mapping(0, 0, 7, 42));
    let instance = rig.registry.instance(1, rig.handle).unwrap();
    let mut plugin = instance.lock();
    assert!(!plugin.handle_midi(&MidiMessage::new(0xB0, 0, 7, 64), 3));
    assert!(plugin.handle_midi(&MidiMessage::new(0xB0, 0, 7, 64), 0));
}

#[test]
fn test_repeated_midi_message_is_sent_once() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut midi = PluginMidiOut::init(&rig.registry, &rig.engine, rig.handle).unwrap();

    assert!(midi.send(0x90, 0, 60, 100));
    assert!(!midi.send(0x90, 0, 60, 100));
    assert!(midi.send(0x90, 0, 62, 100));
    assert!(midi.send(0x90, 0, 60, 100));
    rig.run_block();
    assert_eq!(rig.state.lock().events.len(), 3);
}

/// Two sets within one block arrive as two points, in offset order.
#[test]
fn test_parameter_sets_keep_their_offsets() {
    let plugin = MockPlugin::effect("Synth").parameter(ParameterInfo::new(5, "Cutoff", 0.5));
    let mut rig = Rig::new(plugin);
    let mut set = PluginParamSet::init(&rig.registry, &rig.engine, rig.handle).unwrap();

    rig.engine.set_frames(40);
    assert!(set.set(&rig.engine, 5, 0.6));
    rig.engine.set_frames(10);
    assert!(set.set(&rig.engine, 5, 0.2));
    // Unchanged value is not sent again.
    assert!(!set.set(&rig.engine, 5, 0.2));

    rig.engine.set_frames(0);
    rig.run_block();

    let state = rig.state.lock();
    let changes = state.parameter_changes.last().unwrap();
    let points: Vec<(i32, f64)> = changes
        .find(5)
        .unwrap()
        .points()
        .iter()
        .map(|p| (p.sample_offset, p.value))
        .collect();
    assert_eq!(points, vec![(10, 0.2), (40, 0.6)]);
    assert_relative_eq!(state.params[&5], 0.6);
}

#[test]
fn test_parameter_set_offset_is_clamped_to_block() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut set = PluginParamSet::init(&rig.registry, &rig.engine, rig.handle).unwrap();

    rig.engine.set_frames(1000);
    assert!(set.set(&rig.engine, 9, 0.4));
    rig.engine.set_frames(0);
    rig.run_block();

    let state = rig.state.lock();
    let queue = state.parameter_changes[0].find(9).unwrap();
    assert_eq!(queue.points()[0].sample_offset, TEST_BLOCK_SIZE as i32 - 1);
}

#[test]
fn test_changes_are_consumed_by_one_block() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut set = PluginParamSet::init(&rig.registry, &rig.engine, rig.handle).unwrap();
    assert!(set.set(&rig.engine, 5, 0.9));
    rig.run_block();
    rig.run_block();

    let state = rig.state.lock();
    assert_eq!(state.parameter_changes.len(), 2);
    assert!(!state.parameter_changes[0].is_empty());
    assert!(state.parameter_changes[1].is_empty());
}

#[test]
fn test_tempo_reaches_process_context() {
    let mut rig = Rig::new(MockPlugin::effect("Synth"));
    let mut tempo = PluginTempo::init(&rig.registry, &rig.engine, rig.handle).unwrap();
    tempo.set(140.0);
    rig.run_block();

    let state = rig.state.lock();
    let context = state.contexts.last().unwrap();
    assert_eq!(context.tempo, 140.0);
    assert_eq!(context.sample_rate, TEST_SAMPLE_RATE);
}
