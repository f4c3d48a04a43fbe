//! Preset integration tests
//!
//! Saving and loading through the preset opcodes against real files.

use crate::helpers::*;
use plughost::abi::mock::{ControllerKind, MockCall, MockHandle, MockPlugin};
use plughost::prelude::*;
use plughost::PresetFile;
use std::path::Path;
use tempfile::TempDir;

fn setup(plugins: Vec<MockPlugin>) -> (HostRegistry, FakeEngine, Vec<MockHandle>) {
    let names: Vec<String> = plugins.iter().map(|p| p.info.name.clone()).collect();
    let (loader, mut registry) = test_registry(plugins);
    let engine = FakeEngine::new(1);
    for name in &names {
        PluginInit::init(&mut registry, &engine, MODULE_PATH, name, false);
    }
    let states = loader
        .loaded_module(Path::new(MODULE_PATH))
        .unwrap()
        .instances();
    (registry, engine, states)
}

#[test]
fn test_preset_round_trip_through_opcodes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("warm.vstpreset");
    let (registry, engine, states) = setup(vec![MockPlugin::effect("Delay")]);

    {
        let mut state = states[0].lock();
        state.component_state = b"time=0.4;feedback=0.7".to_vec();
        state.controller_state = b"ui=compact".to_vec();
    }
    assert!(PluginPresetSave::init(&registry, &engine, 0, &path));

    let preset = PresetFile::read(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(preset.component_state, b"time=0.4;feedback=0.7");
    assert_eq!(preset.controller_state.as_deref(), Some(&b"ui=compact"[..]));

    {
        let mut state = states[0].lock();
        state.component_state.clear();
        state.controller_state.clear();
    }
    assert!(PluginPresetLoad::init(&registry, &engine, 0, &path));

    let state = states[0].lock();
    assert_eq!(state.component_state, b"time=0.4;feedback=0.7");
    assert_eq!(
        state.synced_component_state.as_deref(),
        Some(&b"time=0.4;feedback=0.7"[..])
    );
    assert_eq!(state.controller_state, b"ui=compact");
}

#[test]
fn test_preset_for_another_plugin_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("delay.vstpreset");
    let (registry, engine, states) = setup(vec![
        MockPlugin::effect("Delay"),
        MockPlugin::effect("Reverb"),
    ]);
    assert!(PluginPresetSave::init(&registry, &engine, 0, &path));
    assert!(!PluginPresetLoad::init(&registry, &engine, 1, &path));
    assert_eq!(states[1].lock().count(MockCall::SetState), 0);
}

#[test]
fn test_preset_without_controller() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bare.vstpreset");
    let plugin = MockPlugin::effect("Gain").controller(ControllerKind::None);
    let (registry, engine, states) = setup(vec![plugin]);
    states[0].lock().component_state = vec![1, 2, 3];

    assert!(PluginPresetSave::init(&registry, &engine, 0, &path));
    let preset = PresetFile::read(&std::fs::read(&path).unwrap()).unwrap();
    assert!(preset.controller_state.is_none());

    states[0].lock().component_state.clear();
    assert!(PluginPresetLoad::init(&registry, &engine, 0, &path));
    assert_eq!(states[0].lock().component_state, vec![1, 2, 3]);
}

#[test]
fn test_missing_or_corrupt_files_fail() {
    let dir = TempDir::new().unwrap();
    let (registry, engine, _) = setup(vec![MockPlugin::effect("Delay")]);

    let missing = dir.path().join("missing.vstpreset");
    assert!(!PluginPresetLoad::init(&registry, &engine, 0, &missing));

    let corrupt = dir.path().join("corrupt.vstpreset");
    std::fs::write(&corrupt, b"not a preset").unwrap();
    assert!(!PluginPresetLoad::init(&registry, &engine, 0, &corrupt));

    let unwritable = dir.path().join("no_such_dir").join("out.vstpreset");
    assert!(!PluginPresetSave::init(&registry, &engine, 0, &unwritable));
}

#[test]
fn test_rejected_state_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("delay.vstpreset");
    let (registry, engine, states) = setup(vec![MockPlugin::effect("Delay")]);
    assert!(PluginPresetSave::init(&registry, &engine, 0, &path));

    // Initialization already synced the controller once.
    let synced = {
        let mut state = states[0].lock();
        state.failures.insert(MockCall::SetState);
        state.count(MockCall::SetComponentState)
    };
    assert!(!PluginPresetLoad::init(&registry, &engine, 0, &path));
    assert_eq!(states[0].lock().count(MockCall::SetComponentState), synced);
}

#[test]
fn test_invalid_handle_fails() {
    let dir = TempDir::new().unwrap();
    let (registry, engine, _) = setup(vec![MockPlugin::effect("Delay")]);
    let path = dir.path().join("x.vstpreset");
    assert!(!PluginPresetSave::init(&registry, &engine, 7, &path));
    assert!(!path.exists());
}
