//! Registry integration tests
//!
//! Loading through the init opcode, handle numbering, module sharing and
//! per-engine teardown.

use crate::helpers::*;
use plughost::abi::mock::{MockCall, MockPlugin};
use plughost::opcodes::teardown;
use plughost::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Two loads of the same plugin get handles 0 and 1 and share one module.
#[test]
fn test_scenario_a_handles_and_shared_module() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);

    assert_eq!(
        PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false),
        0
    );
    assert_eq!(
        PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false),
        1
    );
    assert_eq!(loader.load_count(), 1);

    let module = loader.loaded_module(Path::new(MODULE_PATH)).unwrap();
    assert_eq!(module.instances().len(), 2);
}

#[test]
fn test_handles_stay_stable() {
    let (_, mut registry) = test_registry(vec![
        MockPlugin::effect("Delay"),
        MockPlugin::effect("Reverb"),
    ]);
    let engine = FakeEngine::new(1);

    let delay = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);
    let first = registry.instance(1, delay).unwrap();
    for _ in 0..4 {
        PluginInit::init(&mut registry, &engine, MODULE_PATH, "Reverb", false);
    }
    let again = registry.instance(1, delay).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.lock().class_info().unwrap().name, "Delay");
}

#[test]
fn test_invalid_path_or_name_returns_minus_one() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);

    assert_eq!(
        PluginInit::init(&mut registry, &engine, "/nowhere.vst3", "Delay", false),
        -1
    );
    assert_eq!(
        PluginInit::init(&mut registry, &engine, MODULE_PATH, "Flanger", true),
        -1
    );
    assert_eq!(registry.instance_count(1), 0);
    // The module itself opened fine and stays cached.
    assert_eq!(loader.load_count(), 1);
    assert!(registry.is_module_loaded(MODULE_PATH));
}

#[test]
fn test_non_audio_classes_are_not_instantiated() {
    let editor = MockPlugin::effect("Editor").category("Plugin Compatibility Class");
    let (_, mut registry) = test_registry(vec![editor]);
    let engine = FakeEngine::new(1);
    assert_eq!(
        PluginInit::init(&mut registry, &engine, MODULE_PATH, "Editor", false),
        -1
    );
}

#[test]
fn test_engines_have_independent_handles() {
    let (_, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let first = FakeEngine::new(1);
    let second = FakeEngine::new(2);

    assert_eq!(
        PluginInit::init(&mut registry, &first, MODULE_PATH, "Delay", false),
        0
    );
    assert_eq!(
        PluginInit::init(&mut registry, &second, MODULE_PATH, "Delay", false),
        0
    );
    assert_eq!(
        PluginInit::init(&mut registry, &first, MODULE_PATH, "Delay", false),
        1
    );
    assert!(PluginTempo::init(&registry, &second, 1).is_none());
}

#[test]
fn test_teardown_releases_only_the_calling_engine() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let first = FakeEngine::new(1);
    let second = FakeEngine::new(2);
    PluginInit::init(&mut registry, &first, MODULE_PATH, "Delay", false);
    PluginInit::init(&mut registry, &second, MODULE_PATH, "Delay", false);

    // An opcode still holding its instance keeps it alive past teardown.
    let mut tempo = PluginTempo::init(&registry, &first, 0).unwrap();

    assert_eq!(teardown(&mut registry, &first), 1);
    assert_eq!(teardown(&mut registry, &first), 0);
    assert!(PluginInfo::init(&registry, &second, 0));

    let module = loader.loaded_module(Path::new(MODULE_PATH)).unwrap();
    let states = module.instances();
    assert_eq!(states[0].lock().count(MockCall::Terminate), 0);
    tempo.set(90.0);
    drop(tempo);
    assert_eq!(states[0].lock().count(MockCall::Terminate), 1);
    assert_eq!(states[1].lock().count(MockCall::Terminate), 0);
}

#[test]
fn test_global_registry_rejects_missing_module() {
    let engine = FakeEngine::new(u64::MAX);
    let mut registry = plughost::registry::global().lock();
    let handle = PluginInit::init(&mut registry, &engine, "/no/backend.vst3", "Any", false);
    assert_eq!(handle, -1);
    assert_eq!(teardown(&mut registry, &engine), 0);
}
