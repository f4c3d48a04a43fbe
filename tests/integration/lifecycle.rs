//! Processing lifecycle integration tests
//!
//! Configuration through the audio opcode, the order of setup calls the
//! plugin sees, and recovery after a failed reconfiguration.

use crate::helpers::*;
use plughost::abi::mock::{MockCall, MockPlugin};
use plughost::abi::SampleSize;
use plughost::prelude::*;
use plughost::{Error, InstanceState};
use std::path::Path;

/// Sample rate then block size reaches Processing and a block succeeds.
#[test]
fn test_scenario_b_configure_then_process() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);

    let instance = registry.instance(1, handle).unwrap();
    {
        let mut plugin = instance.lock();
        plugin.set_sample_rate(44100.0).unwrap();
        plugin.set_block_size(512).unwrap();
        assert_eq!(plugin.state(), InstanceState::Processing);
        plugin.process(0).unwrap();
    }

    let state = loader
        .loaded_module(Path::new(MODULE_PATH))
        .unwrap()
        .last_instance()
        .unwrap();
    let state = state.lock();
    let setup = state.setup.unwrap();
    assert_eq!(setup.sample_rate, 44100.0);
    assert_eq!(setup.max_samples_per_block, 512);
    assert_eq!(setup.sample_size, SampleSize::Sample32);
    assert_eq!(state.process_count(), 1);
}

/// Processing before any configuration fails and changes nothing.
#[test]
fn test_scenario_c_process_before_configuration() {
    let (_, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);

    let instance = registry.instance(1, handle).unwrap();
    let mut plugin = instance.lock();
    assert!(matches!(plugin.process(0), Err(Error::NotProcessing)));
    assert_eq!(plugin.state(), InstanceState::Configured);
    assert!(plugin.sample_rate().is_none());
}

#[test]
fn test_audio_opcode_configures_from_engine() {
    let (_, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);

    let audio = PluginAudio::init(&registry, &engine, handle, 2, 2).unwrap();
    assert_eq!((audio.input_channels(), audio.output_channels()), (2, 2));

    let instance = registry.instance(1, handle).unwrap();
    let plugin = instance.lock();
    assert!(plugin.is_processing());
    assert_eq!(plugin.sample_rate(), Some(TEST_SAMPLE_RATE));
    assert_eq!(plugin.block_size(), Some(TEST_BLOCK_SIZE));
}

/// A second audio opcode on the same plugin does not restart it.
#[test]
fn test_repeated_configuration_is_idempotent() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);

    PluginAudio::init(&registry, &engine, handle, 2, 2).unwrap();
    PluginAudio::init(&registry, &engine, handle, 1, 1).unwrap();

    let module = loader.loaded_module(Path::new(MODULE_PATH)).unwrap();
    let state = module.last_instance().unwrap();
    let state = state.lock();
    assert_eq!(state.count(MockCall::SetupProcessing), 1);
    assert_eq!(state.count(MockCall::SetProcessing(true)), 1);
    assert_eq!(state.count(MockCall::SetProcessing(false)), 0);
}

#[test]
fn test_failed_setup_leaves_plugin_stopped() {
    for call in [
        MockCall::SetupProcessing,
        MockCall::SetActive(true),
        MockCall::SetProcessing(true),
    ] {
        let (_, mut registry) = test_registry(vec![MockPlugin::effect("Delay").fail_on(call)]);
        let engine = FakeEngine::new(1);
        let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);
        assert_eq!(handle, 0);

        assert!(PluginAudio::init(&registry, &engine, handle, 2, 2).is_none());
        let instance = registry.instance(1, handle).unwrap();
        assert!(!instance.lock().is_processing(), "{call:?}");
    }
}

#[test]
fn test_reconfigure_while_running_restarts_in_order() {
    let (loader, mut registry) = test_registry(vec![MockPlugin::effect("Delay")]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Delay", false);
    PluginAudio::init(&registry, &engine, handle, 2, 2).unwrap();

    let state = loader
        .loaded_module(Path::new(MODULE_PATH))
        .unwrap()
        .last_instance()
        .unwrap();
    state.lock().calls.clear();

    let instance = registry.instance(1, handle).unwrap();
    instance.lock().set_block_size(128).unwrap();
    assert_eq!(
        state.lock().calls,
        vec![
            MockCall::SetProcessing(false),
            MockCall::SetActive(false),
            MockCall::SetupProcessing,
            MockCall::SetActive(true),
            MockCall::SetProcessing(true),
        ]
    );
}

#[test]
fn test_plugin_without_processor_still_loads() {
    let (_, mut registry) = test_registry(vec![MockPlugin::effect("Meter").without_processor()]);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, "Meter", false);
    assert_eq!(handle, 0);
    assert!(PluginInfo::init(&registry, &engine, handle));
    assert!(PluginAudio::init(&registry, &engine, handle, 2, 2).is_none());
}
