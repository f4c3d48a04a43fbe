//! Audio bridge integration tests
//!
//! A pass-through plugin must hand back what it was given, for as many
//! channels as both sides share.

use crate::helpers::tolerances::{EXACT, FLOAT32_EPSILON};
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use plughost::abi::mock::MockPlugin;
use plughost::prelude::*;

fn audio_for(
    plugin: MockPlugin,
    config: HostConfig,
    inputs: usize,
    outputs: usize,
) -> (HostRegistry, FakeEngine, PluginAudio) {
    let name = plugin.info.name.clone();
    let (_, mut registry) = test_registry_with(vec![plugin], config);
    let engine = FakeEngine::new(1);
    let handle = PluginInit::init(&mut registry, &engine, MODULE_PATH, &name, false);
    let audio = PluginAudio::init(&registry, &engine, handle, inputs, outputs).unwrap();
    (registry, engine, audio)
}

#[test]
fn test_pass_through_round_trip_32bit() {
    let (_registry, engine, mut audio) =
        audio_for(MockPlugin::effect("Thru"), HostConfig::default(), 2, 2);
    let signal = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE * 4);

    for block in signal.chunks(TEST_BLOCK_SIZE) {
        let inverted: Vec<f64> = block.iter().map(|s| -s).collect();
        let mut left = generate_silence(TEST_BLOCK_SIZE);
        let mut right = generate_silence(TEST_BLOCK_SIZE);
        let inputs = [block, &inverted[..]];
        assert!(audio.audio(&engine, &inputs, &mut [&mut left[..], &mut right[..]]));
        for i in 0..TEST_BLOCK_SIZE {
            assert_abs_diff_eq!(left[i], block[i], epsilon = FLOAT32_EPSILON);
            assert_abs_diff_eq!(right[i], inverted[i], epsilon = FLOAT32_EPSILON);
        }
        engine.advance();
    }
}

#[test]
fn test_pass_through_round_trip_64bit() {
    let config = HostConfig {
        prefer_double_precision: true,
        ..HostConfig::default()
    };
    let (registry, engine, mut audio) =
        audio_for(MockPlugin::effect("Thru").supports_64bit(true), config, 2, 2);
    assert_eq!(
        registry.instance(1, 0).unwrap().lock().sample_size(),
        plughost::abi::SampleSize::Sample64
    );

    let signal = generate_sine(1000.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let mut left = generate_silence(TEST_BLOCK_SIZE);
    let mut right = generate_silence(TEST_BLOCK_SIZE);
    let inputs = [&signal[..], &signal[..]];
    assert!(audio.audio(&engine, &inputs, &mut [&mut left[..], &mut right[..]]));
    for (out, expected) in left.iter().zip(&signal) {
        assert_abs_diff_eq!(*out, *expected, epsilon = EXACT);
    }
}

#[test]
fn test_channel_counts_truncate_to_plugin() {
    let (_registry, engine, mut audio) = audio_for(
        MockPlugin::effect("Mono").buses(&[1], &[1]),
        HostConfig::default(),
        2,
        4,
    );
    assert_eq!(audio.input_channels(), 1);
    assert_eq!(audio.output_channels(), 1);

    let signal = generate_sine(220.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let mut outs: Vec<Vec<f64>> = (0..4).map(|_| vec![0.5; TEST_BLOCK_SIZE]).collect();
    let mut out_refs: Vec<&mut [f64]> = outs.iter_mut().map(|o| o.as_mut_slice()).collect();
    assert!(audio.audio(&engine, &[&signal[..], &signal[..]], &mut out_refs));

    assert_abs_diff_eq!(outs[0][10], signal[10], epsilon = FLOAT32_EPSILON);
    for extra in &outs[1..] {
        assert!(extra.iter().all(|s| *s == 0.5));
    }
}

#[test]
fn test_fewer_engine_channels_than_plugin() {
    let (_registry, engine, mut audio) =
        audio_for(MockPlugin::effect("Thru"), HostConfig::default(), 1, 1);
    let signal = generate_sine(220.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let mut out = generate_silence(TEST_BLOCK_SIZE);
    assert!(audio.audio(&engine, &[&signal[..]], &mut [&mut out[..]]));
    assert_abs_diff_eq!(out[5], signal[5], epsilon = FLOAT32_EPSILON);
}

#[test]
fn test_negative_time_skips_block() {
    let (_registry, engine, mut audio) =
        audio_for(MockPlugin::effect("Thru"), HostConfig::default(), 1, 1);
    engine.set_frames(-64);
    let signal = generate_sine(220.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let mut out = vec![0.25; TEST_BLOCK_SIZE];
    assert!(!audio.audio(&engine, &[&signal[..]], &mut [&mut out[..]]));
    assert!(out.iter().all(|s| *s == 0.25));
}

#[test]
fn test_plugin_failure_reported_per_block() {
    let (registry, engine, mut audio) =
        audio_for(MockPlugin::effect("Flaky"), HostConfig::default(), 1, 1);
    let input = generate_silence(TEST_BLOCK_SIZE);
    let mut out = generate_silence(TEST_BLOCK_SIZE);
    assert!(audio.audio(&engine, &[&input[..]], &mut [&mut out[..]]));

    // Stopping the plugin behind the host's back makes the next block fail.
    registry.instance(1, 0).unwrap().lock().terminate();
    assert!(!audio.audio(&engine, &[&input[..]], &mut [&mut out[..]]));
}
