//! Engine-facing entry points.
//!
//! Each type here backs one scripting opcode. Construction does the
//! init-time work and keeps the instance it operates on; the methods are
//! called once per control period or audio block. Failures are logged and
//! collapsed to a sentinel or `false`, never returned as errors.

use crate::engine::EngineContext;
use crate::error::Result;
use crate::midi::MidiMessage;
use crate::note::{NoteRequest, ScheduledNote};
use crate::registry::{HostRegistry, SharedInstance};
use plughost_abi::{ParamId, ParamValue};
use std::path::Path;

fn collapse<T>(opcode: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(opcode, "{e}");
            None
        }
    }
}

fn fetch(
    opcode: &'static str,
    registry: &HostRegistry,
    engine: &dyn EngineContext,
    handle: i32,
) -> Option<SharedInstance> {
    collapse(opcode, registry.instance(engine.id(), handle))
}

/// Load a plugin and return its handle, or -1.
pub struct PluginInit;

impl PluginInit {
    pub fn init(
        registry: &mut HostRegistry,
        engine: &dyn EngineContext,
        path: impl AsRef<Path>,
        name: &str,
        verbose: bool,
    ) -> i32 {
        collapse(
            "plugin_init",
            registry.load_module(engine.id(), path, name, verbose),
        )
        .unwrap_or(-1)
    }
}

/// Log diagnostics for a plugin.
pub struct PluginInfo;

impl PluginInfo {
    pub fn init(registry: &HostRegistry, engine: &dyn EngineContext, handle: i32) -> bool {
        let Some(instance) = fetch("plugin_info", registry, engine, handle) else {
            return false;
        };
        instance.lock().log_info();
        true
    }
}

/// Runs a plugin on the engine's audio channels.
pub struct PluginAudio {
    instance: SharedInstance,
    input_channels: usize,
    output_channels: usize,
}

impl PluginAudio {
    /// Configure the plugin for the engine's sample rate and block size and
    /// match up to `inputs` / `outputs` channels with its main buses.
    pub fn init(
        registry: &HostRegistry,
        engine: &dyn EngineContext,
        handle: i32,
        inputs: usize,
        outputs: usize,
    ) -> Option<Self> {
        let instance = fetch("plugin_audio", registry, engine, handle)?;
        let (input_channels, output_channels) = {
            let mut plugin = instance.lock();
            collapse("plugin_audio", plugin.set_sample_rate(engine.sample_rate()))?;
            collapse("plugin_audio", plugin.set_block_size(engine.block_size()))?;
            (
                inputs.min(plugin.main_input_channels()),
                outputs.min(plugin.main_output_channels()),
            )
        };
        tracing::debug!(
            handle,
            input_channels,
            output_channels,
            "Plugin audio configured"
        );
        Some(Self {
            instance,
            input_channels,
            output_channels,
        })
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Process one block. Output channels the plugin does not cover are left
    /// as they were.
    pub fn audio(
        &mut self,
        engine: &dyn EngineContext,
        inputs: &[&[f64]],
        outputs: &mut [&mut [f64]],
    ) -> bool {
        let current_time_frames = engine.current_time_frames();
        if current_time_frames < 0 {
            tracing::warn!(current_time_frames, "Negative engine time, skipping block");
            return false;
        }
        let inputs = &inputs[..inputs.len().min(self.input_channels)];
        let output_count = outputs.len().min(self.output_channels);
        let outputs = &mut outputs[..output_count];
        collapse(
            "plugin_audio",
            self.instance
                .lock()
                .process_block(inputs, outputs, current_time_frames),
        )
        .is_some()
    }
}

/// Sends MIDI channel messages to a plugin's first event bus.
pub struct PluginMidiOut {
    instance: SharedInstance,
    last: Option<MidiMessage>,
}

impl PluginMidiOut {
    pub fn init(registry: &HostRegistry, engine: &dyn EngineContext, handle: i32) -> Option<Self> {
        Some(Self {
            instance: fetch("plugin_midiout", registry, engine, handle)?,
            last: None,
        })
    }

    /// Returns true when the message reached the plugin. A repeat of the
    /// last delivered message is skipped.
    pub fn send(&mut self, status: u8, channel: u8, data1: u8, data2: u8) -> bool {
        let message = MidiMessage::new(status, channel, data1, data2);
        if self.last.is_some_and(|last| last.same_content(&message)) {
            return false;
        }
        let delivered = self.instance.lock().handle_midi(&message, 0);
        if delivered {
            self.last = Some(message);
        }
        delivered
    }
}

/// A single note whose note off is sent when the caller releases it.
pub struct PluginNote {
    instance: SharedInstance,
    note: Option<ScheduledNote>,
}

impl PluginNote {
    pub fn init(
        registry: &HostRegistry,
        engine: &dyn EngineContext,
        handle: i32,
        channel: i16,
        key: f64,
        velocity: f64,
        duration: f64,
    ) -> Option<Self> {
        let instance = fetch("plugin_note", registry, engine, handle)?;
        let request = NoteRequest {
            channel,
            key,
            velocity,
            duration,
            score_time: engine.score_time(),
        };
        let note = collapse(
            "plugin_note",
            instance.lock().start_note(
                &request,
                engine.sample_rate(),
                engine.current_time_frames(),
            ),
        )?;
        Some(Self { instance, note })
    }

    /// 0 when no note was scheduled.
    pub fn note_id(&self) -> i32 {
        self.note.map_or(0, |note| note.note_id)
    }

    /// Score time at which the note should be released.
    pub fn off_time(&self) -> Option<f64> {
        self.note.map(|note| note.off_time)
    }

    /// Send the note off. Only the first call has an effect.
    pub fn release(&mut self) -> bool {
        let Some(note) = self.note.take() else {
            return false;
        };
        collapse("plugin_note", self.instance.lock().release_note(&note)).is_some()
    }
}

/// Reads normalized parameter values.
pub struct PluginParamGet {
    instance: SharedInstance,
}

impl PluginParamGet {
    pub fn init(registry: &HostRegistry, engine: &dyn EngineContext, handle: i32) -> Option<Self> {
        Some(Self {
            instance: fetch("plugin_paramget", registry, engine, handle)?,
        })
    }

    /// 0.0 when the plugin has no edit controller.
    pub fn value(&self, id: ParamId) -> ParamValue {
        self.instance.lock().parameter(id).unwrap_or(0.0)
    }
}

/// Writes parameter values, timed within the current block.
pub struct PluginParamSet {
    instance: SharedInstance,
    block_size: i64,
    prior: Option<(ParamId, ParamValue)>,
}

impl PluginParamSet {
    pub fn init(registry: &HostRegistry, engine: &dyn EngineContext, handle: i32) -> Option<Self> {
        Some(Self {
            instance: fetch("plugin_paramset", registry, engine, handle)?,
            block_size: engine.block_size() as i64,
            prior: None,
        })
    }

    /// Buffer `value` for `id` unless neither changed since the last call.
    /// Returns true when a change was buffered.
    pub fn set(&mut self, engine: &dyn EngineContext, id: ParamId, value: ParamValue) -> bool {
        if self.prior == Some((id, value)) {
            return false;
        }
        let block_start = engine.control_cycle() * self.block_size;
        let offset = (engine.current_time_frames() - block_start)
            .clamp(0, (self.block_size - 1).max(0)) as i32;
        let buffered = self.instance.lock().set_parameter(id, value, offset);
        if buffered {
            tracing::trace!(id, value, offset, "Parameter set");
            self.prior = Some((id, value));
        }
        buffered
    }
}

pub struct PluginPresetLoad;

impl PluginPresetLoad {
    pub fn init(
        registry: &HostRegistry,
        engine: &dyn EngineContext,
        handle: i32,
        path: impl AsRef<Path>,
    ) -> bool {
        let Some(instance) = fetch("plugin_presetload", registry, engine, handle) else {
            return false;
        };
        let result = instance.lock().load_preset(path);
        collapse("plugin_presetload", result).is_some()
    }
}

pub struct PluginPresetSave;

impl PluginPresetSave {
    pub fn init(
        registry: &HostRegistry,
        engine: &dyn EngineContext,
        handle: i32,
        path: impl AsRef<Path>,
    ) -> bool {
        let Some(instance) = fetch("plugin_presetsave", registry, engine, handle) else {
            return false;
        };
        let result = instance.lock().save_preset(path);
        collapse("plugin_presetsave", result).is_some()
    }
}

/// Sets the tempo seen by the plugin.
pub struct PluginTempo {
    instance: SharedInstance,
}

impl PluginTempo {
    pub fn init(registry: &HostRegistry, engine: &dyn EngineContext, handle: i32) -> Option<Self> {
        Some(Self {
            instance: fetch("plugin_tempo", registry, engine, handle)?,
        })
    }

    pub fn set(&mut self, bpm: f64) {
        self.instance.lock().set_tempo(bpm);
    }
}

/// Release every plugin instance of the calling engine.
pub fn teardown(registry: &mut HostRegistry, engine: &dyn EngineContext) -> usize {
    registry.teardown(engine.id())
}
