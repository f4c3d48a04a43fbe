//! Audio block bridge between engine channel arrays and plugin buffers.
//!
//! The engine hands over one `f64` slice per channel. Only the first audio
//! bus in each direction is bridged, and only as many channels as both sides
//! have. Engine channels beyond that are left untouched.

use crate::error::Result;
use crate::instance::PluginInstance;
use plughost_abi::{AudioBusBuffers, ChannelBuffers};

impl PluginInstance {
    /// Copy `inputs` into the plugin, process one block and copy the result
    /// into `outputs`.
    pub fn process_block(
        &mut self,
        inputs: &[&[f64]],
        outputs: &mut [&mut [f64]],
        current_time_frames: i64,
    ) -> Result<()> {
        let frames = self.block_size().unwrap_or(0);
        if let Some(bus) = self.inputs.first_mut() {
            write_bus(bus, inputs, frames);
        }
        self.process(current_time_frames)?;
        if let Some(bus) = self.outputs.first() {
            read_bus(bus, outputs, frames);
        }
        Ok(())
    }
}

fn write_bus(bus: &mut AudioBusBuffers, inputs: &[&[f64]], frames: usize) {
    match &mut bus.channels {
        ChannelBuffers::Sample32(channels) => {
            for (dst, src) in channels.iter_mut().zip(inputs) {
                let n = frames.min(dst.len()).min(src.len());
                for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
                    *d = *s as f32;
                }
            }
        }
        ChannelBuffers::Sample64(channels) => {
            for (dst, src) in channels.iter_mut().zip(inputs) {
                let n = frames.min(dst.len()).min(src.len());
                dst[..n].copy_from_slice(&src[..n]);
            }
        }
    }
}

fn read_bus(bus: &AudioBusBuffers, outputs: &mut [&mut [f64]], frames: usize) {
    match &bus.channels {
        ChannelBuffers::Sample32(channels) => {
            for (src, dst) in channels.iter().zip(outputs.iter_mut()) {
                let n = frames.min(dst.len()).min(src.len());
                for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
                    *d = *s as f64;
                }
            }
        }
        ChannelBuffers::Sample64(channels) => {
            for (src, dst) in channels.iter().zip(outputs.iter_mut()) {
                let n = frames.min(dst.len()).min(src.len());
                dst[..n].copy_from_slice(&src[..n]);
            }
        }
    }
}
