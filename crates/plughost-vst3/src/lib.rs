//! VST3 backend for plughost.
//!
//! [`Vst3Loader`] opens a `.vst3` bundle (or the shared library inside it),
//! calls the platform entry point, and exposes the plugin factory as a
//! [`PluginModule`](plughost_abi::PluginModule). Components, processors and
//! controllers are thin adapters over the COM interfaces from the `vst3`
//! crate; the per-block event list, parameter queues and state streams are
//! host-side COM objects defined in [`host`].

mod component;
mod convert;
mod host;
mod module;

pub use module::{bundle_binary_path, Vst3Loader, Vst3Module};
