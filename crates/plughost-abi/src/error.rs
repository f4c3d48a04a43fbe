//! Error types for plugin capability calls

use std::path::PathBuf;
use thiserror::Error;

/// Non-success result of a capability call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    #[error("call returned false")]
    False,

    #[error("interface not supported")]
    NoInterface,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("not implemented")]
    NotImplemented,

    #[error("internal plugin error")]
    InternalError,

    #[error("not initialized")]
    NotInitialized,

    #[error("out of memory")]
    OutOfMemory,

    #[error("result code {0:#x}")]
    Other(i32),
}

pub type PluginResult<T = ()> = std::result::Result<T, ResultCode>;

/// Failure to open a plugin module.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Could not open module {path}\n  Reason: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Module {path} does not export a plugin factory")]
    NoFactory { path: PathBuf },
}
