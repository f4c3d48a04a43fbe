//! Error type for the plughost core.

use crate::preset::PresetError;
use plughost_abi::{ClassId, ModuleError, ResultCode};
use std::path::PathBuf;
use thiserror::Error;

/// Lifecycle step at which a plugin call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateComponent,
    CreateController,
    ConnectController,
    StopProcessing,
    Deactivate,
    SetupProcessing,
    Activate,
    StartProcessing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::CreateComponent => write!(f, "creating component"),
            Stage::CreateController => write!(f, "creating edit controller"),
            Stage::ConnectController => write!(f, "connecting edit controller"),
            Stage::StopProcessing => write!(f, "stopping processing"),
            Stage::Deactivate => write!(f, "deactivating"),
            Stage::SetupProcessing => write!(f, "setting up processing"),
            Stage::Activate => write!(f, "activating"),
            Stage::StartProcessing => write!(f, "starting processing"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("No audio module class named {name:?} in {path}")]
    ClassNotFound { path: PathBuf, name: String },

    #[error("Failed to instantiate class {class} while {stage}: {code}")]
    Instantiation {
        class: ClassId,
        stage: Stage,
        code: ResultCode,
    },

    #[error("Plugin has no audio processor")]
    NoProcessor,

    #[error("Plugin has no edit controller")]
    NoController,

    #[error("Processing setup failed while {stage}: {code}")]
    Setup { stage: Stage, code: ResultCode },

    #[error("Plugin is not processing")]
    NotProcessing,

    #[error("Plugin process call failed: {0}")]
    Process(ResultCode),

    #[error("Input event list is full ({capacity} events)")]
    EventListFull { capacity: usize },

    #[error("Edit controller call failed: {0}")]
    Controller(ResultCode),

    #[error("Preset: {0}")]
    Preset(#[from] PresetError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid plugin handle {0}")]
    InvalidHandle(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
