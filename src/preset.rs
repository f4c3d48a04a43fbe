//! `.vstpreset` container: a 48-byte header, raw state chunks and a chunk
//! list at the end of the file.
//!
//! ```text
//! "VST3" | version: i32 | class id: 32 hex chars | list offset: i64
//! chunk data ...
//! "List" | count: i32 | (id: [u8; 4], offset: i64, size: i64) * count
//! ```
//!
//! All integers are little endian.

use crate::error::{Error, Result};
use crate::instance::PluginInstance;
use plughost_abi::{ClassId, ResultCode};
use std::path::Path;
use thiserror::Error;

const HEADER_ID: &[u8; 4] = b"VST3";
const LIST_ID: &[u8; 4] = b"List";
const FORMAT_VERSION: i32 = 1;
const HEADER_SIZE: usize = 48;
const LIST_ENTRY_SIZE: usize = 20;

pub const COMPONENT_STATE: &[u8; 4] = b"Comp";
pub const CONTROLLER_STATE: &[u8; 4] = b"Cont";
pub const META_INFO: &[u8; 4] = b"Info";

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Not a preset file")]
    BadHeader,

    #[error("Unsupported preset version {0}")]
    UnsupportedVersion(i32),

    #[error("Preset file is truncated")]
    Truncated,

    #[error("Preset has no {0} chunk")]
    MissingChunk(String),

    #[error("Preset is for class {found}, instance is {expected}")]
    ClassMismatch { expected: ClassId, found: ClassId },

    #[error("Plugin rejected preset state: {0}")]
    StateRejected(ResultCode),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresetFile {
    pub class_id: ClassId,
    pub component_state: Vec<u8>,
    pub controller_state: Option<Vec<u8>>,
    /// XML meta information, carried but not interpreted.
    pub meta_info: Option<Vec<u8>>,
}

impl PresetFile {
    pub fn new(class_id: ClassId, component_state: Vec<u8>) -> Self {
        Self {
            class_id,
            component_state,
            ..Self::default()
        }
    }

    pub fn read(bytes: &[u8]) -> std::result::Result<Self, PresetError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PresetError::Truncated);
        }
        if &bytes[0..4] != HEADER_ID {
            return Err(PresetError::BadHeader);
        }
        let version = read_i32(bytes, 4)?;
        if version != FORMAT_VERSION {
            return Err(PresetError::UnsupportedVersion(version));
        }
        let class_id = std::str::from_utf8(&bytes[8..40])
            .ok()
            .and_then(ClassId::from_hex)
            .ok_or(PresetError::BadHeader)?;
        let list_offset = to_index(read_i64(bytes, 40)?)?;

        if bytes.get(list_offset..list_offset + 4) != Some(LIST_ID.as_slice()) {
            return Err(PresetError::BadHeader);
        }
        let count = read_i32(bytes, list_offset + 4)?.max(0) as usize;

        let mut preset = Self {
            class_id,
            ..Self::default()
        };
        let mut has_component = false;
        for i in 0..count {
            let entry = list_offset + 8 + i * LIST_ENTRY_SIZE;
            let id = bytes.get(entry..entry + 4).ok_or(PresetError::Truncated)?;
            let offset = to_index(read_i64(bytes, entry + 4)?)?;
            let size = to_index(read_i64(bytes, entry + 12)?)?;
            let data = bytes
                .get(offset..offset + size)
                .ok_or(PresetError::Truncated)?
                .to_vec();
            match id {
                id if id == COMPONENT_STATE => {
                    preset.component_state = data;
                    has_component = true;
                }
                id if id == CONTROLLER_STATE => preset.controller_state = Some(data),
                id if id == META_INFO => preset.meta_info = Some(data),
                other => tracing::debug!(chunk = ?other, "Skipping unknown preset chunk"),
            }
        }
        if !has_component {
            return Err(PresetError::MissingChunk("Comp".into()));
        }
        Ok(preset)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut chunks: Vec<(&[u8; 4], &[u8])> =
            vec![(COMPONENT_STATE, self.component_state.as_slice())];
        if let Some(state) = &self.controller_state {
            chunks.push((CONTROLLER_STATE, state.as_slice()));
        }
        if let Some(info) = &self.meta_info {
            chunks.push((META_INFO, info.as_slice()));
        }

        let data_size: usize = chunks.iter().map(|(_, data)| data.len()).sum();
        let mut out =
            Vec::with_capacity(HEADER_SIZE + data_size + 8 + chunks.len() * LIST_ENTRY_SIZE);
        out.extend_from_slice(HEADER_ID);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(self.class_id.to_string().as_bytes());
        out.extend_from_slice(&((HEADER_SIZE + data_size) as i64).to_le_bytes());

        let mut entries = Vec::with_capacity(chunks.len());
        for (id, data) in &chunks {
            entries.push((*id, out.len() as i64, data.len() as i64));
            out.extend_from_slice(data);
        }

        out.extend_from_slice(LIST_ID);
        out.extend_from_slice(&(entries.len() as i32).to_le_bytes());
        for (id, offset, size) in entries {
            out.extend_from_slice(id);
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }
        out
    }
}

fn read_i32(bytes: &[u8], at: usize) -> std::result::Result<i32, PresetError> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
        .ok_or(PresetError::Truncated)
}

fn read_i64(bytes: &[u8], at: usize) -> std::result::Result<i64, PresetError> {
    bytes
        .get(at..at + 8)
        .and_then(|b| b.try_into().ok())
        .map(i64::from_le_bytes)
        .ok_or(PresetError::Truncated)
}

fn to_index(value: i64) -> std::result::Result<usize, PresetError> {
    usize::try_from(value).map_err(|_| PresetError::Truncated)
}

impl PluginInstance {
    /// Restore component and controller state from a preset file.
    pub fn load_preset(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let preset = PresetFile::read(&std::fs::read(path)?)?;
        let expected = self.expect_class_id()?;
        if preset.class_id != expected {
            return Err(PresetError::ClassMismatch {
                expected,
                found: preset.class_id,
            }
            .into());
        }

        let Some(component) = self.component.as_mut() else {
            return Err(not_initialized());
        };
        component
            .set_state(&preset.component_state)
            .map_err(PresetError::StateRejected)?;

        // The component already holds the new state; controller failures
        // are reported apart from it.
        if let Some(controller) = self.controller.as_mut() {
            controller
                .set_component_state(&preset.component_state)
                .map_err(Error::Controller)?;
            if let Some(state) = &preset.controller_state {
                controller.set_state(state).map_err(Error::Controller)?;
            }
        }
        tracing::info!(path = %path.display(), "Loaded preset");
        Ok(())
    }

    /// Write the current component and controller state to a preset file.
    pub fn save_preset(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let class_id = self.expect_class_id()?;
        let Some(component) = self.component.as_mut() else {
            return Err(not_initialized());
        };
        let mut preset = PresetFile::new(
            class_id,
            component.get_state().map_err(PresetError::StateRejected)?,
        );
        if let Some(controller) = self.controller.as_mut() {
            match controller.get_state() {
                Ok(state) => preset.controller_state = Some(state),
                Err(code) => tracing::debug!("Controller state unavailable: {code}"),
            }
        }
        std::fs::write(path, preset.to_bytes())?;
        tracing::info!(path = %path.display(), "Saved preset");
        Ok(())
    }

    fn expect_class_id(&self) -> Result<ClassId> {
        self.class_info
            .as_ref()
            .map(|info| info.class_id)
            .ok_or_else(not_initialized)
    }
}

fn not_initialized() -> Error {
    Error::InvalidConfig("instance is not initialized".into())
}
