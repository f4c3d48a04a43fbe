//! Plugin class descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of classes that can be instantiated as audio processors.
pub const AUDIO_MODULE_CLASS: &str = "Audio Module Class";

/// Category of separate edit-controller classes.
pub const COMPONENT_CONTROLLER_CLASS: &str = "Component Controller Class";

/// Cardinality reported by classes that allow any number of instances.
pub const MANY_INSTANCES: i32 = 0x7FFF_FFFF;

/// 16-byte unique class identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClassId(pub [u8; 16]);

impl ClassId {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// An all-zero id is what plugins report when they have no such class.
    pub fn is_valid(&self) -> bool {
        self.0 != [0; 16]
    }

    /// Parse 32 hex digits (either case).
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 32 || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({self})")
    }
}

/// Describes one class exposed by a plugin module, available before
/// instantiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub class_id: ClassId,
    pub cardinality: i32,
    pub category: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub sdk_version: String,
    pub sub_categories: String,
    pub class_flags: u32,
}

impl ClassInfo {
    /// Audio-module class with the given id and name.
    pub fn new(class_id: ClassId, name: impl Into<String>) -> Self {
        Self {
            class_id,
            cardinality: MANY_INSTANCES,
            category: AUDIO_MODULE_CLASS.to_string(),
            name: name.into(),
            vendor: String::new(),
            version: String::new(),
            sdk_version: String::new(),
            sub_categories: String::new(),
            class_flags: 0,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn sub_categories(mut self, sub_categories: impl Into<String>) -> Self {
        self.sub_categories = sub_categories.into();
        self
    }

    pub fn is_audio_module(&self) -> bool {
        self.category == AUDIO_MODULE_CLASS
    }
}
