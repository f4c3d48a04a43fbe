//! Bus descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bus flag: the bus should be active by default.
pub const BUS_DEFAULT_ACTIVE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Audio,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    Main,
    Aux,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Audio => write!(f, "Audio"),
            MediaType::Event => write!(f, "Event"),
        }
    }
}

impl fmt::Display for BusDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusDirection::Input => write!(f, "Input"),
            BusDirection::Output => write!(f, "Output"),
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Main => write!(f, "Main"),
            BusType::Aux => write!(f, "Aux"),
        }
    }
}

/// A named group of channels of one media type and direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusInfo {
    pub media_type: MediaType,
    pub direction: BusDirection,
    pub channel_count: i32,
    pub name: String,
    pub bus_type: BusType,
    pub flags: u32,
}

impl BusInfo {
    pub fn audio(direction: BusDirection, channel_count: i32, name: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Audio,
            direction,
            channel_count,
            name: name.into(),
            bus_type: BusType::Main,
            flags: BUS_DEFAULT_ACTIVE,
        }
    }

    pub fn event(direction: BusDirection, channel_count: i32, name: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Event,
            direction,
            channel_count,
            name: name.into(),
            bus_type: BusType::Main,
            flags: BUS_DEFAULT_ACTIVE,
        }
    }
}
