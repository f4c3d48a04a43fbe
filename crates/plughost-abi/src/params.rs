//! Parameters, units, and sample-accurate automation queues.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type ParamId = u32;

/// Normalized parameter value in 0.0..=1.0.
pub type ParamValue = f64;

pub type UnitId = i32;
pub type ProgramListId = i32;

/// Reported by controller-assignment queries that have no target.
pub const NO_PARAM_ID: ParamId = 0xFFFF_FFFF;

pub const ROOT_UNIT_ID: UnitId = 0;
pub const NO_PROGRAM_LIST_ID: ProgramListId = -1;

/// Parameter metadata as reported by an edit controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub id: ParamId,
    pub title: String,
    pub short_title: String,
    pub units: String,
    pub step_count: i32,
    pub default_normalized_value: ParamValue,
    pub unit_id: UnitId,
    pub flags: u32,
}

impl ParameterInfo {
    pub fn new(id: ParamId, title: impl Into<String>, default_normalized_value: ParamValue) -> Self {
        Self {
            id,
            title: title.into(),
            short_title: String::new(),
            units: String::new(),
            step_count: 0,
            default_normalized_value,
            unit_id: ROOT_UNIT_ID,
            flags: 0,
        }
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub id: UnitId,
    pub parent_unit_id: UnitId,
    pub name: String,
    pub program_list_id: ProgramListId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramListInfo {
    pub id: ProgramListId,
    pub name: String,
    pub program_count: i32,
}

/// One automation point: `value` takes effect at `sample_offset` within the block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub sample_offset: i32,
    pub value: ParamValue,
}

/// Automation points for a single parameter within one block.
///
/// Points are kept in ascending offset order. Adding a point at an offset
/// that is already present replaces that point's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterQueue {
    pub param_id: ParamId,
    points: SmallVec<[ParameterPoint; 4]>,
}

impl ParameterQueue {
    pub fn new(param_id: ParamId) -> Self {
        Self {
            param_id,
            points: SmallVec::new(),
        }
    }

    /// Returns the index the point landed at.
    pub fn add_point(&mut self, sample_offset: i32, value: ParamValue) -> usize {
        match self
            .points
            .binary_search_by_key(&sample_offset, |p| p.sample_offset)
        {
            Ok(index) => {
                self.points[index].value = value;
                index
            }
            Err(index) => {
                self.points.insert(
                    index,
                    ParameterPoint {
                        sample_offset,
                        value,
                    },
                );
                index
            }
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> Option<ParameterPoint> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[ParameterPoint] {
        &self.points
    }

    pub fn last_value(&self) -> Option<ParamValue> {
        self.points.last().map(|p| p.value)
    }
}

/// The set of parameter queues handed to the processor for one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterChanges {
    queues: Vec<ParameterQueue>,
}

impl ParameterChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: Vec::with_capacity(capacity),
        }
    }

    /// Queue for `param_id`, created on first use.
    pub fn add_parameter_data(&mut self, param_id: ParamId) -> &mut ParameterQueue {
        let index = match self.queues.iter().position(|q| q.param_id == param_id) {
            Some(index) => index,
            None => {
                self.queues.push(ParameterQueue::new(param_id));
                self.queues.len() - 1
            }
        };
        &mut self.queues[index]
    }

    pub fn parameter_count(&self) -> usize {
        self.queues.len()
    }

    pub fn queue(&self, index: usize) -> Option<&ParameterQueue> {
        self.queues.get(index)
    }

    pub fn find(&self, param_id: ParamId) -> Option<&ParameterQueue> {
        self.queues.iter().find(|q| q.param_id == param_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterQueue> {
        self.queues.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }
}
