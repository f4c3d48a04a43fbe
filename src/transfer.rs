//! Buffers parameter changes between blocks.
//!
//! Changes arrive from control-rate callers at arbitrary times and are moved
//! into the processor's automation queues once per block, ordered by the
//! sample offset at which each one takes effect.

use plughost_abi::{ParamId, ParamValue, ParameterChanges};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterChange {
    pub id: ParamId,
    pub value: ParamValue,
    pub sample_offset: i32,
}

#[derive(Debug, Clone)]
pub struct ParameterTransfer {
    changes: SmallVec<[ParameterChange; 16]>,
    capacity: usize,
}

impl ParameterTransfer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            changes: SmallVec::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Returns false when the buffer is full and the change was dropped.
    pub fn add_change(&mut self, id: ParamId, value: ParamValue, sample_offset: i32) -> bool {
        if self.changes.len() >= self.capacity {
            tracing::warn!(
                id,
                capacity = self.capacity,
                "Parameter change buffer full, dropping change"
            );
            return false;
        }
        self.changes.push(ParameterChange {
            id,
            value,
            sample_offset,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn pending(&self) -> &[ParameterChange] {
        &self.changes
    }

    /// Move every buffered change into `target` in offset order.
    ///
    /// Changes to one parameter at distinct offsets become distinct points;
    /// a later change at an already used offset replaces the earlier value.
    pub fn transfer_to(&mut self, target: &mut ParameterChanges) -> usize {
        let count = self.changes.len();
        if count == 0 {
            return 0;
        }
        // Stable, so same-offset changes keep their arrival order.
        self.changes.sort_by_key(|c| c.sample_offset);
        for change in self.changes.drain(..) {
            target
                .add_parameter_data(change.id)
                .add_point(change.sample_offset, change.value);
        }
        tracing::trace!(count, "Transferred parameter changes");
        count
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
