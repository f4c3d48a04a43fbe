//! Timestamped note events delivered to the processor.

use crate::error::{PluginResult, ResultCode};

/// Event flag: the event was generated live rather than from a sequence.
pub const EVENT_IS_LIVE: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    NoteOn {
        channel: i16,
        pitch: i16,
        /// Cents deviation from `pitch`.
        tuning: f32,
        velocity: f32,
        /// Note length in frames, 0 when unknown.
        length: i32,
        note_id: i32,
    },
    NoteOff {
        channel: i16,
        pitch: i16,
        velocity: f32,
        note_id: i32,
        tuning: f32,
    },
    PolyPressure {
        channel: i16,
        pitch: i16,
        pressure: f32,
        note_id: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub bus_index: i32,
    pub sample_offset: i32,
    pub ppq_position: f64,
    pub flags: u16,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            bus_index: 0,
            sample_offset: 0,
            ppq_position: 0.0,
            flags: 0,
            kind,
        }
    }

    pub fn at(mut self, sample_offset: i32) -> Self {
        self.sample_offset = sample_offset;
        self
    }

    pub fn on_bus(mut self, bus_index: i32) -> Self {
        self.bus_index = bus_index;
        self
    }

    pub fn note_id(&self) -> i32 {
        match self.kind {
            EventKind::NoteOn { note_id, .. }
            | EventKind::NoteOff { note_id, .. }
            | EventKind::PolyPressure { note_id, .. } => note_id,
        }
    }
}

/// Bounded list of input events for one block.
#[derive(Debug, Clone, Default)]
pub struct EventList {
    events: Vec<Event>,
    capacity: usize,
}

impl EventList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Fails with [`ResultCode::False`] once the list is full.
    pub fn add(&mut self, event: Event) -> PluginResult {
        if self.events.len() >= self.capacity {
            return Err(ResultCode::False);
        }
        self.events.push(event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
