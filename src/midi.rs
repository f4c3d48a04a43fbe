//! Event/parameter bridge for MIDI channel messages.
//!
//! A message is first interpreted as a native plugin event (note on, note
//! off, poly pressure). Controllers, channel aftertouch and pitch bend are
//! instead routed through the plugin's MIDI controller map to a parameter.
//! Anything else, or a controller the plugin did not map, is dropped.

use crate::instance::PluginInstance;
use plughost_abi::{
    Event, EventKind, MidiMapping, ParamId, ParamValue, CTRL_AFTER_TOUCH, CTRL_COUNT,
    CTRL_PITCH_BEND,
};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;

/// A raw MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    /// Upper nibble only.
    pub status: u8,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
    pub sample_offset: i32,
}

impl MidiMessage {
    /// Masks `status` to the message type and `channel` to 0..16.
    pub fn new(status: u8, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            status: status & 0xF0,
            channel: channel & 0x0F,
            data1: data1 & 0x7F,
            data2: data2 & 0x7F,
            sample_offset: 0,
        }
    }

    pub fn at(mut self, sample_offset: i32) -> Self {
        self.sample_offset = sample_offset;
        self
    }

    /// Same message content, ignoring timing.
    pub fn same_content(&self, other: &MidiMessage) -> bool {
        (self.status, self.channel, self.data1, self.data2)
            == (other.status, other.channel, other.data1, other.data2)
    }
}

/// Controller-to-parameter table indexed by bus, channel and controller.
#[derive(Debug, Clone, Default)]
pub struct MidiCcMap {
    buses: usize,
    channels: usize,
    cells: Vec<Option<ParamId>>,
}

impl MidiCcMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Query `mapping` for every controller on `buses` x `channels`.
    pub fn build(mapping: &dyn MidiMapping, buses: usize, channels: usize) -> Self {
        let mut cells = Vec::with_capacity(buses * channels * CTRL_COUNT);
        for bus in 0..buses {
            for channel in 0..channels {
                for controller in 0..CTRL_COUNT {
                    cells.push(mapping.midi_controller_assignment(
                        bus as i32,
                        channel as i16,
                        controller as u16,
                    ));
                }
            }
        }
        Self {
            buses,
            channels,
            cells,
        }
    }

    /// Out-of-range coordinates have no mapping.
    pub fn get(&self, bus: i32, channel: u8, controller: u16) -> Option<ParamId> {
        let (bus, channel, controller) = (bus as usize, channel as usize, controller as usize);
        if bus >= self.buses || channel >= self.channels || controller >= CTRL_COUNT {
            return None;
        }
        self.cells[(bus * self.channels + channel) * CTRL_COUNT + controller]
    }

    pub fn mapped_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.mapped_count() == 0
    }
}

/// Interpret `message` as a native note or pressure event on `bus`.
pub fn to_event(message: &MidiMessage, bus: i32) -> Option<Event> {
    let channel = message.channel as i16;
    let pitch = message.data1 as i16;
    let value = message.data2 as f32 / 127.0;
    let kind = match message.status {
        NOTE_ON if message.data2 > 0 => EventKind::NoteOn {
            channel,
            pitch,
            tuning: 0.0,
            velocity: value,
            length: 0,
            note_id: -1,
        },
        NOTE_ON | NOTE_OFF => EventKind::NoteOff {
            channel,
            pitch,
            velocity: value,
            note_id: -1,
            tuning: 0.0,
        },
        POLY_PRESSURE => EventKind::PolyPressure {
            channel,
            pitch,
            pressure: value,
            note_id: -1,
        },
        _ => return None,
    };
    Some(Event::new(kind).at(message.sample_offset).on_bus(bus))
}

/// Interpret `message` as a mapped parameter change on `bus`.
pub fn to_parameter_change(
    message: &MidiMessage,
    bus: i32,
    map: &MidiCcMap,
) -> Option<(ParamId, ParamValue)> {
    let (controller, value) = match message.status {
        CONTROL_CHANGE => (message.data1 as u16, message.data2 as f64 / 127.0),
        CHANNEL_PRESSURE => (CTRL_AFTER_TOUCH, message.data1 as f64 / 127.0),
        PITCH_BEND => {
            let bend = (message.data1 as u16) | ((message.data2 as u16) << 7);
            (CTRL_PITCH_BEND, bend as f64 / 16383.0)
        }
        _ => return None,
    };
    map.get(bus, message.channel, controller)
        .map(|id| (id, value))
}

impl PluginInstance {
    /// Deliver `message` to the plugin. Returns false when it was dropped.
    pub fn handle_midi(&mut self, message: &MidiMessage, bus: i32) -> bool {
        if let Some(event) = to_event(message, bus) {
            return self.add_event(event).is_ok();
        }
        match to_parameter_change(message, bus, &self.midi_map) {
            Some((id, value)) => self.transfer.add_change(id, value, message.sample_offset),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    struct Table(HashMap<(i32, i16, u16), ParamId>);

    impl MidiMapping for Table {
        fn midi_controller_assignment(&self, bus: i32, channel: i16, cc: u16) -> Option<ParamId> {
            self.0.get(&(bus, channel, cc)).copied()
        }
    }

    fn map() -> MidiCcMap {
        let table = Table(HashMap::from([
            ((0, 0, 7), 100),
            ((0, 0, CTRL_AFTER_TOUCH), 101),
            ((0, 1, CTRL_PITCH_BEND), 102),
            ((1, 0, 7), 103),
        ]));
        MidiCcMap::build(&table, 1, 16)
    }

    #[test]
    fn test_note_on_and_zero_velocity_note_off() {
        let on = to_event(&MidiMessage::new(0x90, 2, 60, 127).at(5), 0).unwrap();
        assert_eq!(on.sample_offset, 5);
        match on.kind {
            EventKind::NoteOn {
                channel,
                pitch,
                velocity,
                note_id,
                ..
            } => {
                assert_eq!((channel, pitch, note_id), (2, 60, -1));
                assert_relative_eq!(velocity, 1.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        let off = to_event(&MidiMessage::new(0x90, 2, 60, 0), 0).unwrap();
        assert!(matches!(off.kind, EventKind::NoteOff { pitch: 60, .. }));
        let off = to_event(&MidiMessage::new(0x80, 2, 60, 64), 0).unwrap();
        match off.kind {
            EventKind::NoteOff { velocity, .. } => assert_relative_eq!(velocity, 64.0 / 127.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_poly_pressure() {
        let event = to_event(&MidiMessage::new(0xA3, 0, 64, 127), 1).unwrap();
        assert_eq!(event.bus_index, 1);
        assert!(matches!(
            event.kind,
            EventKind::PolyPressure { pitch: 64, pressure, .. } if pressure == 1.0
        ));
    }

    #[test]
    fn test_controllers_map_to_parameters() {
        let map = map();
        let cc = to_parameter_change(&MidiMessage::new(0xB0, 0, 7, 127), 0, &map).unwrap();
        assert_eq!(cc.0, 100);
        assert_relative_eq!(cc.1, 1.0);

        let at = to_parameter_change(&MidiMessage::new(0xD0, 0, 64, 0), 0, &map).unwrap();
        assert_eq!(at.0, 101);
        assert_relative_eq!(at.1, 64.0 / 127.0);

        let bend = to_parameter_change(&MidiMessage::new(0xE0, 1, 0x7F, 0x7F), 0, &map).unwrap();
        assert_eq!(bend.0, 102);
        assert_relative_eq!(bend.1, 1.0);
        let centre = to_parameter_change(&MidiMessage::new(0xE0, 1, 0, 0x40), 0, &map).unwrap();
        assert_relative_eq!(centre.1, 8192.0 / 16383.0);
    }

    #[test]
    fn test_unmapped_and_out_of_range_are_dropped() {
        let map = map();
        assert!(to_parameter_change(&MidiMessage::new(0xB0, 0, 8, 1), 0, &map).is_none());
        // Only one bus was scanned, so bus 1's assignment is not reachable.
        assert!(to_parameter_change(&MidiMessage::new(0xB0, 0, 7, 1), 1, &map).is_none());
        assert!(to_parameter_change(&MidiMessage::new(0xB0, 0, 7, 1), -1, &map).is_none());
        assert!(to_parameter_change(&MidiMessage::new(0xC0, 0, 7, 1), 0, &map).is_none());
        assert!(to_event(&MidiMessage::new(0xB0, 0, 7, 1), 0).is_none());
    }

    #[test]
    fn test_message_masks_status_and_channel() {
        let message = MidiMessage::new(0x9F, 0x1F, 60, 100);
        assert_eq!(message.status, 0x90);
        assert_eq!(message.channel, 0x0F);
        assert!(message.same_content(&MidiMessage::new(0x90, 15, 60, 100).at(9)));
    }

    #[test]
    fn test_map_counts() {
        let map = map();
        assert_eq!(map.mapped_count(), 3);
        assert!(MidiCcMap::empty().is_empty());
    }
}
