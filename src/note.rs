//! Score notes turned into a correlated note-on/note-off pair.
//!
//! The note on is timestamped inside the current block from the difference
//! between the note's score time and the engine's performance time. The
//! note off is built at the same time but issued later by the caller, when
//! the note is released.

use crate::error::Result;
use crate::instance::PluginInstance;
use plughost_abi::{Event, EventKind};

/// A note as the score describes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRequest {
    pub channel: i16,
    /// Fractional MIDI key number.
    pub key: f64,
    /// 0..=127.
    pub velocity: f64,
    /// Seconds. Zero schedules nothing, negative means indefinite.
    pub duration: f64,
    /// Start time in seconds.
    pub score_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub note_id: i32,
    pub on: Event,
    pub off: Event,
    /// Score time in seconds at which `off` is due.
    pub off_time: f64,
}

/// Split a fractional key into the nearest key and a cents deviation.
pub fn split_key(key: f64) -> (i16, f32) {
    let pitch = (key + 0.5).floor();
    (pitch as i16, ((key - pitch) * 100.0) as f32)
}

/// Build the event pair for `request`, or `None` for a zero-length note.
pub fn schedule(
    request: &NoteRequest,
    note_id: i32,
    sample_rate: f64,
    current_time_frames: i64,
    indefinite_seconds: f64,
) -> Option<ScheduledNote> {
    if request.duration == 0.0 {
        return None;
    }
    let current_time = current_time_frames as f64 / sample_rate;
    let delta_frames = ((request.score_time - current_time) * sample_rate).max(0.0) as i32;
    let off_time = if request.duration > 0.0 {
        request.score_time + request.duration
    } else {
        request.score_time + indefinite_seconds
    };

    let channel = request.channel & 0x0F;
    let (pitch, tuning) = split_key(request.key);
    let on = Event::new(EventKind::NoteOn {
        channel,
        pitch,
        tuning,
        velocity: (request.velocity / 127.0) as f32,
        length: (request.duration.max(0.0) * sample_rate) as i32,
        note_id,
    })
    .at(delta_frames);
    let off = Event::new(EventKind::NoteOff {
        channel,
        pitch,
        velocity: 0.0,
        note_id,
        tuning,
    });

    Some(ScheduledNote {
        note_id,
        on,
        off,
        off_time,
    })
}

impl PluginInstance {
    /// Queue the note on for `request` and return the pair, or `None` when
    /// the note has zero duration.
    pub fn start_note(
        &mut self,
        request: &NoteRequest,
        sample_rate: f64,
        current_time_frames: i64,
    ) -> Result<Option<ScheduledNote>> {
        if request.duration == 0.0 {
            tracing::debug!(key = request.key, "Not scheduling zero-duration note");
            return Ok(None);
        }
        let note_id = self.next_note_id();
        let indefinite = self.config.indefinite_note_seconds;
        let Some(note) = schedule(request, note_id, sample_rate, current_time_frames, indefinite)
        else {
            return Ok(None);
        };
        tracing::trace!(
            note_id,
            offset = note.on.sample_offset,
            off_time = note.off_time,
            "Note on"
        );
        self.add_event(note.on)?;
        Ok(Some(note))
    }

    /// Queue the note off of a previously started note at the block start.
    pub fn release_note(&mut self, note: &ScheduledNote) -> Result<()> {
        tracing::trace!(note_id = note.note_id, "Note off");
        self.add_event(note.off.at(0))
    }
}
