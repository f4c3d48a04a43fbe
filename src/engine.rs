//! What the host needs to know about the synthesis engine calling it.

/// Identifies one engine instance. Plugin handles are scoped to it.
pub type ContextId = u64;

/// The embedding engine, as seen from one opcode call.
///
/// Timing queries reflect the moment of the call: `current_time_frames`
/// advances once per control period, `control_cycle` counts control periods
/// since the calling instrument started, and `score_time` is that
/// instrument's start time.
pub trait EngineContext {
    fn id(&self) -> ContextId;

    fn sample_rate(&self) -> f64;

    /// Frames per control period.
    fn block_size(&self) -> usize;

    fn current_time_frames(&self) -> i64;

    fn control_cycle(&self) -> i64;

    /// Seconds.
    fn score_time(&self) -> f64;
}
