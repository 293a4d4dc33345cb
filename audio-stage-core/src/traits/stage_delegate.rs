/// Event delegate for staging session notifications.
///
/// All methods are called from the thread driving the stage, not the
/// playback thread. Implementations should marshal if needed.
pub trait StageDelegate: Send + Sync {
    /// Called after a pump cycle commits a block of samples.
    fn on_block_committed(&self, count: usize);

    /// Called when a glitch scan finds an amplitude discontinuity.
    /// `write_cursor` is the cursor position at scan time.
    fn on_discontinuity(&self, write_cursor: usize);
}
