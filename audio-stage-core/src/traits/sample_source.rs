use crate::models::error::StageError;

/// Interface for the audio-producing collaborator.
///
/// The stage calls this each pump cycle with a destination sized to the
/// span it can currently stage ahead of playback. Implementations fill
/// `dest` from the front and return the number of samples actually
/// produced, which may be less than `dest.len()` when less audio is ready.
///
/// Called from whichever thread pumps the stage; keep processing minimal
/// when that is an audio callback.
pub trait SampleSource: Send {
    /// Produce up to `dest.len()` samples, returning the count written.
    fn read_samples(&mut self, dest: &mut [i16]) -> Result<usize, StageError>;
}
