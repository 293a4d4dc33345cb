//! # audio-stage-core
//!
//! Platform-agnostic audio playback staging core.
//!
//! Provides a fixed-capacity circular sample buffer with wraparound-safe
//! bulk reads, sample/time conversion, and glitch detection, plus a
//! staging session that keeps the buffer topped up a fixed lead ahead of
//! playback. Sample producers (synthesizers, simulators, decoders) and
//! playback device backends plug in through the `SampleSource` trait and
//! the shared buffer handle.
//!
//! ## Architecture
//!
//! ```text
//! audio-stage-core (this crate)
//! ├── traits/       ← SampleSource, StageDelegate
//! ├── models/       ← StageError, StageConfig, StageDiagnostics
//! ├── processing/   ← CircularSampleBuffer
//! └── session/      ← PlaybackStage (lead-targeted staging orchestrator)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::StageConfig;
pub use models::diagnostics::StageDiagnostics;
pub use models::error::StageError;
pub use processing::sample_buffer::CircularSampleBuffer;
pub use session::playback_stage::PlaybackStage;
pub use traits::sample_source::SampleSource;
pub use traits::stage_delegate::StageDelegate;
