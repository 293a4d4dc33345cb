use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::StageConfig;
use crate::models::diagnostics::StageDiagnostics;
use crate::models::error::StageError;
use crate::processing::sample_buffer::CircularSampleBuffer;
use crate::traits::sample_source::SampleSource;
use crate::traits::stage_delegate::StageDelegate;

/// Playback staging session.
///
/// Keeps the ring's write cursor a fixed lead ahead of the playback
/// position: each [`pump`] computes how many samples fit between the
/// cursor and the lead target, pulls at most that many from the
/// [`SampleSource`], writes them at the cursor, and commits the block.
///
/// Data flow:
/// ```text
/// [SampleSource] → pump → [CircularSampleBuffer] → fill → playback device
/// ```
///
/// The buffer itself is unsynchronized; the stage holds it behind
/// `Arc<parking_lot::Mutex<_>>` so [`fill`] (or the handle from
/// [`buffer`]) can run on the device callback thread while [`pump`] runs
/// on the producer thread.
///
/// [`pump`]: PlaybackStage::pump
/// [`fill`]: PlaybackStage::fill
/// [`buffer`]: PlaybackStage::buffer
pub struct PlaybackStage<S: SampleSource> {
    source: S,
    buffer: Arc<Mutex<CircularSampleBuffer>>,
    config: Option<StageConfig>,
    lead_samples: usize,
    delegate: Option<Arc<dyn StageDelegate>>,
    diagnostics: StageDiagnostics,
    // Reused between pumps so the steady state does not allocate.
    scratch: Vec<i16>,
}

impl<S: SampleSource> PlaybackStage<S> {
    /// Create an unconfigured stage around a sample source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: Arc::new(Mutex::new(CircularSampleBuffer::new())),
            config: None,
            lead_samples: 0,
            delegate: None,
            diagnostics: StageDiagnostics::default(),
            scratch: Vec::new(),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn StageDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Apply configuration: (re)initialize the ring and pre-advance the
    /// write cursor by the configured lead so playback starts behind it.
    pub fn configure(&mut self, config: StageConfig) -> Result<(), StageError> {
        config.validate().map_err(StageError::ConfigurationFailed)?;

        let lead = config.lead_samples();
        {
            let mut buffer = self.buffer.lock();
            buffer.initialize(config.sample_rate, config.capacity)?;
            buffer.commit(0, lead as i64)?;
        }

        log::debug!(
            "stage configured: {} Hz, ring of {} samples, lead {} samples",
            config.sample_rate,
            config.capacity,
            lead
        );

        self.lead_samples = lead;
        self.config = Some(config);
        Ok(())
    }

    /// One staging cycle.
    ///
    /// `playback_position` is the ring position the consumer will read
    /// next. Tops the ring up to `lead` samples ahead of it and returns
    /// the number of samples committed. Writes nothing when the cursor is
    /// already at or past the lead target.
    pub fn pump(&mut self, playback_position: usize) -> Result<usize, StageError> {
        self.ensure_configured()?;
        self.diagnostics.pump_cycles += 1;

        let lead = self.lead_samples as i64;
        let (cursor, writable) = {
            let buffer = self.buffer.lock();
            let cursor = buffer.write_cursor();
            let target = buffer.index(playback_position as i64, lead)?;
            let writable = buffer.sample_delta(cursor, target)?;
            let current_lead = buffer.sample_delta(playback_position, cursor)?;
            // Already ahead of the target: the "writable" span would be a
            // near-full wrap, not a top-up.
            if current_lead > self.lead_samples {
                return Ok(0);
            }
            (cursor, writable)
        };
        if writable == 0 {
            return Ok(0);
        }

        self.scratch.resize(writable, 0);
        let produced = match self.source.read_samples(&mut self.scratch[..writable]) {
            Ok(count) => count.min(writable),
            Err(err) => {
                log::error!("sample source failed during pump: {err}");
                return Err(err);
            }
        };
        if produced < writable {
            self.diagnostics.short_reads += 1;
        }
        if produced == 0 {
            return Ok(0);
        }

        {
            let mut buffer = self.buffer.lock();
            for (i, &sample) in self.scratch[..produced].iter().enumerate() {
                buffer.write_sample(sample, cursor as i64, i as i64)?;
            }
            buffer.commit(cursor as i64, produced as i64)?;
        }
        self.diagnostics.samples_committed += produced as u64;

        if let Some(ref delegate) = self.delegate {
            delegate.on_block_committed(produced);
        }
        Ok(produced)
    }

    /// Consumer side: copy `dest.len()` staged samples starting at
    /// `position` into `dest`, in time order.
    pub fn fill(&self, dest: &mut [i16], position: usize) -> Result<(), StageError> {
        let length = dest.len();
        self.buffer.lock().copy_out(dest, position as i64, length)
    }

    /// Seconds of audio staged ahead of `playback_position`.
    pub fn latency(&self, playback_position: usize) -> Result<f64, StageError> {
        let buffer = self.buffer.lock();
        let cursor = buffer.write_cursor();
        buffer.time_delta(playback_position, cursor)
    }

    /// Run a discontinuity scan over the full ring.
    ///
    /// On detection, logs a warning, bumps the diagnostics counter, and
    /// notifies the delegate. O(capacity); call periodically, not per
    /// sample.
    pub fn scan_for_glitches(&mut self, threshold: u32) -> Result<bool, StageError> {
        let (found, cursor) = {
            let buffer = self.buffer.lock();
            (buffer.detect_discontinuity(threshold)?, buffer.write_cursor())
        };

        if found {
            self.diagnostics.discontinuities += 1;
            log::warn!("amplitude discontinuity of {threshold}+ near write cursor {cursor}");
            if let Some(ref delegate) = self.delegate {
                delegate.on_discontinuity(cursor);
            }
        }
        Ok(found)
    }

    pub fn diagnostics(&self) -> StageDiagnostics {
        self.diagnostics.clone()
    }

    pub fn config(&self) -> Option<&StageConfig> {
        self.config.as_ref()
    }

    /// Shared handle to the ring buffer for playback device integration.
    pub fn buffer(&self) -> Arc<Mutex<CircularSampleBuffer>> {
        Arc::clone(&self.buffer)
    }

    /// Release the ring and return to the unconfigured state. Idempotent.
    pub fn shutdown(&mut self) {
        self.buffer.lock().destroy();
        self.config = None;
        self.lead_samples = 0;
        log::debug!("stage shut down");
    }

    fn ensure_configured(&self) -> Result<(), StageError> {
        if self.config.is_none() {
            return Err(StageError::ConfigurationFailed("stage not configured".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_relative_eq;

    use super::*;

    /// Source producing a known ramp, optionally capped per call.
    struct RampSource {
        next: i16,
        max_per_read: Option<usize>,
    }

    impl RampSource {
        fn new() -> Self {
            Self {
                next: 0,
                max_per_read: None,
            }
        }
    }

    impl SampleSource for RampSource {
        fn read_samples(&mut self, dest: &mut [i16]) -> Result<usize, StageError> {
            let count = match self.max_per_read {
                Some(max) => max.min(dest.len()),
                None => dest.len(),
            };
            for slot in &mut dest[..count] {
                *slot = self.next;
                self.next = self.next.wrapping_add(1);
            }
            Ok(count)
        }
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn read_samples(&mut self, _dest: &mut [i16]) -> Result<usize, StageError> {
            Err(StageError::SourceFailed("engine stalled".into()))
        }
    }

    #[derive(Default)]
    struct CountingDelegate {
        committed: AtomicUsize,
        discontinuities: AtomicUsize,
    }

    impl StageDelegate for CountingDelegate {
        fn on_block_committed(&self, count: usize) {
            self.committed.fetch_add(count, Ordering::SeqCst);
        }

        fn on_discontinuity(&self, _write_cursor: usize) {
            self.discontinuities.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_config() -> StageConfig {
        StageConfig {
            sample_rate: 1000,
            capacity: 1000,
            lead_secs: 0.1,
        }
    }

    #[test]
    fn configure_establishes_initial_lead() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        assert_eq!(stage.buffer().lock().write_cursor(), 100);
        assert_relative_eq!(stage.latency(0).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn pump_requires_configuration() {
        let mut stage = PlaybackStage::new(RampSource::new());
        assert!(matches!(
            stage.pump(0),
            Err(StageError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn pump_tops_up_to_the_lead_target() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        // Cursor starts at the lead target, so there is nothing to write.
        assert_eq!(stage.pump(0).unwrap(), 0);

        // Playback advanced 40 samples; the cursor is topped back up.
        assert_eq!(stage.pump(40).unwrap(), 40);
        assert_eq!(stage.buffer().lock().write_cursor(), 140);
        assert_relative_eq!(stage.latency(40).unwrap(), 0.1, epsilon = 1e-12);

        // Nothing more to do at the same position.
        assert_eq!(stage.pump(40).unwrap(), 0);
    }

    #[test]
    fn pump_skips_when_already_past_the_target() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        // Move the cursor well past the lead target for this playback
        // position; the cycle must not treat the gap as writable span.
        stage.buffer().lock().commit(0, 300).unwrap();
        assert_eq!(stage.pump(40).unwrap(), 0);
        assert_eq!(stage.buffer().lock().write_cursor(), 300);
    }

    #[test]
    fn pump_commits_only_what_the_source_produced() {
        let mut source = RampSource::new();
        source.max_per_read = Some(25);
        let mut stage = PlaybackStage::new(source);
        stage.configure(test_config()).unwrap();

        assert_eq!(stage.pump(60).unwrap(), 25);
        assert_eq!(stage.buffer().lock().write_cursor(), 125);

        let diagnostics = stage.diagnostics();
        assert_eq!(diagnostics.short_reads, 1);
        assert_eq!(diagnostics.samples_committed, 25);
    }

    #[test]
    fn pumped_samples_come_back_out_in_time_order() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        stage.pump(50).unwrap(); // ramp 0..50 written at positions 100..150

        let mut dest = [0i16; 10];
        stage.fill(&mut dest, 100).unwrap();
        assert_eq!(dest, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn pump_wraps_across_the_ring_end() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        // Move the cursor near the physical end, then stage across it.
        stage.buffer().lock().commit(0, 990).unwrap();
        let written = stage.pump(950).unwrap();
        assert_eq!(written, 60);
        assert_eq!(stage.buffer().lock().write_cursor(), 50);

        let mut dest = [0i16; 20];
        stage.fill(&mut dest, 990).unwrap();
        let expected: Vec<i16> = (0..20).collect();
        assert_eq!(dest.to_vec(), expected);
    }

    #[test]
    fn source_failure_is_propagated_and_nothing_committed() {
        let mut stage = PlaybackStage::new(FailingSource);
        stage.configure(test_config()).unwrap();

        assert_eq!(
            stage.pump(40),
            Err(StageError::SourceFailed("engine stalled".into()))
        );
        assert_eq!(stage.buffer().lock().write_cursor(), 100);
        assert_eq!(stage.diagnostics().samples_committed, 0);
    }

    #[test]
    fn glitch_scan_reports_and_counts() {
        let mut stage = PlaybackStage::new(RampSource::new());
        let delegate = Arc::new(CountingDelegate::default());
        stage.set_delegate(delegate.clone());
        stage.configure(test_config()).unwrap();

        // Quiet ring: nothing to report.
        assert!(!stage.scan_for_glitches(50).unwrap());

        stage.buffer().lock().write_sample(3000, 500, 0).unwrap();
        assert!(stage.scan_for_glitches(50).unwrap());
        assert_eq!(stage.diagnostics().discontinuities, 1);
        assert_eq!(delegate.discontinuities.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delegate_sees_committed_blocks() {
        let mut stage = PlaybackStage::new(RampSource::new());
        let delegate = Arc::new(CountingDelegate::default());
        stage.set_delegate(delegate.clone());
        stage.configure(test_config()).unwrap();

        stage.pump(30).unwrap();
        stage.pump(80).unwrap();
        assert_eq!(delegate.committed.load(Ordering::SeqCst), 80);
    }

    #[test]
    fn shutdown_releases_the_ring_and_is_idempotent() {
        let mut stage = PlaybackStage::new(RampSource::new());
        stage.configure(test_config()).unwrap();

        stage.shutdown();
        stage.shutdown();
        assert!(!stage.buffer().lock().is_initialized());
        assert!(matches!(
            stage.pump(0),
            Err(StageError::ConfigurationFailed(_))
        ));

        // Reconfiguration brings the stage back.
        stage.configure(test_config()).unwrap();
        assert_eq!(stage.pump(10).unwrap(), 10);
    }
}
