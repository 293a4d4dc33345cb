use crate::models::error::StageError;

/// Fixed-capacity circular sample buffer staging audio for playback.
///
/// Owns a ring of `i16` samples plus a write cursor marking the boundary
/// between committed and not-yet-written audio. A producer writes samples
/// at arbitrary offsets and publishes them with [`commit`]; a consumer
/// pulls spans back out with [`read_sample`] or [`copy_out`] and reasons
/// about elapsed time with [`time_delta`].
///
/// The buffer performs no synchronization and never allocates after
/// [`initialize`]. Wrap it in `Arc<parking_lot::Mutex<...>>` when producer
/// and consumer live on different threads.
///
/// [`commit`]: CircularSampleBuffer::commit
/// [`read_sample`]: CircularSampleBuffer::read_sample
/// [`copy_out`]: CircularSampleBuffer::copy_out
/// [`time_delta`]: CircularSampleBuffer::time_delta
/// [`initialize`]: CircularSampleBuffer::initialize
#[derive(Debug, Default)]
pub struct CircularSampleBuffer {
    // Empty slice means uninitialized; every public operation checks.
    samples: Box<[i16]>,
    write_cursor: usize,
    sample_rate: u32,
    seconds_per_sample: f64,
}

impl CircularSampleBuffer {
    /// Create an uninitialized buffer (capacity 0, no storage).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled ring and reset the write cursor.
    ///
    /// May be called on an already-initialized buffer; the previous storage
    /// is released and all state starts over from the new parameters.
    pub fn initialize(&mut self, sample_rate: u32, capacity: usize) -> Result<(), StageError> {
        if sample_rate == 0 {
            return Err(StageError::ConfigurationFailed(
                "sample rate must be positive".into(),
            ));
        }
        if capacity == 0 {
            return Err(StageError::ConfigurationFailed(
                "capacity must be positive".into(),
            ));
        }

        self.samples = vec![0i16; capacity].into_boxed_slice();
        self.write_cursor = 0;
        self.sample_rate = sample_rate;
        self.seconds_per_sample = 1.0 / f64::from(sample_rate);
        Ok(())
    }

    /// Release sample storage and return to the uninitialized state.
    /// Idempotent; the buffer may be initialized again afterwards.
    pub fn destroy(&mut self) {
        self.samples = Box::default();
        self.write_cursor = 0;
        self.sample_rate = 0;
        self.seconds_per_sample = 0.0;
    }

    pub fn is_initialized(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Number of slots in the ring (0 while uninitialized).
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Ring position one past the most recently committed sample.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Normalize `offset + delta` into a ring position in `[0, capacity)`.
    ///
    /// This is the arithmetic primitive every other operation builds on.
    /// Any input is legal: negative values (reading behind the cursor) and
    /// values several wraps ahead normalize the same way.
    pub fn index(&self, offset: i64, delta: i64) -> Result<usize, StageError> {
        let capacity = self.checked_capacity()?;
        Ok((offset + delta).rem_euclid(capacity as i64) as usize)
    }

    /// Store `sample` at ring position `index(offset, delta)`.
    pub fn write_sample(&mut self, sample: i16, offset: i64, delta: i64) -> Result<(), StageError> {
        let at = self.index(offset, delta)?;
        self.samples[at] = sample;
        Ok(())
    }

    /// Read the sample at ring position `index(offset, delta)`.
    pub fn read_sample(&self, offset: i64, delta: i64) -> Result<i16, StageError> {
        let at = self.index(offset, delta)?;
        Ok(self.samples[at])
    }

    /// Advance the write cursor past `length` samples starting at `offset`.
    ///
    /// This is the only mutator of the cursor. The caller is responsible
    /// for having actually written those samples; the buffer does not
    /// verify it.
    pub fn commit(&mut self, offset: i64, length: i64) -> Result<(), StageError> {
        self.write_cursor = self.index(offset, length)?;
        Ok(())
    }

    /// Copy `length` samples starting at ring position `index(offset, 0)`
    /// into `dest`, oldest to newest.
    ///
    /// A span that crosses the physical end of the ring is copied in two
    /// segments. When start and end positions coincide (length 0 or an
    /// exact multiple of the capacity) nothing is copied and `dest` is
    /// left untouched; a span longer than the ring reduces modularly the
    /// same way.
    pub fn copy_out(&self, dest: &mut [i16], offset: i64, length: usize) -> Result<(), StageError> {
        let capacity = self.checked_capacity()?;
        if dest.len() < length {
            return Err(StageError::DestinationTooSmall {
                needed: length,
                available: dest.len(),
            });
        }

        let start = self.index(offset, 0)?;
        let end = self.index(offset, length as i64)?;

        if start == end {
            return Ok(());
        }
        if start < end {
            dest[..end - start].copy_from_slice(&self.samples[start..end]);
        } else {
            let first = capacity - start;
            dest[..first].copy_from_slice(&self.samples[start..]);
            dest[first..first + end].copy_from_slice(&self.samples[..end]);
        }
        Ok(())
    }

    /// Convert a sample count to elapsed seconds.
    ///
    /// Pure scaling; the caller supplies an already-computed count, not a
    /// ring position.
    pub fn sample_to_time(&self, sample_count: i64) -> Result<f64, StageError> {
        self.checked_capacity()?;
        Ok(sample_count as f64 * self.seconds_per_sample)
    }

    /// Elapsed seconds moving forward around the ring from `sample0` to
    /// `sample1`. Always non-negative; see [`sample_delta`] for the
    /// single-wrap assumption.
    ///
    /// [`sample_delta`]: CircularSampleBuffer::sample_delta
    pub fn time_delta(&self, sample0: usize, sample1: usize) -> Result<f64, StageError> {
        let delta = self.sample_delta(sample0, sample1)?;
        self.sample_to_time(delta as i64)
    }

    /// Forward distance in samples from ring position `sample0` to
    /// `sample1`.
    ///
    /// Assumes at most one wrap: a distance of zero and a distance of a
    /// full buffer span are indistinguishable, so the result is valid only
    /// when the true forward distance is under one buffer span. Callers
    /// keep the contract by querying at sub-buffer-length intervals.
    pub fn sample_delta(&self, sample0: usize, sample1: usize) -> Result<usize, StageError> {
        let capacity = self.checked_capacity()?;
        let sample0 = sample0 % capacity;
        let sample1 = sample1 % capacity;
        if sample1 == sample0 {
            Ok(0)
        } else if sample1 < sample0 {
            Ok((capacity - sample0) + sample1)
        } else {
            Ok(sample1 - sample0)
        }
    }

    /// Scan the full ring for an amplitude jump of at least `threshold`
    /// between adjacent samples.
    ///
    /// Traverses the `capacity - 1` adjacent pairs in time order starting
    /// at the write cursor and returns true on the first jump at or above
    /// the threshold. O(capacity): meant for periodic diagnostics, not
    /// per-sample use.
    pub fn detect_discontinuity(&self, threshold: u32) -> Result<bool, StageError> {
        let capacity = self.checked_capacity()?;
        let cursor = self.write_cursor as i64;
        for i in 0..capacity.saturating_sub(1) {
            let s0 = self.samples[self.index(cursor, i as i64)?];
            let s1 = self.samples[self.index(cursor, i as i64 + 1)?];
            let jump = (i32::from(s1) - i32::from(s0)).unsigned_abs();
            if jump >= threshold {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn checked_capacity(&self) -> Result<usize, StageError> {
        if self.samples.is_empty() {
            return Err(StageError::NotInitialized);
        }
        Ok(self.samples.len())
    }
}
