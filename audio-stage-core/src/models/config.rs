use serde::{Deserialize, Serialize};

/// Configuration for a playback staging buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Sample rate in Hz (default: 44100, the playback device rate).
    pub sample_rate: u32,

    /// Ring capacity in samples (default: 44100, one second of audio).
    pub capacity: usize,

    /// Write-ahead target in seconds: how far the write cursor should stay
    /// ahead of the playback position (default: 0.1).
    pub lead_secs: f64,
}

impl StageConfig {
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        Self {
            sample_rate,
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.capacity == 0 {
            return Err("capacity must be positive".into());
        }
        if !self.lead_secs.is_finite() || self.lead_secs < 0.0 {
            return Err(format!("invalid lead: {}", self.lead_secs));
        }
        // The lead must fit inside the ring, or the cursor laps playback.
        if self.lead_secs * self.sample_rate as f64 >= self.capacity as f64 {
            return Err(format!(
                "lead of {}s does not fit a ring of {} samples at {} Hz",
                self.lead_secs, self.capacity, self.sample_rate
            ));
        }
        Ok(())
    }

    /// The configured lead converted to a whole sample count.
    pub fn lead_samples(&self) -> usize {
        (self.lead_secs * self.sample_rate as f64) as usize
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            capacity: 44100,
            lead_secs: 0.1,
        }
    }
}
