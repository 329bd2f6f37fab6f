//! Audio Buffer Management
//!
//! Decoded PCM audio as held by the sample store and produced by the
//! offline renderer. Samples are stored non-interleaved as 32-bit floats.

use crate::error::{MixError, Result};

/// Default engine sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Peak absolute sample value across all channels
pub fn peak(buffer: &AudioBuffer) -> f32 {
    buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded, multi-channel audio
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate `Vec<f32>` and all channels have equal length.
///
/// # Example
/// ```
/// use mixlane::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::silence(2, 48000, 48000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer with `channels` channels of `frames` samples
    pub fn silence(channels: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; frames]; channels],
            sample_rate,
        }
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// Fails if no channels are given, the channels have unequal lengths,
    /// or the sample rate is zero.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(MixError::InvalidBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }
        if sample_rate == 0 {
            return Err(MixError::InvalidBuffer {
                reason: "sample rate must be non-zero".to_string(),
            });
        }
        let frames = samples[0].len();
        if samples.iter().any(|ch| ch.len() != frames) {
            return Err(MixError::InvalidBuffer {
                reason: "channels have different lengths".to_string(),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(MixError::InvalidBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }

        if interleaved.len() % channels != 0 {
            return Err(MixError::InvalidBuffer {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
            });
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];

        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::from_channels(samples, sample_rate)
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_frames = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_frames);

        for frame in 0..num_frames {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Sample at `frame` of the channel feeding output channel `channel`
    ///
    /// Mono sources are fanned out to every output channel; sources with
    /// fewer channels than the output repeat their last channel.
    #[inline]
    pub fn sample_for_output(&self, channel: usize, frame: usize) -> f32 {
        let src = channel.min(self.channels().saturating_sub(1));
        self.samples
            .get(src)
            .and_then(|ch| ch.get(frame).copied())
            .unwrap_or(0.0)
    }

    /// True if every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.samples
            .iter()
            .all(|channel| channel.iter().all(|&s| s == 0.0))
    }
}

// ============================================================================
// Tests
// ============================================================================
