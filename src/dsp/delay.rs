//! Feedback Delay
//!
//! A multi-channel circular delay line whose output is fed back into its own
//! input. With feedback `g` and delay `D`, an impulse produces echoes at
//! `D, 2D, 3D, ...` with amplitudes `1, g, g², ...`.

use crate::engine::model::{MAX_DELAY_FEEDBACK, MAX_DELAY_TIME_SECS};

/// Extra headroom in the line beyond the maximum delay time
const HEADROOM_SECS: f32 = 0.01;

/// Circular delay line with a feedback tap
///
/// The line is sized once for the maximum delay time so changing the delay
/// never reallocates on the render path.
#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    lines: Vec<Vec<f32>>,
    write_pos: usize,
    sample_rate: f32,
}

impl FeedbackDelay {
    /// Create a silent delay line for `channels` channels
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        let size = (((MAX_DELAY_TIME_SECS + HEADROOM_SECS) * sample_rate as f32) as usize).max(2);
        Self {
            lines: vec![vec![0.0; size]; channels],
            write_pos: 0,
            sample_rate: sample_rate as f32,
        }
    }

    /// Convert a delay time to samples, clamped to what the line can hold
    ///
    /// Values within a thousandth of a sample of a whole number snap to it, so
    /// times like 0.3 s land on exact sample boundaries despite f32 rounding.
    #[inline]
    pub fn time_to_samples(&self, seconds: f32) -> f32 {
        let max = (self.capacity() - 1) as f32;
        let samples = seconds * self.sample_rate;
        let whole = samples.round();
        let samples = if (samples - whole).abs() < 1e-3 {
            whole
        } else {
            samples
        };
        samples.clamp(1.0, max)
    }

    /// Line length in samples
    #[inline]
    pub fn capacity(&self) -> usize {
        self.lines.first().map(|l| l.len()).unwrap_or(0)
    }

    /// Read the delayed value for `channel` `delay_samples` behind the write
    /// head, interpolating linearly between neighbouring samples
    #[inline]
    fn read(&self, channel: usize, delay_samples: f32) -> f32 {
        let line = &self.lines[channel];
        let size = line.len();
        let whole = delay_samples.floor();
        let frac = delay_samples - whole;
        let whole = whole as usize;

        let idx_a = (self.write_pos + size - whole) % size;
        let a = line[idx_a];
        if frac == 0.0 {
            return a;
        }
        let idx_b = (self.write_pos + size - whole - 1) % size;
        a + (line[idx_b] - a) * frac
    }

    /// Run one frame through the line
    ///
    /// `frame` holds the send input for each channel and is overwritten with
    /// the delayed output. `feedback` is clamped below unity so the loop
    /// always decays.
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32], delay_samples: f32, feedback: f32) {
        let feedback = feedback.clamp(0.0, MAX_DELAY_FEEDBACK);
        let channels = self.lines.len().min(frame.len());
        for (ch, sample) in frame.iter_mut().enumerate().take(channels) {
            let delayed = self.read(ch, delay_samples);
            let write_pos = self.write_pos;
            self.lines[ch][write_pos] = *sample + delayed * feedback;
            *sample = delayed;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity().max(1);
    }

    /// Clear the line
    pub fn reset(&mut self) {
        for line in self.lines.iter_mut() {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_line_sized_for_max_delay() {
        let delay = FeedbackDelay::new(48000, 2);
        assert!(delay.capacity() >= 96000);
        assert_eq!(delay.time_to_samples(10.0), (delay.capacity() - 1) as f32);
        assert_eq!(delay.time_to_samples(0.0), 1.0);
        assert_eq!(delay.time_to_samples(0.3), 14400.0);
    }

    #[test]
    fn test_echo_train_decays_by_feedback() {
        let sample_rate = 1000;
        let mut delay = FeedbackDelay::new(sample_rate, 1);
        let d = delay.time_to_samples(0.1);
        assert_eq!(d, 100.0);

        let mut output = Vec::new();
        for i in 0..450 {
            let mut frame = [if i == 0 { 1.0 } else { 0.0 }];
            delay.process_frame(&mut frame, d, 0.5);
            output.push(frame[0]);
        }

        assert_abs_diff_eq!(output[100], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output[200], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output[300], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(output[400], 0.125, epsilon = 1e-6);
        assert_eq!(output[0], 0.0);
        assert_eq!(output[150], 0.0);
    }

    #[test]
    fn test_feedback_clamped_below_unity() {
        let mut delay = FeedbackDelay::new(1000, 1);
        let d = 10.0;
        let mut peak_late = 0.0_f32;
        for i in 0..2000 {
            let mut frame = [if i == 0 { 1.0 } else { 0.0 }];
            delay.process_frame(&mut frame, d, 5.0);
            if i > 1500 {
                peak_late = peak_late.max(frame[0].abs());
            }
        }
        assert!(peak_late < 1.0);
    }

    #[test]
    fn test_fractional_delay_interpolates() {
        let mut delay = FeedbackDelay::new(1000, 1);
        let mut output = Vec::new();
        for i in 0..20 {
            let mut frame = [if i == 0 { 1.0 } else { 0.0 }];
            delay.process_frame(&mut frame, 10.5, 0.0);
            output.push(frame[0]);
        }
        assert_abs_diff_eq!(output[10], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output[11], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut delay = FeedbackDelay::new(1000, 1);
        let mut frame = [1.0];
        delay.process_frame(&mut frame, 5.0, 0.5);
        delay.reset();
        for _ in 0..20 {
            let mut frame = [0.0];
            delay.process_frame(&mut frame, 5.0, 0.5);
            assert_eq!(frame[0], 0.0);
        }
    }
}
