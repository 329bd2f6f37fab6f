//! Three-band track EQ
//!
//! Low shelf at 320 Hz, peaking band at 1 kHz (Q = 1) and high shelf at
//! 3.2 kHz, each a biquad using the Audio EQ Cookbook formulas.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Low shelf corner frequency
pub const LOW_SHELF_HZ: f64 = 320.0;
/// Mid peak centre frequency
pub const MID_PEAK_HZ: f64 = 1000.0;
/// Mid peak Q
pub const MID_PEAK_Q: f64 = 1.0;
/// High shelf corner frequency
pub const HIGH_SHELF_HZ: f64 = 3200.0;

/// Gains smaller than this are treated as flat and the band is bypassed
const BYPASS_GAIN_DB: f32 = 0.01;

/// Filter shape of an EQ band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowShelf,
    Peak,
    HighShelf,
}

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Keep the corner below Nyquist for low sample rates
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Direct Form I
    #[inline]
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// One band: coefficients plus per-channel history
#[derive(Debug, Clone)]
struct Band {
    filter_type: FilterType,
    frequency: f64,
    q: f64,
    gain_db: f32,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl Band {
    fn new(filter_type: FilterType, frequency: f64, q: f64, channels: usize) -> Self {
        Self {
            filter_type,
            frequency,
            q,
            gain_db: 0.0,
            coeffs: BiquadCoeffs::default(),
            states: vec![BiquadState::default(); channels],
        }
    }

    fn set_gain(&mut self, gain_db: f32, sample_rate: f64) {
        if gain_db == self.gain_db {
            return;
        }
        self.gain_db = gain_db;
        self.coeffs = BiquadCoeffs::calculate(
            self.filter_type,
            sample_rate,
            self.frequency,
            gain_db as f64,
            self.q,
        );
    }

    #[inline]
    fn is_bypass(&self) -> bool {
        self.gain_db.abs() < BYPASS_GAIN_DB
    }
}

/// Fixed three-band EQ: low shelf → mid peak → high shelf
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    sample_rate: f64,
    bands: [Band; 3],
}

impl ThreeBandEq {
    /// Create a flat EQ for `channels` channels at `sample_rate`
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            bands: [
                Band::new(FilterType::LowShelf, LOW_SHELF_HZ, FRAC_1_SQRT_2, channels),
                Band::new(FilterType::Peak, MID_PEAK_HZ, MID_PEAK_Q, channels),
                Band::new(FilterType::HighShelf, HIGH_SHELF_HZ, FRAC_1_SQRT_2, channels),
            ],
        }
    }

    /// Set the three band gains in dB; coefficients are only recomputed for
    /// bands whose gain changed
    pub fn set_gains(&mut self, low_db: f32, mid_db: f32, high_db: f32) {
        let sample_rate = self.sample_rate;
        self.bands[0].set_gain(low_db, sample_rate);
        self.bands[1].set_gain(mid_db, sample_rate);
        self.bands[2].set_gain(high_db, sample_rate);
    }

    /// Filter one sample of `channel`
    ///
    /// Flat bands are skipped entirely, so an all-flat EQ is bit-transparent.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let mut value = input as f64;
        for band in self.bands.iter_mut() {
            if band.is_bypass() {
                continue;
            }
            if let Some(state) = band.states.get_mut(channel) {
                value = state.process(value, &band.coeffs);
            }
        }
        value as f32
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        for band in self.bands.iter_mut() {
            band.states.fill(BiquadState::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_rms(eq: &mut ThreeBandEq, frequency: f64, sample_rate: u32) -> f64 {
        let n = sample_rate as usize / 2;
        let mut sum = 0.0;
        // Skip the first 10% to let the filter settle
        let settle = n / 10;
        for i in 0..n {
            let x = (2.0 * PI * frequency * i as f64 / sample_rate as f64).sin() as f32;
            let y = eq.process_sample(0, x) as f64;
            if i >= settle {
                sum += y * y;
            }
        }
        (sum / (n - settle) as f64).sqrt()
    }

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = ThreeBandEq::new(48000, 1);
        for x in [0.0_f32, 0.5, -0.25, 1.0] {
            assert_eq!(eq.process_sample(0, x), x);
        }
    }

    #[test]
    fn test_low_shelf_boosts_bass() {
        let mut flat = ThreeBandEq::new(48000, 1);
        let mut boosted = ThreeBandEq::new(48000, 1);
        boosted.set_gains(12.0, 0.0, 0.0);

        let flat_rms = sine_rms(&mut flat, 60.0, 48000);
        let boosted_rms = sine_rms(&mut boosted, 60.0, 48000);
        let gain_db = 20.0 * (boosted_rms / flat_rms).log10();
        assert!((gain_db - 12.0).abs() < 1.0, "got {gain_db} dB");
    }

    #[test]
    fn test_mid_peak_cut_at_centre() {
        let mut flat = ThreeBandEq::new(48000, 1);
        let mut cut = ThreeBandEq::new(48000, 1);
        cut.set_gains(0.0, -12.0, 0.0);

        let flat_rms = sine_rms(&mut flat, 1000.0, 48000);
        let cut_rms = sine_rms(&mut cut, 1000.0, 48000);
        let gain_db = 20.0 * (cut_rms / flat_rms).log10();
        assert!((gain_db + 12.0).abs() < 0.5, "got {gain_db} dB");
    }

    #[test]
    fn test_high_shelf_leaves_bass_alone() {
        let mut flat = ThreeBandEq::new(48000, 1);
        let mut bright = ThreeBandEq::new(48000, 1);
        bright.set_gains(0.0, 0.0, 12.0);

        let flat_rms = sine_rms(&mut flat, 60.0, 48000);
        let bright_rms = sine_rms(&mut bright, 60.0, 48000);
        let gain_db = 20.0 * (bright_rms / flat_rms).log10();
        assert!(gain_db.abs() < 0.5, "got {gain_db} dB");
    }

    #[test]
    fn test_channels_are_independent() {
        let mut eq = ThreeBandEq::new(48000, 2);
        eq.set_gains(6.0, 6.0, 6.0);
        eq.process_sample(0, 1.0);
        // Right channel has seen no input, so a zero stays zero
        assert_eq!(eq.process_sample(1, 0.0), 0.0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut eq = ThreeBandEq::new(48000, 1);
        eq.set_gains(6.0, 0.0, 0.0);
        eq.process_sample(0, 1.0);
        eq.reset();
        assert_eq!(eq.process_sample(0, 0.0), 0.0);
    }
}
