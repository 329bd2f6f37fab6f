//! Track signal chain
//!
//! Fixed topology per track:
//!
//! ```text
//! input → eq_low → eq_mid → eq_high ─┬──────────────────────────→ volume → master
//!                                    └→ delay ─┬→ delay_wet ────↗
//!                                       ↑      │
//!                                       └─ feedback ┘
//! ```
//!
//! `TrackParams` is the producer-side surface: one atomic cell per
//! parameter. `TrackChain` is the render-side processor; it reads the cells
//! once per block and glides towards them through `SmoothedValue`s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::delay::FeedbackDelay;
use super::eq::ThreeBandEq;
use super::smoothing::{AtomicF32, Smoothing, SmoothedValue};
use crate::engine::model::Track;

/// Lock-free parameter surface shared between the producer and render threads
#[derive(Debug)]
pub struct TrackParams {
    volume: AtomicF32,
    muted: AtomicBool,
    soloed: AtomicBool,
    playback_rate: AtomicF32,
    eq_low: AtomicF32,
    eq_mid: AtomicF32,
    eq_high: AtomicF32,
    delay_time: AtomicF32,
    delay_feedback: AtomicF32,
    delay_mix: AtomicF32,
}

impl TrackParams {
    /// Build a parameter set from a track (clamping out-of-range values)
    pub fn from_track(track: &Track) -> Self {
        let track = track.sanitized();
        Self {
            volume: AtomicF32::new(track.volume),
            muted: AtomicBool::new(track.muted),
            soloed: AtomicBool::new(track.soloed),
            playback_rate: AtomicF32::new(track.playback_rate as f32),
            eq_low: AtomicF32::new(track.effects.eq_low),
            eq_mid: AtomicF32::new(track.effects.eq_mid),
            eq_high: AtomicF32::new(track.effects.eq_high),
            delay_time: AtomicF32::new(track.effects.delay_time),
            delay_feedback: AtomicF32::new(track.effects.delay_feedback),
            delay_mix: AtomicF32::new(track.effects.delay_mix),
        }
    }

    /// Overwrite every parameter from `track` in place
    ///
    /// Each field is an independent atomic store; the render side smooths
    /// towards whatever it reads, so a block that straddles an update never
    /// produces a discontinuity.
    pub fn apply(&self, track: &Track) {
        let track = track.sanitized();
        self.volume.store(track.volume);
        self.muted.store(track.muted, Ordering::Relaxed);
        self.soloed.store(track.soloed, Ordering::Relaxed);
        self.playback_rate.store(track.playback_rate as f32);
        self.eq_low.store(track.effects.eq_low);
        self.eq_mid.store(track.effects.eq_mid);
        self.eq_high.store(track.effects.eq_high);
        self.delay_time.store(track.effects.delay_time);
        self.delay_feedback.store(track.effects.delay_feedback);
        self.delay_mix.store(track.effects.delay_mix);
    }

    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed.load(Ordering::Relaxed)
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate.load() as f64
    }

    /// Gain the chain should settle on, folding in mute and solo state
    pub fn effective_gain(&self, any_soloed: bool) -> f32 {
        let audible = !self.is_muted() && (!any_soloed || self.is_soloed());
        if audible {
            self.volume()
        } else {
            0.0
        }
    }
}

/// Render-side processor for one track
#[derive(Debug)]
pub struct TrackChain {
    params: Arc<TrackParams>,
    channels: usize,
    eq: ThreeBandEq,
    delay: FeedbackDelay,
    gain: SmoothedValue,
    eq_low: SmoothedValue,
    eq_mid: SmoothedValue,
    eq_high: SmoothedValue,
    delay_samples: SmoothedValue,
    feedback: SmoothedValue,
    wet: SmoothedValue,
    /// Summed voice input for the current block, one Vec per channel
    input: Vec<Vec<f32>>,
    eq_frame: Vec<f32>,
    wet_frame: Vec<f32>,
}

impl TrackChain {
    /// Create a chain bound to `params`
    ///
    /// # Panics
    /// Panics if `sample_rate`, `channels` or `block_size` is zero; a chain
    /// cannot exist without a render context.
    pub fn new(
        params: Arc<TrackParams>,
        sample_rate: u32,
        channels: usize,
        block_size: usize,
        smoothing: Smoothing,
    ) -> Self {
        assert!(sample_rate > 0, "track chain needs a sample rate");
        assert!(channels > 0, "track chain needs at least one channel");
        assert!(block_size > 0, "track chain needs a block size");

        let mut eq = ThreeBandEq::new(sample_rate, channels);
        let delay = FeedbackDelay::new(sample_rate, channels);

        let low = params.eq_low.load();
        let mid = params.eq_mid.load();
        let high = params.eq_high.load();
        eq.set_gains(low, mid, high);

        let delay_samples = delay.time_to_samples(params.delay_time.load());
        let make = |v: f32| SmoothedValue::new(v, smoothing, sample_rate);

        Self {
            gain: make(params.effective_gain(false)),
            eq_low: make(low),
            eq_mid: make(mid),
            eq_high: make(high),
            delay_samples: make(delay_samples),
            feedback: make(params.delay_feedback.load()),
            wet: make(params.delay_mix.load()),
            params,
            channels,
            eq,
            delay,
            input: vec![vec![0.0; block_size]; channels],
            eq_frame: vec![0.0; channels],
            wet_frame: vec![0.0; channels],
        }
    }

    /// Parameter surface this chain reads from
    pub fn params(&self) -> &Arc<TrackParams> {
        &self.params
    }

    /// Zero the first `frames` frames of the input accumulator
    pub fn clear_input(&mut self, frames: usize) {
        for channel in self.input.iter_mut() {
            let end = frames.min(channel.len());
            channel[..end].fill(0.0);
        }
    }

    /// Input accumulator that voices sum into
    pub fn input_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.input
    }

    /// Pull the latest parameter values and retarget the smoothers
    pub fn sync_params(&mut self, any_soloed: bool) {
        self.gain.set_target(self.params.effective_gain(any_soloed));
        self.eq_low.set_target(self.params.eq_low.load());
        self.eq_mid.set_target(self.params.eq_mid.load());
        self.eq_high.set_target(self.params.eq_high.load());
        let samples = self.delay.time_to_samples(self.params.delay_time.load());
        self.delay_samples.set_target(samples);
        self.feedback.set_target(self.params.delay_feedback.load());
        self.wet.set_target(self.params.delay_mix.load());
    }

    /// Run `frames` frames of the input through the chain and add the result
    /// into `master`
    pub fn process_into(&mut self, frames: usize, master: &mut [Vec<f32>]) {
        let frames = frames.min(self.input.first().map(|c| c.len()).unwrap_or(0));

        // EQ gains move once per block; recomputing biquads per sample
        // would be wasteful and the block is short enough to stay click-free
        if self.eq_low.is_ramping() || self.eq_mid.is_ramping() || self.eq_high.is_ramping() {
            let low = self.eq_low.skip(frames);
            let mid = self.eq_mid.skip(frames);
            let high = self.eq_high.skip(frames);
            self.eq.set_gains(low, mid, high);
        } else {
            self.eq.set_gains(
                self.eq_low.current(),
                self.eq_mid.current(),
                self.eq_high.current(),
            );
        }

        let out_channels = master.len();
        for i in 0..frames {
            let gain = self.gain.next_value();
            let delay_samples = self.delay_samples.next_value();
            let feedback = self.feedback.next_value();
            let wet = self.wet.next_value();

            for ch in 0..self.channels {
                let filtered = self.eq.process_sample(ch, self.input[ch][i]);
                self.eq_frame[ch] = filtered;
                self.wet_frame[ch] = filtered;
            }

            self.delay
                .process_frame(&mut self.wet_frame, delay_samples, feedback);

            for ch in 0..self.channels.min(out_channels) {
                master[ch][i] += gain * (self.eq_frame[ch] + wet * self.wet_frame[ch]);
            }
        }
    }

    /// Clear filter and delay history
    pub fn reset(&mut self) {
        self.eq.reset();
        self.delay.reset();
    }
}
