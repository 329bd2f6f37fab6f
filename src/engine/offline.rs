//! Offline rendering
//!
//! Rebuilds the live graph against a fixed-length target and runs it to
//! completion. Parameters are applied statically (no ramps) and nothing
//! depends on wall-clock time, so identical inputs render bit-identically.

use std::sync::Arc;

use log::{debug, info};

use super::buffer::AudioBuffer;
use super::mixer::MixCore;
use super::model::{Clip, Track};
use super::scheduler::plan_voices;
use super::store::SampleStore;
use crate::dsp::{Smoothing, TrackChain, TrackParams};
use crate::error::{MixError, Result};

/// Renders a whole timeline into a single buffer
#[derive(Debug, Clone, Copy)]
pub struct OfflineRenderer {
    sample_rate: u32,
    channels: usize,
    block_size: usize,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32, channels: usize, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
        }
    }

    /// Render `[0, total_duration]` of the timeline
    ///
    /// Each clip starts at its absolute `start_time`; clips on muted tracks
    /// and clips that start after `total_duration` contribute nothing.
    pub fn render(
        &self,
        clips: &[Clip],
        tracks: &[Track],
        store: &SampleStore,
        total_duration: f64,
    ) -> Result<AudioBuffer> {
        if !total_duration.is_finite() || total_duration < 0.0 {
            return Err(MixError::InvalidDuration {
                duration_secs: total_duration,
            });
        }

        let total_frames = (total_duration * self.sample_rate as f64).round() as usize;
        let mut core = MixCore::new(self.sample_rate, self.channels, self.block_size);

        for track in tracks {
            let chain = TrackChain::new(
                Arc::new(TrackParams::from_track(track)),
                self.sample_rate,
                self.channels,
                self.block_size,
                Smoothing::Static,
            );
            core.attach_chain(track.id.clone(), chain);
        }

        let plans = plan_voices(clips, tracks, store, 0.0);
        for (id, plan) in plans.iter().enumerate() {
            core.start_voice(id as u64, plan, 0);
        }
        debug!(
            "offline render: {} tracks, {} voices, {} frames",
            tracks.len(),
            plans.len(),
            total_frames
        );

        let mut output = AudioBuffer::silence(self.channels, total_frames, self.sample_rate);
        let mut finished = Vec::new();
        let mut written = 0;
        while written < total_frames {
            let frames = (total_frames - written).min(self.block_size);
            let master = core.render_block(frames, &mut finished);
            for (ch, channel) in output.samples.iter_mut().enumerate() {
                channel[written..written + frames].copy_from_slice(&master[ch][..frames]);
            }
            finished.clear();
            written += frames;
        }

        info!(
            "rendered {:.3}s ({} ch @ {} Hz)",
            total_duration, self.channels, self.sample_rate
        );
        Ok(output)
    }
}
