//! Voices
//!
//! A voice is one sounding instance of a clip: a read window into a shared
//! buffer, a start frame on the bus timeline and a playback rate.

use std::sync::Arc;

use super::buffer::AudioBuffer;
use super::scheduler::VoicePlan;

/// Identifier of a voice, unique per engine
pub type VoiceId = u64;

/// One-shot buffer player
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    track_id: String,
    buffer: Arc<AudioBuffer>,
    /// Bus frame at which output begins
    start_frame: u64,
    /// Current read position in buffer frames
    position: f64,
    /// Read position at which the voice ends
    end: f64,
    /// Buffer frames consumed per output frame
    step: f64,
}

impl Voice {
    /// Build a voice from a plan, starting at bus frame `start_frame`
    pub fn from_plan(id: VoiceId, plan: &VoicePlan, start_frame: u64) -> Self {
        let rate = plan.buffer.sample_rate as f64;
        let len = plan.buffer.len() as f64;
        let position = (plan.timing.read_offset * rate).clamp(0.0, len);
        let end = ((plan.timing.read_offset + plan.timing.duration) * rate).clamp(position, len);
        Self {
            id,
            track_id: plan.track_id.clone(),
            buffer: Arc::clone(&plan.buffer),
            start_frame,
            position,
            end,
            step: plan.playback_rate,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    /// True once the read window is exhausted
    pub fn is_finished(&self) -> bool {
        self.position >= self.end
    }

    /// Add this voice's output for the block beginning at bus frame
    /// `block_start` into `out`
    ///
    /// Returns `true` once the voice has played to the end of its window.
    pub fn render(&mut self, block_start: u64, frames: usize, out: &mut [Vec<f32>]) -> bool {
        let block_end = block_start + frames as u64;
        if self.start_frame >= block_end {
            return false;
        }
        let first = self.start_frame.saturating_sub(block_start) as usize;

        for i in first..frames {
            if self.position >= self.end {
                break;
            }
            let index = self.position.floor();
            let frac = (self.position - index) as f32;
            let index = index as usize;

            for (ch, channel) in out.iter_mut().enumerate() {
                let a = self.buffer.sample_for_output(ch, index);
                let sample = if frac == 0.0 {
                    a
                } else {
                    let b = if (index + 1) as f64 >= self.end {
                        0.0
                    } else {
                        self.buffer.sample_for_output(ch, index + 1)
                    };
                    a + (b - a) * frac
                };
                channel[i] += sample;
            }
            self.position += self.step;
        }

        self.is_finished()
    }
}
