//! Clip scheduling
//!
//! Turns a timeline position and a set of clips into voice start commands:
//! when each voice starts relative to "now", where it reads from in its
//! buffer and for how long.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use super::buffer::AudioBuffer;
use super::model::{any_soloed, Clip, Track};
use super::store::SampleStore;

/// Timing of one clip relative to a seek position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipTiming {
    /// Seconds from "now" until the voice starts
    pub start_delay: f64,
    /// Read position inside the buffer in seconds
    pub read_offset: f64,
    /// Remaining play length in buffer-time seconds
    pub duration: f64,
}

/// Compute when and where a clip starts playing if the transport starts at
/// `at_time`
///
/// Returns `None` for clips that lie entirely before `at_time` or whose
/// remaining duration is not strictly positive.
pub fn clip_timing(clip: &Clip, playback_rate: f64, at_time: f64) -> Option<ClipTiming> {
    let rate = if playback_rate > 0.0 { playback_rate } else { 1.0 };

    let mut timing = if clip.start_time >= at_time {
        ClipTiming {
            start_delay: clip.start_time - at_time,
            read_offset: clip.offset,
            duration: clip.duration,
        }
    } else if clip.start_time + clip.timeline_duration(rate) > at_time {
        let elapsed_buffer = (at_time - clip.start_time) * rate;
        ClipTiming {
            start_delay: 0.0,
            read_offset: clip.offset + elapsed_buffer,
            duration: clip.duration - elapsed_buffer,
        }
    } else {
        return None;
    };

    if timing.duration <= 0.0 {
        return None;
    }
    // A negative offset from a hand-edited project reads from the start
    timing.read_offset = timing.read_offset.max(0.0);
    Some(timing)
}

/// A voice ready to be started on a mix bus
#[derive(Debug, Clone)]
pub struct VoicePlan {
    pub clip_id: String,
    pub track_id: String,
    pub buffer: Arc<AudioBuffer>,
    pub timing: ClipTiming,
    pub playback_rate: f64,
}

/// Plan voices for every clip that is audible from `at_time` onwards
///
/// Clips on muted tracks (or tracks silenced by another track's solo), clips
/// whose track or buffer is unknown, and clips whose read window falls
/// outside their buffer are skipped. Nothing here fails.
pub fn plan_voices(
    clips: &[Clip],
    tracks: &[Track],
    store: &SampleStore,
    at_time: f64,
) -> Vec<VoicePlan> {
    let by_id: HashMap<&str, &Track> = tracks.iter().map(|t| (t.id.as_str(), t)).collect();
    let solo = any_soloed(tracks);
    let mut plans = Vec::with_capacity(clips.len());

    for clip in clips {
        let Some(track) = by_id.get(clip.track_id.as_str()) else {
            warn!("clip '{}' references unknown track '{}', skipping", clip.id, clip.track_id);
            continue;
        };
        if !track.is_audible(solo) {
            debug!("clip '{}' is on silent track '{}', skipping", clip.id, track.id);
            continue;
        }
        let Some(buffer) = store.get(&clip.buffer_id) else {
            warn!("clip '{}' references missing buffer '{}', skipping", clip.id, clip.buffer_id);
            continue;
        };

        let rate = track.sanitized().playback_rate;
        let Some(mut timing) = clip_timing(clip, rate, at_time) else {
            continue;
        };

        let buffer_duration = buffer.duration_secs();
        if timing.read_offset >= buffer_duration {
            debug!(
                "clip '{}' reads past the end of buffer '{}', skipping",
                clip.id, clip.buffer_id
            );
            continue;
        }
        timing.duration = timing.duration.min(buffer_duration - timing.read_offset);

        plans.push(VoicePlan {
            clip_id: clip.id.clone(),
            track_id: track.id.clone(),
            buffer,
            timing,
            playback_rate: rate,
        });
    }

    debug!("planned {} of {} clips at {:.3}s", plans.len(), clips.len(), at_time);
    plans
}
