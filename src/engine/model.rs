//! Track and clip records
//!
//! These are read-only inputs to the engine: the project state owns them and
//! hands the engine fresh slices on every call.

use log::warn;
use serde::{Deserialize, Serialize};

/// EQ gain limit in dB (applies symmetrically)
pub const EQ_GAIN_LIMIT_DB: f32 = 20.0;

/// Longest supported delay time in seconds
pub const MAX_DELAY_TIME_SECS: f32 = 2.0;

/// Shortest supported delay time in seconds
pub const MIN_DELAY_TIME_SECS: f32 = 0.001;

/// Highest delay feedback; must stay below 1.0 for the echo to decay
pub const MAX_DELAY_FEEDBACK: f32 = 0.9;

/// Playback rate bounds
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 4.0;

/// Upper bound for track volume (allows a little boost above unity)
pub const MAX_VOLUME: f32 = 2.0;

/// A time-bounded reference into a decoded buffer, placed on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    pub buffer_id: String,
    pub track_id: String,
    /// Timeline position in seconds
    pub start_time: f64,
    /// Read position inside the buffer in seconds
    #[serde(default)]
    pub offset: f64,
    /// Play length in buffer-time seconds
    pub duration: f64,
    #[serde(default)]
    pub name: String,
}

impl Clip {
    pub fn new(
        id: impl Into<String>,
        buffer_id: impl Into<String>,
        track_id: impl Into<String>,
        start_time: f64,
        offset: f64,
        duration: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            buffer_id: buffer_id.into(),
            track_id: track_id.into(),
            start_time,
            offset,
            duration,
        }
    }

    /// Timeline length of the clip when played at `rate`
    pub fn timeline_duration(&self, rate: f64) -> f64 {
        self.duration / rate
    }
}

/// Per-track effect settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackEffects {
    /// Low shelf gain in dB
    pub eq_low: f32,
    /// Mid peak gain in dB
    pub eq_mid: f32,
    /// High shelf gain in dB
    pub eq_high: f32,
    /// Delay time in seconds
    pub delay_time: f32,
    /// Delay feedback amount
    pub delay_feedback: f32,
    /// Wet level of the delay send
    pub delay_mix: f32,
}

impl Default for TrackEffects {
    fn default() -> Self {
        Self {
            eq_low: 0.0,
            eq_mid: 0.0,
            eq_high: 0.0,
            delay_time: 0.3,
            delay_feedback: 0.3,
            delay_mix: 0.0,
        }
    }
}

impl TrackEffects {
    /// Clamp every field into its documented range
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            eq_low: clamp_or(self.eq_low, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, defaults.eq_low),
            eq_mid: clamp_or(self.eq_mid, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, defaults.eq_mid),
            eq_high: clamp_or(self.eq_high, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, defaults.eq_high),
            delay_time: clamp_or(
                self.delay_time,
                MIN_DELAY_TIME_SECS,
                MAX_DELAY_TIME_SECS,
                defaults.delay_time,
            ),
            delay_feedback: clamp_or(
                self.delay_feedback,
                0.0,
                MAX_DELAY_FEEDBACK,
                defaults.delay_feedback,
            ),
            delay_mix: clamp_or(self.delay_mix, 0.0, 1.0, defaults.delay_mix),
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// A mixer track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub soloed: bool,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub effects: TrackEffects,
}

fn default_volume() -> f32 {
    1.0
}

fn default_playback_rate() -> f64 {
    1.0
}

impl Track {
    /// Create a track with unity volume and neutral effects
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            volume: 1.0,
            muted: false,
            soloed: false,
            playback_rate: 1.0,
            color: String::new(),
            effects: TrackEffects::default(),
        }
    }

    /// Copy of this track with every parameter clamped into range
    pub fn sanitized(&self) -> Self {
        let volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, MAX_VOLUME)
        } else {
            1.0
        };
        let playback_rate = if self.playback_rate.is_finite() && self.playback_rate > 0.0 {
            self.playback_rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
        } else {
            1.0
        };
        let effects = self.effects.sanitized();

        if volume != self.volume
            || playback_rate != self.playback_rate
            || effects != self.effects
        {
            warn!("track '{}' had out-of-range parameters, clamped", self.id);
        }

        Self {
            volume,
            playback_rate,
            effects,
            ..self.clone()
        }
    }

    /// Whether this track is heard given the solo state of the whole mix
    pub fn is_audible(&self, any_soloed: bool) -> bool {
        !self.muted && (!any_soloed || self.soloed)
    }
}

/// True if at least one track in the set is soloed
pub fn any_soloed(tracks: &[Track]) -> bool {
    tracks.iter().any(|t| t.soloed)
}
