//! Transport State Machine
//!
//! Tracks whether the timeline is rolling and derives the current timeline
//! position from a clock:
//!
//! ```text
//! position = playing ? now - start_wall_time + offset_at_start : paused_position
//! ```
//!
//! This is the single source of truth for "now"; anything drawing a playhead
//! reads it from here.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::debug;

/// Source of monotonic wall-clock time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock advanced by hand, for driving the engine deterministically
///
/// Time is kept in whole microseconds so repeated advances do not accumulate
/// floating point error.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `seconds` (negative values are ignored)
    pub fn advance(&self, seconds: f64) {
        let micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.fetch_add(micros, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

/// Transport states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}

/// Transport position bookkeeping
pub struct Transport {
    state: TransportState,
    clock: Arc<dyn Clock>,
    /// Wall-clock time when playback last started
    start_wall_time: f64,
    /// Timeline position playback last started from
    timeline_offset_at_start: f64,
    /// Position reported while not playing
    paused_position: f64,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state)
            .field("start_wall_time", &self.start_wall_time)
            .field("timeline_offset_at_start", &self.timeline_offset_at_start)
            .field("paused_position", &self.paused_position)
            .finish()
    }
}

impl Transport {
    /// Create a stopped transport at position zero
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: TransportState::Stopped,
            clock,
            start_wall_time: 0.0,
            timeline_offset_at_start: 0.0,
            paused_position: 0.0,
        }
    }

    /// Start rolling from timeline position `at` (clamped to >= 0)
    ///
    /// Calling this while already playing simply re-anchors the position.
    pub fn start(&mut self, at: f64) {
        let at = if at.is_finite() { at.max(0.0) } else { 0.0 };
        self.start_wall_time = self.clock.now();
        self.timeline_offset_at_start = at;
        self.paused_position = at;
        self.state = TransportState::Playing;
        debug!("[TRANSPORT] Play from {:.3}s", at);
    }

    /// Freeze the position where it is
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.paused_position = self.position();
            self.state = TransportState::Paused;
            debug!("[TRANSPORT] Paused at {:.3}s", self.paused_position);
        }
    }

    /// Stop and rewind to the start of the timeline
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.paused_position = 0.0;
        debug!("[TRANSPORT] Stopped, playhead reset to 0");
    }

    /// Move the playhead without starting playback
    pub fn seek(&mut self, position: f64) {
        if self.state == TransportState::Playing {
            self.start(position);
        } else {
            self.paused_position = position.max(0.0);
        }
    }

    /// Current timeline position in seconds
    pub fn position(&self) -> f64 {
        match self.state {
            TransportState::Playing => {
                self.clock.now() - self.start_wall_time + self.timeline_offset_at_start
            }
            _ => self.paused_position,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == TransportState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TransportState::Stopped
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn manual() -> (Arc<ManualClock>, Transport) {
        let clock = Arc::new(ManualClock::new());
        let transport = Transport::new(clock.clone());
        (clock, transport)
    }

    #[test]
    fn test_default_state_is_stopped() {
        let (_, transport) = manual();
        assert!(transport.is_stopped());
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_position_advances_while_playing() {
        let (clock, mut transport) = manual();
        transport.start(2.0);
        clock.advance(1.5);
        assert_abs_diff_eq!(transport.position(), 3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_position_stable_while_paused() {
        let (clock, mut transport) = manual();
        transport.start(0.0);
        clock.advance(1.0);
        transport.pause();
        assert!(transport.is_paused());
        let paused = transport.position();
        clock.advance(5.0);
        assert_eq!(transport.position(), paused);
        assert_abs_diff_eq!(paused, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_position_monotonic_while_playing() {
        let (clock, mut transport) = manual();
        transport.start(0.0);
        let mut last = transport.position();
        for _ in 0..100 {
            clock.advance(0.013);
            let now = transport.position();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_stop_resets_playhead() {
        let (clock, mut transport) = manual();
        transport.start(4.0);
        clock.advance(1.0);
        transport.stop();
        assert!(transport.is_stopped());
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_restart_reanchors() {
        let (clock, mut transport) = manual();
        transport.start(0.0);
        clock.advance(3.0);
        transport.start(1.0);
        clock.advance(0.5);
        assert_abs_diff_eq!(transport.position(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_seek_while_paused() {
        let (_, mut transport) = manual();
        transport.seek(7.0);
        assert_eq!(transport.position(), 7.0);
        transport.seek(-1.0);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_negative_start_clamped() {
        let (_, mut transport) = manual();
        transport.start(-3.0);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_pause_when_stopped_is_noop() {
        let (_, mut transport) = manual();
        transport.pause();
        assert!(transport.is_stopped());
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(format!("{}", TransportState::Stopped), "Stopped");
        assert_eq!(format!("{}", TransportState::Playing), "Playing");
        assert_eq!(format!("{}", TransportState::Paused), "Paused");
    }
}
