//! Parameter smoothing and lock-free parameter cells
//!
//! The producer thread writes parameters into `AtomicF32` cells; the render
//! thread reads each cell once per block and feeds it to a `SmoothedValue`,
//! which glides towards the new target instead of jumping.

use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` that can be shared between threads without locking
///
/// Stored as its bit pattern in an `AtomicU32`, so a read never observes a
/// half-written value.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// How a chain applies parameter changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// Exponential approach with the given time constant in seconds
    Ramp { time_constant: f32 },
    /// Values take effect immediately (offline rendering)
    Static,
}

/// Distance below which a ramp snaps onto its target
const SNAP_EPSILON: f32 = 1e-5;

/// A value that approaches its target exponentially, one sample at a time
///
/// Equivalent to a one-pole low-pass on the parameter: after one time
/// constant the remaining distance has shrunk to about 37%.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    /// Per-sample retention factor; 0 means jump immediately
    coeff: f32,
}

impl SmoothedValue {
    /// Create a value resting at `initial`
    pub fn new(initial: f32, smoothing: Smoothing, sample_rate: u32) -> Self {
        let coeff = match smoothing {
            Smoothing::Ramp { time_constant } if time_constant > 0.0 && sample_rate > 0 => {
                (-1.0 / (time_constant * sample_rate as f32)).exp()
            }
            _ => 0.0,
        };
        Self {
            current: initial,
            target: initial,
            coeff,
        }
    }

    /// Set a new target; the value glides towards it on subsequent samples
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        if self.coeff == 0.0 {
            self.current = target;
        }
    }

    /// True while the value is still moving towards its target
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.current != self.target
    }

    /// Current value without advancing
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advance one sample and return the new value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.current != self.target {
            self.current = self.target + (self.current - self.target) * self.coeff;
            if (self.current - self.target).abs() < SNAP_EPSILON {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Advance `samples` samples at once and return the value reached
    pub fn skip(&mut self, samples: usize) -> f32 {
        if self.current != self.target {
            self.current = self.target + (self.current - self.target) * self.coeff.powi(samples as i32);
            if (self.current - self.target).abs() < SNAP_EPSILON {
                self.current = self.target;
            }
        }
        self.current
    }
}
