//! Track DSP
//!
//! The fixed per-track processing graph: three-band EQ, feedback delay send
//! and a smoothed volume stage.

mod chain;
mod delay;
mod eq;
mod smoothing;

pub use chain::{TrackChain, TrackParams};
pub use delay::FeedbackDelay;
pub use eq::{BiquadCoeffs, FilterType, ThreeBandEq, HIGH_SHELF_HZ, LOW_SHELF_HZ, MID_PEAK_HZ};
pub use smoothing::{AtomicF32, Smoothing, SmoothedValue};
