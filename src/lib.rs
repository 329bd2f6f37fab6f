//! mixlane - timeline multi-track audio mixing engine
//!
//! Clips placed on tracks are scheduled against a transport, routed through
//! a fixed per-track chain and summed into a master output. The same graph
//! can be rendered offline, deterministically, and encoded to WAV.
//!
//! # Architecture
//!
//! An application constructs an [`Engine`] and receives its paired
//! [`MixBus`]:
//! - `Engine`: producer side (play, stop, parameter updates, export)
//! - `MixBus`: render side, driven from the audio callback
//!
//! ```
//! use mixlane::{Clip, Engine, EngineConfig, Track};
//! use mixlane::engine::AudioBuffer;
//!
//! let (engine, _bus) = Engine::new(EngineConfig::default()).unwrap();
//! engine.add_buffer("kick", AudioBuffer::silence(1, 4800, 48000));
//! let tracks = vec![Track::new("drums")];
//! let clips = vec![Clip::new("c1", "kick", "drums", 0.0, 0.0, 0.1)];
//! let mix = engine.render_mix(&clips, &tracks, 1.0).unwrap();
//! assert_eq!(mix.len(), 48000);
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod state;

pub use config::EngineConfig;
pub use engine::{Clip, Codec, Engine, MixBus, Track, TrackEffects};
pub use error::{MixError, Result};
