//! Mixing Engine Module
//!
//! Everything between decoded samples and the master output:
//! - Sample store and timeline model
//! - Transport and clip scheduling
//! - Live mix bus and offline renderer
//! - WAV encode/decode and recording

pub mod buffer;
pub mod codec;
pub mod handle;
pub mod mixer;
pub mod model;
pub mod offline;
pub mod recorder;
pub mod scheduler;
pub mod store;
pub mod transport;
pub mod voice;

pub use buffer::{linear_to_db, peak, AudioBuffer, DEFAULT_SAMPLE_RATE};
pub use codec::{checksum, decode_wav, encode, encode_wav16, inspect_wav, Codec, WavInfo};
pub use handle::Engine;
pub use mixer::{Command, MixBus, MixCore, VoiceEvent};
pub use model::{any_soloed, Clip, Track, TrackEffects};
pub use offline::OfflineRenderer;
pub use recorder::{CaptureSource, Recorder, Recording};
pub use scheduler::{clip_timing, plan_voices, ClipTiming, VoicePlan};
pub use store::SampleStore;
pub use transport::{Clock, ManualClock, SystemClock, Transport, TransportState};
pub use voice::{Voice, VoiceId};
