//! Recording
//!
//! A `CaptureSource` is the seam to an input device: once started it pushes
//! interleaved chunks into a channel until stopped. `Recorder` owns one
//! source at a time and assembles what it captured into a buffer.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};
use uuid::Uuid;

use super::buffer::AudioBuffer;
use crate::error::{MixError, Result};

/// An input device
pub trait CaptureSource: Send {
    /// Channels per interleaved frame
    fn channels(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Begin capturing into `sink`
    ///
    /// Fails with `DeviceUnavailable` or `PermissionDenied` when the device
    /// cannot be opened; nothing is captured in that case.
    fn start(&mut self, sink: Sender<Vec<f32>>) -> Result<()>;

    /// Stop capturing and release the device
    fn stop(&mut self);
}

/// A finished take
#[derive(Debug, Clone)]
pub struct Recording {
    pub id: Uuid,
    pub buffer: AudioBuffer,
}

impl Recording {
    /// Store key used for the take's buffer
    pub fn buffer_id(&self) -> String {
        format!("recording-{}", self.id)
    }
}

struct ActiveCapture {
    source: Box<dyn CaptureSource>,
    chunks: Receiver<Vec<f32>>,
}

/// Drives a single capture source at a time
#[derive(Default)]
pub struct Recorder {
    active: Option<ActiveCapture>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("recording", &self.is_recording())
            .finish()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Open `source` and start capturing
    pub fn start(&mut self, mut source: Box<dyn CaptureSource>) -> Result<()> {
        if self.active.is_some() {
            return Err(MixError::AlreadyRecording);
        }
        if source.channels() == 0 || source.sample_rate() == 0 {
            return Err(MixError::DeviceUnavailable {
                reason: "device reports no channels or a zero sample rate".to_string(),
            });
        }

        let (tx, rx) = unbounded();
        source.start(tx)?;
        info!(
            "recording started ({} ch @ {} Hz)",
            source.channels(),
            source.sample_rate()
        );
        self.active = Some(ActiveCapture { source, chunks: rx });
        Ok(())
    }

    /// Stop the device and return everything it captured
    pub fn stop(&mut self) -> Result<Recording> {
        let mut active = self.active.take().ok_or(MixError::NotRecording)?;
        active.source.stop();

        let channels = active.source.channels();
        let mut interleaved = Vec::new();
        for chunk in active.chunks.try_iter() {
            interleaved.extend_from_slice(&chunk);
        }

        let remainder = interleaved.len() % channels;
        if remainder != 0 {
            warn!("dropping {} samples of a partial trailing frame", remainder);
            interleaved.truncate(interleaved.len() - remainder);
        }
        if interleaved.is_empty() {
            return Err(MixError::EmptyRecording);
        }

        let buffer =
            AudioBuffer::from_interleaved(&interleaved, channels, active.source.sample_rate())?;
        let recording = Recording {
            id: Uuid::new_v4(),
            buffer,
        };
        info!(
            "recording {} stopped: {:.3}s",
            recording.id,
            recording.buffer.duration_secs()
        );
        Ok(recording)
    }
}
