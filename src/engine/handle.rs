//! Engine handle
//!
//! The producer-side API. An `Engine` owns the sample store, the transport
//! and the per-track parameter cells; its paired [`MixBus`] does the actual
//! rendering wherever the audio callback runs. The two halves talk only
//! through channels and atomics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info};

use super::buffer::{linear_to_db, peak, AudioBuffer};
use super::codec::{decode_wav, encode, Codec};
use super::mixer::{Command, MixBus, MixCore, VoiceEvent};
use super::model::{Clip, Track};
use super::offline::OfflineRenderer;
use super::recorder::{CaptureSource, Recorder, Recording};
use super::scheduler::plan_voices;
use super::store::SampleStore;
use super::transport::{Clock, SystemClock, Transport, TransportState};
use super::voice::VoiceId;
use crate::config::EngineConfig;
use crate::dsp::{Smoothing, TrackChain, TrackParams};
use crate::error::Result;

/// Producer half of a mixing engine
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: SampleStore,
    transport: Transport,
    /// Parameter cells of every track that has a chain on the bus
    params: HashMap<String, Arc<TrackParams>>,
    commands: Sender<Command>,
    events: Receiver<VoiceEvent>,
    /// Voices started and not yet reported finished or stopped
    active: HashSet<VoiceId>,
    next_voice_id: VoiceId,
    recorder: Recorder,
}

impl Engine {
    /// Create an engine driven by the system clock
    pub fn new(config: EngineConfig) -> Result<(Self, MixBus)> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create an engine whose transport reads time from `clock`
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<(Self, MixBus)> {
        config.validate()?;

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let core = MixCore::new(config.sample_rate, config.channels, config.block_size);
        let bus = MixBus::new(core, command_rx, event_tx);

        info!(
            "engine created: {} Hz, {} ch, {}-frame blocks",
            config.sample_rate, config.channels, config.block_size
        );

        let engine = Self {
            config,
            store: SampleStore::new(),
            transport: Transport::new(clock),
            params: HashMap::new(),
            commands: command_tx,
            events: event_rx,
            active: HashSet::new(),
            next_voice_id: 0,
            recorder: Recorder::new(),
        };
        Ok((engine, bus))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle to the sample store (shares the underlying map)
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    /// Store or replace a decoded buffer
    pub fn add_buffer(&self, id: impl Into<String>, buffer: AudioBuffer) -> Arc<AudioBuffer> {
        self.store.put(id, buffer)
    }

    /// Decode WAV bytes and store the result
    ///
    /// On failure the store is left untouched.
    pub fn decode_buffer(&self, id: impl Into<String>, bytes: &[u8]) -> Result<Arc<AudioBuffer>> {
        let buffer = decode_wav(bytes)?;
        Ok(self.store.put(id, buffer))
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Start playback of `clips` from timeline position `at`
    ///
    /// Anything already sounding is stopped first, but delay tails keep
    /// ringing across the re-anchor. Returns the number of voices scheduled.
    pub fn play(&mut self, clips: &[Clip], tracks: &[Track], at: f64) -> usize {
        if self.transport.is_playing() {
            self.stop_voices(false);
        }

        for track in tracks {
            self.ensure_chain(track);
        }

        let at = if at.is_finite() { at.max(0.0) } else { 0.0 };
        let plans = plan_voices(clips, tracks, &self.store, at);
        let mut voices = Vec::with_capacity(plans.len());
        for plan in plans {
            let id = self.next_voice_id;
            self.next_voice_id += 1;
            self.active.insert(id);
            voices.push((id, plan));
        }

        let scheduled = voices.len();
        if scheduled > 0 {
            self.send(Command::StartVoices { voices });
        }
        self.transport.start(at);
        info!("playing from {:.3}s with {} voices", at, scheduled);
        scheduled
    }

    /// Stop every voice and rewind the playhead
    pub fn stop(&mut self) {
        self.stop_voices(true);
        self.transport.stop();
        info!("stopped");
    }

    /// Stop every voice and hold the playhead where it is
    ///
    /// Resume with `play(clips, tracks, engine.position())`.
    pub fn pause(&mut self) {
        if !self.transport.is_playing() {
            return;
        }
        self.stop_voices(true);
        self.transport.pause();
        info!("paused at {:.3}s", self.transport.position());
    }

    /// Move the playhead
    ///
    /// While playing this reschedules from the new position; otherwise it
    /// only moves the playhead.
    pub fn seek(&mut self, clips: &[Clip], tracks: &[Track], at: f64) {
        if self.transport.is_playing() {
            self.play(clips, tracks, at);
        } else {
            self.transport.seek(at);
        }
    }

    /// Current timeline position in seconds
    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Voices still sounding (or waiting to start)
    pub fn active_voice_count(&mut self) -> usize {
        self.drain_events();
        self.active.len()
    }

    fn stop_voices(&mut self, reset_chains: bool) {
        self.drain_events();
        if !self.active.is_empty() {
            debug!("stopping {} active voices", self.active.len());
        }
        self.active.clear();
        self.send(Command::StopAll { reset_chains });
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            match event {
                // Ids already cleared by a stop are simply absent
                VoiceEvent::Finished(id) => {
                    self.active.remove(&id);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------------

    /// Apply new parameters to a track's chain, creating the chain if needed
    pub fn update_track_params(&mut self, track: &Track) {
        self.ensure_chain(track);
    }

    /// Tear down a track's chain and any voices on it
    ///
    /// The bus reports the dropped voices as finished, so they leave the
    /// active count once it has picked up the command.
    pub fn remove_track(&mut self, track_id: &str) -> bool {
        if self.params.remove(track_id).is_none() {
            return false;
        }
        self.send(Command::DetachChain {
            track_id: track_id.to_string(),
        });
        debug!("removed chain for track '{}'", track_id);
        true
    }

    /// True if a chain exists for `track_id`
    pub fn has_track(&self, track_id: &str) -> bool {
        self.params.contains_key(track_id)
    }

    fn ensure_chain(&mut self, track: &Track) {
        if let Some(params) = self.params.get(&track.id) {
            params.apply(track);
            return;
        }

        let params = Arc::new(TrackParams::from_track(track));
        let smoothing = if self.config.smoothing_ms > 0.0 {
            Smoothing::Ramp {
                time_constant: self.config.smoothing_secs(),
            }
        } else {
            Smoothing::Static
        };
        let chain = TrackChain::new(
            Arc::clone(&params),
            self.config.sample_rate,
            self.config.channels,
            self.config.block_size,
            smoothing,
        );
        self.params.insert(track.id.clone(), params);
        self.send(Command::AttachChain {
            track_id: track.id.clone(),
            chain: Box::new(chain),
        });
        debug!("created chain for track '{}'", track.id);
    }

    fn send(&self, command: Command) {
        // The bus has been dropped; there is nothing left to control
        if self.commands.send(command).is_err() {
            debug!("mix bus is gone, command dropped");
        }
    }

    // ------------------------------------------------------------------------
    // Offline
    // ------------------------------------------------------------------------

    /// Render `[0, total_duration]` of the timeline to a buffer
    pub fn render_mix(
        &self,
        clips: &[Clip],
        tracks: &[Track],
        total_duration: f64,
    ) -> Result<AudioBuffer> {
        OfflineRenderer::new(
            self.config.sample_rate,
            self.config.channels,
            self.config.block_size,
        )
        .render(clips, tracks, &self.store, total_duration)
    }

    /// Render and encode the timeline
    pub fn export_mix(
        &self,
        clips: &[Clip],
        tracks: &[Track],
        total_duration: f64,
        codec: Codec,
    ) -> Result<Vec<u8>> {
        let buffer = self.render_mix(clips, tracks, total_duration)?;
        let bytes = encode(&buffer, codec)?;
        info!(
            "exported {:.3}s as {} ({} bytes, peak {:.1} dBFS)",
            total_duration,
            codec,
            bytes.len(),
            linear_to_db(peak(&buffer))
        );
        Ok(bytes)
    }

    // ------------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------------

    /// Open a capture source and start recording
    pub fn start_recording(&mut self, source: Box<dyn CaptureSource>) -> Result<()> {
        self.recorder.start(source)
    }

    /// Stop recording and store the take under [`Recording::buffer_id`]
    pub fn stop_recording(&mut self) -> Result<Recording> {
        let recording = self.recorder.stop()?;
        self.store.put(recording.buffer_id(), recording.buffer.clone());
        Ok(recording)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }
}
