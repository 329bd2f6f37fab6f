//! Mix bus
//!
//! `MixCore` owns the track chains and the sounding voices and renders
//! blocks into a master buffer; both the live bus and the offline renderer
//! drive one. `MixBus` is the live half: it lives on the audio callback
//! context, takes commands from the engine over a channel and reports voices
//! that finished on their own back over another.

use std::collections::BTreeMap;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, trace};

use super::scheduler::VoicePlan;
use super::voice::{Voice, VoiceId};
use crate::dsp::TrackChain;

/// Messages from the engine to the render context
#[derive(Debug)]
pub enum Command {
    /// Install a chain for a track (replaces any existing one)
    AttachChain { track_id: String, chain: Box<TrackChain> },
    /// Tear down a track's chain
    DetachChain { track_id: String },
    /// Start voices, each `timing.start_delay` seconds after the block in
    /// which the command is picked up
    StartVoices { voices: Vec<(VoiceId, VoicePlan)> },
    /// Silence every voice immediately; `reset_chains` also clears EQ and
    /// delay history so echo tails end with the voices
    StopAll { reset_chains: bool },
}

/// Messages from the render context back to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The voice reached the end of its window or its track was torn down
    Finished(VoiceId),
}

/// Track chains, voices and master buffer
#[derive(Debug)]
pub struct MixCore {
    sample_rate: u32,
    channels: usize,
    block_size: usize,
    /// Ordered map so chains always sum into the master in the same order
    chains: BTreeMap<String, TrackChain>,
    voices: Vec<Voice>,
    master: Vec<Vec<f32>>,
    /// Bus frame at the start of the next block
    frame: u64,
}

impl MixCore {
    pub fn new(sample_rate: u32, channels: usize, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
            chains: BTreeMap::new(),
            voices: Vec::new(),
            master: vec![vec![0.0; block_size]; channels],
            frame: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bus frame at the start of the next block
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn attach_chain(&mut self, track_id: String, chain: TrackChain) {
        self.chains.insert(track_id, chain);
    }

    /// Remove a track's chain, pushing the ids of its dropped voices onto
    /// `dropped`
    pub fn detach_chain(&mut self, track_id: &str, dropped: &mut Vec<VoiceId>) {
        self.chains.remove(track_id);
        self.voices.retain(|v| {
            let keep = v.track_id() != track_id;
            if !keep {
                dropped.push(v.id());
            }
            keep
        });
    }

    pub fn has_chain(&self, track_id: &str) -> bool {
        self.chains.contains_key(track_id)
    }

    /// Start a voice at `start_delay` seconds after `base_frame`
    ///
    /// Start frames saturate at `u64::MAX`; such a voice simply never sounds.
    pub fn start_voice(&mut self, id: VoiceId, plan: &VoicePlan, base_frame: u64) {
        if !self.chains.contains_key(&plan.track_id) {
            debug!("no chain for track '{}', dropping voice {}", plan.track_id, id);
            return;
        }
        let delay = plan.timing.start_delay;
        // Float to int casts saturate, so an infinite delay lands on u64::MAX
        let offset = if delay.is_nan() {
            0
        } else {
            (delay.max(0.0) * self.sample_rate as f64).round() as u64
        };
        self.voices
            .push(Voice::from_plan(id, plan, base_frame.saturating_add(offset)));
    }

    /// Drop every voice, optionally clearing chain history as well
    pub fn stop_all(&mut self, reset_chains: bool) -> usize {
        let stopped = self.voices.len();
        self.voices.clear();
        if reset_chains {
            for chain in self.chains.values_mut() {
                chain.reset();
            }
        }
        stopped
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Render the next block of up to `block_size` frames
    ///
    /// Voices that run out during the block are removed and their ids pushed
    /// onto `finished`. Returns the master buffer; only the first `frames`
    /// samples of each channel are valid.
    pub fn render_block(&mut self, frames: usize, finished: &mut Vec<VoiceId>) -> &[Vec<f32>] {
        let frames = frames.min(self.block_size);
        let block_start = self.frame;

        for chain in self.chains.values_mut() {
            chain.clear_input(frames);
        }

        let chains = &mut self.chains;
        self.voices.retain_mut(|voice| {
            let Some(chain) = chains.get_mut(voice.track_id()) else {
                return false;
            };
            let done = voice.render(block_start, frames, chain.input_mut());
            if done {
                finished.push(voice.id());
            }
            !done
        });

        for channel in self.master.iter_mut() {
            channel[..frames].fill(0.0);
        }

        let any_soloed = self.chains.values().any(|c| c.params().is_soloed());
        for chain in self.chains.values_mut() {
            chain.sync_params(any_soloed);
            chain.process_into(frames, &mut self.master);
        }

        self.frame += frames as u64;
        &self.master
    }
}

/// Live render half of an engine
///
/// Hand this to whatever drives the audio output; call [`MixBus::process`]
/// from the callback with the interleaved output slice.
#[derive(Debug)]
pub struct MixBus {
    core: MixCore,
    commands: Receiver<Command>,
    events: Sender<VoiceEvent>,
    finished: Vec<VoiceId>,
}

impl MixBus {
    pub(crate) fn new(core: MixCore, commands: Receiver<Command>, events: Sender<VoiceEvent>) -> Self {
        Self {
            core,
            commands,
            events,
            finished: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.core.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.core.channels()
    }

    /// Frames rendered since the bus was created
    pub fn frames_rendered(&self) -> u64 {
        self.core.frame()
    }

    /// Voices currently held by the bus
    pub fn voice_count(&self) -> usize {
        self.core.voice_count()
    }

    /// Apply every pending command
    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::AttachChain { track_id, chain } => {
                    trace!("attaching chain for track '{}'", track_id);
                    self.core.attach_chain(track_id, *chain);
                }
                Command::DetachChain { track_id } => {
                    self.finished.clear();
                    self.core.detach_chain(&track_id, &mut self.finished);
                    trace!("detached '{}', dropped {} voices", track_id, self.finished.len());
                    self.report_finished();
                }
                Command::StartVoices { voices } => {
                    let base = self.core.frame();
                    for (id, plan) in &voices {
                        self.core.start_voice(*id, plan, base);
                    }
                }
                Command::StopAll { reset_chains } => {
                    let stopped = self.core.stop_all(reset_chains);
                    trace!("stopped {} voices", stopped);
                }
            }
        }
    }

    /// Fill `out` (interleaved, `channels()` samples per frame) with the
    /// next stretch of the mix
    pub fn process(&mut self, out: &mut [f32]) {
        self.drain_commands();

        let channels = self.core.channels();
        let total_frames = out.len() / channels;
        let mut written = 0;

        while written < total_frames {
            let frames = (total_frames - written).min(self.core.block_size());
            self.finished.clear();
            let master = self.core.render_block(frames, &mut self.finished);

            let dest = &mut out[written * channels..(written + frames) * channels];
            for (i, frame) in dest.chunks_exact_mut(channels).enumerate() {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = master[ch][i];
                }
            }

            self.report_finished();
            written += frames;
        }
    }

    fn report_finished(&mut self) {
        for id in self.finished.drain(..) {
            // The engine may already be gone; nothing to report to then
            let _ = self.events.send(VoiceEvent::Finished(id));
        }
    }
}
