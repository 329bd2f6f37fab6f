//! Integration Tests
//!
//! End-to-end tests driving an engine and its mix bus together.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use mixlane::engine::{
    decode_wav, encode_wav16, inspect_wav, AudioBuffer, ManualClock, TransportState,
    DEFAULT_SAMPLE_RATE,
};
use mixlane::{Clip, Codec, Engine, EngineConfig, MixBus, MixError, Track};

const RATE: u32 = 8000;

fn config(smoothing_ms: f32) -> EngineConfig {
    EngineConfig {
        sample_rate: RATE,
        channels: 2,
        block_size: 128,
        smoothing_ms,
    }
}

fn engine(smoothing_ms: f32) -> (Engine, MixBus, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let (engine, bus) = Engine::with_clock(config(smoothing_ms), clock.clone()).unwrap();
    (engine, bus, clock)
}

/// Run the bus for `seconds` of audio, advancing the clock alongside
fn run(bus: &mut MixBus, clock: &ManualClock, seconds: f64) -> Vec<f32> {
    let frames = (seconds * RATE as f64).round() as usize;
    let mut out = vec![0.0; frames * bus.channels()];
    bus.process(&mut out);
    clock.advance(seconds);
    out
}

/// A buffer of constant value
fn dc(value: f32, seconds: f64) -> AudioBuffer {
    let frames = (seconds * RATE as f64).round() as usize;
    AudioBuffer::from_channels(vec![vec![value; frames]], RATE).unwrap()
}

fn impulse(seconds: f64) -> AudioBuffer {
    let frames = (seconds * RATE as f64).round() as usize;
    let mut samples = vec![0.0; frames];
    samples[0] = 1.0;
    AudioBuffer::from_channels(vec![samples], RATE).unwrap()
}

// === Transport / live bus ===

#[test]
fn test_two_overlapping_clips_then_stop() {
    let (mut engine, mut bus, clock) = engine(15.0);
    engine.add_buffer("b", dc(0.25, 2.0));
    let tracks = vec![Track::new("a"), Track::new("b")];
    let clips = vec![
        Clip::new("c1", "b", "a", 0.0, 0.0, 2.0),
        Clip::new("c2", "b", "b", 1.0, 0.0, 2.0),
    ];

    assert_eq!(engine.play(&clips, &tracks, 0.0), 2);
    let out = run(&mut bus, &clock, 1.5);

    assert_abs_diff_eq!(engine.position(), 1.5, epsilon = 1e-6);
    assert_eq!(engine.active_voice_count(), 2);
    // Both tracks sum into the master while they overlap
    assert_abs_diff_eq!(out[out.len() - 1], 0.5, epsilon = 1e-4);
    assert!(engine.has_track("a") && engine.has_track("b"));

    engine.stop();
    assert_eq!(engine.active_voice_count(), 0);
    assert_eq!(engine.state(), TransportState::Stopped);

    let after = run(&mut bus, &clock, 0.1);
    assert_eq!(bus.voice_count(), 0);
    assert!(after.iter().all(|&s| s == 0.0));
}

#[test]
fn test_voices_finish_on_their_own() {
    let (mut engine, mut bus, clock) = engine(15.0);
    engine.add_buffer("b", dc(0.25, 0.5));
    let tracks = vec![Track::new("t")];
    let clips = vec![Clip::new("c", "b", "t", 0.0, 0.0, 0.5)];

    engine.play(&clips, &tracks, 0.0);
    run(&mut bus, &clock, 0.25);
    assert_eq!(engine.active_voice_count(), 1);
    run(&mut bus, &clock, 0.5);
    assert_eq!(engine.active_voice_count(), 0);

    // Stopping after natural completion is harmless
    engine.stop();
    assert_eq!(engine.active_voice_count(), 0);
}

#[test]
fn test_seek_past_end_keeps_playing_silently() {
    let (mut engine, mut bus, clock) = engine(15.0);
    engine.add_buffer("b", dc(0.25, 1.0));
    let tracks = vec![Track::new("t")];
    let clips = vec![Clip::new("c", "b", "t", 0.0, 0.0, 1.0)];

    assert_eq!(engine.play(&clips, &tracks, 50.0), 0);
    assert_eq!(engine.state(), TransportState::Playing);
    assert_eq!(engine.active_voice_count(), 0);
    let out = run(&mut bus, &clock, 0.1);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn test_pause_and_resume_mid_clip() {
    let (mut engine, mut bus, clock) = engine(0.0);
    let samples: Vec<f32> = (0..RATE as usize * 2).map(|i| i as f32 / 16000.0).collect();
    engine.add_buffer("ramp", AudioBuffer::from_channels(vec![samples], RATE).unwrap());
    let tracks = vec![Track::new("t")];
    let clips = vec![Clip::new("c", "ramp", "t", 0.0, 0.0, 2.0)];

    engine.play(&clips, &tracks, 0.0);
    run(&mut bus, &clock, 0.5);
    engine.pause();
    assert_eq!(engine.state(), TransportState::Paused);
    assert_eq!(engine.active_voice_count(), 0);
    run(&mut bus, &clock, 0.25);

    let resume_at = engine.position();
    assert_abs_diff_eq!(resume_at, 0.5, epsilon = 1e-6);
    engine.play(&clips, &tracks, resume_at);
    let out = run(&mut bus, &clock, 0.01);

    // Resumes reading half a second into the buffer
    assert_abs_diff_eq!(out[0], 4000.0 / 16000.0, epsilon = 1e-4);
}

#[test]
fn test_muted_track_is_silent_and_unmute_restores() {
    let (mut engine, mut bus, clock) = engine(15.0);
    engine.add_buffer("b", dc(0.5, 1.0));
    let mut track = Track::new("t");
    track.muted = true;
    let clips = vec![Clip::new("c", "b", "t", 0.0, 0.0, 1.0)];

    assert_eq!(engine.play(&clips, &[track.clone()], 0.0), 0);
    let out = run(&mut bus, &clock, 0.2);
    assert!(out.iter().all(|&s| s == 0.0));

    track.muted = false;
    engine.update_track_params(&track);
    assert_eq!(engine.play(&clips, &[track], 0.0), 1);
    let out = run(&mut bus, &clock, 0.2);
    let tail = &out[out.len() - 2..];
    assert_abs_diff_eq!(tail[0], 0.5, epsilon = 1e-3);
}

#[test]
fn test_live_matches_offline_without_ramps() {
    let (mut engine, mut bus, clock) = engine(0.0);
    engine.add_buffer("imp", impulse(1.0));
    engine.add_buffer("dc", dc(0.1, 0.5));

    let mut echo = Track::new("echo");
    echo.effects.delay_time = 0.125;
    echo.effects.delay_feedback = 0.4;
    echo.effects.delay_mix = 0.6;
    echo.effects.eq_mid = 4.0;
    let mut quiet = Track::new("quiet");
    quiet.volume = 0.5;
    quiet.effects.eq_low = -6.0;
    let tracks = vec![echo, quiet];
    let clips = vec![
        Clip::new("a", "imp", "echo", 0.05, 0.0, 1.0),
        Clip::new("b", "dc", "quiet", 0.2, 0.1, 0.3),
    ];

    engine.play(&clips, &tracks, 0.0);
    let live = run(&mut bus, &clock, 1.0);
    let offline = engine.render_mix(&clips, &tracks, 1.0).unwrap();

    assert_eq!(live, offline.to_interleaved());
}

// === Offline render / export ===

#[test]
fn test_echo_train() {
    let (engine, _bus, _) = engine(15.0);
    engine.add_buffer("imp", impulse(1.0));
    let mut track = Track::new("t");
    track.effects.delay_time = 0.3;
    track.effects.delay_feedback = 0.5;
    track.effects.delay_mix = 0.5;
    let clips = vec![Clip::new("c", "imp", "t", 0.0, 0.0, 1.0)];

    let mix = engine.render_mix(&clips, &[track], 1.0).unwrap();
    let left = mix.channel(0);
    assert_eq!(left[0], 1.0);
    assert_abs_diff_eq!(left[2400], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(left[4800], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(left[7200], 0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(left[1200], 0.0, epsilon = 1e-9);
}

#[test]
fn test_excessive_feedback_is_clamped() {
    let (engine, _bus, _) = engine(15.0);
    engine.add_buffer("imp", impulse(2.0));
    let mut track = Track::new("t");
    track.effects.delay_time = 0.1;
    track.effects.delay_feedback = 5.0;
    track.effects.delay_mix = 1.0;
    let clips = vec![Clip::new("c", "imp", "t", 0.0, 0.0, 2.0)];

    let mix = engine.render_mix(&clips, &[track], 2.0).unwrap();
    let left = mix.channel(0);
    assert_abs_diff_eq!(left[800], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(left[1600], 0.9, epsilon = 1e-6);
    assert!(left.iter().all(|s| s.abs() <= 1.0 + 1e-6));
}

#[test]
fn test_export_is_deterministic() {
    let (engine, _bus, _) = engine(15.0);
    let noise: Vec<f32> = (0..RATE as usize)
        .map(|i| (((i * 2_654_435_761) % 1000) as f32 / 500.0) - 1.0)
        .collect();
    engine.add_buffer("n", AudioBuffer::from_channels(vec![noise], RATE).unwrap());

    let mut a = Track::new("a");
    a.effects.eq_high = 8.0;
    a.effects.delay_mix = 0.3;
    let mut b = Track::new("b");
    b.playback_rate = 1.5;
    b.volume = 0.6;
    let tracks = vec![a, b];
    let clips = vec![
        Clip::new("c1", "n", "a", 0.0, 0.0, 1.0),
        Clip::new("c2", "n", "b", 0.3, 0.2, 0.7),
    ];

    let first = engine.export_mix(&clips, &tracks, 2.0, Codec::Wav).unwrap();
    let second = engine.export_mix(&clips, &tracks, 2.0, Codec::Wav).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_export_is_silent() {
    let (engine, _bus) = Engine::new(EngineConfig::default()).unwrap();
    let bytes = engine.export_mix(&[], &[], 5.0, Codec::Wav).unwrap();

    let info = inspect_wav(&bytes).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, DEFAULT_SAMPLE_RATE);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.frames, 5 * DEFAULT_SAMPLE_RATE);

    let mix = decode_wav(&bytes).unwrap();
    assert!(mix.is_silent());
}

#[test]
fn test_mp3_export_fails_loudly() {
    let (engine, _bus, _) = engine(15.0);
    let err = engine.export_mix(&[], &[], 1.0, Codec::Mp3).unwrap_err();
    assert!(matches!(err, MixError::UnsupportedCodec { .. }));
}

#[test]
fn test_muted_and_late_clips_render_silence() {
    let (engine, _bus, _) = engine(15.0);
    engine.add_buffer("b", dc(0.5, 1.0));
    let mut muted = Track::new("m");
    muted.muted = true;
    let tracks = vec![muted, Track::new("t")];
    let clips = vec![
        Clip::new("c1", "b", "m", 0.0, 0.0, 1.0),
        Clip::new("c2", "b", "t", 4.0, 0.0, 1.0),
    ];
    assert!(engine.render_mix(&clips, &tracks, 3.0).unwrap().is_silent());
}

#[test]
fn test_solo_isolates_track() {
    let (engine, _bus, _) = engine(15.0);
    engine.add_buffer("b", dc(0.25, 1.0));
    let mut lead = Track::new("lead");
    lead.soloed = true;
    let tracks = vec![lead, Track::new("pad")];
    let clips = vec![
        Clip::new("c1", "b", "lead", 0.0, 0.0, 1.0),
        Clip::new("c2", "b", "pad", 0.0, 0.0, 1.0),
    ];
    let mix = engine.render_mix(&clips, &tracks, 1.0).unwrap();
    assert_eq!(mix.channel(0)[100], 0.25);
}

#[test]
fn test_playback_rate_shortens_clip() {
    let (engine, _bus, _) = engine(15.0);
    engine.add_buffer("b", dc(0.25, 1.0));
    let mut fast = Track::new("fast");
    fast.playback_rate = 2.0;
    let clips = vec![Clip::new("c", "b", "fast", 0.0, 0.0, 1.0)];

    let mix = engine.render_mix(&clips, &[fast], 1.0).unwrap();
    let left = mix.channel(0);
    assert_eq!(left[3990], 0.25);
    assert_eq!(left[4010], 0.0);
}

// === Buffers ===

#[test]
fn test_decode_then_mix() {
    let (engine, _bus, _) = engine(15.0);
    let wav = encode_wav16(&dc(0.5, 0.5)).unwrap();
    engine.decode_buffer("voice", &wav).unwrap();

    let tracks = vec![Track::new("t")];
    let clips = vec![Clip::new("c", "voice", "t", 0.25, 0.0, 0.5)];
    let mix = engine.render_mix(&clips, &tracks, 1.0).unwrap();
    assert_eq!(mix.channel(1)[1000], 0.0);
    assert_abs_diff_eq!(mix.channel(1)[3000], 0.5, epsilon = 1e-4);
}

#[test]
fn test_failed_decode_skips_clip() {
    let (engine, _bus, _) = engine(15.0);
    assert!(engine.decode_buffer("broken", b"RIFF....garbage").is_err());
    assert!(!engine.store().contains("broken"));

    let tracks = vec![Track::new("t")];
    let clips = vec![Clip::new("c", "broken", "t", 0.0, 0.0, 1.0)];
    assert!(engine.render_mix(&clips, &tracks, 0.5).unwrap().is_silent());
}

#[test]
fn test_invalid_render_length() {
    let (engine, _bus, _) = engine(15.0);
    let err = engine.render_mix(&[], &[], -2.0).unwrap_err();
    assert!(matches!(err, MixError::InvalidDuration { .. }));
}
