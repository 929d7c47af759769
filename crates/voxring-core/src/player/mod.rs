//! Control plane for streaming playback
//!
//! [`AudioPlayer`] is what the voice engine talks to. It owns one playback
//! session at a time:
//!
//! ```text
//!  play_audio / barge_in / set_playback_rate
//!          │
//!          ▼
//!  CommandSender ──► crossbeam ──► RenderWorker (inside the output stream)
//!                                  │
//!  volume() / samples() ◄── AnalysisTap ◄──┘
//!  stats()              ◄── PlaybackAtomics
//! ```
//!
//! Commands are fire-and-forget. Before `start()` (or after `stop()`) they
//! are logged and ignored rather than failing, since they typically come
//! from UI event handlers.

mod error;

pub use error::{PlayerError, PlayerResult};

use std::sync::Arc;

use crate::analysis::{analysis_tap, AnalysisTap};
use crate::audio::{CpalBackend, OutputBackend, OutputInfo};
use crate::buffer::RingBuffer;
use crate::config::PlayerConfig;
use crate::engine::{
    command_channel, gc_handle, CommandSender, ControlMessage, PlaybackAtomics, PlaybackStats,
    RenderWorker,
};
use crate::types::{PlaybackRate, Sample};

/// Everything created by `start()` and torn down by `stop()`
struct Session<S> {
    // Declared first so it drops first: the render callback stops before
    // the channel and tap ends go away.
    _stream: S,
    info: OutputInfo,
    commands: CommandSender,
    tap: AnalysisTap,
    atomics: Arc<PlaybackAtomics>,
    gc: basedrop::Handle,
}

/// Streaming audio player
///
/// Generic over the output so tests and file rendering can swap the device
/// for an [`crate::audio::OfflineBackend`].
pub struct AudioPlayer<B: OutputBackend = CpalBackend> {
    backend: B,
    config: PlayerConfig,
    session: Option<Session<B::Stream>>,
    /// Last rate requested; may lead the render worker by one quantum
    playback_rate: PlaybackRate,
}

impl AudioPlayer<CpalBackend> {
    /// Player on the system audio device
    pub fn new(config: PlayerConfig) -> Self {
        Self::with_backend(CpalBackend::new(), config)
    }
}

impl<B: OutputBackend> AudioPlayer<B> {
    pub fn with_backend(backend: B, config: PlayerConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
            playback_rate: PlaybackRate::NORMAL,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Fixed rate every `play_audio` chunk must already be at
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Open the output and start rendering
    ///
    /// Does nothing if already started.
    pub fn start(&mut self) -> PlayerResult<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let sample_rate = self.config.sample_rate;
        let gc = gc_handle();
        let atomics = Arc::new(PlaybackAtomics::new());
        let (commands, receiver) = command_channel();
        let (tap_producer, tap) = analysis_tap(self.config.analysis_window);

        let buffer = RingBuffer::new(
            self.config.initial_capacity(),
            self.config.initial_threshold(),
        );
        let worker = RenderWorker::new(buffer, receiver, Arc::clone(&atomics), gc.clone())
            .with_tap(tap_producer);

        // Queued before the device runs, so they apply on the first quantum
        if let Some(samples) = self.config.threshold_override() {
            log::info!("Initial threshold override: {} samples", samples);
            commands.send(ControlMessage::SetInitialThreshold(samples));
        }
        if !self.playback_rate.is_normal() {
            commands.send(ControlMessage::SetPlaybackRate(self.playback_rate.get()));
        }

        let opened = self.backend.open(worker, sample_rate, &self.config.output)?;
        log::info!(
            "Playback started on '{}' ({}Hz, {} frame quantum, threshold {} samples)",
            opened.info.device,
            opened.info.sample_rate,
            opened.info.quantum,
            self.config.initial_threshold()
        );

        self.session = Some(Session {
            _stream: opened.stream,
            info: opened.info,
            commands,
            tap,
            atomics,
            gc,
        });
        Ok(())
    }

    /// Stop rendering and release the session
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            let stats = session.atomics.snapshot();
            drop(session);
            log::info!(
                "Playback stopped after {} quanta ({} samples discarded)",
                stats.quanta_rendered,
                stats.buffered
            );
        }
    }

    /// Queue decoded audio for playback
    pub fn play_audio(&mut self, samples: &[Sample]) -> PlayerResult<()> {
        if let Some(session) = self.live_session("play_audio")? {
            let message = ControlMessage::audio(&session.gc, samples);
            session.commands.send(message);
        }
        Ok(())
    }

    /// Drop everything queued or buffered so far (interruption)
    ///
    /// Applies after all audio sent before this call and before any audio
    /// sent after it.
    pub fn barge_in(&mut self) -> PlayerResult<()> {
        if let Some(session) = self.live_session("barge_in")? {
            session.commands.send(ControlMessage::Flush);
            log::debug!("Barge-in: flush queued");
        }
        Ok(())
    }

    /// Change playback speed (clamped to 0.5–2.0, pitch follows)
    pub fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        let clamped = PlaybackRate::new(rate);
        if let Some(session) = self.live_session("set_playback_rate")? {
            session
                .commands
                .send(ControlMessage::SetPlaybackRate(clamped.get()));
            if clamped.get() != rate {
                log::debug!("Playback rate {} clamped to {}", rate, clamped);
            }
            self.playback_rate = clamped;
        }
        Ok(())
    }

    /// Most recently requested playback speed
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate.get()
    }

    /// Change the cushion required before playback (re)starts
    pub fn set_initial_threshold(&mut self, samples: usize) -> PlayerResult<()> {
        if let Some(session) = self.live_session("set_initial_threshold")? {
            session
                .commands
                .send(ControlMessage::SetInitialThreshold(samples));
        }
        Ok(())
    }

    /// RMS level of recent output, 0.0 when stopped
    pub fn volume(&mut self) -> f64 {
        match self.session.as_mut() {
            Some(session) => session.tap.volume(),
            None => 0.0,
        }
    }

    /// Recent output samples (oldest first), empty when stopped
    pub fn samples(&mut self) -> Vec<f64> {
        match self.session.as_mut() {
            Some(session) => session.tap.samples(),
            None => Vec::new(),
        }
    }

    /// Render-side diagnostics, None when stopped
    pub fn stats(&self) -> Option<PlaybackStats> {
        self.session.as_ref().map(|s| s.atomics.snapshot())
    }

    /// Negotiated output parameters, None when stopped
    pub fn output_info(&self) -> Option<&OutputInfo> {
        self.session.as_ref().map(|s| &s.info)
    }

    /// Session for a command, or None (logged) when stopped
    ///
    /// A session whose render side faulted is stopped here and reported.
    fn live_session(
        &mut self,
        command: &'static str,
    ) -> PlayerResult<Option<&mut Session<B::Stream>>> {
        let fault = match &self.session {
            None => {
                log::warn!("{}: player not started, ignoring", command);
                return Ok(None);
            }
            Some(session) => session.atomics.fault_request(),
        };

        if let Some(requested) = fault {
            log::error!("{}: playback session failed, stopping player", command);
            self.stop();
            return Err(PlayerError::SessionFailed { requested });
        }
        Ok(self.session.as_mut())
    }
}

impl<B: OutputBackend> Drop for AudioPlayer<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{OfflineBackend, OfflineDriver};
    use crate::types::BufferState;

    const QUANTUM: usize = 4;

    fn player(config: PlayerConfig) -> (AudioPlayer<OfflineBackend>, OfflineDriver) {
        let backend = OfflineBackend::new(QUANTUM);
        let driver = backend.driver();
        (AudioPlayer::with_backend(backend, config), driver)
    }

    fn small_config() -> PlayerConfig {
        PlayerConfig {
            sample_rate: 1000,
            initial_capacity_ms: 32,
            initial_threshold_ms: 8,
            ..PlayerConfig::default()
        }
    }

    #[test]
    fn test_commands_before_start_are_ignored() {
        let (mut player, mut driver) = player(small_config());
        assert!(!player.is_initialized());
        player.play_audio(&[0.5; 16]).unwrap();
        player.barge_in().unwrap();
        player.set_playback_rate(1.5).unwrap();
        player.set_initial_threshold(3).unwrap();

        assert_eq!(player.playback_rate(), 1.0);
        assert_eq!(player.volume(), 0.0);
        assert!(player.samples().is_empty());
        assert!(player.stats().is_none());
        assert!(driver.render_quantum().is_none());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut player, driver) = player(small_config());
        player.start().unwrap();
        player.play_audio(&[0.5; 4]).unwrap();
        player.start().unwrap();
        assert!(player.is_initialized());
        assert!(driver.is_attached());
        let info = player.output_info().unwrap();
        assert_eq!(info.device, "offline");
        assert_eq!(info.sample_rate, player.sample_rate());
    }

    #[test]
    fn test_stop_twice_is_same_as_once() {
        let (mut player, driver) = player(small_config());
        player.start().unwrap();
        player.stop();
        player.stop();
        assert!(!player.is_initialized());
        assert!(!driver.is_attached());
        assert!(player.stats().is_none());
    }

    #[test]
    fn test_audio_plays_after_cushion() {
        let (mut player, mut driver) = player(small_config());
        player.start().unwrap();

        // Threshold is 8 samples at 1kHz / 8ms
        player.play_audio(&[0.5; 4]).unwrap();
        assert_eq!(driver.render_quantum().unwrap(), &[0.0; 4]);

        player.play_audio(&[0.5; 4]).unwrap();
        assert_eq!(driver.render_quantum().unwrap(), &[0.5; 4]);
        assert_eq!(driver.render_quantum().unwrap(), &[0.5; 4]);

        let stats = player.stats().unwrap();
        assert_eq!(stats.buffered, 0);
        assert_eq!(stats.state, BufferState::Ready);
    }

    #[test]
    fn test_barge_in_discards_earlier_audio_only() {
        let (mut player, mut driver) = player(small_config().with_threshold_override(0));
        player.start().unwrap();

        player.play_audio(&[0.25; 8]).unwrap();
        player.barge_in().unwrap();
        player.play_audio(&[0.75; 4]).unwrap();

        assert_eq!(driver.render_quantum().unwrap(), &[0.75; 4]);
        assert_eq!(player.stats().unwrap().buffered, 0);
    }

    #[test]
    fn test_burst_plays_out_without_further_calls() {
        let (mut player, mut driver) = player(small_config().with_threshold_override(0));
        player.start().unwrap();
        for level in [0.1, 0.2, 0.3] {
            player.play_audio(&[level; 4]).unwrap();
        }
        for _ in 0..2000 {
            player.set_initial_threshold(0).unwrap();
        }
        player.play_audio(&[0.4; 4]).unwrap();

        let out = driver.render_quanta(6);
        assert_eq!(&out[..4], &[0.1; 4]);
        assert_eq!(&out[4..8], &[0.2; 4]);
        assert_eq!(&out[8..12], &[0.3; 4]);
        assert_eq!(&out[12..16], &[0.4; 4]);
        assert_eq!(&out[16..], &[0.0; 8]);

        let stats = player.stats().unwrap();
        assert_eq!(stats.buffered, 0);
        assert_eq!(stats.quanta_rendered, 6);
    }

    #[test]
    fn test_rate_is_clamped() {
        let (mut player, mut driver) = player(small_config());
        player.start().unwrap();

        player.set_playback_rate(10.0).unwrap();
        assert_eq!(player.playback_rate(), 2.0);
        player.set_playback_rate(0.01).unwrap();
        assert_eq!(player.playback_rate(), 0.5);

        driver.render_quantum();
        assert_eq!(player.stats().unwrap().applied_rate, 0.5);
    }

    #[test]
    fn test_rate_survives_restart() {
        let (mut player, mut driver) = player(small_config());
        player.start().unwrap();
        player.set_playback_rate(1.5).unwrap();
        player.stop();

        player.start().unwrap();
        driver.render_quantum();
        assert_eq!(player.stats().unwrap().applied_rate, 1.5);
    }

    #[test]
    fn test_threshold_override_from_config() {
        let (mut player, mut driver) = player(small_config().with_threshold_override(2));
        player.start().unwrap();
        player.play_audio(&[0.5; 2]).unwrap();

        assert_eq!(driver.render_quantum().unwrap(), &[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(player.stats().unwrap().initial_threshold, 2);
    }

    #[test]
    fn test_volume_and_samples_follow_output() {
        let (mut player, mut driver) = player(small_config().with_threshold_override(0));
        player.start().unwrap();
        player.play_audio(&[0.5, -0.5, 0.5, -0.5]).unwrap();
        driver.render_quantum();

        assert!((player.volume() - 0.5).abs() < 1e-9);
        assert_eq!(player.samples(), vec![0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_faulted_session_stops_player() {
        let (mut player, driver) = player(small_config());
        player.start().unwrap();
        player
            .session
            .as_ref()
            .unwrap()
            .atomics
            .mark_faulted(1 << 40);

        match player.play_audio(&[0.5; 4]) {
            Err(PlayerError::SessionFailed { requested }) => assert_eq!(requested, 1 << 40),
            other => panic!("expected session failure, got {:?}", other),
        }
        assert!(!player.is_initialized());
        assert!(!driver.is_attached());

        // Stopped now: back to logged no-ops
        player.play_audio(&[0.5; 4]).unwrap();
    }

    #[test]
    fn test_sequential_sessions_start_fresh() {
        let (mut player, mut driver) = player(small_config().with_threshold_override(0));
        player.start().unwrap();
        player.play_audio(&[0.5; 12]).unwrap();
        driver.render_quantum();
        player.stop();

        player.start().unwrap();
        assert_eq!(driver.render_quantum().unwrap(), &[0.0; 4]);
        assert_eq!(player.stats().unwrap().buffered, 0);
    }
}
