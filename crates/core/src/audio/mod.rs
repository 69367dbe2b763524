use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    thread,
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::{
    decode::decode_bytes, AnalyzerConfig, AppConfig, AudioConfig, DecodeError, DecodedClip,
    Result, SharedAnalyzer, VisualiserError,
};

mod session;

pub use session::{AudioSession, PlaybackHandle, PlaybackState, SessionId};

/// Identifies one background load requested through [`AudioEngine::request_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// Outcome of a background load, reported when the frame loop polls.
#[derive(Debug)]
pub enum LoadEvent {
    /// The clip decoded and is now the live session.
    Started {
        ticket: LoadTicket,
        session: SessionId,
        replaced: Option<SessionId>,
    },
    /// The load failed; the live session, if any, was left untouched.
    Failed {
        ticket: LoadTicket,
        error: VisualiserError,
    },
}

impl LoadEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            Self::Started { ticket, .. } | Self::Failed { ticket, .. } => *ticket,
        }
    }
}

struct CompletedLoad {
    ticket: LoadTicket,
    result: std::result::Result<DecodedClip, DecodeError>,
}

/// Owns the audio context: the live [`AudioSession`], the lazily created
/// analyzer, and the queue of decodes running in the background.
///
/// At most one session is live. Installing a new one stops and disconnects
/// the previous session first, and background loads are only installed from
/// [`poll_loads`](Self::poll_loads) so the frame loop never observes a
/// half-built session.
pub struct AudioEngine {
    audio: AudioConfig,
    analyzer_config: AnalyzerConfig,
    analyzer: SharedAnalyzer,
    session: Option<AudioSession>,
    next_session: u64,
    next_ticket: u64,
    in_flight: usize,
    completed_tx: Sender<CompletedLoad>,
    completed_rx: Receiver<CompletedLoad>,
}

impl AudioEngine {
    /// Creates an engine with its own analyzer slot.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_analyzer(config, SharedAnalyzer::new())
    }

    /// Creates an engine that feeds the given analyzer slot.
    pub fn with_analyzer(config: &AppConfig, analyzer: SharedAnalyzer) -> Self {
        let (completed_tx, completed_rx) = unbounded();
        Self {
            audio: config.audio.clone(),
            analyzer_config: config.analyzer.clone(),
            analyzer,
            session: None,
            next_session: 1,
            next_ticket: 1,
            in_flight: 0,
            completed_tx,
            completed_rx,
        }
    }

    pub fn analyzer(&self) -> &SharedAnalyzer {
        &self.analyzer
    }

    /// The live session, including one that has stopped or ended.
    pub fn session(&self) -> Option<&AudioSession> {
        self.session.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(AudioSession::is_playing)
    }

    /// Number of background loads that have not been polled yet.
    pub fn pending_loads(&self) -> usize {
        self.in_flight
    }

    /// Decodes `bytes` and immediately starts playing the result.
    ///
    /// On a decode failure the live session keeps playing untouched.
    pub fn load_and_play(&mut self, bytes: Vec<u8>) -> Result<SessionId> {
        let clip = decode_bytes(bytes).map_err(|error| {
            tracing::warn!(%error, "audio decode failed; keeping current session");
            VisualiserError::Decode(error)
        })?;
        self.play_clip(clip)
    }

    /// Starts playing an already decoded clip, replacing the live session.
    pub fn play_clip(&mut self, clip: DecodedClip) -> Result<SessionId> {
        self.install(clip).map(|(id, _)| id)
    }

    /// Decodes `bytes` on a worker thread. The result is installed by the
    /// next [`poll_loads`](Self::poll_loads) after the decode completes.
    pub fn request_load(&mut self, bytes: Vec<u8>) -> Result<LoadTicket> {
        self.request_load_with(move || decode_bytes(bytes))
    }

    /// Like [`request_load`](Self::request_load) with a caller supplied decoder.
    ///
    /// Loads are not cancelled by newer requests: whichever completes last
    /// becomes the live session.
    pub fn request_load_with<F>(&mut self, decode: F) -> Result<LoadTicket>
    where
        F: FnOnce() -> std::result::Result<DecodedClip, DecodeError> + Send + 'static,
    {
        let ticket = LoadTicket(self.next_ticket);
        let tx = self.completed_tx.clone();

        thread::Builder::new()
            .name(format!("audio-decode-{}", ticket.0))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(decode)).unwrap_or_else(|_| {
                    Err(DecodeError::Malformed("decoder panicked".into()))
                });
                // The engine may already be gone; nothing left to report to.
                let _ = tx.send(CompletedLoad { ticket, result });
            })?;

        self.next_ticket += 1;
        self.in_flight += 1;
        tracing::debug!(ticket = ticket.0, "audio load requested");
        Ok(ticket)
    }

    /// Installs every load that completed since the previous poll, in
    /// completion order. Call at the start of a frame.
    pub fn poll_loads(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(done) = self.completed_rx.try_recv() {
            events.push(self.complete(done));
        }
        events
    }

    /// Blocks until the next background load completes, then installs it.
    ///
    /// Returns `Ok(None)` when nothing is in flight or `timeout` elapses.
    pub fn wait_for_load(&mut self, timeout: Duration) -> Result<Option<LoadEvent>> {
        if self.in_flight == 0 {
            return Ok(None);
        }

        match self.completed_rx.recv_timeout(timeout) {
            Ok(done) => Ok(Some(self.complete(done))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(VisualiserError::WorkerDisconnected),
        }
    }

    /// Stops the live session and detaches it from the analyzer.
    ///
    /// Returns `false` when nothing was playing.
    pub fn stop(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let stopped = session.stop();
        if let Some(mut node) = self.analyzer.lock() {
            node.disconnect(session.id());
        }
        session.set_connected(false);

        if stopped {
            tracing::info!(session = %session.id(), "playback stopped");
        }
        stopped
    }

    /// Moves playback forward by `delta` seconds and feeds what played to
    /// the analyzer. Silence is fed while nothing plays.
    pub fn advance(&mut self, delta: f32) {
        if !(delta.is_finite() && delta > 0.0) {
            return;
        }
        let Some(mut node) = self.analyzer.lock() else {
            return;
        };

        let Some(session) = self.session.as_mut().filter(|s| s.is_playing()) else {
            node.push_silence(frames_for(delta, self.audio.sample_rate));
            return;
        };

        let played = session.advance(delta);
        let expected = frames_for(delta, session.clip().sample_rate());
        let shortfall = expected.saturating_sub(played.len());
        node.push_samples(&session.clip().samples()[played]);

        if !session.is_playing() {
            node.push_silence(shortfall);
            node.disconnect(session.id());
            session.set_connected(false);
            tracing::info!(session = %session.id(), "playback reached end of clip");
        }
    }

    fn complete(&mut self, done: CompletedLoad) -> LoadEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        let CompletedLoad { ticket, result } = done;

        let installed = result
            .map_err(VisualiserError::Decode)
            .and_then(|clip| self.install(clip));

        match installed {
            Ok((session, replaced)) => LoadEvent::Started {
                ticket,
                session,
                replaced: replaced.map(|previous| previous.id()),
            },
            Err(error) => {
                tracing::warn!(ticket = ticket.0, %error, "audio load failed; keeping current session");
                LoadEvent::Failed { ticket, error }
            }
        }
    }

    /// Swaps in a new session. The previous one is stopped and disconnected
    /// before the new one is connected, and is handed back to the caller.
    fn install(&mut self, clip: DecodedClip) -> Result<(SessionId, Option<AudioSession>)> {
        let mut node = self.analyzer.lock_or_init(&self.analyzer_config)?;

        let previous = self.session.take().map(|mut previous| {
            previous.stop();
            node.disconnect(previous.id());
            previous.set_connected(false);
            previous
        });

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let mut session = AudioSession::start(id, clip);
        node.connect(id);
        session.set_connected(true);

        tracing::info!(
            session = %id,
            replaced = ?previous.as_ref().map(AudioSession::id),
            seconds = session.clip().duration().as_secs_f32(),
            sample_rate = session.clip().sample_rate(),
            "playback started"
        );

        self.session = Some(session);
        Ok((id, previous))
    }
}

fn frames_for(delta: f32, sample_rate: u32) -> usize {
    (delta as f64 * sample_rate as f64).round() as usize
}

impl fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEngine")
            .field("analyzer", &self.analyzer)
            .field("session", &self.session.as_ref().map(AudioSession::id))
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sine_wav;

    const WAIT: Duration = Duration::from_secs(5);

    fn engine() -> AudioEngine {
        AudioEngine::new(&AppConfig::default())
    }

    fn clip(seconds: f32) -> DecodedClip {
        let rate = 8_000;
        DecodedClip::from_mono(vec![0.25; (rate as f32 * seconds) as usize], rate)
    }

    #[test]
    fn analyzer_is_created_on_first_load() {
        let mut audio = engine();
        assert!(!audio.analyzer().is_initialized());

        let id = audio.load_and_play(sine_wav(440.0, 8_000, 0.1)).unwrap();
        assert!(audio.analyzer().is_initialized());
        assert!(audio.is_playing());

        let node = audio.analyzer().lock().unwrap();
        assert_eq!(node.connected_session(), Some(id));
    }

    #[test]
    fn replacing_stops_and_disconnects_previous_session() {
        let mut audio = engine();
        let (first, _) = audio.install(clip(1.0)).unwrap();
        let (second, previous) = audio.install(clip(1.0)).unwrap();

        let previous = previous.expect("first session is handed back");
        assert_eq!(previous.id(), first);
        assert_eq!(previous.state(), PlaybackState::Stopped);
        assert!(!previous.is_connected());

        let node = audio.analyzer().lock().unwrap();
        assert_eq!(node.connected_session(), Some(second));
    }

    #[test]
    fn decode_failure_leaves_session_untouched() {
        let mut audio = engine();
        let id = audio.play_clip(clip(1.0)).unwrap();
        audio.advance(0.1);

        let err = audio.load_and_play(b"corrupt".to_vec()).unwrap_err();
        assert!(err.is_decode());

        let session = audio.session().unwrap();
        assert_eq!(session.id(), id);
        assert!(session.is_playing());
        assert_eq!(session.playback().position(), 800);
    }

    #[test]
    fn decode_failure_before_first_load_creates_no_analyzer() {
        let mut audio = engine();
        assert!(audio.load_and_play(Vec::new()).is_err());
        assert!(!audio.analyzer().is_initialized());
        assert!(audio.session().is_none());
    }

    #[test]
    fn stop_is_idempotent_and_disconnects() {
        let mut audio = engine();
        audio.play_clip(clip(1.0)).unwrap();
        assert!(audio.stop());
        assert!(!audio.stop());
        assert_eq!(audio.analyzer().lock().unwrap().connected_session(), None);
        assert!(!audio.session().unwrap().is_connected());
    }

    #[test]
    fn advance_feeds_silence_once_the_clip_ends() {
        let mut audio = engine();
        audio.play_clip(clip(0.05)).unwrap();
        audio.advance(0.1);

        assert_eq!(audio.session().unwrap().state(), PlaybackState::Ended);
        let node = audio.analyzer().lock().unwrap();
        assert_eq!(node.connected_session(), None);
        assert_eq!(node.frames_processed(), 800);
    }

    #[test]
    fn advance_without_analyzer_is_a_no_op() {
        let mut audio = engine();
        audio.advance(1.0);
        assert!(!audio.analyzer().is_initialized());
    }

    #[test]
    fn background_load_installs_on_poll() {
        let mut audio = engine();
        let ticket = audio.request_load(sine_wav(220.0, 8_000, 0.1)).unwrap();
        assert_eq!(audio.pending_loads(), 1);
        assert!(audio.session().is_none());

        match audio.wait_for_load(WAIT).unwrap() {
            Some(LoadEvent::Started { ticket: t, replaced, .. }) => {
                assert_eq!(t, ticket);
                assert!(replaced.is_none());
            }
            other => panic!("unexpected load outcome: {other:?}"),
        }
        assert_eq!(audio.pending_loads(), 0);
        assert!(audio.is_playing());
    }

    #[test]
    fn last_completed_load_wins() {
        let mut audio = engine();
        let (release_a, gate_a) = crossbeam_channel::bounded::<()>(0);

        let a = audio
            .request_load_with(move || {
                let _ = gate_a.recv();
                Ok(clip(2.0))
            })
            .unwrap();
        let b = audio.request_load_with(|| Ok(clip(1.0))).unwrap();

        let first = audio.wait_for_load(WAIT).unwrap().unwrap();
        assert_eq!(first.ticket(), b);

        release_a.send(()).unwrap();
        let second = audio.wait_for_load(WAIT).unwrap().unwrap();
        assert_eq!(second.ticket(), a);

        let live = audio.session().unwrap();
        assert_eq!(live.clip().frames(), 16_000);
        assert_eq!(
            audio.analyzer().lock().unwrap().connected_session(),
            Some(live.id())
        );
    }

    #[test]
    fn failed_background_load_reports_and_keeps_playing() {
        let mut audio = engine();
        let id = audio.play_clip(clip(1.0)).unwrap();
        audio.request_load(b"not audio".to_vec()).unwrap();

        let event = audio.wait_for_load(WAIT).unwrap().unwrap();
        assert!(matches!(event, LoadEvent::Failed { ref error, .. } if error.is_decode()));
        assert_eq!(audio.session().unwrap().id(), id);
        assert!(audio.is_playing());
    }

    #[test]
    fn panicking_decoder_reports_a_failed_load() {
        let mut audio = engine();
        let id = audio.play_clip(clip(1.0)).unwrap();
        let ticket = audio
            .request_load_with(|| panic!("decoder blew up"))
            .unwrap();

        match audio.wait_for_load(WAIT).unwrap() {
            Some(LoadEvent::Failed { ticket: t, error }) => {
                assert_eq!(t, ticket);
                assert!(error.is_decode());
            }
            other => panic!("unexpected load outcome: {other:?}"),
        }
        assert_eq!(audio.pending_loads(), 0);
        assert_eq!(audio.session().unwrap().id(), id);
        assert!(audio.is_playing());
    }

    #[test]
    fn wait_without_pending_loads_returns_immediately() {
        let mut audio = engine();
        assert!(audio.wait_for_load(WAIT).unwrap().is_none());
        assert!(audio.poll_loads().is_empty());
    }
}
