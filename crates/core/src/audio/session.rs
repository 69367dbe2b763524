use std::{fmt, ops::Range, time::Duration};

use crate::{DecodedClip, PlaybackClock};

/// Identifies one loaded-and-playing clip for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    /// Stopped explicitly or replaced by a newer session.
    Stopped,
    /// Reached the end of the clip.
    Ended,
}

/// Playback cursor over a session's clip.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    state: PlaybackState,
    clock: PlaybackClock,
    position: usize,
}

impl PlaybackHandle {
    fn started() -> Self {
        Self {
            state: PlaybackState::Playing,
            clock: PlaybackClock::new(),
            position: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Position in frames from the start of the clip.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}

/// One decoded clip together with its exclusive playback handle.
#[derive(Debug)]
pub struct AudioSession {
    id: SessionId,
    clip: DecodedClip,
    playback: PlaybackHandle,
    connected: bool,
}

impl AudioSession {
    /// Creates a session that starts playing from the first frame.
    pub(crate) fn start(id: SessionId, clip: DecodedClip) -> Self {
        Self {
            id,
            clip,
            playback: PlaybackHandle::started(),
            connected: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn clip(&self) -> &DecodedClip {
        &self.clip
    }

    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state
    }

    pub fn is_playing(&self) -> bool {
        self.playback.state == PlaybackState::Playing
    }

    /// Whether the session currently feeds the analyzer.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Stops playback. Returns `false` if the session was not playing.
    pub(crate) fn stop(&mut self) -> bool {
        if self.is_playing() {
            self.playback.state = PlaybackState::Stopped;
            true
        } else {
            false
        }
    }

    /// Advances the cursor by `delta` seconds and returns the range of clip
    /// samples that played during the step.
    pub(crate) fn advance(&mut self, delta: f32) -> Range<usize> {
        let start = self.playback.position;
        if !self.is_playing() {
            return start..start;
        }

        self.playback.clock.advance(delta);
        let end = self
            .playback
            .clock
            .frames_at(self.clip.sample_rate())
            .min(self.clip.frames());
        self.playback.position = end;

        if end >= self.clip.frames() {
            self.playback.state = PlaybackState::Ended;
        }

        start..end
    }
}
