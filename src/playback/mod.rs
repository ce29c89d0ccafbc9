mod engine;
mod hls;
mod manifest;
mod native;
mod player;

use std::sync::mpsc;

use anyhow::Result;
use tracing::trace;

use crate::config::{HttpSettings, PlayerConfig};

pub(crate) use engine::{Handled, PlaybackEngine};

const MANIFEST_MARKER: &str = ".m3u8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Adaptive,
    Native,
}

impl Strategy {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Native => "native",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct HostCapabilities {
    pub(crate) native_manifest: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaybackStatus {
    pub(crate) state: PlaybackState,
    pub(crate) error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PlaybackSource {
    pub(crate) source_url: String,
    pub(crate) poster_url: Option<String>,
}

impl PlaybackSource {
    pub(crate) fn new(source_url: impl Into<String>, poster_url: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            poster_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultKind {
    Network,
    Media,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StrategyEvent {
    ManifestParsed { variants: usize },
    MediaLoaded,
    Fault { kind: FaultKind, detail: String },
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SessionId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionEvent {
    pub(crate) session: SessionId,
    pub(crate) event: StrategyEvent,
}

/// Session-tagged event channel handed to a strategy for one session.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    session: SessionId,
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    pub(crate) fn emit(&self, event: StrategyEvent) {
        trace!(session = self.session.0, ?event, "strategy event");
        // The host may already be gone; nothing to report to then.
        let _ = self.tx.send(SessionEvent {
            session: self.session,
            event,
        });
    }
}

/// One way of delivering a stream to the screen.
pub(crate) trait PlaybackStrategy {
    fn start(&mut self, url: &str, sink: EventSink) -> Result<()>;
    /// Begin playback once enough data is available.
    fn play(&mut self) -> Result<()>;
    /// Reload from the current position after a network fault.
    fn start_load(&mut self) {}
    /// Rebuild the decode pipeline in place after a media fault.
    fn recover_media_error(&mut self) {}
    fn stop(&mut self);
}

pub(crate) trait StrategyFactory {
    fn create(&self, strategy: Strategy) -> Box<dyn PlaybackStrategy>;
}

pub(crate) fn is_manifest_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains(MANIFEST_MARKER)
}

pub(crate) fn select_strategy(url: &str, capabilities: HostCapabilities) -> Strategy {
    if is_manifest_url(url) && !capabilities.native_manifest {
        Strategy::Adaptive
    } else {
        Strategy::Native
    }
}

/// Strategies backed by an external player process.
#[derive(Debug, Clone)]
pub(crate) struct PlayerStrategyFactory {
    player: PlayerConfig,
    http: HttpSettings,
}

impl PlayerStrategyFactory {
    pub(crate) fn new(player: PlayerConfig, http: HttpSettings) -> Self {
        Self { player, http }
    }
}

impl StrategyFactory for PlayerStrategyFactory {
    fn create(&self, strategy: Strategy) -> Box<dyn PlaybackStrategy> {
        match strategy {
            Strategy::Adaptive => Box::new(hls::HlsStrategy::new(
                self.player.clone(),
                self.http.clone(),
            )),
            Strategy::Native => Box::new(native::NativeStrategy::new(self.player.clone())),
        }
    }
}
