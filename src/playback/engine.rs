use std::sync::mpsc;

use tracing::{debug, error, info, trace, warn};

use super::{
    EventSink, FaultKind, HostCapabilities, PlaybackSource, PlaybackState, PlaybackStatus,
    PlaybackStrategy, SessionEvent, SessionId, Strategy, StrategyEvent, StrategyFactory,
    select_strategy,
};
use crate::config::RecoveryLimits;

const NETWORK_ERROR_MESSAGE: &str = "Network error - unable to load the video.";
const ADAPTIVE_ERROR_MESSAGE: &str = "This video cannot be played.";
const NATIVE_ERROR_MESSAGE: &str = "Unable to play the video.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handled {
    /// Event belonged to a torn-down session or arrived with no session.
    Ignored,
    Applied,
    /// The player finished the stream.
    Ended,
}

struct ActiveSession {
    id: SessionId,
    strategy: Strategy,
    driver: Box<dyn PlaybackStrategy>,
    network_recoveries: u32,
    media_recoveries: u32,
}

type StatusListener = Box<dyn FnMut(&PlaybackStatus)>;

/// Drives one stream URL through strategy selection, loading, recovery and
/// teardown. Strategy callbacks arrive through the receiver returned by
/// [`PlaybackEngine::new`] and are fed back with [`PlaybackEngine::handle`].
pub(crate) struct PlaybackEngine<F: StrategyFactory> {
    factory: F,
    capabilities: HostCapabilities,
    limits: RecoveryLimits,
    source: PlaybackSource,
    strategy: Option<Strategy>,
    status: PlaybackStatus,
    active: Option<ActiveSession>,
    last_session: u64,
    events_tx: mpsc::Sender<SessionEvent>,
    listener: Option<StatusListener>,
}

impl<F: StrategyFactory> PlaybackEngine<F> {
    pub(crate) fn new(
        source: PlaybackSource,
        capabilities: HostCapabilities,
        limits: RecoveryLimits,
        factory: F,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel();
        let mut engine = Self {
            factory,
            capabilities,
            limits,
            source,
            strategy: None,
            status: PlaybackStatus {
                state: PlaybackState::Idle,
                error_message: None,
            },
            active: None,
            last_session: 0,
            events_tx,
            listener: None,
        };
        engine.begin_session();
        (engine, events_rx)
    }

    /// Installs the host listener and reports the current status to it.
    pub(crate) fn set_listener<L>(&mut self, listener: L)
    where
        L: FnMut(&PlaybackStatus) + 'static,
    {
        let mut listener: StatusListener = Box::new(listener);
        listener(&self.status);
        self.listener = Some(listener);
    }

    pub(crate) fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub(crate) fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub(crate) fn source(&self) -> &PlaybackSource {
        &self.source
    }

    pub(crate) fn handle(&mut self, event: SessionEvent) -> Handled {
        let Some(active) = self.active.as_mut() else {
            trace!(session = event.session.0, "no active session; event dropped");
            return Handled::Ignored;
        };
        if event.session != active.id {
            debug!(
                session = event.session.0,
                active = active.id.0,
                "ignoring event from a torn-down session"
            );
            return Handled::Ignored;
        }

        match event.event {
            StrategyEvent::ManifestParsed { variants } => {
                debug!(session = active.id.0, variants, "manifest parsed");
                self.mark_ready();
                Handled::Applied
            }
            StrategyEvent::MediaLoaded => {
                self.mark_ready();
                Handled::Applied
            }
            StrategyEvent::Fault { kind, detail } => {
                self.handle_fault(kind, &detail);
                Handled::Applied
            }
            StrategyEvent::Ended => {
                info!(session = active.id.0, "playback ended");
                Handled::Ended
            }
        }
    }

    /// Starts over from strategy selection for the current URL.
    pub(crate) fn retry(&mut self) {
        info!(url = %self.source.source_url, "retrying playback");
        self.begin_session();
    }

    pub(crate) fn set_source(&mut self, source: PlaybackSource) {
        if source.source_url == self.source.source_url {
            self.source.poster_url = source.poster_url;
            return;
        }
        self.source = source;
        self.begin_session();
    }

    pub(crate) fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!(
                session = active.id.0,
                strategy = active.strategy.label(),
                "tearing down playback session"
            );
            active.driver.stop();
        }
    }

    fn begin_session(&mut self) {
        self.teardown();

        let url = self.source.source_url.trim().to_string();
        if url.is_empty() {
            self.strategy = None;
            self.set_status(PlaybackState::Idle, None);
            debug!("no stream url; engine idle");
            return;
        }

        let strategy = select_strategy(&url, self.capabilities);
        self.last_session += 1;
        let id = SessionId(self.last_session);
        self.strategy = Some(strategy);
        self.set_status(PlaybackState::Loading, None);
        info!(session = id.0, strategy = strategy.label(), %url, "starting playback session");

        let mut driver = self.factory.create(strategy);
        let sink = EventSink::new(id, self.events_tx.clone());
        match driver.start(&url, sink) {
            Ok(()) => {
                self.active = Some(ActiveSession {
                    id,
                    strategy,
                    driver,
                    network_recoveries: 0,
                    media_recoveries: 0,
                });
            }
            Err(err) => {
                driver.stop();
                let message = fault_message(strategy, FaultKind::Fatal, &format!("{err:#}"));
                error!(session = id.0, error = %err, "failed to start playback strategy");
                self.set_status(PlaybackState::Error, Some(message));
            }
        }
    }

    fn mark_ready(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.network_recoveries = 0;
            active.media_recoveries = 0;
        }
        self.set_status(PlaybackState::Ready, None);
        if let Some(active) = self.active.as_mut()
            && let Err(err) = active.driver.play()
        {
            debug!(error = %err, "autoplay rejected; waiting for the viewer");
        }
    }

    fn handle_fault(&mut self, kind: FaultKind, detail: &str) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let adaptive = active.strategy == Strategy::Adaptive;
        match kind {
            FaultKind::Network
                if adaptive && active.network_recoveries < self.limits.network =>
            {
                active.network_recoveries += 1;
                warn!(
                    session = active.id.0,
                    attempt = active.network_recoveries,
                    detail,
                    "network fault; reloading stream"
                );
                active.driver.start_load();
                self.set_status(PlaybackState::Loading, None);
            }
            FaultKind::Media if adaptive && active.media_recoveries < self.limits.media => {
                active.media_recoveries += 1;
                warn!(
                    session = active.id.0,
                    attempt = active.media_recoveries,
                    detail,
                    "media fault; recovering decoder"
                );
                active.driver.recover_media_error();
            }
            _ => {
                let strategy = active.strategy;
                error!(session = active.id.0, ?kind, detail, "fatal playback fault");
                let message = fault_message(strategy, kind, detail);
                self.teardown();
                self.set_status(PlaybackState::Error, Some(message));
            }
        }
    }

    fn set_status(&mut self, state: PlaybackState, error_message: Option<String>) {
        let next = PlaybackStatus {
            state,
            error_message,
        };
        if next == self.status {
            return;
        }
        self.status = next;
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.status);
        }
    }
}

impl<F: StrategyFactory> Drop for PlaybackEngine<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn fault_message(strategy: Strategy, kind: FaultKind, detail: &str) -> String {
    let base = match (strategy, kind) {
        (Strategy::Native, _) => NATIVE_ERROR_MESSAGE,
        (Strategy::Adaptive, FaultKind::Network) => NETWORK_ERROR_MESSAGE,
        (Strategy::Adaptive, _) => ADAPTIVE_ERROR_MESSAGE,
    };
    let detail = detail.trim();
    if detail.is_empty() {
        base.to_string()
    } else {
        format!("{base} ({detail})")
    }
}
