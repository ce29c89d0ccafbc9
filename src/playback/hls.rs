use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use super::manifest::parse_manifest;
use super::player::PlayerProcess;
use super::{EventSink, FaultKind, PlaybackStrategy, StrategyEvent};
use crate::config::{HttpSettings, PlayerConfig};
use crate::http::get_text_until_cancelled;

/// Adaptive delivery: the manifest is fetched and parsed here, the chosen
/// rendition is handed to the player.
pub(crate) struct HlsStrategy {
    player: PlayerConfig,
    http: HttpSettings,
    manifest_url: Option<String>,
    sink: Option<EventSink>,
    playback_url: Arc<Mutex<Option<String>>>,
    cancelled: Arc<AtomicBool>,
    process: Option<PlayerProcess>,
}

impl HlsStrategy {
    pub(crate) fn new(player: PlayerConfig, http: HttpSettings) -> Self {
        Self {
            player,
            http,
            manifest_url: None,
            sink: None,
            playback_url: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(AtomicBool::new(false)),
            process: None,
        }
    }

    fn load_manifest(&self) {
        let (Some(url), Some(sink)) = (self.manifest_url.clone(), self.sink.clone()) else {
            return;
        };
        let http = self.http.clone();
        let max_height = self.player.max_height;
        let playback_url = Arc::clone(&self.playback_url);
        let cancelled = Arc::clone(&self.cancelled);

        thread::spawn(move || {
            let fetched = get_text_until_cancelled(&url, &[], &http, &cancelled);
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            let body = match fetched {
                Ok(body) => body,
                Err(err) => {
                    sink.emit(StrategyEvent::Fault {
                        kind: FaultKind::Network,
                        detail: err.to_string(),
                    });
                    return;
                }
            };
            match parse_manifest(&body, &url) {
                Ok(manifest) => {
                    debug!(%url, summary = manifest.summary(), "manifest parsed");
                    let chosen = manifest.playback_url(&url, max_height);
                    *playback_url
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(chosen);
                    sink.emit(StrategyEvent::ManifestParsed {
                        variants: manifest.variant_count(),
                    });
                }
                Err(err) => sink.emit(StrategyEvent::Fault {
                    kind: FaultKind::Fatal,
                    detail: err.to_string(),
                }),
            }
        });
    }

    fn current_playback_url(&self) -> Option<String> {
        self.playback_url
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn kill_player(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
    }
}

impl PlaybackStrategy for HlsStrategy {
    fn start(&mut self, url: &str, sink: EventSink) -> Result<()> {
        self.manifest_url = Some(url.to_string());
        self.sink = Some(sink);
        self.load_manifest();
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.process.as_ref().is_some_and(PlayerProcess::is_running) {
            return Ok(());
        }
        let Some(url) = self.current_playback_url() else {
            bail!("manifest not loaded yet");
        };
        let Some(sink) = self.sink.clone() else {
            bail!("strategy not started");
        };
        info!(%url, "handing rendition to player");
        match PlayerProcess::launch(&self.player, &url, sink.clone(), FaultKind::Media) {
            Ok(process) => {
                self.process = Some(process);
                Ok(())
            }
            Err(err) => {
                // Nothing is left to play once the player cannot start.
                sink.emit(StrategyEvent::Fault {
                    kind: FaultKind::Fatal,
                    detail: format!("{err:#}"),
                });
                Err(err)
            }
        }
    }

    fn start_load(&mut self) {
        debug!("reloading manifest");
        self.load_manifest();
    }

    fn recover_media_error(&mut self) {
        self.kill_player();
        if self.current_playback_url().is_none() {
            self.load_manifest();
            return;
        }
        if let Err(err) = self.play() {
            warn!(error = %err, "player relaunch failed");
        }
    }

    fn stop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.kill_player();
    }
}
