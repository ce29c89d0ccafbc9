use anyhow::Result;
use tracing::info;

use super::player::PlayerProcess;
use super::{EventSink, FaultKind, PlaybackStrategy, StrategyEvent};
use crate::config::PlayerConfig;

/// Hands the URL straight to the player; any abnormal exit is fatal.
pub(crate) struct NativeStrategy {
    player: PlayerConfig,
    process: Option<PlayerProcess>,
}

impl NativeStrategy {
    pub(crate) fn new(player: PlayerConfig) -> Self {
        Self {
            player,
            process: None,
        }
    }
}

impl PlaybackStrategy for NativeStrategy {
    fn start(&mut self, url: &str, sink: EventSink) -> Result<()> {
        info!(url, "handing stream to player");
        let process = PlayerProcess::launch(&self.player, url, sink.clone(), FaultKind::Fatal)?;
        self.process = Some(process);
        sink.emit(StrategyEvent::MediaLoaded);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
    }
}
