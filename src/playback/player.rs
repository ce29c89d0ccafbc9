use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{EventSink, FaultKind, StrategyEvent};
use crate::config::PlayerConfig;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

type SharedChild = Arc<Mutex<Option<Child>>>;

fn lock_child(child: &SharedChild) -> MutexGuard<'_, Option<Child>> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One launch of the external player.
///
/// A watcher thread reports the exit as `Ended` or as a fault of
/// `failure_kind`. Once retired (killed or dropped) the launch reports
/// nothing.
#[derive(Debug)]
pub(crate) struct PlayerProcess {
    child: SharedChild,
    retired: Arc<AtomicBool>,
}

impl PlayerProcess {
    pub(crate) fn launch(
        config: &PlayerConfig,
        url: &str,
        sink: EventSink,
        failure_kind: FaultKind,
    ) -> Result<Self> {
        let mut cmd = ProcessCommand::new(&config.program);
        cmd.args(&config.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = cmd
            .spawn()
            .with_context(|| format!("failed to launch {}", config.program.display()))?;
        debug!(pid = child.id(), program = %config.program.display(), "player launched");

        let child = Arc::new(Mutex::new(Some(child)));
        let retired = Arc::new(AtomicBool::new(false));
        spawn_exit_watcher(Arc::clone(&child), Arc::clone(&retired), sink, failure_kind);
        Ok(Self { child, retired })
    }

    pub(crate) fn is_running(&self) -> bool {
        match lock_child(&self.child).as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Kills and reaps the player; the watcher stays silent afterwards.
    pub(crate) fn kill(&mut self) {
        self.retired.store(true, Ordering::SeqCst);
        if let Some(mut child) = lock_child(&self.child).take() {
            if let Err(err) = child.kill() {
                debug!(error = %err, "player already exited");
            }
            if let Err(err) = child.wait() {
                warn!(error = %err, "failed to reap player process");
            }
        }
    }
}

impl Drop for PlayerProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

fn spawn_exit_watcher(
    child: SharedChild,
    retired: Arc<AtomicBool>,
    sink: EventSink,
    failure_kind: FaultKind,
) {
    thread::spawn(move || {
        loop {
            if retired.load(Ordering::SeqCst) {
                return;
            }
            let polled = match lock_child(&child).as_mut() {
                Some(process) => process.try_wait(),
                None => return,
            };
            match polled {
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(Some(status)) => {
                    if retired.load(Ordering::SeqCst) {
                        return;
                    }
                    if status.success() {
                        sink.emit(StrategyEvent::Ended);
                    } else {
                        sink.emit(StrategyEvent::Fault {
                            kind: failure_kind,
                            detail: format!("player exited with {status}"),
                        });
                    }
                    return;
                }
                Err(err) => {
                    if !retired.load(Ordering::SeqCst) {
                        sink.emit(StrategyEvent::Fault {
                            kind: FaultKind::Fatal,
                            detail: format!("lost track of player process: {err}"),
                        });
                    }
                    return;
                }
            }
        }
    });
}
