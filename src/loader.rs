use std::time::{Duration, Instant};

use tracing::trace;

pub(crate) const AUTO_RESET_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(bool)>;

/// "Transition in flight" signal shared by every view.
///
/// `start` arms an auto-reset deadline so a lost `stop` cannot leave the
/// indicator on; the owner drives the deadline through `tick`.
pub(crate) struct PageLoader {
    loading: bool,
    deadline: Option<Instant>,
    auto_reset: Duration,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl PageLoader {
    pub(crate) fn new() -> Self {
        Self::with_auto_reset(AUTO_RESET_AFTER)
    }

    pub(crate) fn with_auto_reset(auto_reset: Duration) -> Self {
        Self {
            loading: false,
            deadline: None,
            auto_reset,
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn start(&mut self, now: Instant) {
        self.loading = true;
        self.deadline = Some(now + self.auto_reset);
        trace!("page loader started");
        self.notify(true);
    }

    pub(crate) fn stop(&mut self) {
        self.loading = false;
        self.deadline = None;
        trace!("page loader stopped");
        self.notify(false);
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline
            && now >= deadline
        {
            self.stop();
        }
    }

    pub(crate) fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(bool) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, loading: bool) {
        for (_, listener) in &mut self.listeners {
            listener(loading);
        }
    }
}

impl Default for PageLoader {
    fn default() -> Self {
        Self::new()
    }
}
