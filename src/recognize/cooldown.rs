use std::time::{Duration, Instant};

use super::GestureLabel;

/// True iff a label is present and strictly more than `cooldown` has elapsed
/// since the last dispatched action. `None` for `last_action` means nothing
/// has been dispatched yet.
pub fn should_dispatch(
    label: Option<GestureLabel>,
    now: Instant,
    last_action: Option<Instant>,
    cooldown: Duration,
) -> bool {
    if label.is_none() {
        return false;
    }
    match last_action {
        Some(last) => now.saturating_duration_since(last) > cooldown,
        None => true,
    }
}

/// Minimum-interval gate between two dispatched gestures.
#[derive(Clone, Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    last_action: Option<Instant>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_action: None,
        }
    }

    /// Decide and, on success, advance the timestamp in the same step.
    /// Rejected labels are dropped, never queued.
    pub fn admit(&mut self, label: Option<GestureLabel>, now: Instant) -> Option<GestureLabel> {
        if should_dispatch(label, now, self.last_action, self.cooldown) {
            self.last_action = Some(now);
            label
        } else {
            None
        }
    }

    pub fn last_action(&self) -> Option<Instant> {
        self.last_action
    }
}
