use std::time::Duration;

pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_RECONNECT_STEP: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Linear backoff: `base_delay + attempt_index * step`, capped at `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub step: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            step: DEFAULT_RECONNECT_STEP,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay + self.step * attempt_index
    }

    /// Policy that never reconnects automatically.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            step: DEFAULT_RECONNECT_STEP,
            max_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Start attempt number `attempt` (1-based) after `delay`.
    Schedule { attempt: u32, delay: Duration },
    /// The attempt budget is spent; wait for a manual connect.
    Exhausted,
    /// A reconnect cycle is already running.
    Ignore,
}

/// Attempt counter and reconnecting flag. Pure bookkeeping; the session owns the timer.
#[derive(Debug, Clone)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    attempts: u32,
    reconnecting: bool,
}

impl ReconnectTracker {
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempts: 0, reconnecting: false }
    }

    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    /// The connection entered `disconnected` or `failed`.
    pub fn on_connection_lost(&mut self) -> ReconnectDecision {
        if self.reconnecting {
            return ReconnectDecision::Ignore;
        }
        self.next_attempt()
    }

    /// A scheduled attempt did not produce a connection.
    pub fn on_attempt_failed(&mut self) -> ReconnectDecision {
        self.next_attempt()
    }

    pub fn on_connected(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.reconnecting = false;
    }

    fn next_attempt(&mut self) -> ReconnectDecision {
        if self.attempts >= self.policy.max_attempts {
            self.reconnecting = false;
            return ReconnectDecision::Exhausted;
        }
        let delay = self.policy.delay_for(self.attempts);
        self.attempts += 1;
        self.reconnecting = true;
        ReconnectDecision::Schedule { attempt: self.attempts, delay }
    }
}

impl Default for ReconnectTracker {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
