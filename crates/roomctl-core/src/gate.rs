use serde::Deserialize;
use std::time::Duration;

/// How often a persisting no-load condition is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportPolicy {
    /// Every qualifying cycle, as the device always did.
    #[default]
    EveryCycle,
    /// Once when the condition starts; re-armed by a non-qualifying cycle.
    OnTransition,
    /// At most once per `min_interval`.
    RateLimited,
}

#[derive(Debug)]
pub struct ReportGate {
    policy: ReportPolicy,
    min_interval: Duration,
    armed: bool,
    last_sent: Option<Duration>,
}

impl ReportGate {
    pub fn new(policy: ReportPolicy, min_interval: Duration) -> Self {
        Self { policy, min_interval, armed: true, last_sent: None }
    }

    pub fn policy(&self) -> ReportPolicy {
        self.policy
    }

    /// Called once per cycle with a valid load sample. Returns whether a
    /// report should go out for this cycle.
    pub fn admit(&mut self, qualifying: bool, now: Duration) -> bool {
        if !qualifying {
            self.armed = true;
            return false;
        }
        match self.policy {
            ReportPolicy::EveryCycle => true,
            ReportPolicy::OnTransition => std::mem::replace(&mut self.armed, false),
            ReportPolicy::RateLimited => {
                if let Some(t) = self.last_sent {
                    if now.saturating_sub(t) < self.min_interval { return false; }
                }
                self.last_sent = Some(now);
                true
            }
        }
    }
}
