use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Per-rule suppression state. A rule is `Idle` until it fires, then stays in
/// `Cooldown` until its cooldown has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RuleState {
    Idle,
    Cooldown { fired_at: DateTime<Utc> },
}

impl RuleState {
    pub fn is_eligible(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self {
            Self::Idle => true,
            Self::Cooldown { fired_at } => now.signed_duration_since(*fired_at) >= cooldown,
        }
    }

    /// Returns the next state when the rule's condition holds at `now`, or
    /// `None` while the rule is still suppressed.
    pub fn fire(self, now: DateTime<Utc>, cooldown: Duration) -> Option<Self> {
        if self.is_eligible(now, cooldown) {
            Some(Self::Cooldown { fired_at: now })
        } else {
            None
        }
    }

    /// Collapses an expired cooldown back to `Idle`, for reporting.
    pub fn settle(self, now: DateTime<Utc>, cooldown: Duration) -> Self {
        match self {
            Self::Cooldown { .. } if self.is_eligible(now, cooldown) => Self::Idle,
            other => other,
        }
    }

    pub fn last_fired_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Idle => None,
            Self::Cooldown { fired_at } => Some(*fired_at),
        }
    }
}
