use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The canonical event status enumeration (spec §3 superset, chosen as the
/// single enumeration — see DESIGN.md's "Open Questions" resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Previsional,
    Engagement,
    Demande,
    Cloture,
    InProgress,
    Finished,
    Cancelled,
    Closed,
}

impl EventStatus {
    /// True iff this status means the event currently accepts enrollment.
    pub fn is_open(self) -> bool {
        matches!(self, EventStatus::Engagement | EventStatus::Demande)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Previsional => "previsional",
            EventStatus::Engagement => "engagement",
            EventStatus::Demande => "demande",
            EventStatus::Cloture => "cloture",
            EventStatus::InProgress => "in_progress",
            EventStatus::Finished => "finished",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "previsional" => EventStatus::Previsional,
            "engagement" => EventStatus::Engagement,
            "demande" => EventStatus::Demande,
            "cloture" => EventStatus::Cloture,
            "in_progress" => EventStatus::InProgress,
            "finished" => EventStatus::Finished,
            "cancelled" => EventStatus::Cancelled,
            "closed" => EventStatus::Closed,
            other => return Err(CoreError::InvalidStatus(other.to_string())),
        })
    }
}

/// Subscriber plan tier, determining notification delay (spec §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
    Pro,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "free" => Plan::Free,
            "premium" => Plan::Premium,
            "pro" => Plan::Pro,
            other => return Err(CoreError::InvalidPlan(other.to_string())),
        })
    }
}

impl Default for Plan {
    /// The queue planner falls back to the free-tier delay for an unknown
    /// or missing plan (spec §4.7: "fallback `free`").
    fn default() -> Self {
        Plan::Free
    }
}

/// Outbound delivery channel (spec §4.4 — push and email only; see
/// SPEC_FULL.md §9 on the dropped Telegram/WhatsApp/SMTP iterations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Push,
    Email,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Push => write!(f, "push"),
            NotificationChannel::Email => write!(f, "email"),
        }
    }
}

/// Outcome of comparing a pre-poll and post-poll snapshot (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    StatusChanged,
    Opened,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_open_matches_spec_set() {
        assert!(EventStatus::Engagement.is_open());
        assert!(EventStatus::Demande.is_open());
        assert!(!EventStatus::Previsional.is_open());
        assert!(!EventStatus::Closed.is_open());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            EventStatus::Previsional,
            EventStatus::Engagement,
            EventStatus::Demande,
            EventStatus::Cloture,
            EventStatus::InProgress,
            EventStatus::Finished,
            EventStatus::Cancelled,
            EventStatus::Closed,
        ] {
            assert_eq!(s.as_str().parse::<EventStatus>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("bogus".parse::<EventStatus>().is_err());
    }

    #[test]
    fn plan_defaults_to_free() {
        assert_eq!(Plan::default(), Plan::Free);
    }
}
