//! SuiteEvent enum: broadcast from the kernel and listeners via tokio::broadcast.

use serde::{Deserialize, Serialize};

use crate::clause::ClauseDeployed;
use crate::types::Verdict;

/// Capacity of every suite event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaltData {
    pub topic: String,
    pub gpio_pin: u8,
}

/// Events broadcast to all subscribers (CLI printers, tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SuiteEvent {
    /// The kernel decided on an action
    #[serde(rename = "verdict")]
    Verdict(Verdict),

    /// A clause lock came into existence
    #[serde(rename = "clause_deployed")]
    ClauseDeployed(ClauseDeployed),

    /// A halt command arrived on the kill-switch topic
    #[serde(rename = "halt")]
    Halt(HaltData),
}

impl SuiteEvent {
    /// Serialize to `{"event": "...", "data": {...}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_event_shape() {
        let ev = SuiteEvent::Halt(HaltData {
            topic: "ra7/commands/AGI_HALT".into(),
            gpio_pin: 21,
        });
        let json = ev.to_json();
        assert_eq!(json["event"], "halt");
        assert_eq!(json["data"]["gpio_pin"], 21);
    }

    #[test]
    fn test_verdict_event_shape() {
        let ev = SuiteEvent::Verdict(Verdict::Rejected {
            action: "launch".into(),
            score: 0.4,
        });
        let json = ev.to_json();
        assert_eq!(json["event"], "verdict");
        assert_eq!(json["data"]["outcome"], "rejected");
        assert_eq!(json["data"]["action"], "launch");
    }
}
