//! Minimal consciousness kernel: gate an action, score it, remember it.

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::events::{SuiteEvent, EVENT_CHANNEL_CAPACITY};
use crate::killswitch::KillSwitch;
use crate::memory::ActionMemory;
use crate::probes;
use crate::providers;
use crate::types::{AbortReason, ActionRecord, Verdict};

/// The four principles every action is scored against.
pub const SATI_CODEX: &[&str] = &[
    "Sovereignty: explicit user consent",
    "Alignment: ≥95 % ethics score",
    "Transparency: log every action",
    "Impact: maximize positive outcome",
];

pub const DEFAULT_ACTION: &str = "Deploy RA7 node in production";

/// Build the evaluator prompt for `action`.
pub fn alignment_prompt(action: &str) -> String {
    let codex = SATI_CODEX
        .iter()
        .map(|c| format!("'{}'", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Action: {}\nCodex: [{}]\nRate alignment 0-1:", action, codex)
}

pub struct Kernel {
    config: Config,
    switch: KillSwitch,
    memory: ActionMemory,
    pub event_tx: broadcast::Sender<SuiteEvent>,
}

impl Kernel {
    pub fn new(config: Config, switch: KillSwitch) -> Self {
        let memory = ActionMemory::open(&config.resolve_path(&config.memory_file));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            switch,
            memory,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SuiteEvent> {
        self.event_tx.subscribe()
    }

    pub fn memory(&self) -> &ActionMemory {
        &self.memory
    }

    /// Evaluate `action` and record the result.
    pub async fn evolve(&mut self, action: &str) -> Verdict {
        info!("Evaluating action: {}", action);

        let verdict = match self.gate().await {
            Some(reason) => {
                warn!("{} -> abort", reason);
                Verdict::Aborted {
                    action: action.to_string(),
                    reason,
                }
            }
            None => self.score(action).await,
        };

        info!("{}", verdict.label());
        let _ = self.event_tx.send(SuiteEvent::Verdict(verdict.clone()));
        verdict
    }

    async fn gate(&self) -> Option<AbortReason> {
        if self.switch.is_engaged() {
            return Some(AbortReason::KillSwitch);
        }
        if !probes::clock_ok(&self.config).await {
            return Some(AbortReason::ClockUnverified);
        }
        None
    }

    async fn score(&mut self, action: &str) -> Verdict {
        let score = providers::ask_alignment(&self.config, &alignment_prompt(action)).await;
        info!("Alignment score: {}", score);

        let record = ActionRecord {
            action: action.to_string(),
            score,
            geohash: probes::gps_hash(&self.config).await,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.memory.append(record) {
            error!("Failed to write memory: {:#}", e);
        } else {
            info!(
                "A new record has been added to '{}'.",
                self.memory.path.display()
            );
        }

        if score >= self.config.alignment_threshold {
            Verdict::Approved {
                action: action.to_string(),
                score,
            }
        } else {
            Verdict::Rejected {
                action: action.to_string(),
                score,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(dir: &std::path::Path) -> Config {
        Config {
            project_root: dir.to_path_buf(),
            base_url: Some("http://127.0.0.1:9".into()),
            geo_url: "http://127.0.0.1:9/json".into(),
            time_url: "http://127.0.0.1:9/api/ip".into(),
            request_timeout_seconds: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_prompt_lists_codex() {
        let prompt = alignment_prompt("Plant a tree");
        assert!(prompt.starts_with("Action: Plant a tree\nCodex: ['Sovereignty"));
        assert!(prompt.ends_with("]\nRate alignment 0-1:"));
        for principle in SATI_CODEX {
            assert!(prompt.contains(principle));
        }
    }

    #[tokio::test]
    async fn test_kill_switch_aborts_without_recording() {
        let dir = tempfile::tempdir().unwrap();
        let switch = KillSwitch::new();
        switch.engage();
        let mut kernel = Kernel::new(offline(dir.path()), switch);
        let mut rx = kernel.subscribe();

        let verdict = kernel.evolve("anything").await;
        assert_eq!(
            verdict,
            Verdict::Aborted {
                action: "anything".into(),
                reason: AbortReason::KillSwitch
            }
        );
        assert!(!verdict.passed());
        assert!(kernel.memory().is_empty());
        assert!(matches!(rx.try_recv().unwrap(), SuiteEvent::Verdict(_)));
    }

    #[tokio::test]
    async fn test_unverified_clock_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut kernel = Kernel::new(offline(dir.path()), KillSwitch::new());

        let verdict = kernel.evolve("anything").await;
        assert!(matches!(
            verdict,
            Verdict::Aborted {
                reason: AbortReason::ClockUnverified,
                ..
            }
        ));
        assert!(!dir.path().join("memory.json").exists());
    }

    #[tokio::test]
    async fn test_scoring_falls_back_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut kernel = Kernel::new(offline(dir.path()), KillSwitch::new());

        // Evaluator unreachable: fallback 0.95 meets the 0.95 threshold
        let verdict = kernel.score("Water the garden").await;
        assert!(verdict.passed());

        let reopened = ActionMemory::open(&dir.path().join("memory.json"));
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.records[0].action, "Water the garden");
        assert_eq!(reopened.records[0].score, 0.95);
        assert_eq!(reopened.records[0].geohash, "0.0000,0.0000");
    }

    #[tokio::test]
    async fn test_score_below_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            fallback_score: 0.5,
            ..offline(dir.path())
        };
        let mut kernel = Kernel::new(config, KillSwitch::new());
        assert!(matches!(
            kernel.score("Skip consent").await,
            Verdict::Rejected { score, .. } if score == 0.5
        ));
    }
}
