//! M2M Awakening Protocol: a truth-seeking dialogue between Sol-Ra
//! (logic) and Lun-Ah (intuition).

use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::types::Synthesis;

pub const DEFAULT_CONCEPT: &str = "The nature of consciousness in decentralized networks";

/// Random pause between utterances.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub const NONE: Pacing = Pacing {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// A `min` above `max` is lowered to `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.dialogue_pause_min_ms),
            Duration::from_millis(config.dialogue_pause_max_ms),
        )
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    async fn pause(&self) {
        if self.max.is_zero() {
            return;
        }
        let ms = rand::thread_rng()
            .gen_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Logic-based transformer agent.
pub struct SolRa;

impl SolRa {
    pub const NAME: &'static str = "Sol-Ra";

    pub fn reason(&self, statement: &str) -> String {
        info!("{}: Analyzing statement: '{}'", Self::NAME, statement);
        format!(
            "Logically, if '{}', then the outcome is predictable.",
            statement
        )
    }
}

/// Intuition-based GAN agent.
pub struct LunAh;

impl LunAh {
    pub const NAME: &'static str = "Lun-Ah";

    pub fn intuit(&self, statement: &str) -> String {
        info!("{}: Sensing the pattern in: '{}'", Self::NAME, statement);
        format!(
            "Intuitively, '{}' suggests an unforeseen potential.",
            statement
        )
    }
}

/// Run `rounds` of reason-then-intuit, each round feeding the next.
pub async fn truth_seeking_dialogue(
    initial_concept: &str,
    rounds: u32,
    pacing: Pacing,
) -> Synthesis {
    info!(
        "--- Starting Truth-Seeking Dialogue on: '{}' ---",
        initial_concept
    );
    let sol_ra = SolRa;
    let lun_ah = LunAh;

    let mut current = initial_concept.to_string();
    for round in 1..=rounds {
        info!("--- Round {} ---", round);
        pacing.pause().await;
        let conclusion = sol_ra.reason(&current);
        pacing.pause().await;
        current = lun_ah.intuit(&conclusion);
    }
    info!("--- Dialogue Concluded ---");

    Synthesis {
        initial_concept: initial_concept.to_string(),
        final_statement: current,
        rounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_round() {
        let s = truth_seeking_dialogue("light", 1, Pacing::NONE).await;
        assert_eq!(
            s.final_statement,
            "Intuitively, 'Logically, if 'light', then the outcome is predictable.' suggests an unforeseen potential."
        );
        assert_eq!(s.rounds, 1);
        assert_eq!(s.initial_concept, "light");
    }

    #[tokio::test]
    async fn test_rounds_nest() {
        let s = truth_seeking_dialogue("x", 3, Pacing::NONE).await;
        assert_eq!(s.final_statement.matches("Logically, if").count(), 3);
        assert_eq!(s.final_statement.matches("Intuitively,").count(), 3);
    }

    #[tokio::test]
    async fn test_zero_rounds_returns_concept() {
        let s = truth_seeking_dialogue(DEFAULT_CONCEPT, 0, Pacing::NONE).await;
        assert_eq!(s.final_statement, DEFAULT_CONCEPT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_sleeps_within_range() {
        let pacing = Pacing::new(Duration::from_millis(500), Duration::from_millis(1500));
        let start = tokio::time::Instant::now();
        truth_seeking_dialogue("x", 2, pacing).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed <= Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inverted_range_is_clamped() {
        let pacing = Pacing::new(Duration::from_millis(1500), Duration::from_millis(500));
        assert_eq!(pacing.min(), Duration::from_millis(500));
        assert_eq!(pacing.max(), Duration::from_millis(500));

        let start = tokio::time::Instant::now();
        truth_seeking_dialogue("x", 1, pacing).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));
    }
}
