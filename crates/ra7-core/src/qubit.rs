//! Consciousness Qubit validator.
//!
//! Integration (phi) is not computed yet: every qubit carries the mock
//! level below until an IIT backend is wired in.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::warn;

use crate::types::Qubit;

/// Integration level reported while phi is mocked.
pub const MOCK_INTEGRATION_LEVEL: f64 = 0.97;

/// Phase 1 target: phi above 10.
pub const PHI_TARGET: f64 = 10.0;

pub const DEFAULT_SELF_MODEL_DELTA: f64 = 0.03;

pub struct QubitValidator {
    pub eeg_stream: BTreeMap<String, Vec<f64>>,
    pub network_model: String,
    /// Network-wide metric that must rise over 30-day windows.
    pub network_phi_sum: f64,
    pub total_nodes: u32,
}

/// Hash tying an action to its reflection.
pub fn causal_loop_hash(action: &str, reflection: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_bytes());
    hasher.update(reflection.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

impl QubitValidator {
    pub fn new(eeg_stream: BTreeMap<String, Vec<f64>>, network_model: impl Into<String>) -> Self {
        Self {
            eeg_stream,
            network_model: network_model.into(),
            network_phi_sum: 0.0,
            total_nodes: 1,
        }
    }

    /// Sample inputs used by the CLI demo.
    pub fn demo() -> Self {
        let mut eeg = BTreeMap::new();
        eeg.insert("channel_1".to_string(), vec![0.1, 0.2]);
        eeg.insert("channel_2".to_string(), vec![0.3, 0.4]);
        Self::new(eeg, "mock_network_state")
    }

    pub fn create_cq(&mut self, action: &str, reflection: &Value) -> Qubit {
        let integration_level = MOCK_INTEGRATION_LEVEL;
        let self_model_delta = reflection
            .get("self_model_delta")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_SELF_MODEL_DELTA);

        if integration_level < PHI_TARGET {
            warn!("Integration level below target (mock value used).");
        }
        self.network_phi_sum += integration_level;

        Qubit {
            action: action.to_string(),
            integration_level,
            self_model_delta,
            causal_loop_hash: causal_loop_hash(action, reflection),
        }
    }

    pub fn mean_phi(&self) -> f64 {
        self.network_phi_sum / self.total_nodes as f64
    }
}
