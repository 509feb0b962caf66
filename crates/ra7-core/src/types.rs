//! Core types: Address, ActionRecord, Verdict, Node, Qubit, etc.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Addresses ──

/// 20-byte account address, rendered as `0x` + 40 hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| anyhow::anyhow!("invalid address {:?}: {}", s, e))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow::anyhow!("address must be 20 bytes, got {}", v.len()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Kernel ──

/// One evaluated action, as persisted in the memory file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub score: f64,
    pub geohash: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    KillSwitch,
    ClockUnverified,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::KillSwitch => write!(f, "kill-switch active"),
            AbortReason::ClockUnverified => write!(f, "NTP spoof detected"),
        }
    }
}

/// Outcome of `Kernel::evolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    Approved { action: String, score: f64 },
    Rejected { action: String, score: f64 },
    Aborted { action: String, reason: AbortReason },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Approved { .. })
    }

    pub fn label(&self) -> &'static str {
        if self.passed() {
            "PASSED"
        } else {
            "BLOCKED"
        }
    }
}

// ── Birth ritual ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub gps_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthCertificate {
    pub birth_hash: String,
    pub verified_by: Vec<u32>,
    pub morse: String,
}

// ── Dialogue ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub initial_concept: String,
    pub final_statement: String,
    pub rounds: u32,
}

// ── Consciousness qubits ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qubit {
    pub action: String,
    pub integration_level: f64,
    pub self_model_delta: f64,
    pub causal_loop_hash: String,
}
