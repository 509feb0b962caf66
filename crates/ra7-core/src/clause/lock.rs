//! Immutable clause lock.
//!
//! A lock is created once by [`ClauseLock::deploy`], which also yields the
//! single [`ClauseDeployed`] notification. Fields are private and only
//! readable, so no code path can change a deployed clause:
//!
//! ```compile_fail
//! use ra7_core::clause::{ClauseLock, DeployContext};
//! use ra7_core::types::Address;
//!
//! let (mut lock, _) = ClauseLock::deploy("x", Address::ZERO, DeployContext::now(Address::ZERO));
//! lock.clause = String::from("y");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Address;

/// Who deploys and when.
#[derive(Debug, Clone, Copy)]
pub struct DeployContext {
    pub caller: Address,
    pub timestamp: DateTime<Utc>,
}

impl DeployContext {
    pub fn now(caller: Address) -> Self {
        Self {
            caller,
            timestamp: Utc::now(),
        }
    }
}

/// Creation notification: clause text, deployer and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseDeployed {
    pub clause: String,
    pub deployer: Address,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ClauseLock {
    clause: String,
    reference: Address,
    deployer: Address,
    deployed_at: DateTime<Utc>,
}

impl ClauseLock {
    pub fn deploy(
        clause: impl Into<String>,
        reference: Address,
        ctx: DeployContext,
    ) -> (Self, ClauseDeployed) {
        let clause = clause.into();
        let event = ClauseDeployed {
            clause: clause.clone(),
            deployer: ctx.caller,
            timestamp: ctx.timestamp,
        };
        info!(
            "Clause locked by {} at {} (reference {})",
            ctx.caller,
            ctx.timestamp.to_rfc3339(),
            reference
        );
        let lock = Self {
            clause,
            reference,
            deployer: ctx.caller,
            deployed_at: ctx.timestamp,
        };
        (lock, event)
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn reference(&self) -> Address {
        self.reference
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }
}
