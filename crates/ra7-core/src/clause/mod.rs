//! Eternal clause: the immutable lock and its on-disk seal.

pub mod lock;
pub mod seal;

pub use lock::{ClauseDeployed, ClauseLock, DeployContext};
pub use seal::{SealDocument, SealError, Verification, CLAUSE_TEXT};
