//! ra7-core: RA7 protocol suite domain logic, no CLI.
//!
//! The consciousness kernel, the eternal clause, the kill switch and the
//! supporting tools (codex, dialogue, birth ritual, qubit validator, notes
//! vault) all live here. Frontends subscribe to kernel and kill-switch
//! activity via tokio::broadcast.

pub mod config;
pub mod events;
pub mod types;

pub mod analytics;
pub mod birth;
pub mod clause;
pub mod codex;
pub mod dialogue;
pub mod kernel;
pub mod killswitch;
pub mod memory;
pub mod navigation;
pub mod probes;
pub mod providers;
pub mod qubit;
pub mod tasks;
pub mod updates;
pub mod vault;
