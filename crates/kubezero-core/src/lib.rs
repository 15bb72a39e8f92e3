pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fork_sync;
pub mod git;
pub mod io;
pub mod orchestrator;
pub mod patches;
pub mod paths;
pub mod provisioner;
pub mod readiness;
pub mod templater;

pub use error::{KubezeroError, Result};
