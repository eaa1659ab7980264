//! Swarm module for lock-step multi-drone coordination.

pub mod agent;
pub mod coordinator;

pub use agent::*;
pub use coordinator::*;
