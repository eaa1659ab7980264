//! Formation geometry and per-agent path assignment.

pub mod formation;
pub mod path;

pub use formation::*;
pub use path::*;
