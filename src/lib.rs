pub mod choreography;
pub mod core;
pub mod drone;
pub mod swarm;
