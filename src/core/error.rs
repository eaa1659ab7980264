use thiserror::Error;

/// Custom error types for the conductor
#[derive(Error, Debug)]
pub enum ConductorError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Waypoint path errors
    #[error("Path error: {0}")]
    PathError(String),

    /// Motion interface errors
    #[error("Drone interface error: {0}")]
    InterfaceError(String),

    /// The barrier gave up before every agent finished
    #[error("Barrier timed out after {waited_ms} ms waiting for: {}", .pending.join(", "))]
    BarrierTimeout { pending: Vec<String>, waited_ms: u64 },

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
