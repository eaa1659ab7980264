use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::choreography::formation::{FormationSpec, Point2D};
use crate::core::error::ConductorError;
use crate::drone::YawMode;

/// Top-level configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Swarm membership and barrier configuration
    pub swarm: SwarmConfig,

    /// Motion command parameters
    pub motion: MotionConfig,

    /// Simulation runtime configuration
    pub simulation: SimulationConfig,

    /// Formation stages flown by the swarm
    pub choreography: ChoreographyConfig,
}

/// Swarm configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SwarmConfig {
    /// Drone namespaces, in ordinal order
    pub namespaces: Vec<String>,

    /// Sleep between two barrier passes in milliseconds
    pub poll_interval_ms: u64,

    /// Give up waiting on the barrier after this many milliseconds
    pub wait_timeout_ms: Option<u64>,
}

impl SwarmConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            namespaces: vec!["drone0".into(), "drone1".into(), "drone2".into()],
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: None,
        }
    }
}

/// Motion command configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Takeoff target altitude in meters
    pub takeoff_altitude: f64,

    /// Takeoff vertical speed in m/s
    pub takeoff_speed: f64,

    /// Go-to speed in m/s
    pub speed: f64,

    /// Landing speed in m/s
    pub land_speed: f64,

    /// Heading policy while flying between waypoints
    pub yaw_mode: YawMode,

    /// Heading in degrees, for `fixed_yaw`
    pub yaw_angle: Option<f64>,

    /// Reference frame of the waypoints
    pub frame_id: String,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            takeoff_altitude: 1.0,
            takeoff_speed: 0.7,
            speed: 0.5,
            land_speed: 0.4,
            yaw_mode: YawMode::PathFacing,
            yaw_angle: None,
            frame_id: "earth".to_string(),
        }
    }
}

/// Simulation runtime configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run on the simulated clock
    pub use_sim_time: bool,

    /// Simulated seconds per wall-clock second when `use_sim_time` is set
    pub time_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            use_sim_time: true,
            time_scale: 1.0,
        }
    }
}

/// Choreography configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChoreographyConfig {
    pub stages: Vec<StageConfig>,
    pub closing: ClosingConfig,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            stages: vec![StageConfig {
                altitude: 1.0,
                formation: FormationSpec::Triangle {
                    base: 2.0,
                    height: 2.0,
                    orientation: 0.0,
                    center: Point2D::ORIGIN,
                },
            }],
            closing: ClosingConfig::default(),
        }
    }
}

/// A single formation stage
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StageConfig {
    pub altitude: f64,
    pub formation: FormationSpec,
}

/// Closing line every agent ends on
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClosingConfig {
    pub length: f64,
    pub orientation: f64,
    pub center: Point2D,
    pub altitude: f64,
}

impl Default for ClosingConfig {
    fn default() -> Self {
        Self {
            length: 2.0,
            orientation: 180.0,
            center: Point2D::ORIGIN,
            altitude: 1.0,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&config_text)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> anyhow::Error { ConductorError::ConfigError(msg).into() };

        if self.swarm.namespaces.is_empty() {
            return Err(invalid("at least one drone namespace is required".into()));
        }
        let mut seen = HashSet::new();
        for namespace in &self.swarm.namespaces {
            if namespace.trim().is_empty() {
                return Err(invalid("drone namespaces must not be blank".into()));
            }
            if !seen.insert(namespace.as_str()) {
                return Err(invalid(format!("duplicate drone namespace '{}'", namespace)));
            }
        }
        if self.swarm.poll_interval_ms == 0 {
            return Err(invalid("swarm.poll_interval_ms must be positive".into()));
        }

        let speeds = [
            ("motion.takeoff_speed", self.motion.takeoff_speed),
            ("motion.speed", self.motion.speed),
            ("motion.land_speed", self.motion.land_speed),
        ];
        for (name, value) in speeds {
            if value.is_nan() || value <= 0.0 {
                return Err(invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        let time_scale = self.simulation.time_scale;
        if time_scale.is_nan() || time_scale <= 0.0 {
            return Err(invalid(format!(
                "simulation.time_scale must be positive, got {}",
                self.simulation.time_scale
            )));
        }

        Ok(())
    }
}
