//! Boundary to the flight stack that actually moves a drone.

pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::choreography::formation::Point3D;
use crate::core::config::MotionConfig;

pub use simulated::{SimulatedDrone, SimulationContext};

/// Status of the behavior a drone is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorStatus {
    Idle,
    Running,
    Paused,
}

/// Heading policy for go-to commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawMode {
    PathFacing,
    FixedYaw,
    KeepYaw,
}

/// A motion command the flight stack runs in the background
#[derive(Debug, Clone, PartialEq)]
pub enum MotionCommand {
    Takeoff {
        altitude: f64,
        speed: f64,
    },
    GoTo {
        target: Point3D,
        speed: f64,
        yaw_mode: YawMode,
        yaw_angle: Option<f64>,
        frame_id: String,
    },
    Land {
        speed: f64,
    },
}

impl MotionCommand {
    pub fn takeoff(motion: &MotionConfig) -> Self {
        MotionCommand::Takeoff {
            altitude: motion.takeoff_altitude,
            speed: motion.takeoff_speed,
        }
    }

    pub fn go_to(target: Point3D, motion: &MotionConfig) -> Self {
        MotionCommand::GoTo {
            target,
            speed: motion.speed,
            yaw_mode: motion.yaw_mode,
            yaw_angle: motion.yaw_angle,
            frame_id: motion.frame_id.clone(),
        }
    }

    pub fn land(motion: &MotionConfig) -> Self {
        MotionCommand::Land {
            speed: motion.land_speed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MotionCommand::Takeoff { .. } => "takeoff",
            MotionCommand::GoTo { .. } => "go_to",
            MotionCommand::Land { .. } => "land",
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionCommand::Takeoff { altitude, speed } => {
                write!(f, "takeoff to {:.2} m at {:.2} m/s", altitude, speed)
            }
            MotionCommand::GoTo { target, speed, .. } => write!(
                f,
                "go_to ({:.2}, {:.2}, {:.2}) at {:.2} m/s",
                target.x, target.y, target.z, speed
            ),
            MotionCommand::Land { speed } => write!(f, "land at {:.2} m/s", speed),
        }
    }
}

/// LED indicator colour, 0-255 per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self::new(rng.random(), rng.random(), rng.random())
    }

    /// Channels scaled to 0.0-1.0
    pub fn to_unit(self) -> [f32; 3] {
        [self.r, self.g, self.b].map(|c| c as f32 / 255.0)
    }
}

/// Per-drone motion interface.
///
/// Commands are fire-and-forget: `issue` returns as soon as the command is
/// accepted and `status` reports its progress. Once `issue` returns `Ok`,
/// `status` must already describe the new command.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MotionInterface: Send + Sync {
    /// Arm the motors
    async fn arm(&self) -> bool;

    /// Hand control over to autonomous (offboard) commands
    async fn enable_autonomous_mode(&self) -> bool;

    /// Start a command without waiting for it to finish
    async fn issue(&self, command: MotionCommand) -> Result<()>;

    /// Status of the most recent command
    async fn status(&self) -> BehaviorStatus;

    async fn set_indicator_color(&self, color: Rgb);

    /// Tear the interface down; it accepts nothing afterwards
    async fn release(&self) -> Result<()>;
}
