//! A single swarm member: its waypoint path, a cursor into it, and the
//! motion interface that flies it.

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::choreography::formation::Point3D;
use crate::choreography::path::WaypointSequence;
use crate::core::config::MotionConfig;
use crate::drone::{BehaviorStatus, MotionCommand, MotionInterface, Rgb};

/// Progress of the agent's most recent command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// No command issued yet
    None,
    Running,
    /// The interface reports idle after a command was issued
    Finished,
}

/// Outcome of [`Agent::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    /// The waypoint now being flown to
    Issued(Point3D),
    /// The cursor is past the end of the path; nothing was issued
    Exhausted,
}

pub struct Agent {
    index: usize,
    name: String,
    path: WaypointSequence,
    cursor: usize,
    current: Option<MotionCommand>,
    motion: MotionConfig,
    interface: Box<dyn MotionInterface>,
}

impl Agent {
    pub fn new(
        index: usize,
        name: impl Into<String>,
        path: WaypointSequence,
        motion: MotionConfig,
        interface: Box<dyn MotionInterface>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            path,
            cursor: 0,
            current: None,
            motion,
            interface,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &WaypointSequence {
        &self.path
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Last command handed to the interface, whether or not it was accepted
    pub fn current_command(&self) -> Option<&MotionCommand> {
        self.current.as_ref()
    }

    /// Rewind to the first waypoint
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Arm and enable autonomous mode. Both are attempted even if arming fails.
    pub async fn get_ready(&self) -> bool {
        let armed = self.interface.arm().await;
        let autonomous = self.interface.enable_autonomous_mode().await;
        if !armed {
            warn!("{}: arming failed", self.name);
        }
        if !autonomous {
            warn!("{}: could not enable autonomous mode", self.name);
        }
        armed && autonomous
    }

    /// Start `command` and track it. The command is tracked even when the
    /// interface rejects it; completion is judged from the interface status.
    pub async fn execute(&mut self, command: MotionCommand) -> Result<()> {
        self.current = Some(command.clone());
        self.interface
            .issue(command.clone())
            .await
            .with_context(|| format!("{}: failed to {}", self.name, command.name()))
    }

    /// Fly to the waypoint under the cursor and move the cursor on. The cursor
    /// moves even if the interface rejects the waypoint.
    pub async fn advance(&mut self) -> Result<Advance> {
        let Some(&waypoint) = self.path.get(self.cursor) else {
            debug!("{}: path exhausted at waypoint {}", self.name, self.cursor);
            return Ok(Advance::Exhausted);
        };

        self.cursor += 1;
        self.execute(MotionCommand::go_to(waypoint, &self.motion)).await?;
        self.interface.set_indicator_color(Rgb::random()).await;

        debug!(
            "{}: waypoint {}/{} -> ({:.2}, {:.2}, {:.2})",
            self.name,
            self.cursor,
            self.path.len(),
            waypoint.x,
            waypoint.y,
            waypoint.z
        );
        Ok(Advance::Issued(waypoint))
    }

    pub async fn command_state(&self) -> CommandState {
        if self.current.is_none() {
            return CommandState::None;
        }
        match self.interface.status().await {
            BehaviorStatus::Idle => CommandState::Finished,
            BehaviorStatus::Running | BehaviorStatus::Paused => CommandState::Running,
        }
    }

    /// True only once an issued command has finished; an agent that was never
    /// commanded has not reached anything.
    pub async fn goal_reached(&self) -> bool {
        self.command_state().await == CommandState::Finished
    }

    pub async fn set_indicator_color(&self, color: Rgb) {
        self.interface.set_indicator_color(color).await;
    }

    /// Release the motion interface
    pub async fn release(self) -> Result<()> {
        self.interface
            .release()
            .await
            .with_context(|| format!("{}: failed to release interface", self.name))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("cursor", &self.cursor)
            .field("path_len", &self.path.len())
            .field("current", &self.current)
            .finish()
    }
}
