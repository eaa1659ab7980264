//! Per-agent waypoint assignment.
//!
//! Every agent sees the same formations, rotated by its ordinal, so that at
//! any step of a stage agents with distinct ordinals (mod 3) sit on distinct
//! vertices and the swarm as a whole chases itself around the shape.

use serde::Serialize;

use super::formation::{line_formation, Formation, Point3D};
use crate::core::config::{ChoreographyConfig, ClosingConfig, StageConfig};

/// Ordered, non-empty list of waypoints owned by a single agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WaypointSequence(Vec<Point3D>);

impl WaypointSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for sequences built by [`assign_path`]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point3D> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3D> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Point3D] {
        &self.0
    }
}

/// One choreography stage: a formation flown at a fixed altitude
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub formation: Formation,
    pub altitude: f64,
}

impl Stage {
    pub fn new(formation: Formation, altitude: f64) -> Self {
        Self {
            formation,
            altitude,
        }
    }
}

impl From<&StageConfig> for Stage {
    fn from(config: &StageConfig) -> Self {
        Self::new(config.formation.vertices(), config.altitude)
    }
}

impl From<&ClosingConfig> for Stage {
    fn from(config: &ClosingConfig) -> Self {
        Self::new(
            line_formation(config.length, config.orientation, config.center),
            config.altitude,
        )
    }
}

/// The three vertices of `formation`, starting at `agent_index` and wrapping
/// around, each lifted to `altitude`.
pub fn cyclic_window(formation: &Formation, agent_index: usize, altitude: f64) -> [Point3D; 3] {
    std::array::from_fn(|step| formation[(agent_index + step) % 3].at_altitude(altitude))
}

/// Build an agent's full path: the cyclic window of every stage in order,
/// followed by the agent's own vertex of the closing formation.
pub fn assign_path(agent_index: usize, stages: &[Stage], closing: &Stage) -> WaypointSequence {
    let mut waypoints: Vec<Point3D> = stages
        .iter()
        .flat_map(|stage| cyclic_window(&stage.formation, agent_index, stage.altitude))
        .collect();
    waypoints.push(closing.formation[agent_index % 3].at_altitude(closing.altitude));
    WaypointSequence(waypoints)
}

/// Waypoints of one agent, for printing a flight plan
#[derive(Debug, Clone, Serialize)]
pub struct AgentPlan {
    pub index: usize,
    pub namespace: String,
    pub waypoints: WaypointSequence,
}

/// A complete choreography: ordered stages plus the closing line
#[derive(Debug, Clone, PartialEq)]
pub struct Choreography {
    stages: Vec<Stage>,
    closing: Stage,
}

impl Choreography {
    pub fn new(stages: Vec<Stage>, closing: Stage) -> Self {
        Self { stages, closing }
    }

    pub fn from_config(config: &ChoreographyConfig) -> Self {
        Self::new(
            config.stages.iter().map(Stage::from).collect(),
            Stage::from(&config.closing),
        )
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of waypoints every agent flies
    pub fn path_length(&self) -> usize {
        self.stages.len() * 3 + 1
    }

    pub fn path_for(&self, agent_index: usize) -> WaypointSequence {
        assign_path(agent_index, &self.stages, &self.closing)
    }

    pub fn plan<S: AsRef<str>>(&self, namespaces: &[S]) -> Vec<AgentPlan> {
        namespaces
            .iter()
            .enumerate()
            .map(|(index, namespace)| AgentPlan {
                index,
                namespace: namespace.as_ref().to_string(),
                waypoints: self.path_for(index),
            })
            .collect()
    }
}

impl Default for Choreography {
    fn default() -> Self {
        Self::from_config(&ChoreographyConfig::default())
    }
}
