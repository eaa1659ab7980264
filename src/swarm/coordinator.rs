//! SwarmCoordinator - drives every agent through the mission phases.
//!
//! Commands are issued agent by agent from a single task; completion is
//! awaited collectively at the barrier ([`SwarmCoordinator::wait`]), which is
//! the only place the coordinator suspends.

use anyhow::Result;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use super::agent::{Advance, Agent};
use crate::choreography::path::Choreography;
use crate::core::config::{Config, MotionConfig};
use crate::core::error::ConductorError;
use crate::drone::{MotionCommand, MotionInterface, Rgb};

/// The SwarmCoordinator owns every agent for the lifetime of the mission
#[derive(Debug)]
pub struct SwarmCoordinator {
    agents: BTreeMap<usize, Agent>,
    motion: MotionConfig,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl SwarmCoordinator {
    /// Take ownership of the agents. Indices must be unique and paths must
    /// all have the same length.
    pub fn new(agents: Vec<Agent>, config: &Config) -> Result<Self> {
        let Some(first) = agents.first() else {
            return Err(ConductorError::PathError("swarm has no agents".into()).into());
        };
        let mut seen = HashSet::new();
        if let Some(dup) = agents.iter().find(|a| !seen.insert(a.index())) {
            return Err(ConductorError::PathError(format!(
                "{} reuses agent index {}",
                dup.name(),
                dup.index()
            ))
            .into());
        }
        let expected = first.path().len();
        if let Some(odd) = agents.iter().find(|a| a.path().len() != expected) {
            return Err(ConductorError::PathError(format!(
                "{} has {} waypoints but {} has {}",
                odd.name(),
                odd.path().len(),
                first.name(),
                expected
            ))
            .into());
        }

        let agents: BTreeMap<usize, Agent> = agents.into_iter().map(|a| (a.index(), a)).collect();
        info!(
            "Swarm of {} drones ready to coordinate, {} waypoints each",
            agents.len(),
            expected
        );

        Ok(Self {
            agents,
            motion: config.motion.clone(),
            poll_interval: config.swarm.poll_interval(),
            wait_timeout: config.swarm.wait_timeout(),
        })
    }

    /// Build one agent per configured namespace, asking `connect` for each
    /// agent's motion interface.
    pub fn from_config<F>(config: &Config, mut connect: F) -> Result<Self>
    where
        F: FnMut(&str) -> Box<dyn MotionInterface>,
    {
        let choreography = Choreography::from_config(&config.choreography);
        info!(
            "Choreography: {} stages, {} waypoints per drone",
            choreography.stages().len(),
            choreography.path_length()
        );
        let agents = config
            .swarm
            .namespaces
            .iter()
            .enumerate()
            .map(|(index, namespace)| {
                Agent::new(
                    index,
                    namespace.as_str(),
                    choreography.path_for(index),
                    config.motion.clone(),
                    connect(namespace),
                )
            })
            .collect();
        Self::new(agents, config)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent(&self, index: usize) -> Option<&Agent> {
        self.agents.get(&index)
    }

    /// Waypoints per agent, taken from the first agent
    pub fn path_length(&self) -> usize {
        self.agents
            .values()
            .next()
            .map(|a| a.path().len())
            .unwrap_or(0)
    }

    /// Arm every drone and enable autonomous mode. Every drone is tried even
    /// after a failure; the result is true only if all succeeded.
    pub async fn get_ready(&self) -> bool {
        let mut success = true;
        for agent in self.agents.values() {
            let ready = agent.get_ready().await;
            success = success && ready;
        }
        if success {
            info!("All drones armed and in autonomous mode");
        } else {
            warn!("Some drones failed to get ready");
        }
        success
    }

    pub async fn takeoff(&mut self) -> Result<()> {
        info!("Taking off to {:.2} m", self.motion.takeoff_altitude);
        let command = MotionCommand::takeoff(&self.motion);
        for agent in self.agents.values_mut() {
            if let Err(e) = agent.execute(command.clone()).await {
                warn!("{:#}", e);
            }
            agent.set_indicator_color(Rgb::GREEN).await;
        }
        self.wait().await
    }

    /// Fly the whole choreography once from the first waypoint, one barrier
    /// per waypoint. Returns the number of rounds flown.
    pub async fn play_choreography(&mut self) -> Result<usize> {
        for agent in self.agents.values_mut() {
            agent.reset();
        }

        let rounds = self.path_length();
        info!("Playing choreography: {} rounds", rounds);
        for round in 0..rounds {
            for agent in self.agents.values_mut() {
                match agent.advance().await {
                    Ok(Advance::Issued(_)) => {}
                    Ok(Advance::Exhausted) => {
                        warn!("{}: no waypoint left for round {}", agent.name(), round + 1)
                    }
                    Err(e) => warn!("{:#}", e),
                }
            }
            self.wait().await?;
            debug!("Round {}/{} complete", round + 1, rounds);
        }
        info!("Choreography complete");
        Ok(rounds)
    }

    pub async fn land(&mut self) -> Result<()> {
        info!("Landing");
        let command = MotionCommand::land(&self.motion);
        for agent in self.agents.values_mut() {
            if let Err(e) = agent.execute(command.clone()).await {
                warn!("{:#}", e);
            }
        }
        self.wait().await
    }

    /// Block until one polling pass observes every agent finished.
    ///
    /// An agent that has never been commanded counts as not finished, so a
    /// swarm with such an agent only leaves through the timeout, if any. A
    /// command the interface rejected still counts as commanded.
    pub async fn wait(&self) -> Result<()> {
        let started = Instant::now();
        loop {
            let reached = join_all(self.agents.values().map(|a| a.goal_reached())).await;
            if reached.iter().all(|&r| r) {
                debug!("Barrier released after {:?}", started.elapsed());
                return Ok(());
            }

            if let Some(limit) = self.wait_timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    let pending = self
                        .agents
                        .values()
                        .zip(&reached)
                        .filter(|(_, r)| !**r)
                        .map(|(a, _)| a.name().to_string())
                        .collect();
                    return Err(ConductorError::BarrierTimeout {
                        pending,
                        waited_ms: waited.as_millis() as u64,
                    }
                    .into());
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Release every drone's interface. The coordinator is gone afterwards.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down swarm");
        let mut failures = 0;
        for agent in self.agents.into_values() {
            if let Err(e) = agent.release().await {
                warn!("{:#}", e);
                failures += 1;
            }
        }
        if failures > 0 {
            warn!("{} drones did not release cleanly", failures);
        }
        Ok(())
    }
}
