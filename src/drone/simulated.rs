//! In-process simulated flight stack.
//!
//! A [`SimulationContext`] stands in for the middleware runtime: it is
//! created once, hands out one [`SimulatedDrone`] per namespace and is torn
//! down once at the end of the mission. Motion commands run as background
//! tasks owned by the context.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use super::{BehaviorStatus, MotionCommand, MotionInterface, Rgb};
use crate::choreography::formation::Point3D;
use crate::core::config::SimulationConfig;
use crate::core::error::ConductorError;

/// Handle to the simulation runtime, cheap to clone
#[derive(Clone)]
pub struct SimulationContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    use_sim_time: bool,
    time_scale: f64,
    active: AtomicBool,
    tasks: Mutex<JoinSet<()>>,
}

impl SimulationContext {
    pub fn init(config: &SimulationConfig) -> Self {
        info!(
            "Initializing simulation context (sim time: {}, time scale: {})",
            config.use_sim_time, config.time_scale
        );
        Self {
            inner: Arc::new(ContextInner {
                use_sim_time: config.use_sim_time,
                time_scale: config.time_scale,
                active: AtomicBool::new(true),
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Create the motion interface for one drone
    pub fn drone(&self, namespace: &str) -> SimulatedDrone {
        SimulatedDrone {
            namespace: namespace.to_string(),
            context: self.clone(),
            state: Arc::new(DroneState::default()),
        }
    }

    /// Wall-clock time needed to cover `distance` meters at `speed` m/s
    pub fn travel_time(&self, distance: f64, speed: f64) -> Duration {
        let mut seconds = distance / speed.max(f64::EPSILON);
        if self.inner.use_sim_time {
            seconds /= self.inner.time_scale;
        }
        // saturate when the scaled time does not fit in a Duration
        Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    async fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.inner.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Abort every in-flight motion and refuse further commands
    pub async fn shutdown(&self) {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.inner.tasks.lock().await.shutdown().await;
        info!("Simulation context shut down");
    }
}

struct DroneState {
    status: AtomicU8,
    armed: AtomicBool,
    offboard: AtomicBool,
    released: AtomicBool,
    /// Bumped on every command; a motion task only lands its result if it is
    /// still the latest one.
    generation: AtomicU64,
    position: RwLock<Point3D>,
    color: RwLock<Rgb>,
}

impl Default for DroneState {
    fn default() -> Self {
        Self {
            status: AtomicU8::new(encode_status(BehaviorStatus::Idle)),
            armed: AtomicBool::new(false),
            offboard: AtomicBool::new(false),
            released: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            position: RwLock::new(Point3D::default()),
            color: RwLock::new(Rgb::default()),
        }
    }
}

impl DroneState {
    fn set_status(&self, status: BehaviorStatus) {
        self.status.store(encode_status(status), Ordering::Release);
    }

    fn status(&self) -> BehaviorStatus {
        decode_status(self.status.load(Ordering::Acquire))
    }
}

fn encode_status(status: BehaviorStatus) -> u8 {
    match status {
        BehaviorStatus::Idle => 0,
        BehaviorStatus::Running => 1,
        BehaviorStatus::Paused => 2,
    }
}

fn decode_status(raw: u8) -> BehaviorStatus {
    match raw {
        1 => BehaviorStatus::Running,
        2 => BehaviorStatus::Paused,
        _ => BehaviorStatus::Idle,
    }
}

/// A drone whose commands complete after their straight-line travel time
pub struct SimulatedDrone {
    namespace: String,
    context: SimulationContext,
    state: Arc<DroneState>,
}

impl SimulatedDrone {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn position(&self) -> Point3D {
        *self.state.position.read().await
    }

    pub async fn color(&self) -> Rgb {
        *self.state.color.read().await
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::Acquire)
    }

    fn usable(&self) -> Result<()> {
        if !self.context.is_active() {
            return Err(ConductorError::InterfaceError(format!(
                "{}: simulation context has been shut down",
                self.namespace
            ))
            .into());
        }
        if self.state.released.load(Ordering::Acquire) {
            return Err(ConductorError::InterfaceError(format!(
                "{}: interface already released",
                self.namespace
            ))
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl MotionInterface for SimulatedDrone {
    async fn arm(&self) -> bool {
        if self.usable().is_err() {
            return false;
        }
        self.state.armed.store(true, Ordering::Release);
        debug!("{}: armed", self.namespace);
        true
    }

    async fn enable_autonomous_mode(&self) -> bool {
        if self.usable().is_err() {
            return false;
        }
        self.state.offboard.store(true, Ordering::Release);
        debug!("{}: offboard enabled", self.namespace);
        true
    }

    async fn issue(&self, command: MotionCommand) -> Result<()> {
        self.usable()?;
        if !self.state.armed.load(Ordering::Acquire) || !self.state.offboard.load(Ordering::Acquire)
        {
            return Err(ConductorError::InterfaceError(format!(
                "{}: cannot {} before arming and enabling offboard mode",
                self.namespace,
                command.name()
            ))
            .into());
        }

        let start = *self.state.position.read().await;
        let (target, speed) = match &command {
            MotionCommand::Takeoff { altitude, speed } => {
                (Point3D::new(start.x, start.y, *altitude), *speed)
            }
            MotionCommand::GoTo { target, speed, .. } => (*target, *speed),
            MotionCommand::Land { speed } => (Point3D::new(start.x, start.y, 0.0), *speed),
        };
        let landing = matches!(command, MotionCommand::Land { .. });
        let duration = self.context.travel_time(start.distance_to(&target), speed);

        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.set_status(BehaviorStatus::Running);
        debug!("{}: {} ({:?})", self.namespace, command, duration);

        let state = Arc::clone(&self.state);
        self.context
            .spawn(async move {
                tokio::time::sleep(duration).await;
                if state.generation.load(Ordering::Acquire) != generation {
                    return;
                }
                *state.position.write().await = target;
                if landing {
                    state.armed.store(false, Ordering::Release);
                    state.offboard.store(false, Ordering::Release);
                }
                state.set_status(BehaviorStatus::Idle);
            })
            .await;
        Ok(())
    }

    async fn status(&self) -> BehaviorStatus {
        self.state.status()
    }

    async fn set_indicator_color(&self, color: Rgb) {
        let [r, g, b] = color.to_unit();
        debug!("{}: leds ({:.2}, {:.2}, {:.2})", self.namespace, r, g, b);
        *self.state.color.write().await = color;
    }

    async fn release(&self) -> Result<()> {
        if self.state.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.state.set_status(BehaviorStatus::Idle);
        self.state.armed.store(false, Ordering::Release);
        self.state.offboard.store(false, Ordering::Release);
        info!("{}: released", self.namespace);
        Ok(())
    }
}
