use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use conductor::choreography::{line_formation, Choreography, Point2D, Point3D};
use conductor::core::config::{Config, SimulationConfig};
use conductor::drone::{
    BehaviorStatus, MotionCommand, MotionInterface, Rgb, SimulatedDrone, SimulationContext,
};
use conductor::swarm::SwarmCoordinator;

/// Shared record of what every fake drone was told and when it finished
#[derive(Default)]
struct Ledger {
    issued: Vec<usize>,
    finished: Vec<usize>,
    targets: Vec<Vec<Point3D>>,
    violations: Vec<String>,
}

/// Fake drone that finishes each command after a fixed number of status polls
struct RecordingDrone {
    index: usize,
    polls_per_command: usize,
    remaining: AtomicUsize,
    running: AtomicBool,
    ledger: Arc<Mutex<Ledger>>,
}

impl RecordingDrone {
    fn new(index: usize, polls_per_command: usize, ledger: Arc<Mutex<Ledger>>) -> Self {
        {
            let mut l = ledger.lock().unwrap();
            l.issued.push(0);
            l.finished.push(0);
            l.targets.push(Vec::new());
        }
        Self {
            index,
            polls_per_command,
            remaining: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            ledger,
        }
    }
}

#[async_trait]
impl MotionInterface for RecordingDrone {
    async fn arm(&self) -> bool {
        true
    }

    async fn enable_autonomous_mode(&self) -> bool {
        true
    }

    async fn issue(&self, command: MotionCommand) -> Result<()> {
        let mut guard = self.ledger.lock().unwrap();
        let ledger = &mut *guard;
        let mine = ledger.issued[self.index];
        for (other, &done) in ledger.finished.iter().enumerate() {
            if other != self.index && done < mine {
                let msg = format!(
                    "drone{} got command {} while drone{} had finished only {}",
                    self.index,
                    mine + 1,
                    other,
                    done
                );
                ledger.violations.push(msg);
            }
        }
        ledger.issued[self.index] += 1;
        if let MotionCommand::GoTo { target, .. } = command {
            ledger.targets[self.index].push(target);
        }
        self.remaining.store(self.polls_per_command, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> BehaviorStatus {
        if !self.running.load(Ordering::SeqCst) {
            return BehaviorStatus::Idle;
        }
        let left = self.remaining.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining.store(left - 1, Ordering::SeqCst);
            return BehaviorStatus::Running;
        }
        self.running.store(false, Ordering::SeqCst);
        self.ledger.lock().unwrap().finished[self.index] += 1;
        BehaviorStatus::Idle
    }

    async fn set_indicator_color(&self, _color: Rgb) {}

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.swarm.poll_interval_ms = 1;
    config
}

#[tokio::test]
async fn test_three_drones_fly_reference_choreography_in_lock_step() {
    let config = fast_config();
    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let mut next = 0;
    let mut swarm = SwarmCoordinator::from_config(&config, |_| {
        let drone = RecordingDrone::new(next, 1 + next * 4, Arc::clone(&ledger));
        next += 1;
        Box::new(drone)
    })
    .unwrap();

    assert!(swarm.get_ready().await);
    swarm.takeoff().await.unwrap();
    let rounds = swarm.play_choreography().await.unwrap();
    swarm.land().await.unwrap();

    let ledger = ledger.lock().unwrap();
    assert!(ledger.violations.is_empty(), "{:?}", ledger.violations);
    assert_eq!(rounds, swarm.path_length());
    assert_eq!(ledger.issued, vec![rounds + 2; 3]);
    assert_eq!(ledger.finished, vec![rounds + 2; 3]);

    for targets in &ledger.targets {
        assert_eq!(targets.len(), rounds);
    }
    for step in 0..rounds {
        let spots: Vec<Point2D> = ledger.targets.iter().map(|t| t[step].xy()).collect();
        assert_ne!(spots[0], spots[1], "step {}", step);
        assert_ne!(spots[1], spots[2], "step {}", step);
        assert_ne!(spots[0], spots[2], "step {}", step);
    }
    drop(ledger);
    swarm.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_replay_flies_identical_waypoints() {
    let config = fast_config();
    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let mut next = 0;
    let mut swarm = SwarmCoordinator::from_config(&config, |_| {
        let drone = RecordingDrone::new(next, 2, Arc::clone(&ledger));
        next += 1;
        Box::new(drone)
    })
    .unwrap();

    swarm.get_ready().await;
    swarm.takeoff().await.unwrap();
    let rounds = swarm.play_choreography().await.unwrap();
    swarm.play_choreography().await.unwrap();

    let ledger = ledger.lock().unwrap();
    for (index, targets) in ledger.targets.iter().enumerate() {
        assert_eq!(targets.len(), rounds * 2);
        assert_eq!(targets[..rounds], targets[rounds..]);
        assert_eq!(
            targets[..rounds],
            *Choreography::default().path_for(index).as_slice()
        );
    }
}

#[tokio::test]
async fn test_simulated_mission_lands_on_closing_line() {
    let mut config = fast_config();
    config.simulation = SimulationConfig {
        use_sim_time: true,
        time_scale: 200.0,
    };
    let context = SimulationContext::init(&config.simulation);
    let drones: Arc<Mutex<Vec<Arc<SimulatedDrone>>>> = Arc::default();

    struct Shared(Arc<SimulatedDrone>);

    #[async_trait]
    impl MotionInterface for Shared {
        async fn arm(&self) -> bool {
            self.0.arm().await
        }
        async fn enable_autonomous_mode(&self) -> bool {
            self.0.enable_autonomous_mode().await
        }
        async fn issue(&self, command: MotionCommand) -> Result<()> {
            self.0.issue(command).await
        }
        async fn status(&self) -> BehaviorStatus {
            self.0.status().await
        }
        async fn set_indicator_color(&self, color: Rgb) {
            self.0.set_indicator_color(color).await
        }
        async fn release(&self) -> Result<()> {
            self.0.release().await
        }
    }

    let mut swarm = SwarmCoordinator::from_config(&config, |namespace| {
        let drone = Arc::new(context.drone(namespace));
        drones.lock().unwrap().push(Arc::clone(&drone));
        Box::new(Shared(drone))
    })
    .unwrap();

    assert!(swarm.get_ready().await);
    swarm.takeoff().await.unwrap();
    let drones: Vec<Arc<SimulatedDrone>> = drones.lock().unwrap().clone();
    for drone in &drones {
        assert_eq!(drone.position().await.z, 1.0);
        assert_eq!(drone.color().await, Rgb::GREEN);
    }

    swarm.play_choreography().await.unwrap();
    swarm.land().await.unwrap();

    let closing = line_formation(2.0, 180.0, Point2D::ORIGIN);
    for (index, drone) in drones.iter().enumerate() {
        let position = drone.position().await;
        assert_eq!(position.xy(), closing[index]);
        assert_eq!(position.z, 0.0);
        assert!(!drone.is_armed());
    }

    swarm.shutdown().await.unwrap();
    context.shutdown().await;
    assert!(drones[0]
        .issue(MotionCommand::land(&config.motion))
        .await
        .is_err());
}
