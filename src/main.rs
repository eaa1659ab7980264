use anyhow::Result;
use clap::{Parser, Subcommand};
use conductor::choreography::Choreography;
use conductor::core::config::Config;
use conductor::drone::SimulationContext;
use conductor::swarm::SwarmCoordinator;
use log::{info, warn, LevelFilter};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[clap(author, version, about = "Conductor - synchronized formation flight for drone swarms")]
struct Cli {
    /// Path to config file (built-in mission when omitted)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Drone namespaces, comma separated
    #[clap(short, long, value_delimiter = ',', global = true)]
    namespaces: Vec<String>,

    /// Verbose output
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Use simulation time
    #[clap(short = 's', long, global = true)]
    use_sim_time: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fly the mission, confirming each phase (default)
    Fly {
        /// Answer yes to every prompt
        #[clap(short, long)]
        yes: bool,

        /// Number of replays to fly when answering automatically
        #[clap(long, default_value_t = 0)]
        replays: usize,
    },

    /// Print every drone's waypoints as JSON
    Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Takeoff,
    GoTo,
    Replay,
    Land,
}

impl Prompt {
    fn label(self) -> &'static str {
        match self {
            Prompt::Takeoff => "Takeoff",
            Prompt::GoTo => "Go to",
            Prompt::Replay => "Replay",
            Prompt::Land => "Land",
        }
    }
}

/// Source of the operator's answers between phases
enum Prompter {
    Interactive(Lines<BufReader<Stdin>>),
    Scripted { replays: usize },
}

impl Prompter {
    async fn confirm(&mut self, prompt: Prompt) -> Result<bool> {
        print!("{}? (y/n): ", prompt.label());
        match self {
            Prompter::Interactive(lines) => {
                std::io::stdout().flush()?;
                // end of input counts as "no"
                let answer = lines.next_line().await?;
                Ok(answer.as_deref().map(str::trim) == Some("y"))
            }
            Prompter::Scripted { replays } => {
                let yes = match prompt {
                    Prompt::Replay if *replays == 0 => false,
                    Prompt::Replay => {
                        *replays -= 1;
                        true
                    }
                    _ => true,
                };
                println!("{}", if yes { "y" } else { "n" });
                Ok(yes)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logger
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(log_level).init();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if !cli.namespaces.is_empty() {
        config.swarm.namespaces = cli.namespaces.clone();
    }
    if cli.use_sim_time {
        config.simulation.use_sim_time = true;
    }
    config.validate()?;

    match cli.command.unwrap_or(Command::Fly {
        yes: false,
        replays: 0,
    }) {
        Command::Plan => {
            let plan = Choreography::from_config(&config.choreography)
                .plan(config.swarm.namespaces.as_slice());
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Command::Fly { yes, replays } => {
            print_banner();
            let prompter = if yes {
                Prompter::Scripted { replays }
            } else {
                Prompter::Interactive(BufReader::new(tokio::io::stdin()).lines())
            };
            fly(config, prompter).await
        }
    }
}

async fn fly(config: Config, mut prompter: Prompter) -> Result<()> {
    info!("Swarm: {}", config.swarm.namespaces.join(", "));

    let context = SimulationContext::init(&config.simulation);
    let mut swarm = SwarmCoordinator::from_config(&config, |namespace| {
        Box::new(context.drone(namespace))
    })?;

    let outcome = run_mission(&mut swarm, &mut prompter).await;

    println!("Shutdown");
    swarm.shutdown().await?;
    context.shutdown().await;

    if outcome.is_ok() {
        info!("Mission complete");
    }
    outcome
}

async fn run_mission(swarm: &mut SwarmCoordinator, prompter: &mut Prompter) -> Result<()> {
    if !prompter.confirm(Prompt::Takeoff).await? {
        return Ok(());
    }
    if !swarm.get_ready().await {
        warn!("Continuing with drones that failed to get ready");
    }
    swarm.takeoff().await?;

    if prompter.confirm(Prompt::GoTo).await? {
        swarm.play_choreography().await?;
        while prompter.confirm(Prompt::Replay).await? {
            swarm.play_choreography().await?;
        }
    }

    // airborne drones land whatever the answer
    if !prompter.confirm(Prompt::Land).await? {
        info!("Landing anyway");
    }
    swarm.land().await
}

fn print_banner() {
    println!("\n====================================================");
    println!("  CONDUCTOR - Swarm Formation Choreography v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================================\n");
}
