mod scenario;

use anyhow::Context;
use clap::{Parser, Subcommand};
use handspace_dispatch::DispatchConfig;
use scenario::Scenario;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "handspace-cli", about = "Controller dispatch tools")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// List the standard modules with their priorities and slots
    Modules {
        /// Dispatch config (YAML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Play a controller scenario through the standard modules
    Run {
        /// Scenario file (YAML)
        #[arg(short, long)]
        scenario: PathBuf,
        /// Dispatch config (YAML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to play; defaults to the scenario's length
        #[arg(short, long)]
        frames: Option<u64>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DispatchConfig> {
    match path {
        Some(path) => DispatchConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(DispatchConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("handspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", handspace_common::crate_info());
            println!("kernel: {}", handspace_kernel::crate_info());
            println!("dispatch: {}", handspace_dispatch::crate_info());
            println!("input: {}", handspace_input::crate_info());
            println!("modules: {}", handspace_modules::crate_info());
        }
        Commands::Modules { config } => {
            let config = load_config(config.as_ref())?;
            let mut modules = handspace_modules::standard_modules(&config);
            modules.sort_by_key(|(_, m)| m.descriptor().priority);
            println!("{:<28} {:>8}  slots", "module", "priority");
            for (name, module) in &modules {
                let descriptor = module.descriptor();
                let slots: Vec<&str> = descriptor.slots.iter().map(|s| s.as_str()).collect();
                println!("{:<28} {:>8}  {}", name, descriptor.priority, slots.join(", "));
            }
        }
        Commands::Run {
            scenario,
            config,
            frames,
        } => {
            let config = load_config(config.as_ref())?;
            let scenario = Scenario::load(&scenario)?;
            let lines = scenario.play(&config, frames)?;
            for line in &lines {
                let owners: Vec<String> = line
                    .owners
                    .iter()
                    .map(|(slot, owner)| format!("{slot}={owner}"))
                    .collect();
                println!("frame {:>4}  [{}]", line.frame, owners.join(" "));
                for (object, method) in &line.calls {
                    println!("            {object}.{method}");
                }
                for hand in &line.haptics {
                    println!("            haptic {hand}");
                }
                for destination in &line.teleports {
                    println!("            teleport to {destination}");
                }
                if line.failures > 0 {
                    println!("            {} module failure(s)", line.failures);
                }
            }
            let failures: usize = lines.iter().map(|l| l.failures).sum();
            tracing::info!(frames = lines.len(), failures, "scenario finished");
        }
    }

    Ok(())
}
