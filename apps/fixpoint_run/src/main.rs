mod components;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use components::{Add, Counter, Delay, Monitor, Scale};
use fixpoint_core::{Director, DirectorError, Network, RunConfig, Scheduler};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Demo {
    /// counter -> scale -> monitor, plus an unconnected branch
    Pipeline,
    /// Running sum closed through a unit delay
    Accumulator,
    /// A strict component feeding itself. The dependency scheduler rejects it;
    /// under the random fallback its first instant ends in a causality loop.
    SelfLoop,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Run config (TOML). Defaults to fixpoint.toml or configs/fixpoint.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Demo::Pipeline)]
    demo: Demo,

    /// Override director.iterations
    #[arg(long)]
    iterations: Option<i64>,

    /// Print one JSON report per instant instead of a table.
    #[arg(long)]
    json: bool,

    /// Print the config JSON Schema and exit.
    #[arg(long)]
    schema: bool,
}

fn load(args: &Args) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => fixpoint_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => match fixpoint_config::find_config() {
            Ok((path, config)) => {
                log::info!("Using config {}", path.display());
                config
            }
            Err(e) => {
                log::info!("{e}; using defaults");
                RunConfig::default()
            }
        },
    };
    if let Some(iterations) = args.iterations {
        config.director.iterations = iterations;
    }
    // A demo without a limit would only end by deactivation
    if config.director.iteration_limit().is_none() {
        config.director.iterations = 5;
    }
    Ok(config)
}

fn build(demo: Demo) -> anyhow::Result<Network> {
    let mut net = Network::new();
    match demo {
        Demo::Pipeline => {
            net.add_component(Counter::boxed("counter"))?;
            net.add_component(Scale::boxed("triple", 3))?;
            net.add_component(Monitor::boxed("monitor", None))?;
            net.add_component(Scale::boxed("idle", 2))?;
            net.connect("counter", "out", "triple", "in")?;
            net.connect("triple", "out", "monitor", "in")?;
        }
        Demo::Accumulator => {
            net.add_component(Counter::boxed("counter"))?;
            net.add_component(Add::boxed("sum"))?;
            net.add_component(Delay::boxed("previous", 0))?;
            net.add_component(Monitor::boxed("monitor", None))?;
            net.connect("counter", "out", "sum", "a")?;
            net.connect("previous", "out", "sum", "b")?;
            net.connect("sum", "out", "previous", "in")?;
            net.connect("sum", "out", "monitor", "in")?;
        }
        Demo::SelfLoop => {
            net.add_component(Scale::boxed("echo", 1))?;
            net.add_component(Monitor::boxed("monitor", Some(2)))?;
            net.connect("echo", "out", "echo", "in")?;
            net.connect("echo", "out", "monitor", "in")?;
        }
    }
    Ok(net)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.schema {
        println!(
            "{}",
            serde_json::to_string_pretty(&fixpoint_config::config_schema())?
        );
        return Ok(());
    }

    let config = load(&args)?;
    let mut director = Director::from_config(build(args.demo)?, &config);

    match director.initialize() {
        Ok(()) => {}
        Err(DirectorError::Schedule(cycle)) if config.scheduler.fallback_to_random => {
            log::warn!("{cycle}; falling back to the random scheduler");
            director.set_scheduler(Scheduler::random(config.scheduler.seed));
            director.initialize()?;
        }
        Err(e) => return Err(e).context("could not schedule the network"),
    }

    loop {
        let report = director.iterate()?;
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            let states = director.channel_states();
            let cells: Vec<String> = states.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!(
                "instant {:>3}  t={:<6} passes={}  {}",
                report.instant,
                report.time,
                report.passes,
                cells.join("  ")
            );
        }
        if !report.keep_running {
            break;
        }
    }

    let stats = director.stats();
    println!(
        "{} instants, {} passes, rough cost {}, real cost {}",
        stats.instants, stats.total_passes, stats.rough_cost, stats.real_cost
    );
    Ok(())
}
