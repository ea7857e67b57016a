//! Command-line runner for the scheduling decomposition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::{Compare, RunConfig};

#[derive(Parser)]
#[command(
    name = "lbbd-bench",
    about = "Logic-based Benders decomposition for periodic scheduling",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance file.
    Solve {
        /// Instance in JSON or SDF3 XML form.
        instance: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Also solve the monolithic model and compare periods.
        #[arg(long)]
        monolithic: bool,

        /// Also solve the throughput decomposition and compare periods.
        #[arg(long)]
        throughput: bool,

        /// Print the schedule found at the incumbent.
        #[arg(long)]
        schedule: bool,
    },
    /// Solve every `*.json` and `*.xml` instance in a directory and write a summary.
    Benchmark {
        /// Directory holding instance files.
        dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Summary file (default: `<output>/summary.json`).
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Settings file (JSON); command-line flags override its values.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Iteration cap.
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Convergence tolerance on the bound gap.
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Time limit in seconds.
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Progress output: 0 silent, 1 per iteration, 2 per step.
    #[arg(short, long, default_value_t = 0)]
    verbosity: u8,

    /// Plain dual cuts, no auxiliary subproblem.
    #[arg(long)]
    no_stabilization: bool,

    /// Directory for solution files and error logs.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        RunConfig {
            settings_file: self.settings,
            iterations: self.iterations,
            epsilon: self.epsilon,
            time_limit: self.time_limit,
            verbosity: self.verbosity,
            stabilized: !self.no_stabilization,
            output: self.output,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            run,
            monolithic,
            throughput,
            schedule,
        } => commands::solve(
            &instance,
            &run.into_config(),
            Compare {
                monolithic,
                throughput,
                schedule,
            },
        ),
        Commands::Benchmark { dir, run, summary } => {
            commands::benchmark(&dir, &run.into_config(), summary.as_deref()).map(|_| ())
        }
    }
}
