//! CLI for timeleak: recover secrets from services that leak through response latency.

mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "timeleak")]
#[command(about = "timeleak: recover secrets from services that leak through response latency")]
#[command(version = timeleak_core::VERSION)]
struct Cli {
    /// More output (-v: per-candidate rankings, -vv: debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print the final result
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where probes go.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Base URL of the target service
    #[arg(long, default_value = timeleak_core::config::DEFAULT_BASE_URL)]
    url: String,

    /// Username/ID the target derives the secret from
    #[arg(long)]
    user: String,

    /// Target-side difficulty (1-10)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=10))]
    difficulty: u32,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Response body marker that signals an accepted secret
    #[arg(long, default_value = timeleak_core::config::DEFAULT_SUCCESS_MARKER)]
    success_marker: String,
}

/// Measurement parameters. Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON file with an attack configuration
    #[arg(long)]
    config: Option<String>,

    /// Candidate symbols, in tie-break order
    #[arg(long)]
    alphabet: Option<String>,

    /// Longest secret length to probe
    #[arg(long)]
    max_length: Option<usize>,

    /// Measurements per probe during length discovery
    #[arg(long)]
    measurements: Option<usize>,

    /// Parallel workers during length discovery
    #[arg(long)]
    workers: Option<usize>,

    /// Single-stage ranking: every symbol measured with the simple budget
    #[arg(long)]
    simple: bool,

    /// Measurements per candidate in the quick stage
    #[arg(long)]
    quick_measurements: Option<usize>,

    /// Workers in the quick stage
    #[arg(long)]
    quick_workers: Option<usize>,

    /// Measurements per candidate in the full stage
    #[arg(long)]
    full_measurements: Option<usize>,

    /// Workers in the full stage
    #[arg(long)]
    full_workers: Option<usize>,

    /// Candidates kept after the quick stage
    #[arg(long)]
    top_k: Option<usize>,

    /// Measurements per candidate in simple mode
    #[arg(long)]
    simple_measurements: Option<usize>,

    /// Workers in simple mode
    #[arg(long)]
    simple_workers: Option<usize>,

    /// Directory for run summaries
    #[arg(long, default_value = "attack_runs")]
    output: String,

    /// Do not write a run summary
    #[arg(long)]
    no_save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the secret length only (phase 1)
    Length {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Recover the secret with a known or assumed length (phase 2)
    Crack {
        /// Secret length
        #[arg(long)]
        length: usize,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Full attack: length discovery, then character recovery
    Attack {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Send one confirmation request for a candidate secret
    Verify {
        /// Candidate secret
        secret: String,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Start the leaky practice target
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Use this secret for every user instead of generating one per user
        #[arg(long)]
        secret: Option<String>,

        /// Length of generated secrets
        #[arg(long, default_value = "8")]
        secret_length: usize,

        /// Symbols generated secrets are drawn from
        #[arg(long, default_value = timeleak_core::config::DEFAULT_ALPHABET)]
        alphabet: String,

        /// Milliseconds per unit of comparison work at difficulty 1
        #[arg(long, default_value = "1")]
        step_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    let verbosity = commands::Verbosity::from_flags(cli.quiet, cli.verbose);
    commands::init_logging(verbosity, cli.verbose);

    match cli.command {
        Commands::Length { target, run } => {
            commands::attack::run(commands::attack::Action::LengthOnly, &target, &run, verbosity)
        }
        Commands::Crack {
            length,
            target,
            run,
        } => commands::attack::run(
            commands::attack::Action::Crack(length),
            &target,
            &run,
            verbosity,
        ),
        Commands::Attack { target, run } => {
            commands::attack::run(commands::attack::Action::Full, &target, &run, verbosity)
        }
        Commands::Verify { secret, target } => commands::verify::run(&secret, &target),
        Commands::Serve {
            port,
            host,
            secret,
            secret_length,
            alphabet,
            step_ms,
        } => commands::server::run(&host, port, secret, secret_length, &alphabet, step_ms),
    }
}
