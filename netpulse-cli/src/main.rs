// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Netpulse CLI
//!
//! Command-line interface for the netpulse latency benchmark.

use clap::{Args, Parser, Subcommand};

mod commands;

/// Netpulse - UDP round-trip-latency prober for serverless benchmarking
#[derive(Parser)]
#[command(name = "netpulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe an echo peer until the round-trip time converges
    Probe(ProbeArgs),

    /// Run a local echo responder
    Echo(EchoArgs),

    /// Validate a settings file
    Validate {
        /// Path to the settings file
        file: String,
    },
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Echo peer host name or IP address
    #[arg(long)]
    pub address: String,

    /// Echo peer UDP port
    #[arg(long)]
    pub port: u16,

    /// Identifier carried in every probing datagram
    #[arg(long, default_value = "test")]
    pub request_id: String,

    /// Consecutive non-improving attempts required for convergence
    #[arg(long, default_value_t = 1)]
    pub repetitions: u32,

    /// Local port for the peer's echoes (defaults to the peer port)
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Keep the per-attempt series and store it as a CSV artifact
    #[arg(long)]
    pub debug: bool,

    /// Settings file with probe tunables
    #[arg(short, long)]
    pub config: Option<String>,

    /// Root directory of the artifact store
    #[arg(long, default_value = "artifacts")]
    pub output: String,

    /// Bucket (subdirectory) for result artifacts
    #[arg(long, default_value = "netpulse")]
    pub bucket: String,
}

#[derive(Args)]
pub struct EchoArgs {
    /// UDP port to listen on
    #[arg(long)]
    pub port: u16,

    /// Port on the sender's host to reply to (defaults to the listening port)
    #[arg(long)]
    pub reply_port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Probe(args) => commands::probe::execute(&args),
        Commands::Echo(args) => commands::echo::execute(&args),
        Commands::Validate { file } => commands::validate::execute(&file),
    }
}
