// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Navalha - WhatsApp concierge for salons and barbershops.
//!
//! Binary entry point. The webhook server (`serve`) and the message worker
//! (`worker`) run as separate processes coordinating through the shared
//! SQLite store.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;
mod telemetry;
mod worker;

/// Navalha - WhatsApp concierge for salons and barbershops.
#[derive(Parser, Debug)]
#[command(name = "navalha", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the inbound webhook server.
    Serve,
    /// Start the message worker pool.
    Worker,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match navalha_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            navalha_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    telemetry::init_tracing(&config);

    let result = match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Worker => worker::run(config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "navalha exited with error");
        std::process::exit(1);
    }
}
