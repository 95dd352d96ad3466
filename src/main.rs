//! Service gateway.
//!
//! A single entry point that routes inbound HTTP calls to registered
//! backend services by path prefix.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                    GATEWAY                        │
//!   Client Request       │  ┌────────┐   ┌─────────┐   ┌──────────────────┐  │
//!   ─────────────────────┼─▶│  http  │──▶│ routing │──▶│    discovery     │  │
//!                        │  │ server │   │  (key)  │   │   (directory)    │  │
//!                        │  └────────┘   └─────────┘   └────────┬─────────┘  │
//!                        │                                      ▼            │
//!                        │                             ┌──────────────────┐  │
//!                        │                             │    resilience    │  │
//!                        │                             │ (circuit breaker)│  │
//!                        │                             └────────┬─────────┘  │
//!                        │                                      ▼            │
//!   Client Response      │  ┌──────────┐               ┌──────────────────┐  │
//!   ◀────────────────────┼──│ envelope │◀──────────────│     dispatch     │◀─┼── Backend
//!                        │  └──────────┘               └──────────────────┘  │
//!                        │                                                   │
//!                        │   config · observability · lifecycle              │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_gateway::lifecycle::startup;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(version, about = "Prefix-routing service gateway with circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Without it, defaults plus
    /// GATEWAY_* environment variables are used.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    startup::run(cli.config).await?;
    Ok(())
}
