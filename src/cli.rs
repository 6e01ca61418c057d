use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pollproxy")]
#[command(about = "Polls an upstream JSON endpoint and serves the cached result", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the poller and the HTTP server
    Server(ServerArgs),
    /// Run a single fetch attempt and print the resulting view
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides config)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
