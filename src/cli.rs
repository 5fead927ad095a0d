use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tilexport")]
#[command(about = "Tile export job coordinator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the finalize loop and the health endpoint
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Overrides `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Config file; defaults to `TILEXPORT_CONFIG` or config/tilexport.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}
