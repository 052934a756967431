//! CLI argument definitions using clap derive macros.

use std::net::IpAddr;

use clap::Parser;

/// Serve the filhaal API.
///
/// Settings come from `FILHAAL_*` environment variables; the flags below
/// override the matching variables.
#[derive(Parser, Debug)]
#[command(name = "filhaal")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Address to bind (overrides FILHAAL_BIND)
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on (overrides FILHAAL_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// SQLite file, or ":memory:" (overrides FILHAAL_DATABASE)
    #[arg(short, long)]
    pub database: Option<String>,
}
