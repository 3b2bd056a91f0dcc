//! Entry point for the nextmac command-line tool.
//!
//! Provisioning scripts call `nextmac allocate <ifname>` and read the address
//! from stdout. On failure the numeric error code is printed instead and is
//! also the exit status.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use nextmac_shared::errors::MacError;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Allocate(args) => commands::allocate::execute(args, &cli.global),
        Commands::Remove(args) => commands::remove::execute(args, &cli.global),
        Commands::Swap(args) => commands::swap::execute(args, &cli.global),
        Commands::Reserved(args) => commands::reserved::execute(args, &cli.global),
        Commands::List(args) => commands::list::execute(args, &cli.global),
    };

    if let Err(e) = result {
        let code = e.downcast_ref::<MacError>().map(MacError::code).unwrap_or(1);
        eprintln!("Error: {:#}", e);
        std::process::exit(code);
    }
}
