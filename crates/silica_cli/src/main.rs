//! The `silica` command-line driver.
//!
//! Subnets travel between commands as bincode files; libraries are
//! described in TOML. Each command returns an integer status: 0 on
//! success, 1 for input problems, 2 for synthesis failures.

use clap::{Parser, Subcommand};

mod commands;
mod libfile;

#[derive(Parser)]
#[command(name = "silica", about = "Standard-cell logic synthesis back-end")]
struct Cli {
    /// Optional pipeline configuration (TOML).
    #[arg(long, global = true, default_value = "silica.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints size and depth statistics of a subnet.
    Stats {
        /// The subnet file (bincode).
        subnet: String,
    },
    /// Rewrites a subnet to reduce cell count.
    Rewrite {
        /// The subnet file (bincode).
        subnet: String,
        /// Where to write the rewritten subnet.
        #[arg(short, long)]
        output: String,
    },
    /// Maps a subnet onto a standard-cell library.
    Map {
        /// The subnet file (bincode).
        subnet: String,
        /// The library description (TOML).
        #[arg(short, long)]
        library: String,
        /// Where to write the mapped subnet.
        #[arg(short, long)]
        output: String,
        /// Also print a JSON report to stdout.
        #[arg(long)]
        report: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let status = match cli.command {
        Command::Stats { subnet } => commands::stats(&subnet),
        Command::Rewrite { subnet, output } => {
            commands::rewrite(&subnet, &output, &cli.config)
        }
        Command::Map {
            subnet,
            library,
            output,
            report,
        } => commands::map(&subnet, &library, &output, report, &cli.config),
    };
    std::process::exit(status);
}
