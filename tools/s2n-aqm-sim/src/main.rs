// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub use anyhow::Error;
use structopt::StructOpt;

pub type Result<T = (), E = Error> = core::result::Result<T, E>;

mod packet;
mod run;
mod scenario;
mod stats;

#[derive(Debug, StructOpt)]
enum Args {
    /// Runs a scenario and prints a line per report interval
    Run(run::Run),
    /// Prints the default scenario as TOML
    Defaults(scenario::Defaults),
}

fn main() -> Result {
    let format = tracing_subscriber::fmt::format()
        .with_level(false) // don't include levels in formatted output
        .without_time() // events carry the simulated timestamp instead
        .with_ansi(false)
        .compact(); // Use a less verbose output format.

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .event_format(format)
        .init();

    match Args::from_args() {
        Args::Run(args) => args.run(),
        Args::Defaults(args) => args.run(),
    }
}
