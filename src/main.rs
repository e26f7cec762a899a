mod brew;
mod cli;
mod config;
mod install;
mod manifest;
mod runlog;
mod verify;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
