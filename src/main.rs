mod api;
mod app;
mod cli;
mod config;
mod db;
mod format;
mod history;
mod http;
mod kv;
mod loader;
mod logging;
mod pagination;
mod paths;
mod playback;
mod query_cache;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init_logging(cli.verbose)?;
    app::run(cli)
}
