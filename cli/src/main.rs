use clap::Parser;

use config::{Args, Config};

mod app;
mod config;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load(&args)?;
    app::run(&config)
}
