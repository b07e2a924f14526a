mod almanac;
mod app;
mod camera;
mod catalog;
mod config;
mod declutter;
mod ephemeris;
mod hud;
mod input;
mod minimap;
mod projection;
mod shader;
mod sky;
mod surface;
mod telemetry;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = config::Cli::parse();
    app::run(cli)
}
