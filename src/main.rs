// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod scenes;

use scenes::Scene;

#[derive(Parser)]
#[command(author, version, about = "Runs a layout pass over a sample scene and prints the result", long_about = None)]
struct Args {
    /// Sample scene to lay out
    #[arg(short, long, value_enum, default_value = "grid")]
    scenario: Scene,

    /// Available width
    #[arg(long, default_value = "800")]
    width: f32,

    /// Available height
    #[arg(long, default_value = "600")]
    height: f32,

    /// Available depth
    #[arg(long, default_value = "100")]
    depth: f32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let available_size = Vec3::new(args.width, args.height, args.depth);
    info!("Laying out the {:?} scene in {:?}", args.scenario, available_size);

    let (mut tree, root) = args.scenario.build().context("Failed to build the scene")?;
    debug!("scene has {} elements", tree.len());

    let result = tree
        .update_layout(root, available_size)
        .with_context(|| format!("Layout of element {} failed", root))?;
    print!("{}", result);
    Ok(())
}
