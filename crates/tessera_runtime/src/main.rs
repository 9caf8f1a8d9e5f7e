//! Tessera Runtime
//!
//! Demo binary: loads settings, runs a frame loop against an entity store
//! and round-trips a snapshot.
//!
//! Usage: `tessera [settings.json]`

mod demo;
mod settings;

use anyhow::Result;
use demo::Demo;
use settings::RuntimeSettings;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Tessera v{}", tessera_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = RuntimeSettings::load(path.as_deref())?;
    tracing::info!(
        entities = settings.entities,
        frames = settings.frames,
        churn = settings.churn,
        allocator = ?settings.allocator,
        "settings loaded"
    );

    let mut demo = Demo::new(settings)?;
    demo.run()?;
    demo.reload()?;

    tracing::info!("Run complete");
    Ok(())
}
