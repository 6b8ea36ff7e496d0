use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::Output;
use crate::config::EngineConfig;

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Resolve `0` values to the sizes actually used
    #[arg(long)]
    pub effective: bool,
}

pub fn execute(args: ConfigArgs, engine: &EngineConfig, output: &Output) -> Result<()> {
    let shown = if args.effective {
        EngineConfig {
            workers: engine.pool_size(),
            queue: engine.queue_size(),
            thread_name: engine.thread_name.clone(),
        }
    } else {
        engine.clone()
    };

    output.verbose("merged from defaults, foldpool.toml, --config, FOLDPOOL_* and flags");
    let json = serde_json::to_string_pretty(&shown).context("Failed to serialize configuration")?;
    println!("{json}");
    Ok(())
}
