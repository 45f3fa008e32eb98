//! Configuration check and summary.

use anyhow::Context;
use clap::Args;
use crossbar_config::RouterConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Router configuration file (TOML)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// List every active connection
    #[arg(short, long)]
    verbose: bool,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let config = RouterConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config
        .validate()
        .with_context(|| format!("{} is not a valid router", args.config.display()))?;
    let router = config.build_router()?;
    let engine = router.engine();
    let topology = router.topology();

    println!("{}", args.config.display());
    println!("  Topology:    {topology}");
    println!("  Matrix:      {} x {} ({} entries)", topology.rows(), topology.cols(), topology.len());
    println!(
        "  Fades:       in {} ms ({} samples), out {} ms ({} samples)",
        engine.fade_in_ms(),
        engine.fade_in_samples(),
        engine.fade_out_ms(),
        engine.fade_out_samples()
    );
    println!(
        "  Audio:       {} Hz, block {}",
        config.audio.sample_rate, config.audio.block_size
    );

    let active = router.store().active_count();
    match config.connection_state() {
        None => println!("  Connections: none saved"),
        Some(saved) => {
            let requested = saved.iter().filter(|&&v| v).count();
            println!("  Connections: {active} active");
            if requested != active {
                // only a relay loop can make the store drop a saved entry
                println!(
                    "  Warning:     {} saved connection(s) dropped to break relay loops",
                    requested - active
                );
            }
        }
    }

    if args.verbose {
        for c in router.store().active() {
            println!("    {c}");
        }
    }

    Ok(())
}
