//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::Args;
use crossbar_config::RouterConfig;
use crossbar_core::{Router, Topology};
use std::path::PathBuf;

/// Where a command gets its router from: a config file, or bare counts.
#[derive(Args, Debug, Clone)]
pub struct RouterSource {
    /// Router configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Relay count when no config file is given
    #[arg(long, default_value = "0", conflicts_with = "config")]
    pub relays: usize,

    /// External input count when no config file is given
    #[arg(long, default_value = "0", conflicts_with = "config")]
    pub inputs: usize,

    /// External output count when no config file is given
    #[arg(long, default_value = "0", conflicts_with = "config")]
    pub outputs: usize,
}

impl RouterSource {
    /// Loads or assembles the configuration without building a router.
    pub fn config(&self) -> anyhow::Result<RouterConfig> {
        match &self.config {
            Some(path) => RouterConfig::load(path)
                .with_context(|| format!("loading config {}", path.display())),
            None => Ok(RouterConfig::new(Topology::new(
                self.relays,
                self.inputs,
                self.outputs,
            ))),
        }
    }

    /// Builds the router this source describes.
    pub fn build(&self) -> anyhow::Result<(RouterConfig, Router)> {
        let config = self.config()?;
        let router = config
            .build_router()
            .context("building router from configuration")?;
        tracing::info!(topology = %router.topology(), "router ready");
        Ok((config, router))
    }
}
