//! Configuration files for crossbar routing matrices.
//!
//! A router configuration is a small TOML file naming the topology, the fade
//! times, the audio settings, and optionally the connection state to restore.
//!
//! # Features
//!
//! - **Load/Save**: Read and write configurations as TOML
//! - **Validation**: Reject configurations that cannot build a router
//! - **Build/Capture**: Turn a configuration into a running [`Router`] and
//!   snapshot a running router back into a configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use crossbar_config::RouterConfig;
//!
//! let config = RouterConfig::load("studio.toml").unwrap();
//! let mut router = config.build_router().unwrap();
//!
//! router.set_connection(2, 0, true);
//! RouterConfig::capture(&router).save("studio.toml").unwrap();
//! ```
//!
//! [`Router`]: crossbar_core::Router

mod error;
mod router_config;

/// Router configuration validation.
pub mod validation;

pub use error::ConfigError;
pub use router_config::{AudioConfig, FadeConfig, RouterConfig, TopologyConfig};
pub use validation::{ValidationError, ValidationResult, validate_config};
