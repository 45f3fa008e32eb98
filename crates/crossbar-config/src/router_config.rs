//! Router configuration file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crossbar_core::{DEFAULT_FADE_MS, Router, Topology};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_config};

/// A complete router description: topology, fades, audio settings and
/// optionally the connection state to restore.
///
/// # TOML Format
///
/// ```toml
/// # optional, row-major, one 0/1 per matrix entry
/// connections = [0, 1, 0, 0, 0, 1, 1, 0, 0]
///
/// [topology]
/// relays = 2
/// inputs = 1
/// outputs = 1
///
/// [fades]
/// fade_in_ms = 10.0
/// fade_out_ms = 50.0
///
/// [audio]
/// sample_rate = 48000
/// block_size = 64
/// ```
///
/// Only `[topology]` is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    /// Saved connection state, row-major, one 0/1 entry per matrix cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<u8>>,

    /// Port counts.
    pub topology: TopologyConfig,

    /// Fade durations.
    #[serde(default)]
    pub fades: FadeConfig,

    /// Sample rate and block size.
    #[serde(default)]
    pub audio: AudioConfig,
}

/// `[topology]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TopologyConfig {
    /// Relay nodes.
    #[serde(default)]
    pub relays: usize,
    /// External inputs.
    #[serde(default)]
    pub inputs: usize,
    /// External outputs.
    #[serde(default)]
    pub outputs: usize,
}

/// `[fades]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FadeConfig {
    /// Fade-in time in milliseconds.
    #[serde(default = "default_fade_ms")]
    pub fade_in_ms: f32,
    /// Fade-out time in milliseconds.
    #[serde(default = "default_fade_ms")]
    pub fade_out_ms: f32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: DEFAULT_FADE_MS,
            fade_out_ms: DEFAULT_FADE_MS,
        }
    }
}

/// `[audio]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioConfig {
    /// Sample rate in Hz (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Largest block mixed in one pass (defaults to 64).
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
        }
    }
}

fn default_fade_ms() -> f32 {
    DEFAULT_FADE_MS
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_block_size() -> usize {
    64
}

impl From<Topology> for TopologyConfig {
    fn from(t: Topology) -> Self {
        Self {
            relays: t.relays,
            inputs: t.inputs,
            outputs: t.outputs,
        }
    }
}

impl From<TopologyConfig> for Topology {
    fn from(t: TopologyConfig) -> Self {
        Topology::new(t.relays, t.inputs, t.outputs)
    }
}

impl RouterConfig {
    /// Create a configuration with default fades and audio settings and no
    /// saved connections.
    pub fn new(topology: Topology) -> Self {
        Self {
            connections: None,
            topology: topology.into(),
            fades: FadeConfig::default(),
            audio: AudioConfig::default(),
        }
    }

    /// Set both fade times.
    pub fn with_fades(mut self, fade_in_ms: f32, fade_out_ms: f32) -> Self {
        self.fades = FadeConfig {
            fade_in_ms,
            fade_out_ms,
        };
        self
    }

    /// Set the sample rate and block size.
    pub fn with_audio(mut self, sample_rate: u32, block_size: usize) -> Self {
        self.audio = AudioConfig {
            sample_rate,
            block_size,
        };
        self
    }

    /// The topology as a core type.
    pub fn topology(&self) -> Topology {
        self.topology.into()
    }

    /// Saved connection state as booleans, if present.
    pub fn connection_state(&self) -> Option<Vec<bool>> {
        self.connections
            .as_ref()
            .map(|c| c.iter().map(|&v| v != 0).collect())
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that the configuration describes a buildable router.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }

    /// Build a router from this configuration.
    ///
    /// The saved connection state, if any, is replayed through the store, so
    /// a hand-edited file with a relay loop loads with the loop broken. The
    /// restored connections fade in.
    pub fn build_router(&self) -> Result<Router, ConfigError> {
        self.validate()?;

        let mut router = Router::new(
            self.topology(),
            self.audio.sample_rate as f32,
            self.audio.block_size,
        );
        router.set_fade_in_ms(self.fades.fade_in_ms);
        router.set_fade_out_ms(self.fades.fade_out_ms);

        if let Some(state) = self.connection_state() {
            router.deserialize(&state)?;
        }
        Ok(router)
    }

    /// Snapshot a running router, including its current connections.
    pub fn capture(router: &Router) -> Self {
        let engine = router.engine();
        Self {
            connections: Some(router.serialize().into_iter().map(u8::from).collect()),
            topology: router.topology().into(),
            fades: FadeConfig {
                fade_in_ms: engine.fade_in_ms(),
                fade_out_ms: engine.fade_out_ms(),
            },
            audio: AudioConfig {
                sample_rate: round_sample_rate(engine.sample_rate()),
                block_size: engine.max_block_size(),
            },
        }
    }
}

fn round_sample_rate(sample_rate: f32) -> u32 {
    sample_rate.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config = RouterConfig::from_toml_str("[topology]\nrelays = 3\n").unwrap();
        assert_eq!(config.topology(), Topology::new(3, 0, 0));
        assert_eq!(config.fades, FadeConfig::default());
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.block_size, 64);
        assert_eq!(config.connections, None);
    }

    #[test]
    fn missing_topology_is_a_parse_error() {
        let err = RouterConfig::from_toml_str("[audio]\nsample_rate = 44100\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = RouterConfig::new(Topology::new(1, 1, 1))
            .with_fades(5.0, 120.0)
            .with_audio(44100, 128);
        config.connections = Some(vec![0, 1, 1, 0]);

        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[topology]"), "got:\n{text}");
        assert_eq!(RouterConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn build_applies_settings_and_state() {
        let mut config = RouterConfig::new(Topology::new(2, 1, 1))
            .with_fades(1.0, 2.0)
            .with_audio(1000, 32);
        config.connections = Some(vec![0, 1, 0, 0, 0, 1, 1, 0, 0]);

        let router = config.build_router().unwrap();
        assert_eq!(router.engine().fade_in_samples(), 1);
        assert_eq!(router.engine().fade_out_samples(), 2);
        assert_eq!(router.engine().max_block_size(), 32);
        assert!(router.store().is_connected(0, 1));
        assert!(router.store().is_connected(2, 0));
        assert_eq!(router.engine().target_gain(1, 2), Some(1.0));
    }

    #[test]
    fn build_breaks_saved_relay_loop() {
        let mut config = RouterConfig::new(Topology::new(2, 0, 0));
        config.connections = Some(vec![0, 1, 1, 0]);
        let router = config.build_router().unwrap();
        assert!(router.store().relays_acyclic());
        assert_eq!(router.store().active_count(), 1);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = RouterConfig::new(Topology::new(1, 0, 0)).with_audio(0, 64);
        assert!(matches!(
            config.build_router(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn capture_reflects_router() {
        let mut router = Router::new(Topology::new(1, 1, 2), 44100.0, 256);
        router.set_fade_in_ms(3.0);
        router.set_fade_out_ms(7.0);
        router.set_connection(1, 2, true);

        let config = RouterConfig::capture(&router);
        assert_eq!(config.topology(), Topology::new(1, 1, 2));
        assert_eq!(config.fades.fade_in_ms, 3.0);
        assert_eq!(config.fades.fade_out_ms, 7.0);
        assert_eq!(config.audio, AudioConfig {
            sample_rate: 44100,
            block_size: 256
        });
        assert_eq!(config.connections, Some(vec![0, 0, 0, 0, 0, 1]));
    }
}
