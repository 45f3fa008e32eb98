//! Router configuration validation.
//!
//! A configuration can parse as TOML and still describe a router that cannot
//! run: a zero block size, a negative fade, or a saved connection list that
//! does not match the topology. [`validate_config`] reports every such problem
//! at once.
//!
//! # Example
//!
//! ```rust
//! use crossbar_config::{RouterConfig, ValidationError, validate_config};
//! use crossbar_core::Topology;
//!
//! let mut config = RouterConfig::new(Topology::new(1, 1, 1));
//! assert!(validate_config(&config).is_ok());
//!
//! config.connections = Some(vec![0, 1, 0]);
//! assert_eq!(
//!     validate_config(&config),
//!     Err(ValidationError::ConnectionCount { expected: 4, found: 3 })
//! );
//! ```

use thiserror::Error;

use crate::router_config::RouterConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The matrix has no rows or no columns.
    #[error("topology {relays} relays, {inputs} inputs, {outputs} outputs has an empty matrix")]
    EmptyTopology {
        /// Relay count.
        relays: usize,
        /// External input count.
        inputs: usize,
        /// External output count.
        outputs: usize,
    },

    /// Sample rate of zero.
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,

    /// Block size of zero.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,

    /// Fade time that is negative or not finite.
    #[error("fade '{name}' must be a finite, non-negative number of milliseconds, got {value}")]
    InvalidFade {
        /// Field name.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Saved connection list with the wrong length.
    #[error("connection list has {found} entries, topology needs {expected}")]
    ConnectionCount {
        /// Matrix entry count.
        expected: usize,
        /// Entries in the file.
        found: usize,
    },

    /// Saved connection entry other than 0 or 1.
    #[error("connection entry {index} is {value}, expected 0 or 1")]
    ConnectionValue {
        /// Row-major position in the list.
        index: usize,
        /// The rejected value.
        value: u8,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Checks that a configuration describes a router that can be built.
///
/// Returns the single problem found, or [`ValidationError::Multiple`] if
/// there are several.
pub fn validate_config(config: &RouterConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    let topology = config.topology();
    if topology.rows() == 0 || topology.cols() == 0 {
        errors.push(ValidationError::EmptyTopology {
            relays: topology.relays,
            inputs: topology.inputs,
            outputs: topology.outputs,
        });
    }

    if config.audio.sample_rate == 0 {
        errors.push(ValidationError::ZeroSampleRate);
    }
    if config.audio.block_size == 0 {
        errors.push(ValidationError::ZeroBlockSize);
    }

    for (name, value) in [
        ("fade_in_ms", config.fades.fade_in_ms),
        ("fade_out_ms", config.fades.fade_out_ms),
    ] {
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError::InvalidFade { name, value });
        }
    }

    if let Some(connections) = &config.connections {
        if connections.len() != topology.len() {
            errors.push(ValidationError::ConnectionCount {
                expected: topology.len(),
                found: connections.len(),
            });
        }
        if let Some((index, &value)) = connections.iter().enumerate().find(|(_, v)| **v > 1) {
            errors.push(ValidationError::ConnectionValue { index, value });
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbar_core::Topology;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::new(Topology::new(2, 2, 2))), Ok(()));
    }

    #[test]
    fn relays_only_is_valid() {
        assert_eq!(validate_config(&RouterConfig::new(Topology::new(2, 0, 0))), Ok(()));
    }

    #[test]
    fn empty_topology() {
        let config = RouterConfig::new(Topology::new(0, 0, 3));
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::EmptyTopology { outputs: 3, .. })
        ));
    }

    #[test]
    fn bad_fades() {
        let mut config = RouterConfig::new(Topology::new(1, 0, 0));
        config.fades.fade_in_ms = -1.0;
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::InvalidFade {
                name: "fade_in_ms",
                value: -1.0
            })
        );

        config.fades.fade_in_ms = 0.0;
        config.fades.fade_out_ms = f32::INFINITY;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::InvalidFade {
                name: "fade_out_ms",
                ..
            })
        ));
    }

    #[test]
    fn connection_value_out_of_range() {
        let mut config = RouterConfig::new(Topology::new(1, 0, 0));
        config.connections = Some(vec![2]);
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::ConnectionValue { index: 0, value: 2 })
        );
    }

    #[test]
    fn several_errors_are_collected() {
        let mut config = RouterConfig::new(Topology::new(1, 1, 1));
        config.audio.sample_rate = 0;
        config.audio.block_size = 0;
        let Err(ValidationError::Multiple(errors)) = validate_config(&config) else {
            panic!("expected multiple errors");
        };
        assert_eq!(
            errors,
            vec![ValidationError::ZeroSampleRate, ValidationError::ZeroBlockSize]
        );
        let msg = ValidationError::Multiple(errors).to_string();
        assert!(msg.contains("sample rate") && msg.contains("block size"), "got: {msg}");
    }
}
