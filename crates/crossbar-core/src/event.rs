//! Control events exchanged with a host.
//!
//! Hosts drive a router with discrete messages: a symbolic name followed by a
//! short list of numbers. [`ControlEvent`] is the parsed form; it can be built
//! from a name and numeric arguments ([`ControlEvent::from_message`]) or from
//! a text line ([`str::parse`]):
//!
//! ```text
//! connection 0 3 1     # also accepted as the bare list "0 3 1"
//! clear
//! dump
//! serialize
//! deserialize 0 1 0 0
//! fadeIn 20
//! fadeOut 150
//! fade 50
//! ```
//!
//! The router answers with [`Response`]s: one `row col value` triple per
//! changed or dumped connection, or one flat list for `serialize`.

#[cfg(not(feature = "std"))]
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use core::str::FromStr;

use crate::topology::Connection;

/// A parsed control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Request `row → col` to be switched on or off.
    Connection {
        /// Source index.
        row: usize,
        /// Destination index.
        col: usize,
        /// Requested state.
        active: bool,
    },
    /// Switch every connection off, then dump.
    Clear,
    /// Report every connection.
    Dump,
    /// Report the flattened matrix.
    Serialize,
    /// Restore a flattened matrix.
    Deserialize(Vec<bool>),
    /// Fade-in time in milliseconds.
    FadeIn(f32),
    /// Fade-out time in milliseconds.
    FadeOut(f32),
    /// Both fade times in milliseconds.
    Fade(f32),
}

/// Why a control message could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum EventError {
    /// Blank message.
    Empty,
    /// The message name is not recognised.
    UnknownMessage(String),
    /// Too few arguments for the message.
    MissingArguments {
        /// Canonical message name.
        message: &'static str,
        /// Minimum argument count.
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },
    /// An argument is not a number.
    InvalidArgument {
        /// Zero-based argument position.
        position: usize,
        /// The offending token.
        token: String,
    },
    /// A connection index is negative or not finite.
    InvalidIndex(f32),
}

impl core::fmt::Display for EventError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty message"),
            Self::UnknownMessage(name) => write!(f, "unknown message '{name}'"),
            Self::MissingArguments {
                message,
                expected,
                found,
            } => write!(
                f,
                "'{message}' expects at least {expected} arguments, got {found}"
            ),
            Self::InvalidArgument { position, token } => {
                write!(f, "argument {position} is not a number: '{token}'")
            }
            Self::InvalidIndex(v) => write!(f, "invalid connection index {v}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EventError {}

impl ControlEvent {
    /// Builds an event from a message name and its numeric arguments.
    ///
    /// Extra trailing arguments are ignored. Numbers are truncated toward zero
    /// before use, so `0.7` selects index 0 and switches a connection off.
    pub fn from_message(name: &str, args: &[f32]) -> Result<Self, EventError> {
        match name {
            "connection" | "list" => {
                require("connection", args, 3)?;
                Ok(Self::Connection {
                    row: to_index(args[0])?,
                    col: to_index(args[1])?,
                    active: to_flag(args[2]),
                })
            }
            "clear" => Ok(Self::Clear),
            "dump" => Ok(Self::Dump),
            "serialize" => Ok(Self::Serialize),
            "deserialize" => Ok(Self::Deserialize(args.iter().map(|&v| to_flag(v)).collect())),
            "fadeIn" | "fade_in" | "fadi" => {
                require("fadeIn", args, 1)?;
                Ok(Self::FadeIn(args[0]))
            }
            "fadeOut" | "fade_out" | "fado" => {
                require("fadeOut", args, 1)?;
                Ok(Self::FadeOut(args[0]))
            }
            "fade" => {
                require("fade", args, 1)?;
                Ok(Self::Fade(args[0]))
            }
            other => Err(EventError::UnknownMessage(other.to_string())),
        }
    }

    /// Canonical message name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Clear => "clear",
            Self::Dump => "dump",
            Self::Serialize => "serialize",
            Self::Deserialize(_) => "deserialize",
            Self::FadeIn(_) => "fadeIn",
            Self::FadeOut(_) => "fadeOut",
            Self::Fade(_) => "fade",
        }
    }
}

impl FromStr for ControlEvent {
    type Err = EventError;

    /// Parses `name arg arg ...`; a line starting with a number is a bare
    /// `connection` list. A trailing `;` is ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().trim_end_matches(';');
        let mut tokens = line.split_whitespace().peekable();

        let name = match tokens.peek() {
            None => return Err(EventError::Empty),
            Some(first) if first.parse::<f32>().is_ok() => "list",
            Some(_) => tokens.next().unwrap_or_default(),
        };

        let args = tokens
            .enumerate()
            .map(|(position, token)| {
                token.parse::<f32>().map_err(|_| EventError::InvalidArgument {
                    position,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        Self::from_message(name, &args)
    }
}

impl core::fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Connection { row, col, active } => {
                write!(f, "connection {row} {col} {}", u8::from(*active))
            }
            Self::Deserialize(values) => {
                write!(f, "deserialize")?;
                for &v in values {
                    write!(f, " {}", u8::from(v))?;
                }
                Ok(())
            }
            Self::FadeIn(ms) | Self::FadeOut(ms) | Self::Fade(ms) => {
                write!(f, "{} {ms}", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Output produced by a router in answer to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The actual state of one connection after a request or dump.
    Connection(Connection),
    /// The flattened matrix, row-major.
    Serialized(Vec<bool>),
}

impl core::fmt::Display for Response {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Connection(c) => write!(f, "{c}"),
            Self::Serialized(values) => {
                write!(f, "serialize")?;
                for &v in values {
                    write!(f, " {}", u8::from(v))?;
                }
                Ok(())
            }
        }
    }
}

fn require(message: &'static str, args: &[f32], expected: usize) -> Result<(), EventError> {
    if args.len() < expected {
        return Err(EventError::MissingArguments {
            message,
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn to_index(value: f32) -> Result<usize, EventError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EventError::InvalidIndex(value));
    }
    Ok(libm::truncf(value) as usize)
}

fn to_flag(value: f32) -> bool {
    libm::truncf(value) != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_connection() {
        let ev: ControlEvent = "connection 2 3 1".parse().unwrap();
        assert_eq!(
            ev,
            ControlEvent::Connection {
                row: 2,
                col: 3,
                active: true
            }
        );
    }

    #[test]
    fn bare_list_is_connection() {
        let ev: ControlEvent = "1 0 0;".parse().unwrap();
        assert_eq!(
            ev,
            ControlEvent::Connection {
                row: 1,
                col: 0,
                active: false
            }
        );
    }

    #[test]
    fn values_are_truncated() {
        let ev = ControlEvent::from_message("list", &[1.9, 0.2, 0.7]).unwrap();
        assert_eq!(
            ev,
            ControlEvent::Connection {
                row: 1,
                col: 0,
                active: false
            }
        );
    }

    #[test]
    fn fade_aliases() {
        assert_eq!("fadi 20".parse(), Ok(ControlEvent::FadeIn(20.0)));
        assert_eq!("fade_out 5".parse(), Ok(ControlEvent::FadeOut(5.0)));
        assert_eq!("fadeOut 5".parse(), Ok(ControlEvent::FadeOut(5.0)));
        assert_eq!("fade 50".parse(), Ok(ControlEvent::Fade(50.0)));
    }

    #[test]
    fn deserialize_collects_flags() {
        let ev: ControlEvent = "deserialize 0 1 1 0".parse().unwrap();
        assert_eq!(
            ev,
            ControlEvent::Deserialize(vec![false, true, true, false])
        );
    }

    #[test]
    fn malformed_messages() {
        assert_eq!("".parse::<ControlEvent>(), Err(EventError::Empty));
        assert_eq!(
            "connection 1 2".parse::<ControlEvent>(),
            Err(EventError::MissingArguments {
                message: "connection",
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            "fade abc".parse::<ControlEvent>(),
            Err(EventError::InvalidArgument {
                position: 0,
                token: "abc".to_string()
            })
        );
        assert_eq!(
            "-1 0 1".parse::<ControlEvent>(),
            Err(EventError::InvalidIndex(-1.0))
        );
        assert!(matches!(
            "bogus 1".parse::<ControlEvent>(),
            Err(EventError::UnknownMessage(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for line in ["connection 0 1 1", "clear", "deserialize 1 0", "fadeIn 12.5"] {
            let ev: ControlEvent = line.parse().unwrap();
            assert_eq!(ev.to_string(), line);
        }
    }

    #[test]
    fn response_display() {
        let r = Response::Serialized(vec![true, false, true]);
        assert_eq!(r.to_string(), "serialize 1 0 1");
        let r = Response::Connection(Connection::new(1, 2, false));
        assert_eq!(r.to_string(), "1 2 0");
    }
}
