//! Event scripts: one control event per line.
//!
//! ```text
//! # comments run to the end of the line
//! fade 20
//! connection 2 0 1
//! @0.5 0 1 1        # timestamped: applied half a second into a render
//! @1.25 clear;
//! ```
//!
//! A leading `@<seconds>` token schedules the event for `render`; `run`
//! applies events in file order and ignores timestamps.

use crossbar_core::{ControlEvent, EventError};
use thiserror::Error;

/// Why a script line was rejected.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The `@` token is not a finite, non-negative number of seconds.
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    /// The event itself did not parse.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    /// 1-based line number in the source.
    pub line: usize,
    /// Scheduled time in seconds, if the line carried one.
    pub at: Option<f64>,
    /// The event.
    pub event: ControlEvent,
}

/// Parses one line. Blank and comment-only lines yield `Ok(None)`.
pub fn parse_line(text: &str) -> Result<Option<(Option<f64>, ControlEvent)>, ScriptError> {
    let text = text.split_once('#').map_or(text, |(code, _)| code).trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (at, rest) = match text.strip_prefix('@') {
        Some(stamped) => {
            let (stamp, rest) = stamped.split_once(char::is_whitespace).unwrap_or((stamped, ""));
            let seconds = stamp
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| ScriptError::Timestamp(stamp.to_string()))?;
            (Some(seconds), rest)
        }
        None => (None, text),
    };

    Ok(Some((at, rest.parse()?)))
}

/// Parses a whole script, logging and skipping lines that do not parse.
///
/// Timestamped events are sorted by time; the sort is stable, so events
/// sharing a timestamp keep their file order. Untimed events count as time 0.
pub fn parse_script(source: &str) -> Vec<ScriptEvent> {
    let mut events = Vec::new();
    for (idx, text) in source.lines().enumerate() {
        match parse_line(text) {
            Ok(Some((at, event))) => events.push(ScriptEvent {
                line: idx + 1,
                at,
                event,
            }),
            Ok(None) => {}
            Err(err) => tracing::warn!(line = idx + 1, "skipping script line: {err}"),
        }
    }
    events.sort_by(|a, b| a.at.unwrap_or(0.0).total_cmp(&b.at.unwrap_or(0.0)));
    events
}
