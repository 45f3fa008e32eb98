//! Crossbar Core - feedback-safe N×M routing matrix
//!
//! This crate provides the control plane and the audio plane of a dynamic
//! routing matrix, designed for real-time use with zero allocation in the
//! audio path.
//!
//! # Core Abstractions
//!
//! ## Control Plane
//!
//! - [`ConnectionStore`] - Boolean connection matrix that refuses any relay
//!   connection that would close a feedback loop
//! - [`Topology`] - Fixed relay/input/output counts and matrix addressing
//! - [`ControlEvent`] / [`Response`] - Host message protocol
//!
//! ## Audio Plane
//!
//! - [`MixEngine`] - Every output is a ramped-gain sum of every input
//! - [`Ramp`] - Linear, interruptible gain ramps for click-free toggles
//! - [`BufferPool`] - Slot-addressed host buffers, input/output aliasing allowed
//!
//! ## Integration
//!
//! - [`Router`] - Store and engine driven together by control events
//! - [`bridge`] - Control-thread / audio-thread split (requires `std`)
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! crossbar-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use crossbar_core::{Router, Topology};
//!
//! // two relays, one external input, one external output
//! let mut router = Router::new(Topology::new(2, 1, 1), 48000.0, 256);
//! router.set_fade_in_ms(5.0);
//! router.set_fade_out_ms(50.0);
//!
//! router.set_connection(2, 0, true); // input → relay 0
//! router.set_connection(0, 1, true); // relay 0 → relay 1
//! router.set_connection(1, 2, true); // relay 1 → output
//! let back = router.set_connection(1, 0, true).unwrap();
//! assert!(!back.active, "relay 1 → relay 0 would feed back");
//!
//! let silence = [0.0; 256];
//! let inputs = [&silence[..]; 3];
//! let (mut a, mut b, mut c) = ([0.0; 256], [0.0; 256], [0.0; 256]);
//! router.process(&inputs, &mut [&mut a, &mut b, &mut c]);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations or locks in audio processing paths
//! - **Never aborts**: Malformed or cycle-creating requests are answered, not
//!   panicked on
//! - **Rate separation**: Cycle checks happen at control rate only

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
pub mod bridge;
pub mod buffer;
pub mod engine;
pub mod event;
pub mod ramp;
pub mod router;
pub mod store;
pub mod topology;

// Re-export main types at crate root
#[cfg(feature = "std")]
pub use bridge::{RouterAudio, RouterCommand, RouterControl};
pub use buffer::BufferPool;
pub use engine::{DEFAULT_FADE_MS, MixEngine, ms_to_samples};
pub use event::{ControlEvent, EventError, Response};
pub use ramp::Ramp;
pub use router::Router;
pub use store::{ConnectionStore, StoreError};
pub use topology::{Connection, Topology};
