//! Router: connection store and mixing engine driven together.
//!
//! A [`Router`] owns one [`ConnectionStore`] and one [`MixEngine`] with an
//! input port per matrix row and an output port per matrix column. Every
//! request goes through the store first; the engine then fades the
//! connection toward whatever state the store actually applied, so audio never
//! follows a relay connection the store rejected.
//!
//! ```rust
//! use crossbar_core::{ControlEvent, Response, Router, Topology};
//!
//! let mut router = Router::new(Topology::new(2, 0, 0), 48000.0, 64);
//! let mut replies = Vec::new();
//! router.handle(&"connection 0 1 1".parse().unwrap(), &mut |r| replies.push(r));
//! router.handle(&"connection 1 0 1".parse().unwrap(), &mut |r| replies.push(r));
//! assert_eq!(replies[1].to_string(), "1 0 0");
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::buffer::BufferPool;
use crate::engine::MixEngine;
use crate::event::{ControlEvent, Response};
use crate::store::{ConnectionStore, StoreError};
use crate::topology::{Connection, Topology};

/// Connection store plus mixing engine, kept in agreement.
#[derive(Debug, Clone)]
pub struct Router {
    store: ConnectionStore,
    engine: MixEngine,
}

impl Router {
    /// Creates a router with every connection off.
    ///
    /// # Arguments
    /// * `topology` - Relay, input and output counts
    /// * `sample_rate` - Sample rate in Hz
    /// * `max_block` - Largest block the engine mixes in one pass
    pub fn new(topology: Topology, sample_rate: f32, max_block: usize) -> Self {
        Self {
            store: ConnectionStore::new(topology),
            engine: MixEngine::new(topology.rows(), topology.cols(), sample_rate, max_block),
        }
    }

    /// The fixed topology.
    pub fn topology(&self) -> Topology {
        self.store.topology()
    }

    /// Read access to the connection store.
    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    /// Read access to the mixing engine.
    pub fn engine(&self) -> &MixEngine {
        &self.engine
    }

    /// Requests a connection change; the engine follows the applied state.
    ///
    /// Returns the applied connection, or `None` if out of range.
    pub fn set_connection(&mut self, row: usize, col: usize, active: bool) -> Option<Connection> {
        connect(&mut self.store, &mut self.engine, row, col, active)
    }

    /// Switches every connection off, fading each one out.
    pub fn clear(&mut self) {
        self.store.clear();
        self.engine.sync(&self.store);
    }

    /// Restores a serialized matrix and fades the engine to match it.
    ///
    /// Nothing changes if the length is wrong.
    pub fn deserialize(&mut self, values: &[bool]) -> Result<(), StoreError> {
        self.store.deserialize(values)?;
        self.engine.sync(&self.store);
        Ok(())
    }

    /// Flattened matrix, row-major.
    pub fn serialize(&self) -> Vec<bool> {
        self.store.serialize()
    }

    /// Sets the fade-in time in milliseconds.
    pub fn set_fade_in_ms(&mut self, ms: f32) {
        self.engine.set_fade_in_ms(ms);
    }

    /// Sets the fade-out time in milliseconds.
    pub fn set_fade_out_ms(&mut self, ms: f32) {
        self.engine.set_fade_out_ms(ms);
    }

    /// Sets both fade times in milliseconds.
    pub fn set_fade_ms(&mut self, ms: f32) {
        self.engine.set_fade_ms(ms);
    }

    /// Updates the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.engine.set_sample_rate(sample_rate);
    }

    /// Re-sizes the engine for a new maximum block size. Allocates.
    pub fn set_max_block_size(&mut self, max_block: usize) {
        self.engine.set_max_block_size(max_block);
    }

    /// Applies one control event, passing every response to `emit`.
    ///
    /// - `connection` emits the applied triple, nothing if out of range;
    /// - `clear` and `dump` emit one triple per matrix entry;
    /// - `serialize` emits the flat list;
    /// - `deserialize` and the fade messages emit nothing.
    pub fn handle<F>(&mut self, event: &ControlEvent, emit: &mut F)
    where
        F: FnMut(Response),
    {
        dispatch(&mut self.store, &mut self.engine, event, emit);
    }

    /// Emits every connection triple in row-major order.
    pub fn dump<F>(&self, emit: &mut F)
    where
        F: FnMut(Response),
    {
        dump(&self.store, emit);
    }

    /// Mixes one block; see [`MixEngine::process`].
    #[inline]
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.engine.process(inputs, outputs);
    }

    /// Mixes one block between pool slots; see [`MixEngine::process_slots`].
    #[inline]
    pub fn process_slots(
        &mut self,
        pool: &mut BufferPool,
        input_slots: &[usize],
        output_slots: &[usize],
        frames: usize,
    ) {
        self.engine
            .process_slots(pool, input_slots, output_slots, frames);
    }

    /// Splits into a control half and an audio half for two-thread hosts.
    ///
    /// See [`crate::bridge`].
    #[cfg(feature = "std")]
    pub fn split(self, capacity: usize) -> (crate::bridge::RouterControl, crate::bridge::RouterAudio) {
        crate::bridge::split(self.store, self.engine, capacity)
    }
}

/// Receiver of the gain changes that follow store decisions.
///
/// Implemented by [`MixEngine`] for single-threaded use and by the command
/// queue of the real-time split.
pub(crate) trait GainControl {
    fn set_gain(&mut self, row: usize, col: usize, active: bool);
    fn set_fade_in_ms(&mut self, ms: f32);
    fn set_fade_out_ms(&mut self, ms: f32);
    fn set_fade_ms(&mut self, ms: f32);

    /// Brings every gain in line with the store.
    fn sync(&mut self, store: &ConnectionStore) {
        for c in store.dump_all() {
            self.set_gain(c.row, c.col, c.active);
        }
    }
}

impl GainControl for MixEngine {
    fn set_gain(&mut self, row: usize, col: usize, active: bool) {
        self.set_connection_gain(row, col, active);
    }

    fn set_fade_in_ms(&mut self, ms: f32) {
        MixEngine::set_fade_in_ms(self, ms);
    }

    fn set_fade_out_ms(&mut self, ms: f32) {
        MixEngine::set_fade_out_ms(self, ms);
    }

    fn set_fade_ms(&mut self, ms: f32) {
        MixEngine::set_fade_ms(self, ms);
    }

    /// Only retargets ramps that disagree, so settled connections keep
    /// their state and running fades are not restarted.
    fn sync(&mut self, store: &ConnectionStore) {
        for c in store.dump_all() {
            let target = if c.active { 1.0 } else { 0.0 };
            if self.target_gain(c.row, c.col) != Some(target) {
                self.set_connection_gain(c.row, c.col, c.active);
            }
        }
    }
}

pub(crate) fn connect<G: GainControl>(
    store: &mut ConnectionStore,
    gains: &mut G,
    row: usize,
    col: usize,
    active: bool,
) -> Option<Connection> {
    let applied = store.set_connection(row, col, active)?;
    gains.set_gain(row, col, applied);
    Some(Connection::new(row, col, applied))
}

pub(crate) fn dump<F: FnMut(Response)>(store: &ConnectionStore, emit: &mut F) {
    for connection in store.dump_all() {
        emit(Response::Connection(connection));
    }
}

pub(crate) fn dispatch<G, F>(
    store: &mut ConnectionStore,
    gains: &mut G,
    event: &ControlEvent,
    emit: &mut F,
) where
    G: GainControl,
    F: FnMut(Response),
{
    match event {
        ControlEvent::Connection { row, col, active } => {
            if let Some(applied) = connect(store, gains, *row, *col, *active) {
                emit(Response::Connection(applied));
            }
        }
        ControlEvent::Clear => {
            store.clear();
            gains.sync(store);
            dump(store, emit);
        }
        ControlEvent::Dump => dump(store, emit),
        ControlEvent::Serialize => emit(Response::Serialized(store.serialize())),
        ControlEvent::Deserialize(values) => {
            // A size mismatch is a no-op by contract.
            if store.deserialize(values).is_ok() {
                gains.sync(store);
            }
        }
        ControlEvent::FadeIn(ms) => gains.set_fade_in_ms(*ms),
        ControlEvent::FadeOut(ms) => gains.set_fade_out_ms(*ms),
        ControlEvent::Fade(ms) => gains.set_fade_ms(*ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(router: &mut Router, line: &str) -> Vec<Response> {
        let mut out = Vec::new();
        router.handle(&line.parse().unwrap(), &mut |r| out.push(r));
        out
    }

    #[test]
    fn connection_drives_engine_gain() {
        let mut router = Router::new(Topology::new(0, 1, 1), 1000.0, 16);
        router.set_fade_ms(0.0);
        assert_eq!(
            collect(&mut router, "connection 0 0 1"),
            vec![Response::Connection(Connection::new(0, 0, true))]
        );

        let input = [0.5; 4];
        let mut out = [0.0; 4];
        router.process(&[&input], &mut [&mut out]);
        assert_eq!(out, [0.5; 4]);
    }

    #[test]
    fn rejected_relay_stays_silent() {
        let mut router = Router::new(Topology::new(2, 0, 0), 1000.0, 16);
        router.set_fade_ms(0.0);
        collect(&mut router, "0 1 1");
        let replies = collect(&mut router, "1 0 1");
        assert_eq!(replies, vec![Response::Connection(Connection::new(1, 0, false))]);
        assert_eq!(router.engine().target_gain(1, 0), Some(0.0));
        assert_eq!(router.engine().target_gain(0, 1), Some(1.0));
    }

    #[test]
    fn out_of_range_emits_nothing() {
        let mut router = Router::new(Topology::new(1, 1, 1), 48000.0, 16);
        assert!(collect(&mut router, "5 0 1").is_empty());
    }

    #[test]
    fn clear_dumps_all_off_and_fades_out() {
        let mut router = Router::new(Topology::new(1, 1, 1), 1000.0, 16);
        router.set_fade_ms(0.0);
        collect(&mut router, "1 1 1");
        router.set_fade_out_ms(4.0);

        let replies = collect(&mut router, "clear");
        assert_eq!(replies.len(), 4);
        assert!(replies.iter().all(|r| matches!(
            r,
            Response::Connection(c) if !c.active
        )));
        assert_eq!(router.engine().target_gain(1, 1), Some(0.0));
        assert_eq!(router.engine().gain(1, 1), Some(1.0), "fades, not jumps");
    }

    #[test]
    fn serialize_and_deserialize_events() {
        let mut router = Router::new(Topology::new(1, 1, 1), 48000.0, 16);
        collect(&mut router, "1 0 1");
        let replies = collect(&mut router, "serialize");
        assert_eq!(replies, vec![Response::Serialized(vec![false, false, true, false])]);

        let mut other = Router::new(Topology::new(1, 1, 1), 48000.0, 16);
        assert!(collect(&mut other, "deserialize 0 0 1 0").is_empty());
        assert!(other.store().is_connected(1, 0));
        assert_eq!(other.engine().target_gain(1, 0), Some(1.0));
    }

    #[test]
    fn deserialize_wrong_length_changes_nothing() {
        let mut router = Router::new(Topology::new(1, 1, 1), 48000.0, 16);
        collect(&mut router, "1 0 1");
        collect(&mut router, "deserialize 0 0 0");
        assert!(router.store().is_connected(1, 0));
        assert_eq!(router.engine().target_gain(1, 0), Some(1.0));
    }

    #[test]
    fn fade_events_reach_engine() {
        let mut router = Router::new(Topology::new(0, 1, 1), 48000.0, 16);
        collect(&mut router, "fadeIn 10");
        collect(&mut router, "fadeOut 20");
        assert_eq!(router.engine().fade_in_samples(), 480);
        assert_eq!(router.engine().fade_out_samples(), 960);
        collect(&mut router, "fade 1");
        assert_eq!(router.engine().fade_in_samples(), 48);
        assert_eq!(router.engine().fade_out_samples(), 48);
    }
}
