//! Connection state store with feedback-loop prevention.
//!
//! [`ConnectionStore`] is the authority on which connections of a routing
//! matrix are active. It keeps two views of the same state:
//!
//! - the full `(R+I) × (R+O)` matrix, freely settable outside the relay block;
//! - the `R × R` relay sub-matrix, which must always induce an acyclic graph.
//!
//! A relay connection `row → col` is accepted only if `col` cannot already
//! reach `row` through active relay connections. Otherwise the request is
//! rejected and the connection is reported as off, so the caller can reconcile
//! its view with the actual state.
//!
//! All operations are control-rate and never touch sample buffers.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::topology::{Connection, Topology};

/// Errors returned by bulk store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A serialized state does not have one value per matrix entry.
    LengthMismatch {
        /// Number of entries in the matrix.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LengthMismatch { expected, found } => write!(
                f,
                "serialized state has {found} values, expected {expected}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StoreError {}

/// Boolean connection matrix with an acyclic relay sub-graph.
///
/// # Example
///
/// ```rust
/// use crossbar_core::{ConnectionStore, Topology};
///
/// let mut store = ConnectionStore::new(Topology::new(2, 0, 0));
/// assert_eq!(store.set_connection(0, 1, true), Some(true));
/// // 1 → 0 would close the loop 0 → 1 → 0
/// assert_eq!(store.set_connection(1, 0, true), Some(false));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    topology: Topology,
    /// Row-major `rows × cols` matrix.
    all: Vec<bool>,
    /// Row-major `relays × relays` matrix.
    relays: Vec<bool>,
}

impl ConnectionStore {
    /// Creates a store with every connection off.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            all: vec![false; topology.len()],
            relays: vec![false; topology.relays * topology.relays],
        }
    }

    /// The fixed topology of this store.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Requests a connection change and returns the state actually applied.
    ///
    /// Returns `None` when `(row, col)` is out of range; nothing changes.
    /// For relay pairs an activation that would close a cycle is rejected and
    /// `Some(false)` is returned. Every other request is honoured.
    pub fn set_connection(&mut self, row: usize, col: usize, active: bool) -> Option<bool> {
        if !self.topology.contains(row, col) {
            return None;
        }

        let applied = if self.topology.is_relay_pair(row, col) {
            let relay_idx = self.relay_index(row, col);
            // Clear first so re-enabling an existing edge is never seen as its
            // own cycle.
            self.relays[relay_idx] = false;
            let accepted = active && !self.relay_reaches(col, row);
            self.relays[relay_idx] = accepted;

            #[cfg(feature = "tracing")]
            if active && !accepted {
                tracing::debug!("relay_reject: {row} → {col} would close a cycle");
            }

            accepted
        } else {
            active
        };

        let idx = self.topology.index(row, col);
        self.all[idx] = applied;
        Some(applied)
    }

    /// Returns whether `(row, col)` is active. Out-of-range entries are off.
    pub fn is_connected(&self, row: usize, col: usize) -> bool {
        self.topology.contains(row, col) && self.all[self.topology.index(row, col)]
    }

    /// Returns true if activating relay connection `row → col` would be
    /// rejected. Always false outside the relay block.
    pub fn would_create_cycle(&self, row: usize, col: usize) -> bool {
        if !self.topology.is_relay_pair(row, col) {
            return false;
        }
        if self.relays[self.relay_index(row, col)] {
            // Already accepted, so the graph stays as it is.
            return false;
        }
        self.relay_reaches(col, row)
    }

    /// Every entry of the full matrix in row-major order.
    pub fn dump_all(&self) -> impl Iterator<Item = Connection> + '_ {
        self.all.iter().enumerate().map(|(idx, &active)| {
            let (row, col) = self.topology.position(idx);
            Connection::new(row, col, active)
        })
    }

    /// Only the active connections, in row-major order.
    pub fn active(&self) -> impl Iterator<Item = Connection> + '_ {
        self.dump_all().filter(|c| c.active)
    }

    /// Number of active connections.
    pub fn active_count(&self) -> usize {
        self.all.iter().filter(|&&a| a).count()
    }

    /// Turns every connection off.
    pub fn clear(&mut self) {
        self.all.fill(false);
        self.relays.fill(false);
    }

    /// Flattens the full matrix in row-major order.
    pub fn serialize(&self) -> Vec<bool> {
        self.all.clone()
    }

    /// Restores a state produced by [`serialize`](Self::serialize).
    ///
    /// The length must match the matrix exactly or nothing happens. Entries
    /// are replayed through [`set_connection`](Self::set_connection) starting
    /// from an empty matrix, so the cycle rule is re-applied rather than
    /// trusted: a state that was valid when saved loads back unchanged, and an
    /// invalid one is repaired by dropping the offending relay connections.
    pub fn deserialize(&mut self, values: &[bool]) -> Result<(), StoreError> {
        if values.len() != self.topology.len() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "store_deserialize: rejected {} values, expected {}",
                values.len(),
                self.topology.len()
            );
            return Err(StoreError::LengthMismatch {
                expected: self.topology.len(),
                found: values.len(),
            });
        }

        self.clear();
        for (idx, &active) in values.iter().enumerate() {
            let (row, col) = self.topology.position(idx);
            self.set_connection(row, col, active);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("store_deserialize: {} active", self.active_count());

        Ok(())
    }

    /// True if no directed cycle exists among active relay connections.
    ///
    /// The store maintains this at all times; the check exists for tests and
    /// diagnostics.
    pub fn relays_acyclic(&self) -> bool {
        (0..self.topology.relays).all(|relay| {
            (0..self.topology.relays)
                .filter(|&next| self.relays[self.relay_index(relay, next)])
                .all(|next| !self.relay_reaches(next, relay))
        })
    }

    #[inline]
    fn relay_index(&self, row: usize, col: usize) -> usize {
        row * self.topology.relays + col
    }

    /// DFS reachability over active relay connections: can `from` reach `to`?
    fn relay_reaches(&self, from: usize, to: usize) -> bool {
        let n = self.topology.relays;
        let mut visited = vec![false; n];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited[current] {
                continue;
            }
            visited[current] = true;

            let row = &self.relays[current * n..(current + 1) * n];
            for (next, &active) in row.iter().enumerate() {
                if active && !visited[next] {
                    stack.push(next);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relays_only(n: usize) -> ConnectionStore {
        ConnectionStore::new(Topology::new(n, 0, 0))
    }

    #[test]
    fn two_cycle_rejected() {
        let mut store = relays_only(2);
        assert_eq!(store.set_connection(0, 1, true), Some(true));
        assert_eq!(store.set_connection(1, 0, true), Some(false));
        assert!(store.is_connected(0, 1));
        assert!(!store.is_connected(1, 0));
    }

    #[test]
    fn self_connection_rejected() {
        let mut store = relays_only(3);
        assert_eq!(store.set_connection(2, 2, true), Some(false));
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn indirect_cycle_rejected() {
        let mut store = relays_only(3);
        store.set_connection(0, 1, true);
        store.set_connection(1, 2, true);
        assert!(store.would_create_cycle(2, 0));
        assert_eq!(store.set_connection(2, 0, true), Some(false));
        assert!(store.relays_acyclic());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut store = relays_only(4);
        assert_eq!(store.set_connection(0, 1, true), Some(true));
        assert_eq!(store.set_connection(0, 2, true), Some(true));
        assert_eq!(store.set_connection(1, 3, true), Some(true));
        assert_eq!(store.set_connection(2, 3, true), Some(true));
        assert_eq!(store.active_count(), 4);
    }

    #[test]
    fn reenabling_active_edge_is_accepted() {
        let mut store = relays_only(2);
        store.set_connection(0, 1, true);
        assert_eq!(store.set_connection(0, 1, true), Some(true));
        assert!(!store.would_create_cycle(0, 1));
    }

    #[test]
    fn breaking_a_path_allows_reverse_edge() {
        let mut store = relays_only(3);
        store.set_connection(0, 1, true);
        store.set_connection(1, 2, true);
        assert_eq!(store.set_connection(2, 0, true), Some(false));

        assert_eq!(store.set_connection(1, 2, false), Some(false));
        assert_eq!(store.set_connection(2, 0, true), Some(true));
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let mut store = relays_only(3);
        store.set_connection(0, 1, true);
        store.set_connection(1, 2, true);
        let before = store.serialize();
        store.set_connection(2, 0, true);
        assert_eq!(store.serialize(), before);
    }

    #[test]
    fn non_relay_entries_are_verbatim() {
        // 1 relay, 1 input, 1 output: rows = [relay, input], cols = [relay, output]
        let mut store = ConnectionStore::new(Topology::new(1, 1, 1));
        assert_eq!(store.set_connection(0, 1, true), Some(true));
        assert_eq!(store.set_connection(1, 0, true), Some(true));
        assert_eq!(store.set_connection(1, 1, true), Some(true));
        assert_eq!(store.set_connection(0, 0, true), Some(false));
        assert_eq!(store.active_count(), 3);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut store = ConnectionStore::new(Topology::new(1, 1, 1));
        assert_eq!(store.set_connection(2, 0, true), None);
        assert_eq!(store.set_connection(0, 2, true), None);
        assert_eq!(store.active_count(), 0);
        assert!(!store.is_connected(5, 5));
    }

    #[test]
    fn dump_is_row_major() {
        let mut store = ConnectionStore::new(Topology::new(1, 1, 1));
        store.set_connection(1, 0, true);
        let dumped: Vec<Connection> = store.dump_all().collect();
        assert_eq!(
            dumped,
            vec![
                Connection::new(0, 0, false),
                Connection::new(0, 1, false),
                Connection::new(1, 0, true),
                Connection::new(1, 1, false),
            ]
        );
    }

    #[test]
    fn clear_turns_everything_off() {
        let mut store = ConnectionStore::new(Topology::new(2, 1, 1));
        store.set_connection(0, 1, true);
        store.set_connection(2, 2, true);
        store.clear();
        assert!(store.dump_all().all(|c| !c.active));
        // Relay view is cleared too: the reverse edge is now allowed.
        assert_eq!(store.set_connection(1, 0, true), Some(true));
    }

    #[test]
    fn serialize_roundtrip() {
        let mut store = ConnectionStore::new(Topology::new(3, 1, 2));
        store.set_connection(0, 1, true);
        store.set_connection(1, 2, true);
        store.set_connection(3, 4, true);
        let saved = store.serialize();
        assert_eq!(saved.len(), 4 * 5);

        let mut restored = ConnectionStore::new(store.topology());
        restored.deserialize(&saved).unwrap();
        assert_eq!(restored.serialize(), saved);
    }

    #[test]
    fn deserialize_wrong_length_is_noop() {
        let mut store = relays_only(2);
        store.set_connection(0, 1, true);
        let err = store.deserialize(&[true; 3]).unwrap_err();
        assert_eq!(
            err,
            StoreError::LengthMismatch {
                expected: 4,
                found: 3
            }
        );
        assert!(store.is_connected(0, 1));
    }

    #[test]
    fn deserialize_repairs_cyclic_payload() {
        let mut store = relays_only(2);
        store.deserialize(&[false, true, true, false]).unwrap();
        assert!(store.relays_acyclic());
        assert!(store.is_connected(0, 1));
        assert!(!store.is_connected(1, 0));
    }

    #[test]
    fn deserialize_ignores_prior_state() {
        let mut store = relays_only(2);
        store.set_connection(1, 0, true);
        store.deserialize(&[false, true, false, false]).unwrap();
        assert!(store.is_connected(0, 1));
        assert!(!store.is_connected(1, 0));
    }
}
