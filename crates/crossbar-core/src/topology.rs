//! Routing topology and connection addressing.
//!
//! A [`Topology`] fixes the number of relays, pure inputs and pure outputs for
//! the lifetime of a store or router. Sources (rows) are the relays followed by
//! the pure inputs; destinations (columns) are the relays followed by the pure
//! outputs:
//!
//! ```text
//!                 col: 0 .. R      R .. R+O
//! row 0 .. R       relay → relay   relay → output
//! row R .. R+I     input → relay   input → output
//! ```
//!
//! Only the top-left `R × R` block can form feedback loops.

/// Fixed node counts of a routing matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Topology {
    /// Nodes that both send and receive within the matrix.
    pub relays: usize,
    /// Pure sources.
    pub inputs: usize,
    /// Pure destinations.
    pub outputs: usize,
}

impl Topology {
    /// Creates a topology from its three counts.
    pub const fn new(relays: usize, inputs: usize, outputs: usize) -> Self {
        Self {
            relays,
            inputs,
            outputs,
        }
    }

    /// Number of source rows (`relays + inputs`).
    #[inline]
    pub const fn rows(&self) -> usize {
        self.relays + self.inputs
    }

    /// Number of destination columns (`relays + outputs`).
    #[inline]
    pub const fn cols(&self) -> usize {
        self.relays + self.outputs
    }

    /// Number of entries in the full matrix.
    #[inline]
    pub const fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// True when the full matrix has no entries.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `(row, col)` addresses an entry of the full matrix.
    #[inline]
    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows() && col < self.cols()
    }

    /// True if both endpoints are relays.
    #[inline]
    pub const fn is_relay_pair(&self, row: usize, col: usize) -> bool {
        row < self.relays && col < self.relays
    }

    /// Row-major index of `(row, col)` in the full matrix.
    ///
    /// Callers must check [`contains`](Self::contains) first.
    #[inline]
    pub(crate) const fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols() + col
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub(crate) const fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols(), index % self.cols())
    }
}

impl core::fmt::Display for Topology {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} relays, {} inputs, {} outputs ({}x{})",
            self.relays,
            self.inputs,
            self.outputs,
            self.rows(),
            self.cols()
        )
    }
}

/// One entry of the connection matrix, as reported back to a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Source index in `0..rows`.
    pub row: usize,
    /// Destination index in `0..cols`.
    pub col: usize,
    /// Whether the connection is active.
    pub active: bool,
}

impl Connection {
    /// Creates a connection triple.
    pub const fn new(row: usize, col: usize, active: bool) -> Self {
        Self { row, col, active }
    }
}

impl core::fmt::Display for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.row, self.col, u8::from(self.active))
    }
}
