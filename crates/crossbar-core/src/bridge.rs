//! Two-thread operation: control thread and audio thread.
//!
//! [`Router`](crate::Router) assumes control messages and audio blocks are
//! interleaved on one thread. Hosts that run audio on a dedicated real-time
//! thread split the router instead:
//!
//! - [`RouterControl`] stays on the control thread. It owns the
//!   [`ConnectionStore`], evaluates every request (including cycle checks)
//!   and turns the outcome into [`RouterCommand`]s.
//! - [`RouterAudio`] moves to the audio thread. It owns the [`MixEngine`] and
//!   drains pending commands at the start of every block.
//!
//! Commands travel through a bounded `crossbeam` channel. The control side
//! never blocks: if the queue is full the command is dropped, counted, and
//! the control half is marked stale until [`RouterControl::resync`] succeeds.
//! The audio side never blocks or allocates. A command is applied whole,
//! between blocks, so a block never sees a half-applied toggle.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::buffer::BufferPool;
use crate::engine::MixEngine;
use crate::event::{ControlEvent, Response};
use crate::router::{GainControl, connect, dispatch};
use crate::store::ConnectionStore;
use crate::topology::{Connection, Topology};

/// A change for the audio thread to apply at the next block boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouterCommand {
    /// Fade `(input, output)` in or out.
    Gain {
        /// Input port (matrix row).
        input: usize,
        /// Output port (matrix column).
        output: usize,
        /// Fade in when true, out when false.
        active: bool,
    },
    /// New fade times in milliseconds.
    Fades {
        /// Fade-in time.
        fade_in_ms: f32,
        /// Fade-out time.
        fade_out_ms: f32,
    },
    /// New sample rate in Hz.
    SampleRate(f32),
}

impl RouterCommand {
    /// Applies the command to an engine.
    pub fn apply(self, engine: &mut MixEngine) {
        match self {
            Self::Gain {
                input,
                output,
                active,
            } => engine.set_connection_gain(input, output, active),
            Self::Fades {
                fade_in_ms,
                fade_out_ms,
            } => {
                engine.set_fade_in_ms(fade_in_ms);
                engine.set_fade_out_ms(fade_out_ms);
            }
            Self::SampleRate(sr) => engine.set_sample_rate(sr),
        }
    }
}

/// Sending end of the command queue, with the state needed to resend.
#[derive(Debug)]
struct CommandQueue {
    tx: Sender<RouterCommand>,
    fade_in_ms: f32,
    fade_out_ms: f32,
    sample_rate: f32,
    dropped: u64,
    stale: bool,
}

impl CommandQueue {
    fn send(&mut self, cmd: RouterCommand) {
        match self.tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                self.stale = true;
                #[cfg(feature = "tracing")]
                tracing::debug!("router_queue: dropped {cmd:?}");
            }
        }
    }

    fn send_fades(&mut self) {
        self.send(RouterCommand::Fades {
            fade_in_ms: self.fade_in_ms,
            fade_out_ms: self.fade_out_ms,
        });
    }
}

impl GainControl for CommandQueue {
    fn set_gain(&mut self, row: usize, col: usize, active: bool) {
        self.send(RouterCommand::Gain {
            input: row,
            output: col,
            active,
        });
    }

    fn set_fade_in_ms(&mut self, ms: f32) {
        self.fade_in_ms = ms;
        self.send_fades();
    }

    fn set_fade_out_ms(&mut self, ms: f32) {
        self.fade_out_ms = ms;
        self.send_fades();
    }

    fn set_fade_ms(&mut self, ms: f32) {
        self.fade_in_ms = ms;
        self.fade_out_ms = ms;
        self.send_fades();
    }
}

/// Control-thread half of a split router.
#[derive(Debug)]
pub struct RouterControl {
    store: ConnectionStore,
    queue: CommandQueue,
}

impl RouterControl {
    /// The fixed topology.
    pub fn topology(&self) -> Topology {
        self.store.topology()
    }

    /// Read access to the connection store.
    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    /// Applies one control event; see [`Router::handle`](crate::Router::handle).
    pub fn handle<F>(&mut self, event: &ControlEvent, emit: &mut F)
    where
        F: FnMut(Response),
    {
        dispatch(&mut self.store, &mut self.queue, event, emit);
    }

    /// Requests a connection change and queues the resulting fade.
    pub fn set_connection(&mut self, row: usize, col: usize, active: bool) -> Option<Connection> {
        connect(&mut self.store, &mut self.queue, row, col, active)
    }

    /// Queues a sample-rate change.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.queue.sample_rate = sample_rate;
        self.queue.send(RouterCommand::SampleRate(sample_rate));
    }

    /// Commands dropped because the queue was full.
    pub fn dropped_commands(&self) -> u64 {
        self.queue.dropped
    }

    /// True if a dropped command may have left the audio side out of date.
    pub fn is_stale(&self) -> bool {
        self.queue.stale
    }

    /// Resends the sample rate, fade times and every connection.
    ///
    /// Returns true if everything fit into the queue. Call again later (after
    /// the audio thread has drained) if it returns false.
    pub fn resync(&mut self) -> bool {
        self.queue.stale = false;
        self.queue.send(RouterCommand::SampleRate(self.queue.sample_rate));
        self.queue.send_fades();
        self.queue.sync(&self.store);
        !self.queue.stale
    }
}

/// Audio-thread half of a split router.
#[derive(Debug)]
pub struct RouterAudio {
    engine: MixEngine,
    rx: Receiver<RouterCommand>,
}

impl RouterAudio {
    /// Read access to the engine.
    pub fn engine(&self) -> &MixEngine {
        &self.engine
    }

    /// Applies every pending command. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(cmd) = self.rx.try_recv() {
            cmd.apply(&mut self.engine);
            applied += 1;
        }
        applied
    }

    /// Drains pending commands, then mixes one block.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.drain();
        self.engine.process(inputs, outputs);
    }

    /// Drains pending commands, then mixes one block between pool slots.
    pub fn process_slots(
        &mut self,
        pool: &mut BufferPool,
        input_slots: &[usize],
        output_slots: &[usize],
        frames: usize,
    ) {
        self.drain();
        self.engine
            .process_slots(pool, input_slots, output_slots, frames);
    }
}

pub(crate) fn split(
    store: ConnectionStore,
    engine: MixEngine,
    capacity: usize,
) -> (RouterControl, RouterAudio) {
    let (tx, rx) = bounded(capacity.max(1));
    let queue = CommandQueue {
        tx,
        fade_in_ms: engine.fade_in_ms(),
        fade_out_ms: engine.fade_out_ms(),
        sample_rate: engine.sample_rate(),
        dropped: 0,
        stale: false,
    };
    (RouterControl { store, queue }, RouterAudio { engine, rx })
}
