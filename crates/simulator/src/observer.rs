//! Event subscription (`spec.md` §4.5, §9 Design Notes).
//!
//! The source event-emitter library and its identity-equality context object
//! are replaced with a first-class trait (default no-op methods, matching
//! `examples/bluealloy-revm/crates/inspector/src/inspector.rs`'s shape) and an
//! opaque token generated from an atomic counter rather than pointer
//! identity.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Bytes, U256};

/// An opaque per-simulation correlation token.
///
/// Subscribers correlate events to a simulation by this value, never by
/// identity — see `spec.md` §9's note on replacing the source's "allocate an
/// empty object and rely on identity equality" pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh, process-wide-unique token.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single EVM step's observable state, passed to [`Observer::step`].
#[derive(Debug, Clone)]
pub struct StepEvent<'a> {
    /// Program counter at the start of this step.
    pub pc: usize,
    /// The opcode about to execute.
    pub opcode: u8,
    /// Gas remaining before this step.
    pub gas_remaining: u64,
    /// Current call depth.
    pub depth: usize,
    /// The operand stack, top-of-stack last.
    pub stack: &'a [U256],
}

/// Decoded arguments from a console-log-style call (`spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct ConsoleLogEvent {
    /// The raw call data the console-log pattern matched on.
    pub data: Bytes,
}

/// Subscribes to a Simulator run's four event channels.
///
/// All methods default to no-ops; implementors override only the channels
/// they care about. Delivery is synchronous with the EVM step the orchestrator
/// is executing, so an implementation must not block.
pub trait Observer {
    /// Fired exactly once before the first EVM step.
    fn before(&mut self, _context: ContextId) {}

    /// Fired for each EVM opcode step.
    fn step(&mut self, _context: ContextId, _event: &StepEvent<'_>) {}

    /// Fired when a step corresponds to a call into the console-log pattern.
    fn console_log(&mut self, _context: ContextId, _event: &ConsoleLogEvent) {}

    /// Fired exactly once after a successful `run` (never after one that raised).
    fn after(&mut self, _context: ContextId) {}
}

/// An [`Observer`] that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}
