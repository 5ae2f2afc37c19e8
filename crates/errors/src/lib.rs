//! Error types shared by the transaction simulation core.
//!
//! The message text of [`OverrideError`] and the five-variant family below it is
//! part of the external contract: RPC clients match on these strings, so they are
//! reproduced verbatim rather than paraphrased.

#![warn(missing_docs, unreachable_pub, rust_2018_idioms)]

use alloy_primitives::{Address, Bytes};
use revm_primitives::EVMError;
use thiserror::Error;

/// Which override field a validation error applies to.
///
/// Formats as the literal prefix ("State" / "StateDiff") used by the stable
/// error strings in [`OverrideError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    /// The `state` (replace-whole-storage) override field.
    State,
    /// The `stateDiff` (merge-into-storage) override field.
    StateDiff,
}

impl core::fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::State => f.write_str("State"),
            Self::StateDiff => f.write_str("StateDiff"),
        }
    }
}

/// Errors raised while applying `CallOverride`s to the state overlay.
///
/// These are rejected before the EVM is ever invoked (`spec.md` §4.2, §7 kind 1).
/// The message text is an external contract reproduced verbatim from the spec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// `state` and `stateDiff` were both present for the same address.
    #[error("both state and stateDiff overrides specified")]
    ConflictingStateOverrides {
        /// The address whose override specified both fields.
        address: Address,
    },
    /// A storage key was not a 66-character `0x`-prefixed hex string.
    #[error("{kind} override slot must be a 64 character hex string. Received {received} character string.")]
    InvalidSlotLength {
        /// Which override field (`state` or `stateDiff`) this came from.
        kind: OverrideKind,
        /// The number of characters actually received.
        received: usize,
    },
    /// A storage value was not a 66-character `0x`-prefixed hex string.
    #[error("{kind} override data must be a 64 character hex string. Received {received} character string.")]
    InvalidValueLength {
        /// Which override field (`state` or `stateDiff`) this came from.
        kind: OverrideKind,
        /// The number of characters actually received.
        received: usize,
    },
    /// A storage value was missing, `null`, or not hex at all.
    #[error("{kind} override data not valid. Received: {received}")]
    InvalidValueFormat {
        /// Which override field (`state` or `stateDiff`) this came from.
        kind: OverrideKind,
        /// A debug rendering of what was actually received.
        received: String,
    },
}

/// The VM-internal failure surfaced by a completed (or short-circuited) EVM run.
///
/// Mirrors `spec.md`'s `EVMResult.exceptionError`. `OutOfGas` is the only variant
/// the Simulator itself can produce without invoking the EVM (see [`CallError`]);
/// the rest are relayed from the underlying `revm` execution result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExceptionKind {
    /// `tx.gas` did not cover intrinsic gas; the EVM was never invoked (invariant I2).
    #[error("out of gas")]
    OutOfGas,
    /// The contract executed a `REVERT`.
    #[error("execution reverted")]
    Revert,
    /// An undefined opcode was encountered.
    #[error("invalid opcode")]
    InvalidOpcode,
    /// A stack underflow occurred.
    #[error("stack underflow")]
    StackUnderflow,
    /// Any other VM-internal halt reason, carrying `revm`'s own description.
    #[error("{0}")]
    Other(String),
}

/// Raised when a `run` (or an iteration of `createAccessList`) produces a
/// non-empty `exceptionError` (`spec.md` §7 kind 2).
///
/// Carries the full partial result so callers can decode revert reasons and the
/// gas actually consumed before the revert, per `spec.md` §4.1's `run` algorithm.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transaction execution failed: {exception}")]
pub struct CallError {
    /// The VM-internal failure reason.
    pub exception: ExceptionKind,
    /// The raw return data, e.g. an ABI-encoded revert reason.
    pub return_value: Bytes,
    /// Gas consumed before the failure.
    pub gas_used: u64,
}

/// Raised when `createAccessList`'s fixed-point loop exceeds `MAX_ITERATIONS`
/// without stabilizing (`spec.md` §4.4, §7 kind 3; see `DESIGN.md` for the
/// open-question resolution on whether this is raisable).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("access list did not converge after {iterations} iterations")]
pub struct NonConvergenceError {
    /// The number of iterations attempted before giving up.
    pub iterations: u32,
}

/// Converts a lower-level `revm` transaction error into the kind of failure the
/// simulation core distinguishes.
///
/// `revm`'s `EVMError` covers both pre-flight validation failures (which, for
/// this core, should never surface once `Simulator::initialize` has already
/// applied intrinsic-gas/debit bookkeeping) and halts during execution, which
/// map onto [`ExceptionKind::Other`].
pub fn exception_from_evm_error<DBError: core::fmt::Display>(
    err: &EVMError<DBError>,
) -> ExceptionKind {
    ExceptionKind::Other(err.to_string())
}
