use alloy_primitives::{Address, Bytes, B256};
use txsim_errors::ExceptionKind;

use crate::quantity::Quantity;

/// A single EVM log entry emitted during a run.
///
/// Logs are surfaced on a successful [`EVMResult`] but, per `spec.md` §1's
/// Non-goals, are never persisted past the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Log {
    /// The address that emitted this log.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Unindexed data.
    pub data: Bytes,
}

/// The outcome of one `run` (`spec.md` §3 `EVMResult`).
///
/// `exception_error` being `Some` does not mean this value was returned
/// directly to a caller — `Simulator::run` wraps such a result in a
/// `CallError` raise (`spec.md` §4.1) rather than returning it, but the type
/// itself stays a plain struct so the fixed-point loop can inspect a failed
/// iteration's partial result without downcasting an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EVMResult {
    /// Raw return data (or revert reason bytes).
    pub return_value: Bytes,
    /// Gas consumed by this run.
    pub gas_used: Quantity,
    /// The VM-internal failure, if any.
    pub exception_error: Option<ExceptionKind>,
    /// Logs emitted, empty if `exception_error` is set.
    pub logs: Vec<Log>,
}

impl EVMResult {
    /// Builds a synthesized result for a deterministic initialization failure
    /// (`spec.md` §4.1 step 6, §7 kind 1): zero gas used, no return data, no
    /// logs, and the given exception.
    #[must_use]
    pub fn init_error(exception: ExceptionKind) -> Self {
        Self {
            return_value: Bytes::new(),
            gas_used: Quantity::ZERO,
            exception_error: Some(exception),
            logs: Vec::new(),
        }
    }

    /// `true` if the run completed without a VM-internal failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exception_error.is_none()
    }
}
