//! Transaction simulation core: executes one transaction against an
//! ephemeral, checkpointed state overlay to answer `eth_call` and
//! `eth_createAccessList`.
//!
//! See [`Simulator`] for the orchestrator's lifecycle and
//! [`overlay::StateOverlay`] for the isolation mechanism backing invariant I1.

#![warn(missing_docs, unreachable_pub, rust_2018_idioms)]

mod access_tracker;
mod gas;
mod inspector;
mod observer;
mod overlay;
mod simulator;

pub use access_tracker::AccessListInspector;
pub use gas::{access_list_data_fee, intrinsic_gas};
pub use observer::{ConsoleLogEvent, ContextId, NullObserver, Observer, StepEvent};
pub use overlay::{Checkpoint, StateOverlay};
pub use simulator::{CreateAccessListError, Empty, Initialized, Simulator, MAX_ITERATIONS};

pub use revm::primitives::SpecId;
pub use revm::db::{CacheDB, DatabaseRef, EmptyDB};

/// A bare in-memory `DatabaseRef` for tests and example harnesses: an empty
/// parent wrapped in a cache, matching `revm`'s own `InMemoryDB` type alias
/// (`examples/bluealloy-revm/crates/database/src/in_memory_db.rs`).
pub type InMemoryDB = CacheDB<EmptyDB>;
