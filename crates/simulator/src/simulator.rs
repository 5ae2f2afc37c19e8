//! The Simulator orchestrator (`spec.md` §4.1).
//!
//! Grounded on `reth-rpc`'s `Call::replay_transactions_until`
//! (`examples/yutianwu-reth/crates/rpc/rpc/src/eth/helpers/call.rs`): build an
//! `Evm` bound to the overlay database and an `Env`, fill in the transaction
//! fields, `transact`. The reth version commits to its database and loops
//! over many transactions; this orchestrator runs exactly one transaction and
//! never commits, since the overlay's checkpoint is the isolation barrier
//! (invariant I1).
//!
//! The lifecycle (`spec.md` §3's "created empty, initialized, consumed") is
//! expressed as a Rust typestate rather than a runtime state machine, so
//! calling `run` before `initialize`, or calling either twice, is a
//! compile-time error instead of a panic.

use std::collections::HashSet;
use std::marker::PhantomData;

use alloy_primitives::{Address, U256};
use revm::db::DatabaseRef;
use revm::precompile::{PrecompileSpecId, Precompiles};
use revm::primitives::{
    BlockEnv, CfgEnv, CreateScheme, Env, ExecutionResult, Output, SpecId, TransactTo, TxEnv,
};
use revm::{inspector_handle_register, Evm};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use txsim_errors::{exception_from_evm_error, CallError, ExceptionKind, NonConvergenceError};
use txsim_types::{AccessList, CallOverride, EVMResult as SimEVMResult, Rules, SimulationTransaction};

use crate::access_tracker::AccessListInspector;
use crate::gas::{access_list_data_fee, intrinsic_gas};
use crate::inspector::SimInspector;
use crate::observer::{ContextId, NullObserver, Observer};
use crate::overlay::StateOverlay;

/// The bound beyond which `createAccessList`'s fixed-point loop gives up
/// (`spec.md` §4.4).
pub const MAX_ITERATIONS: u32 = 1000;

/// The ways `create_access_list` can fail to produce a list (`spec.md` §6, §7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum CreateAccessListError {
    /// The loop did not stabilize within [`MAX_ITERATIONS`].
    #[error(transparent)]
    NonConvergence(#[from] NonConvergenceError),
    /// The inner `run` raised; the access list recorded for that iteration is
    /// attached, as `spec.md` §6 describes, "when meaningful".
    #[error("transaction execution failed while building access list: {error}")]
    Call {
        /// The underlying execution failure.
        error: CallError,
        /// The access list recorded for the failing iteration, if any.
        partial_access_list: Option<AccessList>,
    },
}

/// Marker: no transaction has been loaded yet.
#[derive(Debug)]
pub struct Empty;

/// Marker: `initialize` has populated the overlay and call parameters.
#[derive(Debug)]
pub struct Initialized;

#[derive(Debug, Clone)]
struct CallParams {
    caller: Address,
    to: Option<Address>,
    data: Vec<u8>,
    value: U256,
    gas_price: U256,
    gas_limit: u64,
    access_list: Vec<(Address, Vec<U256>)>,
    block: txsim_types::RuntimeBlock,
}

/// Converts a canonical [`AccessList`] into the `(address, slots)` pairs
/// `revm`'s `TxEnv` pre-warms from.
fn access_list_to_tx_format(list: &AccessList) -> Vec<(Address, Vec<U256>)> {
    list.0
        .iter()
        .map(|entry| (entry.address, entry.storage_keys.iter().map(|k| U256::from_be_bytes(k.0)).collect()))
        .collect()
}

/// The per-request orchestrator. Built empty, `initialize`d once, then
/// consumed by exactly one of `run` or `create_access_list`.
#[derive(Debug)]
pub struct Simulator<DB, O = NullObserver, State = Empty>
where
    DB: DatabaseRef + Clone,
{
    overlay: StateOverlay<DB>,
    rules: Rules,
    observer: O,
    context: ContextId,
    intrinsic: u64,
    init_error: Option<ExceptionKind>,
    call: Option<CallParams>,
    exclusion_set: HashSet<Address>,
    storage_only_set: HashSet<Address>,
    spec_id: SpecId,
    /// The access list discovered by the previous `createAccessList` iteration,
    /// pre-warmed into the next `run_once` on top of `call.access_list`
    /// (`spec.md` §4.4's rationale: warming the discovered list changes gas
    /// costs, which can change which branches a contract takes).
    warm_override: Option<AccessList>,
    _state: PhantomData<State>,
}

impl<DB> Simulator<DB, NullObserver, Empty>
where
    DB: DatabaseRef + Clone,
{
    /// Builds an empty Simulator over `parent`, discarding events.
    #[must_use]
    pub fn new(parent: DB, rules: Rules, spec_id: SpecId) -> Self {
        Self::with_observer(parent, rules, spec_id, NullObserver)
    }
}

impl<DB, O> Simulator<DB, O, Empty>
where
    DB: DatabaseRef + Clone,
    O: Observer,
{
    /// Builds an empty Simulator over `parent`, delivering events to `observer`.
    #[must_use]
    pub fn with_observer(parent: DB, rules: Rules, spec_id: SpecId, observer: O) -> Self {
        Self {
            overlay: StateOverlay::new(parent),
            rules,
            observer,
            context: ContextId::next(),
            intrinsic: 0,
            init_error: None,
            call: None,
            exclusion_set: HashSet::new(),
            storage_only_set: HashSet::new(),
            spec_id,
            warm_override: None,
            _state: PhantomData,
        }
    }

    /// Runs the initialization algorithm of `spec.md` §4.1: overrides,
    /// pre-warming, sender debit, and intrinsic gas accounting.
    ///
    /// # Errors
    /// Returns the overlay's database error if a required account could not
    /// be loaded.
    pub fn initialize(
        mut self,
        tx: &SimulationTransaction,
        overrides: Option<&CallOverride>,
    ) -> Result<Simulator<DB, O, Initialized>, DB::Error> {
        let is_creation = tx.is_creation();
        self.intrinsic = intrinsic_gas(tx.data(), is_creation, self.rules);

        let gas_limit = tx.gas.as_u64_saturating();
        if gas_limit < self.intrinsic {
            self.init_error = Some(ExceptionKind::OutOfGas);
        } else {
            let execution_budget = gas_limit - self.intrinsic;

            if self.rules.berlin {
                self.exclusion_set.insert(tx.from);
                for address in Precompiles::new(PrecompileSpecId::from_spec_id(self.spec_id)).addresses() {
                    self.exclusion_set.insert(*address);
                }
                if let Some(to) = tx.to {
                    self.storage_only_set.insert(to);
                }
            }

            if let Some(overrides) = overrides {
                self.overlay.apply_overrides(overrides)?;
            }

            let debit = tx.gas.0.saturating_mul(tx.gas_price.0);
            self.overlay.debit_sender(tx.from, debit)?;

            let access_list = tx.access_list.as_ref().map(access_list_to_tx_format).unwrap_or_default();

            self.call = Some(CallParams {
                caller: tx.from,
                to: tx.to,
                data: tx.data().to_vec(),
                value: tx.value().0,
                gas_price: tx.gas_price.0,
                gas_limit: execution_budget,
                access_list,
                block: tx.block,
            });
        }

        Ok(Simulator {
            overlay: self.overlay,
            rules: self.rules,
            observer: self.observer,
            context: self.context,
            intrinsic: self.intrinsic,
            init_error: self.init_error,
            call: self.call,
            exclusion_set: self.exclusion_set,
            storage_only_set: self.storage_only_set,
            spec_id: self.spec_id,
            warm_override: self.warm_override,
            _state: PhantomData,
        })
    }
}

impl<DB, O> Simulator<DB, O, Initialized>
where
    DB: DatabaseRef + Clone,
    O: Observer,
{
    fn build_env(&self, block: &txsim_types::RuntimeBlock, call: &CallParams) -> Env {
        let mut env = Env::default();
        env.cfg = CfgEnv::default();
        env.block = BlockEnv {
            number: U256::from(block.number.as_u64_saturating()),
            timestamp: U256::from(block.timestamp.as_u64_saturating()),
            gas_limit: U256::from(block.gas_limit.as_u64_saturating()),
            coinbase: block.coinbase,
            basefee: block.base_fee.map(|q| q.0).unwrap_or_default(),
            prevrandao: Some(block.prev_randao),
            ..Default::default()
        };
        let mut access_list = call.access_list.clone();
        if let Some(warm) = &self.warm_override {
            access_list.extend(access_list_to_tx_format(warm));
        }

        env.tx = TxEnv {
            caller: call.caller,
            transact_to: match call.to {
                Some(to) => TransactTo::Call(to),
                None => TransactTo::Create(CreateScheme::Create),
            },
            data: call.data.clone().into(),
            value: call.value,
            gas_price: call.gas_price,
            gas_limit: call.gas_limit,
            access_list,
            ..Default::default()
        };
        env
    }

    /// Runs once, emitting `before`/`step*`/`after` to the observer
    /// (`after` only on success, per `spec.md` §4.5). Used directly by both
    /// `run` and each iteration of `create_access_list`'s fixed-point loop, so
    /// the event ordering `spec.md` §5 describes ("checkpoint, run (emits
    /// before, many steps, after), revert") holds for every iteration, not
    /// just a single top-level `run`.
    fn run_once(&mut self) -> (Result<SimEVMResult, CallError>, AccessListInspector) {
        self.observer.before(self.context);

        if let Some(exception) = self.init_error.clone() {
            let err = CallError { exception, return_value: Default::default(), gas_used: 0 };
            let access = AccessListInspector::new(self.exclusion_set.clone(), self.storage_only_set.clone());
            return (Err(err), access);
        }

        let call = self.call.clone().expect("initialized without an init error always has call params");
        debug!(target: "txsim", caller = %call.caller, ?call.to, "running simulated transaction");

        let tracker =
            AccessListInspector::new(self.exclusion_set.clone(), self.storage_only_set.clone());
        let mut inspector = SimInspector::new(self.context, &mut self.observer, tracker);

        let env = self.build_env(&call.block, &call);

        let evm_result = {
            let mut evm = Evm::builder()
                .with_db(self.overlay.db_mut().clone())
                .with_env(Box::new(env))
                .with_spec_id(self.spec_id)
                .with_external_context(&mut inspector)
                .append_handler_register(inspector_handle_register)
                .build();
            evm.transact()
        };

        let access = inspector.into_access_tracker();

        let result = match evm_result {
            Ok(result_and_state) => execution_result_to_sim(result_and_state.result),
            Err(err) => SimEVMResult {
                return_value: Default::default(),
                gas_used: self.intrinsic.into(),
                exception_error: Some(exception_from_evm_error(&err)),
                logs: Vec::new(),
            },
        };

        trace!(target: "txsim", gas_used = %result.gas_used, "simulation run complete");

        if let Some(exception) = result.exception_error.clone() {
            let err = CallError {
                exception,
                return_value: result.return_value,
                gas_used: result.gas_used.as_u64_saturating(),
            };
            (Err(err), access)
        } else {
            self.observer.after(self.context);
            (Ok(result), access)
        }
    }

    /// Executes the transaction once (`spec.md` §4.1's `run` algorithm).
    ///
    /// # Errors
    /// Raises [`CallError`] if the VM produced a non-empty exception, or if
    /// initialization had already failed deterministically (e.g. insufficient
    /// gas for intrinsic cost).
    pub fn run(mut self) -> Result<SimEVMResult, CallError> {
        let (result, _access) = self.run_once();
        result
    }

    /// Runs the fixed-point loop that produces a minimal access list
    /// (`spec.md` §4.4).
    ///
    /// # Errors
    /// Raises [`NonConvergenceError`] if the list has not stabilized after
    /// [`MAX_ITERATIONS`]. `cancel`, if provided, is checked only at each
    /// iteration boundary (`spec.md` §5's cancellation model); the loop exits
    /// early with the last computed list when cancelled.
    pub async fn create_access_list(
        mut self,
        seed: AccessList,
        cancel: Option<CancellationToken>,
    ) -> Result<(AccessList, u64), CreateAccessListError> {
        let mut previous = seed;

        for _ in 0..MAX_ITERATIONS {
            if let Some(cancel) = &cancel {
                if cancel.is_cancelled() {
                    break;
                }
            }

            self.warm_override = Some(previous.clone());
            let checkpoint = self.overlay.checkpoint();
            let (outcome, access) = self.run_once();
            self.overlay.revert(checkpoint);

            let current = access.snapshot_as_list();
            let result = outcome.map_err(|error| CreateAccessListError::Call {
                error,
                partial_access_list: Some(current.clone()),
            })?;

            if current == previous {
                let data_fee = access_list_data_fee(&current, self.rules);
                let gas_used = result.gas_used.as_u64_saturating() + self.intrinsic + data_fee;
                return Ok((current, gas_used));
            }
            previous = current;
        }

        Err(CreateAccessListError::NonConvergence(NonConvergenceError { iterations: MAX_ITERATIONS }))
    }
}

fn execution_result_to_sim(result: ExecutionResult) -> SimEVMResult {
    match result {
        ExecutionResult::Success { gas_used, output, logs, .. } => SimEVMResult {
            return_value: match output {
                Output::Call(bytes) => bytes,
                Output::Create(bytes, _) => bytes,
            },
            gas_used: gas_used.into(),
            exception_error: None,
            logs: logs
                .into_iter()
                .map(|log| txsim_types::Log {
                    address: log.address,
                    topics: log.data.topics().to_vec(),
                    data: log.data.data,
                })
                .collect(),
        },
        ExecutionResult::Revert { gas_used, output } => SimEVMResult {
            return_value: output,
            gas_used: gas_used.into(),
            exception_error: Some(ExceptionKind::Revert),
            logs: Vec::new(),
        },
        ExecutionResult::Halt { gas_used, reason } => SimEVMResult {
            return_value: Default::default(),
            gas_used: gas_used.into(),
            exception_error: Some(halt_to_exception(reason)),
            logs: Vec::new(),
        },
    }
}

fn halt_to_exception(reason: revm::primitives::HaltReason) -> ExceptionKind {
    use revm::primitives::HaltReason;
    match reason {
        HaltReason::OutOfGas(_) => ExceptionKind::OutOfGas,
        HaltReason::OpcodeNotFound | HaltReason::InvalidFEOpcode => ExceptionKind::InvalidOpcode,
        HaltReason::StackUnderflow => ExceptionKind::StackUnderflow,
        other => ExceptionKind::Other(format!("{other:?}")),
    }
}
