//! Wires the access tracker and a caller's [`Observer`] into a single
//! `revm::Inspector`, so one EVM run drives both (`spec.md` §4.1, §4.5): `step`
//! feeds both the access list tracker and the observer's `step` channel, and
//! `call` watches for calls into the well-known `console.log` address and
//! forwards decoded arguments to the observer's `console_log` channel.

use alloy_primitives::{address, Address};
use revm::interpreter::{CallInputs, CallOutcome, Interpreter};
use revm::primitives::Database;
use revm::{EvmContext, Inspector};

use crate::access_tracker::AccessListInspector;
use crate::observer::{ConsoleLogEvent, ContextId, Observer, StepEvent};

/// The well-known `console.log` precompile address (`spec.md` §4.5) that
/// Hardhat-style tooling targets with `STATICCALL`s carrying ABI-encoded log
/// arguments, at a fixed address nothing else ever deploys to.
const CONSOLE_LOG_ADDRESS: Address = address!("000000000000000000636F6e736F6c652e6c6f67");

/// The `Inspector` the Simulator actually installs for a run: forwards
/// per-step events to an [`Observer`] and, simultaneously, feeds the same
/// step to an [`AccessListInspector`] so a single EVM pass serves both
/// `spec.md` §4.4 (access tracking) and §4.5 (event subscription).
pub struct SimInspector<'o, O> {
    context: ContextId,
    observer: &'o mut O,
    access: AccessListInspector,
}

impl<'o, O: Observer> SimInspector<'o, O> {
    /// Builds an inspector forwarding to `observer`, tagged with `context`,
    /// and tracking access with `access`.
    pub fn new(context: ContextId, observer: &'o mut O, access: AccessListInspector) -> Self {
        Self { context, observer, access }
    }

    /// Consumes the inspector, returning the access tracker so the caller can
    /// snapshot the access list it recorded.
    #[must_use]
    pub fn into_access_tracker(self) -> AccessListInspector {
        self.access
    }
}

impl<'o, O: Observer, DB: Database> Inspector<DB> for SimInspector<'o, O> {
    fn step(&mut self, interp: &mut Interpreter, context: &mut EvmContext<DB>) {
        Inspector::<DB>::step(&mut self.access, interp, context);

        let event = StepEvent {
            pc: interp.program_counter(),
            opcode: interp.current_opcode(),
            gas_remaining: interp.gas.remaining(),
            depth: context.journaled_state.depth(),
            stack: interp.stack().data(),
        };
        self.observer.step(self.context, &event);
    }

    fn call(&mut self, _context: &mut EvmContext<DB>, inputs: &mut CallInputs) -> Option<CallOutcome> {
        if inputs.target_address == CONSOLE_LOG_ADDRESS {
            let event = ConsoleLogEvent { data: inputs.input.clone() };
            self.observer.console_log(self.context, &event);
        }
        None
    }
}
