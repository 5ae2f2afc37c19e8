//! Copy-on-write state overlay (`spec.md` §4.2).
//!
//! Grounded on `revm`'s own `CacheDB<ExtDB>`
//! (`examples/bluealloy-revm/crates/database/src/in_memory_db.rs`): its
//! `cache` field is public and `Clone`, so `checkpoint`/`revert` are a
//! snapshot-and-restore of that field rather than a bespoke journal. This
//! mirrors reth's `chain-state` cache split between a read-through cache and
//! a write buffer (`examples/yutianwu-reth/crates/chain-state/src/cache/
//! plain_state.rs`), adapted here to a single in-process struct instead of a
//! process-wide `lazy_static!` cache.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, B256, U256};
use revm::db::{AccountState, CacheDB, DatabaseRef};
use revm::primitives::{AccountInfo, Bytecode, KECCAK_EMPTY};
use txsim_types::{AccountOverride, CallOverride, StorageOverride};

/// A single checkpoint's snapshot of the overlay's write buffer.
///
/// Opaque to callers; `StateOverlay::checkpoint` returns one, and only that
/// same overlay's `revert`/`commit` consume it.
#[derive(Debug)]
pub struct Checkpoint<ExtDB: DatabaseRef>(CacheDB<ExtDB>);

/// The ephemeral, checkpointed state overlay a `Simulator` runs against.
///
/// Wraps `revm::db::CacheDB<ExtDB>`: reads fall through to the read-only
/// parent `ExtDB`, writes land in the in-memory cache, and the parent is
/// never mutated (invariant I1).
#[derive(Debug)]
pub struct StateOverlay<ExtDB: DatabaseRef> {
    db: CacheDB<ExtDB>,
}

impl<ExtDB> StateOverlay<ExtDB>
where
    ExtDB: DatabaseRef + Clone,
{
    /// Wraps a parent state source in a fresh, empty write buffer.
    pub fn new(parent: ExtDB) -> Self {
        Self { db: CacheDB::new(parent) }
    }

    /// Returns the underlying `revm` database for wiring into an `Evm`.
    pub fn db_mut(&mut self) -> &mut CacheDB<ExtDB> {
        &mut self.db
    }

    /// Takes a checkpoint: a clone of the current write buffer that
    /// `revert` can restore to, undoing everything written since.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint<ExtDB> {
        Checkpoint(CacheDB { cache: self.db.cache.clone(), db: self.db.db.clone() })
    }

    /// Discards a checkpoint without restoring it — the writes made since it
    /// was taken are kept. The Simulator never calls this on its top-level
    /// isolation checkpoint (`spec.md` §4.1 step 2); it is only used between
    /// iterations of `createAccessList`, which instead always calls
    /// [`Self::revert`].
    pub fn commit(&mut self, _checkpoint: Checkpoint<ExtDB>) {}

    /// Restores the write buffer to a previously taken checkpoint, discarding
    /// every write since (`spec.md` §4.1 step 2, §4.4's per-iteration revert).
    pub fn revert(&mut self, checkpoint: Checkpoint<ExtDB>) {
        self.db = checkpoint.0;
    }

    fn account_mut(&mut self, address: Address) -> Result<&mut AccountInfo, ExtDB::Error> {
        let account = self.db.load_account(address)?;
        if matches!(account.account_state, AccountState::NotExisting) {
            account.account_state = AccountState::None;
        }
        Ok(&mut account.info)
    }

    /// Applies a parsed set of overrides to the overlay, post-checkpoint and
    /// pre-execution (`spec.md` §4.2).
    ///
    /// # Errors
    /// Returns the underlying database error as `ExtDB::Error`; override
    /// validation errors ([`OverrideError`]) are caught earlier, while the
    /// override values are still wire strings (`txsim_types::RawAccountOverride`).
    pub fn apply_overrides(&mut self, overrides: &CallOverride) -> Result<(), ExtDB::Error> {
        for (&address, account_override) in &overrides.0 {
            self.apply_account_override(address, account_override)?;
        }
        Ok(())
    }

    fn apply_account_override(
        &mut self,
        address: Address,
        account_override: &AccountOverride,
    ) -> Result<(), ExtDB::Error> {
        if account_override.nonce.is_some()
            || account_override.balance.is_some()
            || account_override.code.is_some()
        {
            let code = account_override.code.clone();
            let nonce = account_override.nonce;
            let balance = account_override.balance;

            if let Some(code) = code {
                self.set_code(address, &code)?;
            }
            let info = self.account_mut(address)?;
            if let Some(nonce) = nonce {
                info.nonce = nonce;
            }
            if let Some(balance) = balance {
                info.balance = balance.0;
            }
        }

        match &account_override.storage {
            StorageOverride::None => {}
            StorageOverride::Replace(slots) => {
                let storage: HashMap<U256, U256> =
                    slots.iter().map(|(k, v)| (key_to_u256(*k), key_to_u256(*v))).collect();
                self.db.replace_account_storage(address, storage)?;
            }
            StorageOverride::Merge(slots) => {
                for (key, value) in slots {
                    self.db.insert_account_storage(address, key_to_u256(*key), key_to_u256(*value))?;
                }
            }
        }

        Ok(())
    }

    fn set_code(&mut self, address: Address, code: &Bytes) -> Result<(), ExtDB::Error> {
        let info = self.account_mut(address)?;
        if code.is_empty() {
            info.code_hash = KECCAK_EMPTY;
            info.code = Some(Bytecode::default());
        } else {
            let bytecode = Bytecode::new_raw(code.clone());
            info.code_hash = bytecode.hash_slow();
            info.code = Some(bytecode);
        }
        Ok(())
    }

    /// Fetches an account, increments its nonce, and debits `cost` from its
    /// balance (`spec.md` §4.1 step 7's sender debit).
    pub fn debit_sender(&mut self, sender: Address, cost: U256) -> Result<(), ExtDB::Error> {
        let info = self.account_mut(sender)?;
        info.nonce = info.nonce.saturating_add(1);
        info.balance = info.balance.saturating_sub(cost);
        Ok(())
    }
}

fn key_to_u256(value: B256) -> U256 {
    U256::from_be_bytes(value.0)
}
