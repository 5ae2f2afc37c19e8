use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256};
use txsim_errors::{OverrideError, OverrideKind};

use crate::hexword::{hex_decode, HexWord};
use crate::quantity::Quantity;

/// The mutually-exclusive storage-override shape for one address
/// (`spec.md` §9 Design Notes: "phantom types → tagged variant").
///
/// The wire format carries this as two optional maps (`state`, `stateDiff`);
/// [`AccountOverride::from_wire`] rejects the case where both are present
/// before this type is ever constructed, so by the time a `StorageOverride`
/// exists the tag is already exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageOverride {
    /// No storage override for this address.
    #[default]
    None,
    /// Replace the account's entire storage trie with the given slots.
    Replace(BTreeMap<B256, B256>),
    /// Merge the given slots into the account's existing storage.
    Merge(BTreeMap<B256, B256>),
}

/// The per-address override payload (`spec.md` §3 `CallOverride`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountOverride {
    /// Replacement bytecode. An empty `Bytes` installs `KECCAK256_NULL`.
    pub code: Option<Bytes>,
    /// Replacement nonce.
    pub nonce: Option<u64>,
    /// Replacement balance.
    pub balance: Option<Quantity>,
    /// Storage replacement or merge.
    pub storage: StorageOverride,
}

/// The raw wire shape of one address's override, before the `state`/`stateDiff`
/// exclusivity check has been applied.
///
/// Every field arrives as an optional hex string, matching a reference node's
/// convention of treating an empty string as the zero value (`spec.md` §4.2).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RawAccountOverride {
    /// Replacement bytecode, as a hex string.
    pub code: Option<String>,
    /// Replacement nonce, as a hex string.
    pub nonce: Option<String>,
    /// Replacement balance, as a hex string.
    pub balance: Option<String>,
    /// Replace-whole-storage slots, keyed by 66-character hex slot.
    pub state: Option<BTreeMap<String, Option<String>>>,
    /// Merge-into-storage slots, keyed by 66-character hex slot.
    pub state_diff: Option<BTreeMap<String, Option<String>>>,
}

impl AccountOverride {
    /// Validates and converts a [`RawAccountOverride`], producing the exact
    /// [`OverrideError`] variants the external contract specifies.
    pub fn from_wire(address: Address, raw: RawAccountOverride) -> Result<Self, OverrideError> {
        if raw.state.is_some() && raw.state_diff.is_some() {
            return Err(OverrideError::ConflictingStateOverrides { address });
        }

        let code = raw
            .code
            .as_deref()
            .map(parse_bytes)
            .transpose()
            .map_err(|_| OverrideError::InvalidValueFormat {
                kind: OverrideKind::State,
                received: raw.code.clone().unwrap_or_default(),
            })?;
        let nonce = raw
            .nonce
            .as_deref()
            .map(Quantity::parse)
            .transpose()
            .map_err(|_| OverrideError::InvalidValueFormat {
                kind: OverrideKind::State,
                received: raw.nonce.clone().unwrap_or_default(),
            })?
            .map(|q| q.as_u64_saturating());
        let balance = raw
            .balance
            .as_deref()
            .map(Quantity::parse)
            .transpose()
            .map_err(|_| OverrideError::InvalidValueFormat {
                kind: OverrideKind::State,
                received: raw.balance.clone().unwrap_or_default(),
            })?;

        let storage = if let Some(slots) = raw.state {
            StorageOverride::Replace(parse_slot_map(OverrideKind::State, slots)?)
        } else if let Some(slots) = raw.state_diff {
            StorageOverride::Merge(parse_slot_map(OverrideKind::StateDiff, slots)?)
        } else {
            StorageOverride::None
        };

        Ok(Self { code, nonce, balance, storage })
    }
}

fn parse_bytes(s: &str) -> Result<Bytes, ()> {
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    let digits = s.strip_prefix("0x").ok_or(())?;
    hex_decode(digits).map(Bytes::from).ok_or(())
}

fn parse_slot_map(
    kind: OverrideKind,
    slots: BTreeMap<String, Option<String>>,
) -> Result<BTreeMap<B256, B256>, OverrideError> {
    let mut out = BTreeMap::new();
    for (key, value) in slots {
        let key = parse_slot_hex(kind, &key, true)?;
        let value = match value {
            None => {
                return Err(OverrideError::InvalidValueFormat {
                    kind,
                    received: "null".to_string(),
                })
            }
            Some(v) => parse_slot_hex(kind, &v, false)?,
        };
        out.insert(key, value);
    }
    Ok(out)
}

fn parse_slot_hex(kind: OverrideKind, s: &str, is_key: bool) -> Result<B256, OverrideError> {
    match HexWord::parse(s) {
        Ok(word) => Ok(word.into()),
        // `HexWord::parse` reports the received length on any failure; a
        // length other than 66 means the string itself was the wrong size,
        // while a reported length of 66 means it was malformed despite being
        // the right size (missing `0x` prefix or non-hex digits).
        Err(len) if len != 66 => {
            if is_key {
                Err(OverrideError::InvalidSlotLength { kind, received: len })
            } else {
                Err(OverrideError::InvalidValueLength { kind, received: len })
            }
        }
        Err(_) => Err(OverrideError::InvalidValueFormat { kind, received: s.to_string() }),
    }
}

/// A set of per-address overrides to apply to the state overlay before
/// execution (`spec.md` §3 `CallOverride`).
#[derive(Debug, Clone, Default)]
pub struct CallOverride(pub BTreeMap<Address, AccountOverride>);

impl CallOverride {
    /// The empty override set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }
}
