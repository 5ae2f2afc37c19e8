use alloy_primitives::{Address, B256};

use crate::quantity::Quantity;

/// The header fields the EVM observes as block context (`spec.md` §3, §6).
///
/// Supplied by the out-of-scope `Blockchain`/`Block` collaborators; the
/// simulation core never constructs one from a live chain itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RuntimeBlock {
    /// Block number.
    pub number: Quantity,
    /// Block timestamp, seconds since the Unix epoch.
    pub timestamp: Quantity,
    /// EIP-1559 base fee, if the active rules include London.
    pub base_fee: Option<Quantity>,
    /// Post-Merge randomness beacon (`prevrandao`); pre-Merge this is the
    /// legacy `difficulty` value instead.
    pub prev_randao: B256,
    /// Fee recipient.
    pub coinbase: Address,
    /// Block gas limit.
    pub gas_limit: Quantity,
    /// The state trie root this block's state is pinned to.
    pub state_root: B256,
}
