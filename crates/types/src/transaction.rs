use alloy_primitives::{Address, Bytes};

use crate::access_list::AccessList;
use crate::block::RuntimeBlock;
use crate::quantity::Quantity;

/// A single transaction to simulate (`spec.md` §3 `SimulationTransaction`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SimulationTransaction {
    /// The sending account.
    pub from: Address,
    /// The recipient; `None` signals contract creation.
    pub to: Option<Address>,
    /// Total gas budget, including intrinsic cost.
    pub gas: Quantity,
    /// Gas price.
    pub gas_price: Quantity,
    /// Value transferred, if any.
    pub value: Option<Quantity>,
    /// Calldata (or init code, for creation).
    pub data: Option<Bytes>,
    /// The header view the EVM observes.
    pub block: RuntimeBlock,
    /// A caller-supplied access list to pre-warm and seed convergence with.
    pub access_list: Option<AccessList>,
}

impl SimulationTransaction {
    /// `true` if this transaction creates a contract (no `to`).
    #[must_use]
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// The calldata, or an empty slice if none was supplied.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// The value transferred, or zero if none was supplied.
    #[must_use]
    pub fn value(&self) -> Quantity {
        self.value.unwrap_or(Quantity::ZERO)
    }
}
