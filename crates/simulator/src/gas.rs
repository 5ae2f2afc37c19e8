//! Pre-execution gas accounting (`spec.md` §4.3).
//!
//! Grounded on `revm`'s own `gas::calc::validate_initial_tx_gas` and the
//! constants it pulls from `gas::constants` (`examples/bluealloy-revm/crates/
//! interpreter/src/gas/{calc,constants}.rs`): this is the same formula,
//! expressed against [`Rules`] instead of a `SpecId`, and split so the
//! access-list surcharge is a separate, optional addend (`spec.md` §4.3's
//! "not included here").

use txsim_types::{AccessList, Rules};

const TX_BASE_GAS: u64 = 21000;
const TX_CREATE_SURCHARGE: u64 = 32000;
const TX_DATA_ZERO_GAS: u64 = 4;
const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;
const TX_DATA_NON_ZERO_GAS_ISTANBUL: u64 = 16;
const ACCESS_LIST_ADDRESS_GAS: u64 = 2400;
const ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1900;
const INITCODE_WORD_COST: u64 = 2;

/// Computes the intrinsic (pre-execution) cost of a transaction.
///
/// Does not account for an access list's surcharge; call
/// [`access_list_data_fee`] separately and add it in, per `spec.md` §4.3/§4.4.
#[must_use]
pub fn intrinsic_gas(data: &[u8], is_creation: bool, rules: Rules) -> u64 {
    let zero_bytes = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zero_bytes = data.len() as u64 - zero_bytes;
    let non_zero_cost =
        if rules.berlin { TX_DATA_NON_ZERO_GAS_ISTANBUL } else { TX_DATA_NON_ZERO_GAS_FRONTIER };

    let mut gas = zero_bytes * TX_DATA_ZERO_GAS + non_zero_bytes * non_zero_cost;

    gas += if is_creation && rules.homestead { TX_CREATE_SURCHARGE } else { 0 } + TX_BASE_GAS;

    if is_creation && rules.shanghai {
        gas += initcode_word_cost(data.len() as u64);
    }

    gas
}

/// EIP-3860 per-word charge for a creation transaction's init code.
fn initcode_word_cost(len: u64) -> u64 {
    len.div_ceil(32) * INITCODE_WORD_COST
}

/// The EIP-2930 surcharge for declaring an access list up front
/// (`spec.md` §4.3, §4.4's `data_fee`).
#[must_use]
pub fn access_list_data_fee(list: &AccessList, rules: Rules) -> u64 {
    if !rules.berlin {
        return 0;
    }
    list.0.iter().fold(0, |acc, entry| {
        acc + ACCESS_LIST_ADDRESS_GAS + entry.storage_keys.len() as u64 * ACCESS_LIST_STORAGE_KEY_GAS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use txsim_types::AccessListEntry;

    #[test]
    fn empty_call_is_base_cost() {
        assert_eq!(intrinsic_gas(&[], false, Rules::all()), TX_BASE_GAS);
    }

    #[test]
    fn zero_and_non_zero_bytes_priced_differently() {
        let data = [0u8, 0u8, 1u8];
        let gas = intrinsic_gas(&data, false, Rules::all());
        assert_eq!(gas, TX_BASE_GAS + 2 * TX_DATA_ZERO_GAS + TX_DATA_NON_ZERO_GAS_ISTANBUL);
    }

    #[test]
    fn pre_berlin_non_zero_byte_is_more_expensive() {
        let data = [1u8];
        let gas = intrinsic_gas(&data, false, Rules::none());
        assert_eq!(gas, TX_BASE_GAS + TX_DATA_NON_ZERO_GAS_FRONTIER);
    }

    #[test]
    fn creation_adds_homestead_surcharge() {
        let gas = intrinsic_gas(&[], true, Rules::all());
        assert_eq!(gas, TX_BASE_GAS + TX_CREATE_SURCHARGE);
    }

    #[test]
    fn shanghai_charges_per_initcode_word() {
        let data = vec![0u8; 64];
        let gas = intrinsic_gas(&data, true, Rules::all());
        let expected = TX_BASE_GAS + TX_CREATE_SURCHARGE + 64 * TX_DATA_ZERO_GAS + 2 * INITCODE_WORD_COST;
        assert_eq!(gas, expected);
    }

    #[test]
    fn access_list_fee_scales_with_addresses_and_keys() {
        let list = AccessList(vec![AccessListEntry::new(
            Address::repeat_byte(1),
            [alloy_primitives::B256::repeat_byte(1), alloy_primitives::B256::repeat_byte(2)],
        )]);
        let fee = access_list_data_fee(&list, Rules::all());
        assert_eq!(fee, ACCESS_LIST_ADDRESS_GAS + 2 * ACCESS_LIST_STORAGE_KEY_GAS);
    }
}
