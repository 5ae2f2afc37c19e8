use std::collections::BTreeSet;

use alloy_primitives::{Address, B256};

/// A single EIP-2930 access-list entry: an address and the storage slots within
/// it that a transaction declares (or that the access tracker recorded) as
/// touched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AccessListEntry {
    /// The touched address.
    pub address: Address,
    /// The touched storage slots within that address.
    pub storage_keys: Vec<B256>,
}

impl AccessListEntry {
    /// Builds an entry, deduplicating and lexicographically sorting its slots
    /// (`spec.md` §4.4's canonicalization step).
    #[must_use]
    pub fn new(address: Address, storage_keys: impl IntoIterator<Item = B256>) -> Self {
        let mut keys: Vec<B256> = storage_keys.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        keys.sort_unstable();
        Self { address, storage_keys: keys }
    }
}

/// An ordered sequence of [`AccessListEntry`]s.
///
/// Equality is order-insensitive for both the outer sequence and each entry's
/// `storage_keys` (`spec.md` §3, §4.4): two lists are equal iff the sets
/// `{(address, {slots})}` are equal. The `Vec` ordering used for wire output is
/// the canonical one produced by [`AccessList::canonicalize`] (sorted by
/// address), but an `AccessList` built by hand, in any order, still compares
/// equal to its canonicalized form.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AccessList(pub Vec<AccessListEntry>);

impl AccessList {
    /// The empty access list.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns a new list with entries deduplicated by address (later entries'
    /// slots merge into earlier ones), each entry's slots deduped and sorted,
    /// and the outer sequence sorted by address.
    #[must_use]
    pub fn canonicalize(&self) -> Self {
        let mut merged: std::collections::BTreeMap<Address, BTreeSet<B256>> =
            std::collections::BTreeMap::new();
        for entry in &self.0 {
            merged.entry(entry.address).or_default().extend(entry.storage_keys.iter().copied());
        }
        let entries = merged
            .into_iter()
            .map(|(address, keys)| AccessListEntry { address, storage_keys: keys.into_iter().collect() })
            .collect();
        Self(entries)
    }

    /// `true` if this list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for AccessList {
    fn eq(&self, other: &Self) -> bool {
        self.canonicalize().0 == other.canonicalize().0
    }
}

impl Eq for AccessList {}

impl FromIterator<AccessListEntry> for AccessList {
    fn from_iter<T: IntoIterator<Item = AccessListEntry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn key(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn equality_ignores_outer_order() {
        let a = AccessList(vec![
            AccessListEntry::new(addr(1), [key(1)]),
            AccessListEntry::new(addr(2), [key(2)]),
        ]);
        let b = AccessList(vec![
            AccessListEntry::new(addr(2), [key(2)]),
            AccessListEntry::new(addr(1), [key(1)]),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_ignores_slot_order_and_duplicates() {
        let a = AccessListEntry::new(addr(1), [key(1), key(2)]);
        let b = AccessListEntry::new(addr(1), [key(2), key(1), key(2)]);
        assert_eq!(AccessList(vec![a]), AccessList(vec![b]));
    }

    #[test]
    fn canonicalize_merges_duplicate_addresses() {
        let list = AccessList(vec![
            AccessListEntry::new(addr(1), [key(1)]),
            AccessListEntry::new(addr(1), [key(2)]),
        ]);
        let canon = list.canonicalize();
        assert_eq!(canon.0.len(), 1);
        assert_eq!(canon.0[0].storage_keys, vec![key(1), key(2)]);
    }
}
