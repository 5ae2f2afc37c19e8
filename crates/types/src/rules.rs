/// The hardfork-gated EIP flags the simulation core needs to know about.
///
/// `spec.md` describes these in terms of a chain's active hardfork; rather
/// than import `revm`'s full `SpecId` lattice, the orchestration layer only
/// ever branches on three independent booleans, so that is all this type
/// carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    /// EIP-2929/2930: access lists and cold/warm access-set accounting.
    pub berlin: bool,
    /// EIP-3860: charge per init-code word on contract creation.
    pub shanghai: bool,
    /// Homestead: the 32000 gas contract-creation surcharge.
    pub homestead: bool,
}

impl Rules {
    /// All flags active — the common case for a modern development chain.
    #[must_use]
    pub const fn all() -> Self {
        Self { berlin: true, shanghai: true, homestead: true }
    }

    /// No flags active — pre-Homestead legacy semantics.
    #[must_use]
    pub const fn none() -> Self {
        Self { berlin: false, shanghai: false, homestead: false }
    }
}
