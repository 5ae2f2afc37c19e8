use revm_primitives::U256;

/// An unsigned integer of arbitrary width (`spec.md` §3): gas, balance, nonce, and
/// value fields are all `Quantity`s.
///
/// Wraps [`U256`] rather than a dedicated bignum type — every quantity in a
/// simulated transaction fits comfortably in 256 bits, and `revm` already uses
/// `U256` pervasively for balances and storage values, so there is nothing this
/// type would add over a thin wrapper with minimal-hex wire encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(pub U256);

impl Quantity {
    /// The zero quantity.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Builds a `Quantity` from a `u64`, the common case for gas limits and nonces.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(U256::from_limbs([value, 0, 0, 0]))
    }

    /// Returns the value truncated to `u64`, saturating at `u64::MAX`.
    #[must_use]
    pub fn as_u64_saturating(&self) -> u64 {
        self.0.try_into().unwrap_or(u64::MAX)
    }

    /// Parses a minimal-hex wire quantity (`"0x0"`, `"0x2a"`, ...).
    ///
    /// Per `spec.md` §4.2, an empty string is treated as `"0x0"` — matching a
    /// reference node's override convention.
    pub fn parse(s: &str) -> Result<Self, ParseQuantityError> {
        if s.is_empty() {
            return Ok(Self::ZERO);
        }
        let digits = s.strip_prefix("0x").ok_or(ParseQuantityError)?;
        if digits.is_empty() {
            return Ok(Self::ZERO);
        }
        U256::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ParseQuantityError)
    }

    /// Renders as a minimal-hex wire quantity, e.g. `U256::ZERO` renders as `"0x0"`.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        if self.0.is_zero() {
            return "0x0".to_string();
        }
        format!("{:#x}", self.0)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<U256> for Quantity {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

/// A quantity string was neither empty nor `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid quantity")]
pub struct ParseQuantityError;

#[cfg(feature = "serde")]
impl serde::Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
