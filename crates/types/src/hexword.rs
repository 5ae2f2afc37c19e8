use alloy_primitives::B256;

/// A fixed 32-byte wire value, validated as an exactly-66-character `0x`-prefixed
/// hex string (`spec.md` §3, §4.2). Used for storage keys and storage values in
/// `CallOverride`s, where the reference node rejects anything shorter or longer
/// rather than left/right-padding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexWord(pub B256);

impl HexWord {
    /// Parses a 66-character `0x`-prefixed hex string.
    ///
    /// On failure, returns the number of characters actually received so the
    /// caller can build the exact `"...Received N character string."` message
    /// required by `spec.md` §6.
    pub fn parse(s: &str) -> Result<Self, usize> {
        if !s.starts_with("0x") || s.len() != 66 {
            return Err(s.len());
        }
        let bytes = hex_decode(&s[2..]).ok_or(s.len())?;
        Ok(Self(B256::from_slice(&bytes)))
    }
}

impl From<HexWord> for B256 {
    fn from(value: HexWord) -> Self {
        value.0
    }
}

impl From<B256> for HexWord {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

pub(crate) fn hex_decode(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_66_characters() {
        let s = format!("0x{}", "ab".repeat(32));
        assert_eq!(s.len(), 66);
        assert!(HexWord::parse(&s).is_ok());
    }

    #[test]
    fn rejects_short_string() {
        let err = HexWord::parse("0x1234").unwrap_err();
        assert_eq!(err, 6);
    }

    #[test]
    fn rejects_missing_prefix() {
        let s = "ab".repeat(32);
        assert!(HexWord::parse(&s).is_err());
    }

    #[test]
    fn rejects_non_hex_digits() {
        let s = format!("0x{}zz", "ab".repeat(31));
        assert_eq!(s.len(), 66);
        assert!(HexWord::parse(&s).is_err());
    }
}
