use std::fmt;

use static_assertions::assert_eq_size;

/// A title id exactly as stored in tickets and title metadata: big-endian wire order.
///
/// Equality compares the wire bytes, so two ids can be checked against each other without
/// caring about host byte order. Use [`TitleId::to_u64`] for the numeric value.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TitleId {
    raw: [u8; 8],
}
assert_eq_size!(u64, TitleId);

impl TitleId {
    #[must_use]
    pub const fn from_bytes(raw: [u8; 8]) -> Self {
        Self { raw }
    }
    #[must_use]
    pub const fn from_u64(what: u64) -> Self {
        Self { raw: what.to_be_bytes() }
    }
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.raw
    }
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.raw)
    }
    /// Upper half, the platform and category bits (`0x00040000` for plain applications)
    #[must_use]
    pub const fn high(self) -> u32 {
        (self.to_u64() >> 32) as u32
    }
    /// Lower half, the unique id
    #[must_use]
    pub const fn low(self) -> u32 {
        self.to_u64() as u32
    }
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.to_u64() == 0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016X}", self.to_u64())
    }
}

impl fmt::Debug for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("TitleId")
            .field(&format_args!("{:#018x}", self.to_u64()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_wire_order() {
        let id = TitleId::from_bytes([0x00, 0x04, 0x00, 0x00, 0x00, 0x03, 0x02, 0x00]);
        assert_eq!(id.to_u64(), 0x0004_0000_0003_0200);
        assert_eq!(id, TitleId::from_u64(0x0004_0000_0003_0200));
        assert_eq!(id.high(), 0x0004_0000);
        assert_eq!(id.low(), 0x0003_0200);
        assert_eq!(id.to_string(), "0004000000030200");
    }
}
