use std::{borrow::Cow, fmt, str};

/// A NUL-padded byte string of a fixed size, as used by the issuer fields of tickets and title
/// metadata (e.g. `Root-CA00000003-XS0000000c`)
#[derive(Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct SizedCString<const SIZE: usize>([u8; SIZE]);

impl<const SIZE: usize> SizedCString<SIZE> {
    /// Bytes up to, not including, the first NUL
    #[must_use]
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|v| *v == 0).unwrap_or(SIZE);
        &self.0[..end]
    }
    /// Returns the string stored within, or str::Utf8Error if it's not valid UTF-8 data
    /// <https://doc.rust-lang.org/std/str/fn.from_utf8.html>
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.trimmed())
    }
    /// Converts to a string, replacing invalid UTF-8 sequences with replacement character
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.trimmed())
    }
    /// Checks if string inside this struct is all zeroes
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0)
    }
    /// Returns the full padded storage
    #[must_use]
    pub fn data(&self) -> &[u8; SIZE] {
        &self.0
    }
}

impl<const SIZE: usize> From<[u8; SIZE]> for SizedCString<SIZE> {
    fn from(other: [u8; SIZE]) -> SizedCString<SIZE> {
        SizedCString(other)
    }
}

impl<const SIZE: usize> fmt::Debug for SizedCString<SIZE> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_fmt(format_args!("\"{}\"", self.to_string_lossy()))
    }
}
