//! Fixed-capacity string fields.

use std::fmt;

/// A string that never holds more than `N - 1` bytes, mirroring a
/// NUL-terminated `char[N]` buffer. Longer input is truncated at the last char
/// boundary that fits.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    buf: String,
}

impl<const N: usize> FixedStr<N> {
    /// Usable capacity in bytes.
    pub const CAPACITY: usize = if N == 0 { 0 } else { N - 1 };

    pub fn new(s: &str) -> Self {
        let mut out = Self { buf: String::new() };
        out.set(s);
        out
    }

    /// Replace the contents, truncating to capacity.
    pub fn set(&mut self, s: &str) {
        let mut end = s.len().min(Self::CAPACITY);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.clear();
        self.buf.push_str(&s[..end]);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> PartialEq<str> for FixedStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.buf == other
    }
}

impl<const N: usize> PartialEq<&str> for FixedStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.buf == *other
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.buf, f)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_capacity() {
        let s: FixedStr<4> = FixedStr::new("abcdef");
        assert_eq!(s, "abc");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn truncates_on_char_boundary() {
        // "é" is two bytes; only one byte of capacity would remain for it.
        let s: FixedStr<3> = FixedStr::new("aé");
        assert_eq!(s, "a");
    }

    #[test]
    fn short_input_is_kept() {
        let mut s: FixedStr<16> = FixedStr::default();
        assert!(s.is_empty());
        s.set("select");
        assert_eq!(s.as_str(), "select");
        assert_eq!(s.to_string(), "select");
    }
}
