//! Fixed-width key formatting.
//!
//! Keys are zero-left-padded decimal strings of a configurable width. The
//! engine's path encoding requires odd-length keys, so an even configured
//! width is bumped to the next odd value.

/// Formats integer key numbers as fixed-width decimal strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyCodec {
    len: usize,
}

impl KeyCodec {
    /// Create a codec for the given width. Even widths are incremented by one.
    pub fn new(len: usize) -> Self {
        let len = if len % 2 == 0 { len + 1 } else { len };
        Self { len }
    }

    /// The key width this codec produces. Always odd.
    pub fn key_len(&self) -> usize {
        self.len
    }

    /// Render `key_num` as a zero-padded decimal string of exactly
    /// [`key_len`](Self::key_len) characters. A number wider than the
    /// configured width keeps all its digits.
    pub fn encode(&self, key_num: u64) -> String {
        let digits = key_num.to_string();
        let zeros = self.len.saturating_sub(digits.len());
        let mut key = String::with_capacity(zeros + digits.len());
        key.extend(std::iter::repeat('0').take(zeros));
        key.push_str(&digits);
        key
    }

    /// Parse a key back to its integer form. Scans use this to walk
    /// consecutive keys from a starting point.
    pub fn decode(&self, key: &str) -> Option<u64> {
        key.parse().ok()
    }
}
