//! Knobs that control how strictly the codec treats wire data.
//!
//! The defaults follow the limits laid down by the DBus specification,
//! and should only be relaxed when talking to peers known to emit
//! slightly-off messages.

/// Maximum nesting of containers (arrays, structs, dict entries and
/// variants) within a single value.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Maximum body length of a single array, in bytes.
pub const DEFAULT_MAX_ARRAY_LEN: u32 = 1 << 26;

#[derive(Clone, Debug, PartialEq)]
pub struct CodecOptions {
    /// Reject alignment padding that is not zero.
    pub strict_padding: bool,
    pub max_depth: usize,
    pub max_array_len: u32,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            strict_padding: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
        }
    }
}

impl CodecOptions {
    pub fn with_strict_padding(mut self, strict: bool) -> Self {
        self.strict_padding = strict;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_array_len(mut self, len: u32) -> Self {
        self.max_array_len = len;
        self
    }
}
