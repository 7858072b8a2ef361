//! Storage keys for trie nodes.
//!
//! A [`TrieKey`] is the full bit path from the root of the trie to a node,
//! together with its length. Bit 0 is the least significant bit of the path;
//! bit `len - 1` is the bit taken first when descending from the root.

use crate::felt::{felt_from_be_bytes, Felt, FELT_BITS};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A fixed-capacity bit path of length `0..=252`.
///
/// Bits above `len` are always zero. The type is plain data and cheap to
/// copy; the derived ordering is only used to key ordered storage maps and
/// carries no path semantics (see [`TrieKey::cmp_aligned`] for those).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrieKey {
    len: u8,
    /// Little-endian 64-bit words; bit `i` lives in `words[i / 64]`.
    words: [u64; 4],
}

impl TrieKey {
    /// Builds a key of length exactly `len` from a big-endian byte slice.
    /// Input bits above `len` are discarded.
    pub fn new(len: u8, be_bytes: &[u8]) -> Self {
        debug_assert!(len <= FELT_BITS);
        let mut padded = [0u8; 32];
        let take = be_bytes.len().min(32);
        padded[32 - take..].copy_from_slice(&be_bytes[be_bytes.len() - take..]);

        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let hi = 32 - i * 8;
            *word = u64::from_be_bytes(padded[hi - 8..hi].try_into().expect("8-byte chunk"));
        }

        let mut key = Self { len, words };
        key.mask_above_len();
        key
    }

    /// The empty (zero-length) key.
    pub const fn empty() -> Self {
        Self {
            len: 0,
            words: [0; 4],
        }
    }

    /// Number of bits in the path.
    pub const fn len(&self) -> u8 {
        self.len
    }

    /// True for the zero-length path.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads bit `i` of the path. Indices at or above `len` read as zero.
    pub fn test(&self, i: u8) -> bool {
        (self.words[(i / 64) as usize] >> (i % 64)) & 1 == 1
    }

    /// Drops all bits at positions `new_len` and above.
    pub fn truncate(&mut self, new_len: u8) {
        debug_assert!(new_len <= self.len);
        self.len = new_len;
        self.mask_above_len();
    }

    /// Shifts the path right by `n` bits, shortening it by `n`.
    pub fn delete_lsb(&mut self, n: u8) {
        debug_assert!(n <= self.len);
        let word_shift = (n / 64) as usize;
        let bit_shift = (n % 64) as u32;

        let mut out = [0u64; 4];
        for i in 0..4 - word_shift {
            let mut word = self.words[i + word_shift] >> bit_shift;
            if bit_shift > 0 && i + word_shift + 1 < 4 {
                word |= self.words[i + word_shift + 1] << (64 - bit_shift);
            }
            out[i] = word;
        }
        self.words = out;
        self.len -= n;
    }

    /// Compares two keys as if both were aligned to the most significant bit
    /// of a full-height path. Keys that agree on their common prefix order by
    /// length, the longer key after the shorter.
    pub fn cmp_aligned(&self, other: &Self) -> Ordering {
        let common = self.len.min(other.len);
        for i in 1..=common {
            let a = self.test(self.len - i);
            let b = other.test(other.len - i);
            if a != b {
                return if a { Ordering::Greater } else { Ordering::Less };
            }
        }
        self.len.cmp(&other.len)
    }

    /// The path bits interpreted as a field element.
    pub fn felt(&self) -> Felt {
        felt_from_be_bytes(&self.to_be_bytes())
    }

    /// Big-endian byte form of the path bits.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, word) in self.words.iter().enumerate() {
            let hi = 32 - i * 8;
            out[hi - 8..hi].copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Deterministic storage encoding: the length byte followed by the
    /// big-endian path bits.
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.len;
        out[1..].copy_from_slice(&self.to_be_bytes());
        out
    }

    fn mask_above_len(&mut self) {
        let full = (self.len / 64) as usize;
        let rem = (self.len % 64) as u32;
        if full < 4 {
            self.words[full] &= if rem == 0 { 0 } else { u64::MAX >> (64 - rem) };
            for word in &mut self.words[full + 1..] {
                *word = 0;
            }
        }
    }
}

impl TryFrom<&[u8]> for TrieKey {
    type Error = &'static str;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 33 {
            return Err("trie key encoding must be 33 bytes");
        }
        let len = bytes[0];
        if len > FELT_BITS {
            return Err("trie key length exceeds the field bit width");
        }
        let key = Self::new(len, &bytes[1..]);
        if key.to_be_bytes() != bytes[1..] {
            return Err("trie key has bits set above its length");
        }
        Ok(key)
    }
}

impl fmt::Debug for TrieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrieKey(len={}, 0x", self.len)?;
        for byte in self.to_be_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
