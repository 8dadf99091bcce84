//! # Dynamic big integer
//!
//! [`MpNumber`] is a growable, magnitude-only (unsigned) integer: a word
//! count plus an owned buffer, most-significant word first, built directly
//! on the [`word`](crate::word) kernel. It carries the crate's external
//! text format — hexadecimal with every word zero-padded to its full 16
//! digits — which is the test-vector format and must stay bit-exact.
//!
//! Secrets (private exponents, prime factors) are wiped in place through
//! the [`zeroize::Zeroize`] impl rather than left for the allocator.

use core::cmp::Ordering;
use core::fmt;

use crate::word::{self, Word, WORD_BYTES, WORD_NIBBLES};

/// Error parsing a hexadecimal string.
///
/// Parsing is strict: a malformed digit is rejected rather than silently
/// treated as zero, since every published test vector is valid hex and a
/// typo in a modulus should never parse to a different number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// A character outside `[0-9A-Fa-f]`.
    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidDigit {
        /// The offending character.
        digit: char,
        /// Byte offset into the input string.
        position: usize,
    },
}

/// A dynamically sized unsigned big integer, most-significant word first.
///
/// A fresh number is zero-valued; buffers are resized on demand. Instances
/// with no superfluous leading zero words are called normalized (see
/// [`trim`](MpNumber::trim)); the empty buffer is the canonical zero.
/// Comparison and equality are size-aware, so `[0, 7]` equals `[7]`.
#[derive(Debug, Clone, Default)]
pub struct MpNumber {
    data: Vec<Word>,
}

impl MpNumber {
    /// The empty (zero-valued, zero-length) integer.
    pub fn new() -> Self {
        MpNumber { data: Vec::new() }
    }

    /// A zero-filled integer of `size` words.
    pub fn with_size(size: usize) -> Self {
        MpNumber {
            data: vec![0; size],
        }
    }

    /// A one-word integer.
    pub fn from_word(w: Word) -> Self {
        MpNumber { data: vec![w] }
    }

    /// Copy an existing word buffer.
    pub fn from_words(words: &[Word]) -> Self {
        MpNumber {
            data: words.to_vec(),
        }
    }

    /// The backing words, most significant first.
    pub fn as_words(&self) -> &[Word] {
        &self.data
    }

    pub(crate) fn as_words_mut(&mut self) -> &mut [Word] {
        &mut self.data
    }

    /// Word count of the buffer (not the significant length).
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Significant bit length.
    pub fn bits(&self) -> usize {
        word::bits(&self.data)
    }

    /// True if the value is zero (including the empty integer).
    pub fn is_zero(&self) -> bool {
        word::is_zero(&self.data)
    }

    /// True if the value is one.
    pub fn is_one(&self) -> bool {
        word::is_one(&self.data)
    }

    /// True if the value is odd.
    pub fn is_odd(&self) -> bool {
        word::is_odd(&self.data)
    }

    /// Resize to `size` words, preserving the low-aligned value: growing
    /// prepends zero words, shrinking drops high words.
    pub fn resize(&mut self, size: usize) {
        let mut data = vec![0; size];
        word::set_ext(&mut data, &self.data);
        self.data = data;
    }

    /// Replace the value with a single word, shrinking to one word.
    pub fn set_word(&mut self, w: Word) {
        self.data.clear();
        self.data.push(w);
    }

    /// Strip superfluous leading zero words; zero trims to the empty buffer.
    pub fn trim(&mut self) {
        let sig = word::significant_words(&self.data);
        let start = self.data.len() - sig;
        self.data.drain(..start);
    }

    /// Add a single word, growing the buffer if the sum carries out.
    pub fn add_word_assign(&mut self, w: Word) {
        if word::add_word(&mut self.data, w) != 0 {
            self.data.insert(0, 1);
        }
    }

    /// Subtract a single word. The caller guarantees the value is at least
    /// `w`; a borrow out of the buffer panics in debug builds.
    pub fn sub_word_assign(&mut self, w: Word) {
        let borrow = word::sub_word(&mut self.data, w);
        debug_assert_eq!(borrow, 0, "subtraction underflow");
    }

    /// Double the value, growing the buffer on carry.
    pub fn double_assign(&mut self) {
        if word::double(&mut self.data) != 0 {
            self.data.insert(0, 1);
        }
    }

    /// Full product of two numbers.
    pub fn mul(x: &MpNumber, y: &MpNumber) -> MpNumber {
        if x.data.is_empty() || y.data.is_empty() {
            return MpNumber::new();
        }
        let mut result = MpNumber::with_size(x.size() + y.size());
        word::mul(&mut result.data, &x.data, &y.data);
        result
    }

    /// General modular reduction `self mod m` for an arbitrary nonzero
    /// modulus: normalize the divisor, long-divide, denormalize the
    /// remainder. Used where no Barrett context for `m` exists (CRT term
    /// computation); the Barrett path stays division-free.
    pub fn reduce(&self, m: &MpNumber) -> MpNumber {
        let msig = m.significant();
        assert!(!msig.is_empty(), "reduction by zero modulus");
        let xsig = self.significant();
        if word::lt_ext(xsig, msig) {
            let mut r = MpNumber::with_size(msig.len());
            word::set_ext(&mut r.data, xsig);
            return r;
        }

        let shift = word::leading_zero_bits(msig);
        let mut divisor = msig.to_vec();
        word::shl(&mut divisor, shift);

        let mut dividend = vec![0; xsig.len() + 1];
        dividend[1..].copy_from_slice(xsig);
        word::shl(&mut dividend, shift);

        let mut out = vec![0; dividend.len() + 1];
        let mut wksp = vec![0; divisor.len() + 1];
        word::div_rem(&mut out, &dividend, &divisor, &mut wksp);

        let mut rem = out[out.len() - msig.len()..].to_vec();
        word::shr(&mut rem, shift);
        MpNumber { data: rem }
    }

    /// Modular inverse of `self` modulo `m` via the binary extended GCD.
    /// Returns `None` when `gcd(self, m) != 1` — a normal outcome, not an
    /// error; callers that sample random elements simply retry.
    pub fn mod_inverse(&self, m: &MpNumber) -> Option<MpNumber> {
        let msig = m.significant();
        assert!(!msig.is_empty(), "inversion modulo zero");
        let reduced;
        let ysig = if word::ge_ext(self.significant(), msig) {
            reduced = self.reduce(m);
            reduced.significant().to_vec()
        } else {
            self.significant().to_vec()
        };
        let mut result = MpNumber::with_size(msig.len());
        let mut wksp = vec![0; 6 * (msig.len() + 1)];
        word::mod_inverse(msig, &ysig, &mut result.data, &mut wksp).then_some(result)
    }

    /// The significant words (leading zeros skipped).
    pub(crate) fn significant(&self) -> &[Word] {
        let sig = word::significant_words(&self.data);
        &self.data[self.data.len() - sig..]
    }

    // --- text and byte formats ---------------------------------------------

    /// Parse a hexadecimal string, most-significant digit first. An
    /// odd-length string is treated as if padded with one leading zero
    /// nibble. The empty string parses to the empty integer.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        let bytes = hex.as_bytes();
        if bytes.is_empty() {
            return Ok(MpNumber::new());
        }
        let size = bytes.len().div_ceil(WORD_NIBBLES);
        let mut data = vec![0; size];
        // the first chunk takes whatever digits don't fill a whole word
        let mut chunk = bytes.len() - (size - 1) * WORD_NIBBLES;
        let mut pos = 0;
        for w in data.iter_mut() {
            let mut acc: Word = 0;
            for &b in &bytes[pos..pos + chunk] {
                let nibble = match b {
                    b'0'..=b'9' => b - b'0',
                    b'A'..=b'F' => b - b'A' + 10,
                    b'a'..=b'f' => b - b'a' + 10,
                    _ => {
                        return Err(HexError::InvalidDigit {
                            digit: hex[pos..].chars().next().unwrap_or('?'),
                            position: pos,
                        })
                    }
                };
                acc = (acc << 4) | nibble as Word;
                pos += 1;
            }
            *w = acc;
            chunk = WORD_NIBBLES;
        }
        Ok(MpNumber { data })
    }

    /// Render as hexadecimal: each word zero-padded to its full 16 digits,
    /// concatenated most-significant word first. This fixed-width form is
    /// the externally observable vector format.
    pub fn to_hex(&self) -> String {
        use core::fmt::Write;
        let mut out = String::with_capacity(self.data.len() * WORD_NIBBLES);
        for w in &self.data {
            write!(out, "{w:016x}").expect("formatting into a String");
        }
        out
    }

    /// Import a big-endian octet string, skipping non-significant leading
    /// zero bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bytes = {
            let skip = bytes.iter().take_while(|&&b| b == 0).count();
            &bytes[skip..]
        };
        if bytes.is_empty() {
            return MpNumber::new();
        }
        let size = bytes.len().div_ceil(WORD_BYTES);
        let mut data = vec![0; size];
        let mut chunk = bytes.len() - (size - 1) * WORD_BYTES;
        let mut pos = 0;
        for w in data.iter_mut() {
            let mut acc: Word = 0;
            for &b in &bytes[pos..pos + chunk] {
                acc = (acc << 8) | b as Word;
                pos += 1;
            }
            *w = acc;
            chunk = WORD_BYTES;
        }
        MpNumber { data }
    }

    /// Export the significant bytes as a big-endian octet string; zero
    /// exports to the empty string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let nbytes = (self.bits() + 7) / 8;
        let mut out = vec![0u8; nbytes];
        let mut i = nbytes;
        'outer: for &w in self.data.iter().rev() {
            for shift in (0..word::WORD_BITS).step_by(8) {
                if i == 0 {
                    break 'outer;
                }
                i -= 1;
                out[i] = (w >> shift) as u8;
            }
        }
        out
    }
}

impl PartialEq for MpNumber {
    fn eq(&self, other: &Self) -> bool {
        word::eq_ext(&self.data, &other.data)
    }
}

impl Eq for MpNumber {}

impl PartialOrd for MpNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MpNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        if word::eq_ext(&self.data, &other.data) {
            Ordering::Equal
        } else if word::gt_ext(&self.data, &other.data) {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

impl fmt::Display for MpNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl zeroize::Zeroize for MpNumber {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroize;

    #[test]
    fn hex_round_trip_is_bit_exact() {
        let cases = [
            "0000000000000001",
            "c773218c737ec8ee993b4f2ded30f48edace915f",
            "ffffffffffffffffffffffffffffffff",
            "0123456789abcdef0123456789abcdef0123456789abcdef",
        ];
        for hex in cases {
            let n = MpNumber::from_hex(hex).expect("valid hex");
            let back = MpNumber::from_hex(&n.to_hex()).expect("round trip");
            assert_eq!(n, back, "round trip of {hex}");
        }
    }

    #[test]
    fn odd_length_hex_gets_a_leading_zero_nibble() {
        let a = MpNumber::from_hex("fff").unwrap();
        let b = MpNumber::from_hex("0fff").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_words(), &[0xfff]);
    }

    #[test]
    fn uppercase_and_lowercase_parse_alike() {
        let a = MpNumber::from_hex("DEADBEEF").unwrap();
        let b = MpNumber::from_hex("deadbeef").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        match MpNumber::from_hex("12g4") {
            Err(HexError::InvalidDigit { digit, position }) => {
                assert_eq!(digit, 'g');
                assert_eq!(position, 2);
            }
            other => panic!("expected InvalidDigit, got {other:?}"),
        }
    }

    #[test]
    fn to_hex_pads_every_word() {
        let n = MpNumber::from_word(0x1f);
        assert_eq!(n.to_hex(), "000000000000001f");
        assert_eq!(MpNumber::new().to_hex(), "");
    }

    #[test]
    fn byte_round_trip_skips_leading_zeros() {
        let n = MpNumber::from_bytes(&[0, 0, 0x12, 0x34, 0x56]);
        assert_eq!(n.as_words(), &[0x123456]);
        assert_eq!(n.to_bytes(), vec![0x12, 0x34, 0x56]);
        assert_eq!(MpNumber::from_bytes(&n.to_bytes()), n);
    }

    #[test]
    fn comparison_is_size_aware() {
        let a = MpNumber::from_hex("00000000000000000000000000000005").unwrap();
        let b = MpNumber::from_word(5);
        assert_eq!(a, b);
        assert!(MpNumber::from_word(6) > a);
        assert!(a < MpNumber::from_hex("10000000000000000").unwrap());
    }

    #[test]
    fn trim_strips_leading_zero_words_only() {
        let mut n = MpNumber::from_hex("000000000000000000000000000000ff").unwrap();
        assert_eq!(n.size(), 2);
        n.trim();
        assert_eq!(n.size(), 1);
        assert_eq!(n.as_words(), &[0xff]);

        let mut z = MpNumber::with_size(3);
        z.trim();
        assert_eq!(z.size(), 0);
        assert!(z.is_zero());
    }

    #[test]
    fn grow_on_carry() {
        let mut n = MpNumber::from_words(&[Word::MAX]);
        n.add_word_assign(1);
        assert_eq!(n.as_words(), &[1, 0]);

        let mut d = MpNumber::from_words(&[1 << 63]);
        d.double_assign();
        assert_eq!(d.as_words(), &[1, 0]);
    }

    #[test]
    fn mul_matches_u128() {
        let a = MpNumber::from_word(0xfedcba9876543210);
        let b = MpNumber::from_word(0x0f0f0f0f0f0f0f0f);
        let p = MpNumber::mul(&a, &b);
        let expect = 0xfedcba9876543210u128 * 0x0f0f0f0f0f0f0f0fu128;
        assert_eq!(
            p.as_words(),
            &[(expect >> 64) as Word, expect as Word],
            "product mismatch"
        );
    }

    #[test]
    fn reduce_matches_u128() {
        let x = MpNumber::from_words(&[0x0123456789abcdef, 0xfedcba9876543210]);
        let m = MpNumber::from_word(0x1_0000_0001);
        let r = x.reduce(&m);
        let xv = ((x.as_words()[0] as u128) << 64) | x.as_words()[1] as u128;
        assert_eq!(r, MpNumber::from_word((xv % 0x1_0000_0001) as Word));
        // x < m returns x unchanged
        let small = MpNumber::from_word(7);
        assert_eq!(small.reduce(&m), small);
    }

    #[test]
    fn mod_inverse_agrees_with_multiplication() {
        let m = MpNumber::from_word(101);
        for a in 1..101u64 {
            let inv = MpNumber::from_word(a).mod_inverse(&m).expect("101 is prime");
            let prod = MpNumber::mul(&MpNumber::from_word(a), &inv).reduce(&m);
            assert!(prod.is_one(), "{a} * {a}^-1 mod 101 != 1");
        }
        // non-coprime value reports non-invertibility
        let m = MpNumber::from_word(100);
        assert!(MpNumber::from_word(10).mod_inverse(&m).is_none());
    }

    #[test]
    fn zeroize_clears_the_buffer_in_place() {
        let mut n = MpNumber::from_hex("deadbeefcafebabe1122334455667788").unwrap();
        let size = n.size();
        n.zeroize();
        assert_eq!(n.size(), size, "wipe must not deallocate");
        assert!(n.is_zero());
    }
}
