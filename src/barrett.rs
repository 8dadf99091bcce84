//! # Barrett modular-reduction engine
//!
//! A [`Barrett`] context binds a fixed modulus to its precomputed reduction
//! coefficient `mu = floor(radix^(2N) / m)` and performs every modular
//! operation — reduction, add/sub/mul/square, exponentiation, inversion,
//! random sampling — without integer division in the hot path.
//!
//! ## Algorithm: Barrett reduction
//!
//! For a 2N-word operand `x`, the reduction approximates
//! `x − floor(x / radix^N) · mu · radix^(−N) · m` with two partial-product
//! passes against `mu` (only the words that can influence the quotient
//! estimate are computed), then corrects the at-most-small-constant
//! overshoot with a few subtractions of `m`. See "Handbook of Applied
//! Cryptography", Menezes, van Oorschot, Vanstone, chapter 14.3.3.
//!
//! ## Algorithm: sliding-window exponentiation (window 4)
//!
//! The exponent is scanned most-significant-bit first, accumulating bits
//! into a 4-bit window. Only the odd powers g^1, g^3, …, g^15 are
//! precomputed (the even ones are reachable by squaring), and each window
//! value decodes through three fixed tables: squarings before the table
//! multiply, the odd-power index, and squarings after. For window value
//! `1100` for example: square twice, multiply by g^3, square twice more.
//! The full decode per 4-bit value:
//!
//! ```text
//!     0 : - | -       | -          1000 : 1 |  g1 @ 0 | 3
//!     1 : 1 |  g1 @ 0 | 0          1001 : 4 |  g9 @ 4 | 0
//!    10 : 1 |  g1 @ 0 | 1          1010 : 3 |  g5 @ 2 | 1
//!    11 : 2 |  g3 @ 1 | 0          1011 : 4 | g11 @ 5 | 0
//!   100 : 1 |  g1 @ 0 | 2          1100 : 2 |  g3 @ 1 | 2
//!   101 : 3 |  g5 @ 2 | 0          1101 : 4 | g13 @ 6 | 0
//!   110 : 2 |  g3 @ 1 | 1          1110 : 3 |  g7 @ 3 | 1
//!   111 : 3 |  g7 @ 3 | 0          1111 : 4 | g15 @ 7 | 0
//! ```
//!
//! A base-2 specialization ([`Barrett::two_pow_mod_w`]) replaces the table
//! multiply with a conditional modular doubling — the common case for the
//! mandatory first Miller–Rabin witness.
//!
//! ## Workspace formulas
//!
//! Every `*_w` operation takes a caller-supplied scratch slice; the
//! documented minimum sizes (N = modulus words) are: reduction `2N+2`,
//! modular add/sub/mul/square `4N+2`, coefficient computation `6N+4`,
//! inversion `6(N+1)`, random sampling `N` (`6N+6` for the invertible
//! variant). The allocating wrappers size these internally.

use crate::number::{HexError, MpNumber};
use crate::word::{self, Word};
use crate::{fill_words, RandomSource};

/// Squarings to perform before the table multiply, per 4-bit window value.
const WINDOW_PRE_SQUARES: [u8; 16] = [0, 1, 1, 2, 1, 3, 2, 3, 1, 4, 3, 4, 2, 4, 3, 4];

/// Odd-power table index (g^(2k+1) lives at slot k), per window value.
const WINDOW_TABLE_INDEX: [u8; 16] = [0, 0, 0, 1, 0, 2, 1, 3, 0, 4, 2, 5, 1, 6, 3, 7];

/// Squarings to perform after the table multiply, per window value.
const WINDOW_POST_SQUARES: [u8; 16] = [0, 0, 1, 0, 2, 0, 1, 0, 3, 0, 1, 0, 2, 0, 1, 0];

/// A fixed modulus together with its Barrett reduction coefficient.
///
/// The modulus (N words) and coefficient (N+1 words) live in one buffer,
/// allocated and freed together. All modular operations assume operands
/// reduced below the modulus (at most N words; 2N for [`reduce_w`]) and are
/// only defined once the modulus is set — which the constructors guarantee.
///
/// [`reduce_w`]: Barrett::reduce_w
#[derive(Debug, Clone, PartialEq)]
pub struct Barrett {
    size: usize,
    /// `words[..size]` is the modulus, `words[size..]` the coefficient.
    words: Vec<Word>,
}

impl Barrett {
    /// Build a context for the given modulus (most-significant word first;
    /// leading zero words are trimmed). Panics on a zero modulus.
    pub fn new(modulus: &[Word]) -> Self {
        let sig = word::significant_words(modulus);
        assert!(sig > 0, "modulus must be nonzero");
        let mut b = Barrett::alloc(sig);
        b.words[..sig].copy_from_slice(&modulus[modulus.len() - sig..]);
        let mut wksp = vec![0; 6 * sig + 4];
        b.compute_mu_w(&mut wksp);
        b
    }

    /// Build a context from a big integer.
    pub fn from_number(m: &MpNumber) -> Self {
        Self::new(m.as_words())
    }

    /// Build a context from a hexadecimal modulus.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        Ok(Self::new(MpNumber::from_hex(hex)?.as_words()))
    }

    /// An all-zero context of `size` words with no coefficient yet; the
    /// prime search writes candidates into it and computes the coefficient
    /// only after the cheap filters pass.
    pub(crate) fn alloc(size: usize) -> Self {
        debug_assert!(size > 0);
        Barrett {
            size,
            words: vec![0; 2 * size + 1],
        }
    }

    /// Modulus word count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Significant bit length of the modulus.
    pub fn bits(&self) -> usize {
        word::bits(self.modulus())
    }

    /// The modulus words.
    pub fn modulus(&self) -> &[Word] {
        &self.words[..self.size]
    }

    pub(crate) fn modulus_mut(&mut self) -> &mut [Word] {
        &mut self.words[..self.size]
    }

    /// The reduction coefficient words (N+1 of them).
    fn mu(&self) -> &[Word] {
        &self.words[self.size..]
    }

    /// The modulus as a big integer.
    pub fn to_number(&self) -> MpNumber {
        MpNumber::from_words(self.modulus())
    }

    /// Zero the modulus and coefficient in place without deallocating.
    pub fn wipe(&mut self) {
        use zeroize::Zeroize;
        self.words.zeroize();
    }

    /// Recompute the reduction coefficient after the modulus words changed:
    /// normalize the modulus, divide the implicit single-set-bit dividend
    /// `radix^(2N) << shift` by it, keep the quotient, denormalize the
    /// modulus back. Needs `6N+4` workspace words.
    pub(crate) fn compute_mu_w(&mut self, wksp: &mut [Word]) {
        let n = self.size;
        debug_assert!(wksp.len() >= 6 * n + 4);
        let (modl, mu) = self.words.split_at_mut(n);
        let (divmod, rest) = wksp.split_at_mut(2 * n + 2);
        let (dividend, rest) = rest.split_at_mut(2 * n + 1);
        let ws = &mut rest[..n + 1];

        let shift = word::normalize(modl);
        debug_assert!(
            shift < word::WORD_BITS,
            "modulus has a zero most-significant word"
        );
        dividend.fill(0);
        dividend[0] = 1 << shift;
        word::div_rem(divmod, dividend, modl, ws);
        mu.copy_from_slice(&divmod[1..n + 2]);
        word::shr(modl, shift);
    }

    // --- reduction ---------------------------------------------------------

    /// Barrett reduction of a 2N-word operand into an N-word result
    /// congruent to it modulo the modulus. Needs `2N+2` workspace words.
    pub fn reduce_w(&self, x: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(x.len(), 2 * n);
        debug_assert_eq!(result.len(), n);
        debug_assert!(wksp.len() >= 2 * n + 2);
        let wksp = &mut wksp[..2 * n + 2];
        let mu = self.mu();

        // pass 1: the high words of floor(x / radix^(n-1)) * mu; each
        // successively more significant operand word meets one more word of
        // mu, so the low words that cannot reach the quotient estimate are
        // never formed
        let carry = word::mul_word(&mut wksp[n + 1..n + 3], &mu[..2], x[n]);
        wksp[n] = carry;
        for s in 3..=n + 1 {
            let xw = x[n + 2 - s];
            let lo = n + 3 - s;
            wksp[lo - 1] = if xw != 0 {
                word::mul_word_acc(&mut wksp[lo..n + 3], &mu[..s], xw)
            } else {
                0
            };
        }
        let xw = x[0];
        wksp[0] = if xw != 0 {
            word::mul_word_acc(&mut wksp[1..n + 2], mu, xw)
        } else {
            0
        };

        // pass 2: r2 = q * m mod radix^(n+1), truncated partial products
        let (q, r2) = wksp.split_at_mut(n + 1);
        let modl = self.modulus();
        r2[0] = word::mul_word(&mut r2[1..], modl, q[n]);
        for j in 0..n {
            let sp = n - j;
            word::mul_word_acc(&mut r2[..sp], &modl[j..], q[n - 1 - j]);
        }

        // x mod radix^(n+1) minus r2, then the bounded corrective loop
        word::set_ext(q, x);
        word::sub(q, r2);
        while word::ge_ext(q, modl) {
            word::sub_ext(q, modl);
        }
        result.copy_from_slice(&q[1..]);
    }

    // --- modular arithmetic ------------------------------------------------

    /// `result = (x + y) mod m` for operands of at most N words. Needs
    /// `4N+2` workspace words.
    pub fn add_mod_w(&self, x: &[Word], y: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert!(x.len() <= n && y.len() <= n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        word::set_ext(opnd, x);
        word::add_ext(opnd, y);
        self.reduce_w(opnd, result, red);
    }

    /// `result = (x - y) mod m`; an underflow adds the modulus back before
    /// reducing. Needs `4N+2` workspace words.
    pub fn sub_mod_w(&self, x: &[Word], y: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert!(x.len() <= n && y.len() <= n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        word::set_ext(opnd, x);
        if word::sub_ext(opnd, y) != 0 {
            word::add_ext(opnd, self.modulus());
        }
        self.reduce_w(opnd, result, red);
    }

    /// `result = (x * y) mod m`. Needs `4N+2` workspace words.
    pub fn mul_mod_w(&self, x: &[Word], y: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert!(x.len() <= n && y.len() <= n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        let fill = 2 * n - x.len() - y.len();
        opnd[..fill].fill(0);
        word::mul(&mut opnd[fill..], x, y);
        self.reduce_w(opnd, result, red);
    }

    /// `result = x^2 mod m`. Needs `4N+2` workspace words.
    pub fn sqr_mod_w(&self, x: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert!(x.len() <= n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        let fill = 2 * (n - x.len());
        opnd[..fill].fill(0);
        word::sqr(&mut opnd[fill..], x);
        self.reduce_w(opnd, result, red);
    }

    /// Square an N-word residue in place. Needs `4N+2` workspace words.
    pub fn sqr_mod_in_place_w(&self, x: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(x.len(), n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        word::sqr(opnd, x);
        self.reduce_w(opnd, x, red);
    }

    /// Multiply an N-word residue by `y` in place. Needs `4N+2` workspace
    /// words.
    pub fn mul_mod_in_place_w(&self, x: &mut [Word], y: &[Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(x.len(), n);
        debug_assert!(y.len() <= n);
        let (red, opnd) = wksp[..4 * n + 2].split_at_mut(2 * n + 2);
        let fill = n - y.len();
        opnd[..fill].fill(0);
        word::mul(&mut opnd[fill..], x, y);
        self.reduce_w(opnd, x, red);
    }

    /// Copy `m - 1` into `result`.
    pub fn minus_one_into(&self, result: &mut [Word]) {
        result.copy_from_slice(self.modulus());
        word::sub_word(result, 1);
    }

    /// `m - 1` as a big integer.
    pub fn minus_one(&self) -> MpNumber {
        let mut r = MpNumber::with_size(self.size);
        self.minus_one_into(r.as_words_mut());
        r
    }

    /// `result = (m - x) mod m` for a residue `x` in `[0, m)`, computed as
    /// a two's-complement negate plus the modulus.
    pub fn neg_mod_w(&self, x: &[Word], result: &mut [Word]) {
        debug_assert_eq!(x.len(), self.size);
        result.copy_from_slice(x);
        word::neg(result);
        word::add(result, self.modulus());
    }

    // --- exponentiation ----------------------------------------------------

    /// Precompute the sliding-window table of odd powers x^1, x^3, …, x^15
    /// into `slide` (8N words: slot k holds x^(2k+1)). Needs `4N+2`
    /// workspace words.
    pub fn precompute_window_w(&self, x: &[Word], slide: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(slide.len(), 8 * n);
        // x^2 parks in slot 0 while the odd powers build on it
        self.sqr_mod_w(x, &mut slide[..n], wksp);
        {
            let (x2, rest) = slide.split_at_mut(n);
            self.mul_mod_w(x, &x2[..n], &mut rest[..n], wksp);
        }
        for k in 2..8 {
            let (lo, hi) = slide.split_at_mut(k * n);
            let (x2, prev) = (&lo[..n], &lo[(k - 1) * n..]);
            self.mul_mod_w(x2, prev, &mut hi[..n], wksp);
        }
        word::set_ext(&mut slide[..n], x);
    }

    /// Sliding-window modular exponentiation: `result = x^e mod m`. The
    /// window table is built per call (8N transient words); use
    /// [`pow_mod_window_w`](Barrett::pow_mod_window_w) with a table from
    /// [`precompute_window_w`](Barrett::precompute_window_w) when the same
    /// base serves many exponents. Needs `4N+2` workspace words.
    pub fn pow_mod_w(&self, x: &[Word], e: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        debug_assert_eq!(result.len(), self.size);
        if word::bits(e) == 0 {
            // x^0 stays one
            word::set_word(result, 1);
            return;
        }
        let mut slide = vec![0; 8 * self.size];
        self.precompute_window_w(x, &mut slide, wksp);
        self.pow_mod_window_w(&slide, e, result, wksp);
    }

    /// The sliding-window decode loop over a caller-supplied table of odd
    /// powers. Needs `4N+2` workspace words.
    pub fn pow_mod_window_w(&self, slide: &[Word], e: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(slide.len(), 8 * n);
        debug_assert_eq!(result.len(), n);
        word::set_word(result, 1);
        let ebits = word::bits(e);
        let mut window: usize = 0;
        let mut len = 0u32;
        for i in (0..ebits).rev() {
            let bit = word::bit(e, i) as usize;
            window = (window << 1) + bit;
            if window != 0 {
                if len > 0 {
                    len += 1;
                } else if bit == 1 {
                    len = 1;
                }
                if len == 4 {
                    self.apply_window(slide, window, result, wksp);
                    window = 0;
                    len = 0;
                }
            } else {
                // a bit that keeps the window empty just squares
                self.sqr_mod_in_place_w(result, wksp);
            }
        }
        if window != 0 {
            self.apply_window(slide, window, result, wksp);
        }
    }

    /// Decode one window value: pre-squarings, table multiply,
    /// post-squarings.
    fn apply_window(&self, slide: &[Word], window: usize, result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        for _ in 0..WINDOW_PRE_SQUARES[window] {
            self.sqr_mod_in_place_w(result, wksp);
        }
        let k = WINDOW_TABLE_INDEX[window] as usize;
        self.mul_mod_in_place_w(result, &slide[k * n..(k + 1) * n], wksp);
        for _ in 0..WINDOW_POST_SQUARES[window] {
            self.sqr_mod_in_place_w(result, wksp);
        }
    }

    /// Base-2 modular exponentiation: `result = 2^e mod m`, left-to-right
    /// square-and-conditionally-double with no precomputed table. Needs
    /// `4N+2` workspace words.
    pub fn two_pow_mod_w(&self, e: &[Word], result: &mut [Word], wksp: &mut [Word]) {
        debug_assert_eq!(result.len(), self.size);
        word::set_word(result, 1);
        let ebits = word::bits(e);
        for i in (0..ebits).rev() {
            self.sqr_mod_in_place_w(result, wksp);
            if word::bit(e, i)
                && (word::double(result) != 0 || word::ge(result, self.modulus()))
            {
                word::sub(result, self.modulus());
            }
        }
    }

    // --- inversion ---------------------------------------------------------

    /// Modular inverse of `x` by the binary extended GCD; assumes an odd
    /// modulus (every Barrett modulus in this crate is an odd prime — the
    /// contract is the caller's to keep). Returns `false` for a
    /// non-invertible `x`. Needs `6(N+1)` workspace words.
    pub fn mod_inverse_w(&self, x: &[Word], result: &mut [Word], wksp: &mut [Word]) -> bool {
        word::mod_inverse(self.modulus(), x, result, wksp)
    }

    // --- random sampling ---------------------------------------------------

    /// Sample a uniformly distributed residue strictly between 1 and
    /// `m - 1`: draw N random words, mask the excess high bits implied by
    /// the modulus bit length, fold into range, retry while the value is
    /// zero or one. Needs `N` workspace words.
    pub fn random_element_w(&self, rng: &mut dyn RandomSource, result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(result.len(), n);
        let msz = word::leading_zero_bits(self.modulus());
        let wksp = &mut wksp[..n];
        self.minus_one_into(wksp);
        loop {
            fill_words(rng, result);
            result[0] &= Word::MAX >> msz;
            while word::ge(result, wksp) {
                word::sub(result, wksp);
            }
            if !word::le_one(result) {
                return;
            }
        }
    }

    /// Like [`random_element_w`](Barrett::random_element_w) but forces the
    /// result odd. Needs `N` workspace words.
    pub fn random_odd_element_w(&self, rng: &mut dyn RandomSource, result: &mut [Word], wksp: &mut [Word]) {
        let n = self.size;
        debug_assert_eq!(result.len(), n);
        let msz = word::leading_zero_bits(self.modulus());
        let wksp = &mut wksp[..n];
        self.minus_one_into(wksp);
        loop {
            fill_words(rng, result);
            result[0] &= Word::MAX >> msz;
            word::set_lsb(result);
            while word::ge(result, wksp) {
                word::sub(result, wksp);
                word::set_lsb(result);
            }
            if !word::le_one(result) {
                return;
            }
        }
    }

    /// Sample until the element is invertible modulo the context, writing
    /// the element and its inverse. Needs `6N+6` workspace words.
    pub fn random_invertible_w(
        &self,
        rng: &mut dyn RandomSource,
        result: &mut [Word],
        inverse: &mut [Word],
        wksp: &mut [Word],
    ) {
        loop {
            if word::is_even(self.modulus()) {
                self.random_odd_element_w(rng, result, wksp);
            } else {
                self.random_element_w(rng, result, wksp);
            }
            if word::mod_inverse(self.modulus(), result, inverse, wksp) {
                return;
            }
        }
    }

    // --- allocating conveniences -------------------------------------------

    /// `x mod m` for an operand of up to 2N significant words.
    pub fn reduce(&self, x: &[Word]) -> MpNumber {
        let n = self.size;
        let mut opnd = vec![0; 2 * n];
        word::set_ext(&mut opnd, x);
        let mut result = MpNumber::with_size(n);
        let mut wksp = vec![0; 2 * n + 2];
        self.reduce_w(&opnd, result.as_words_mut(), &mut wksp);
        result
    }

    /// `(x + y) mod m`.
    pub fn add_mod(&self, x: &[Word], y: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.add_mod_w(x, y, result.as_words_mut(), &mut wksp);
        result
    }

    /// `(x - y) mod m`.
    pub fn sub_mod(&self, x: &[Word], y: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.sub_mod_w(x, y, result.as_words_mut(), &mut wksp);
        result
    }

    /// `(x * y) mod m`.
    pub fn mul_mod(&self, x: &[Word], y: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.mul_mod_w(x, y, result.as_words_mut(), &mut wksp);
        result
    }

    /// `(m - x) mod m` for a residue `x` in `[0, m)`.
    pub fn neg_mod(&self, x: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        self.neg_mod_w(x, result.as_words_mut());
        result
    }

    /// `x^2 mod m`.
    pub fn sqr_mod(&self, x: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.sqr_mod_w(x, result.as_words_mut(), &mut wksp);
        result
    }

    /// `x^e mod m` by sliding-window exponentiation.
    pub fn pow_mod(&self, x: &[Word], e: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.pow_mod_w(x, e, result.as_words_mut(), &mut wksp);
        result
    }

    /// `2^e mod m` by the base-2 specialization.
    pub fn two_pow_mod(&self, e: &[Word]) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 4 * self.size + 2];
        self.two_pow_mod_w(e, result.as_words_mut(), &mut wksp);
        result
    }

    /// Modular inverse of `x`, or `None` when `gcd(x, m) != 1`.
    pub fn mod_inverse(&self, x: &[Word]) -> Option<MpNumber> {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 6 * (self.size + 1)];
        self.mod_inverse_w(x, result.as_words_mut(), &mut wksp)
            .then_some(result)
    }

    /// A random residue strictly between 1 and `m - 1`.
    pub fn random_element(&self, rng: &mut dyn RandomSource) -> MpNumber {
        let mut result = MpNumber::with_size(self.size);
        let mut wksp = vec![0; self.size];
        self.random_element_w(rng, result.as_words_mut(), &mut wksp);
        result
    }

    /// A random invertible residue and its inverse.
    pub fn random_invertible_element(&self, rng: &mut dyn RandomSource) -> (MpNumber, MpNumber) {
        let mut result = MpNumber::with_size(self.size);
        let mut inverse = MpNumber::with_size(self.size);
        let mut wksp = vec![0; 6 * self.size + 6];
        self.random_invertible_w(rng, result.as_words_mut(), inverse.as_words_mut(), &mut wksp);
        (result, inverse)
    }
}
