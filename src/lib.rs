//! # keystone — arbitrary-precision modular arithmetic and key generation
//!
//! A from-scratch big-integer engine for public-key cryptography: Barrett
//! modular reduction, sliding-window modular exponentiation, binary extended
//! GCD inversion, Miller–Rabin primality testing, and prime/keypair
//! generation for RSA and discrete-logarithm (DSA/ElGamal-style) schemes.
//! All arithmetic runs directly on fixed-width `u64` word buffers; no
//! external bignum library is involved.
//!
//! ## Layering
//!
//! 1. [`word`] — allocation-free kernel primitives on raw word slices.
//! 2. [`number`] — a growable magnitude ([`MpNumber`]) with hex/byte
//!    import-export and secure wipe.
//! 3. [`barrett`] — a fixed modulus plus its precomputed reduction
//!    coefficient ([`Barrett`]), supporting all modular operations without
//!    division in the hot path.
//! 4. [`prime`] — trial-division filtering and Miller–Rabin witness testing,
//!    plus plain / safe / congruent-one prime searches.
//! 5. [`dlparam`], [`rsa`] — discrete-log domain parameters and RSA keypairs
//!    assembled from the layers below.
//!
//! ## Randomness
//!
//! Everything that needs entropy takes a [`RandomSource`] — a capability,
//! not a global. Any [`rand_core::RngCore`] implements it, so production
//! code can pass an OS rng while tests pass a seeded ChaCha stream for
//! reproducible key generation.
//!
//! ## Scratch discipline
//!
//! The hot-path operations come in `*_w` form taking a caller-supplied
//! workspace slice sized by a documented per-operation formula, with
//! allocating convenience wrappers layered on top. Reduction, GCD, and the
//! exponentiation inner loops never allocate.

pub mod barrett;
pub mod dlparam;
pub mod number;
pub mod prime;
pub mod rsa;
pub mod word;

pub use barrett::Barrett;
pub use dlparam::DomainParams;
pub use number::{HexError, MpNumber};
pub use prime::{miller_rabin_trials, Cofactor, PrimeGenError};
pub use rsa::RsaKeyPair;

use word::Word;

/// Capability trait for the random-byte source injected into sampling and
/// prime-candidate generation.
///
/// Implemented for every [`rand_core::RngCore`], so `StdRng`, `OsRng`, or a
/// seeded `ChaCha20Rng` all plug in directly.
pub trait RandomSource {
    /// Fill `buf` entirely with random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

impl<R: rand_core::RngCore + ?Sized> RandomSource for R {
    fn fill(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf);
    }
}

/// Fill a word buffer from the random source, one big-endian word at a time.
pub(crate) fn fill_words(rng: &mut dyn RandomSource, dst: &mut [Word]) {
    let mut chunk = [0u8; word::WORD_BYTES];
    for w in dst.iter_mut() {
        rng.fill(&mut chunk);
        *w = Word::from_be_bytes(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fill_words_is_deterministic_for_a_seeded_source() {
        let mut a = [0 as Word; 4];
        let mut b = [0 as Word; 4];
        let mut rng1 = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        let mut rng2 = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        fill_words(&mut rng1, &mut a);
        fill_words(&mut rng2, &mut b);
        assert_eq!(a, b);
        assert!(a.iter().any(|&w| w != 0), "256 random bits were all zero");
    }
}
