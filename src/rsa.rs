//! # RSA keypair generation
//!
//! Builds RSA keypairs from the prime search and the Barrett engine: two
//! half-length primes compatible with the fixed public exponent, a
//! corrective loop that guarantees the modulus carries exactly the
//! requested bit count, and the Chinese-Remainder-Theorem terms
//! (`d mod (p−1)`, `d mod (q−1)`, `q⁻¹ mod p`) that let the private
//! operation run two half-size exponentiations instead of one full-size
//! one (Garner's recombination).
//!
//! Raw modular operations only — padding schemes and key encoding live
//! with the callers.

use tracing::debug;
use zeroize::Zeroize;

use crate::barrett::Barrett;
use crate::number::MpNumber;
use crate::prime::{self, miller_rabin_trials};
use crate::word::{self, Word};
use crate::RandomSource;

/// The fixed public exponent, F4 = 2^16 + 1.
pub const PUBLIC_EXPONENT: Word = 0x10001;

/// An RSA keypair with CRT acceleration terms.
///
/// Invariants established by [`generate`]: `p > q`, `n = p·q` with exactly
/// the requested bit length, `e·d ≡ 1 (mod lcm(p−1, q−1))`,
/// `d1 = d mod (p−1)`, `d2 = d mod (q−1)`, `c·q ≡ 1 (mod p)`. The private
/// members are wiped in place when the keypair drops.
#[derive(Debug)]
pub struct RsaKeyPair {
    /// The public modulus `p·q`, as a reduction context.
    pub n: Barrett,
    /// The public exponent.
    pub e: MpNumber,
    /// The private exponent.
    pub d: MpNumber,
    /// The larger prime factor.
    pub p: Barrett,
    /// The smaller prime factor.
    pub q: Barrett,
    /// `d mod (p − 1)`.
    pub d1: MpNumber,
    /// `d mod (q − 1)`.
    pub d2: MpNumber,
    /// `q⁻¹ mod p`.
    pub c: MpNumber,
}

/// Generate a keypair whose modulus carries exactly `bits` bits (`bits`
/// must be even; each prime gets half).
///
/// Both primes come from the plain random search with the public exponent
/// as the auxiliary congruence value, so `gcd(prime − 1, e) = 1` and the
/// private exponent always exists. If the product of the first two primes
/// falls a bit short of the requested length, the smaller factor is
/// regenerated until the length lands exactly — a corrective loop, not a
/// single draw.
pub fn generate(rng: &mut dyn RandomSource, bits: usize) -> RsaKeyPair {
    assert!(bits >= 128 && bits % 2 == 0, "modulus length must be even");
    let pbits = bits / 2;
    let t = miller_rabin_trials(pbits);
    let e = MpNumber::from_word(PUBLIC_EXPONENT);

    let mut p = prime::random_prime(rng, pbits, t, Some(&e));
    let mut q = loop {
        let q = prime::random_prime(rng, pbits, t, Some(&e));
        if word::ne_ext(q.modulus(), p.modulus()) {
            break q;
        }
    };
    // keep the larger factor as p
    if word::gt_ext(q.modulus(), p.modulus()) {
        core::mem::swap(&mut p, &mut q);
    }

    let modulus = loop {
        let product = MpNumber::mul(&p.to_number(), &q.to_number());
        if product.bits() == bits {
            break product;
        }
        debug!(
            wanted = bits,
            got = product.bits(),
            "modulus fell one bit short; regenerating a factor"
        );
        let fresh = prime::random_prime(rng, pbits, t, Some(&e));
        // take the replacement only when it actually grows the product
        if word::gt_ext(fresh.modulus(), q.modulus())
            && word::ne_ext(fresh.modulus(), p.modulus())
        {
            q = fresh;
            if word::gt_ext(q.modulus(), p.modulus()) {
                core::mem::swap(&mut p, &mut q);
            }
        }
    };
    let n = Barrett::from_number(&modulus);

    let p1 = p.minus_one();
    let q1 = q.minus_one();
    let phi = MpNumber::mul(&p1, &q1);
    let d = e
        .mod_inverse(&phi)
        .expect("gcd(phi, e) = 1 by the congruence filter on both primes");
    let d1 = d.reduce(&p1);
    let d2 = d.reduce(&q1);
    let c = p
        .mod_inverse(q.modulus())
        .expect("distinct primes are coprime");

    RsaKeyPair {
        n,
        e,
        d,
        p,
        q,
        d1,
        d2,
        c,
    }
}

impl RsaKeyPair {
    /// The raw public operation `x^e mod n` (encrypt / verify direction).
    /// The operand must already be reduced below `n`.
    pub fn public_op(&self, x: &MpNumber) -> MpNumber {
        debug_assert!(*x < self.n.to_number());
        self.n.pow_mod(x.significant(), self.e.as_words())
    }

    /// The raw private operation `x^d mod n` (decrypt / sign direction)
    /// through the CRT: two half-size exponentiations recombined as
    /// `j2 + q · (c·(j1 − j2) mod p)`.
    pub fn private_op(&self, x: &MpNumber) -> MpNumber {
        debug_assert!(*x < self.n.to_number());
        let xp = self.p.reduce(x.significant());
        let xq = self.q.reduce(x.significant());
        let j1 = self.p.pow_mod(xp.as_words(), self.d1.as_words());
        let j2 = self.q.pow_mod(xq.as_words(), self.d2.as_words());
        let diff = self.p.sub_mod(j1.as_words(), j2.as_words());
        let h = self.p.mul_mod(self.c.as_words(), diff.as_words());
        let mut m = MpNumber::mul(&h, &self.q.to_number());
        word::add_ext(m.as_words_mut(), j2.as_words());
        m
    }
}

impl Drop for RsaKeyPair {
    fn drop(&mut self) {
        self.d.zeroize();
        self.d1.zeroize();
        self.d2.zeroize();
        self.c.zeroize();
        self.p.wipe();
        self.q.wipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> rand_chacha::ChaCha20Rng {
        rand_chacha::ChaCha20Rng::seed_from_u64(seed)
    }

    #[test]
    fn generated_keypair_holds_every_invariant() {
        let mut rng = rng(30);
        let kp = generate(&mut rng, 512);

        // n == p * q, with the exact requested length
        let product = MpNumber::mul(&kp.p.to_number(), &kp.q.to_number());
        assert_eq!(product, kp.n.to_number());
        assert_eq!(kp.n.bits(), 512);

        // p > q, both primes
        assert!(kp.p.to_number() > kp.q.to_number());
        assert!(prime::miller_rabin(&kp.p, &mut rng, 10));
        assert!(prime::miller_rabin(&kp.q, &mut rng, 10));

        // e*d == 1 modulo both p-1 and q-1 (hence modulo their lcm)
        let ed = MpNumber::mul(&kp.e, &kp.d);
        assert!(ed.reduce(&kp.p.minus_one()).is_one());
        assert!(ed.reduce(&kp.q.minus_one()).is_one());

        // CRT terms
        assert_eq!(kp.d1, kp.d.reduce(&kp.p.minus_one()));
        assert_eq!(kp.d2, kp.d.reduce(&kp.q.minus_one()));
        assert!(kp
            .p
            .mul_mod(kp.c.as_words(), kp.q.modulus())
            .is_one());
    }

    #[test]
    fn public_and_private_operations_invert_each_other() {
        let mut rng = rng(31);
        let kp = generate(&mut rng, 512);
        let m = MpNumber::from_hex("0123456789abcdeffedcba987654321000c0ffee").unwrap();

        let ciphertext = kp.public_op(&m);
        assert_eq!(kp.private_op(&ciphertext), m, "decrypt(encrypt(m)) != m");

        let signature = kp.private_op(&m);
        assert_eq!(kp.public_op(&signature), m, "verify(sign(m)) != m");
    }

    #[test]
    fn crt_private_op_matches_plain_exponentiation() {
        let mut rng = rng(32);
        let kp = generate(&mut rng, 256);
        let x = kp.n.random_element(&mut rng);
        let via_crt = kp.private_op(&x);
        let plain = kp.n.pow_mod(x.as_words(), kp.d.as_words());
        assert_eq!(via_crt, plain);
    }

    #[test]
    fn factors_are_distinct_across_generations() {
        let mut rng = rng(33);
        let a = generate(&mut rng, 256);
        let b = generate(&mut rng, 256);
        assert!(word::ne_ext(a.p.modulus(), a.q.modulus()));
        assert!(a.n.to_number() != b.n.to_number(), "two keys collided");
    }
}
