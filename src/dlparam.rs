//! # Discrete-logarithm domain parameters
//!
//! The `(p, q, g)` triple for DSA/ElGamal-style schemes: a prime modulus
//! `p`, a prime `q` dividing `p − 1` (with cofactor `r`, so `p = q·r + 1`),
//! and a generator `g` — of order `q` for subgroup schemes, or of order
//! `p − 1` (a primitive root) for schemes that work in the full group.
//!
//! Generation composes the prime searches: `q` comes from the plain
//! search, `p` from the congruent-one construction so that `q | p − 1`,
//! and `g` from rejection sampling with the order conditions checked by
//! modular exponentiation. Received parameters from an untrusted source go
//! through [`DomainParams::validate`], which re-derives every structural
//! relationship instead of trusting the sender.

use crate::barrett::Barrett;
use crate::number::MpNumber;
use crate::prime::{self, miller_rabin_trials, Cofactor};
use crate::word;
use crate::RandomSource;

/// Witness count when validating parameters from an untrusted source.
const VALIDATE_TRIALS: u32 = 50;

/// Discrete-log domain parameters.
///
/// Invariants kept by the generators and checked by [`validate`]: `p` and
/// `q` are probable primes, `q` divides `p − 1` with `p = q·r + 1`, and
/// `1 < g < p` with the order promised by the generating variant.
///
/// [`validate`]: DomainParams::validate
#[derive(Debug, Clone)]
pub struct DomainParams {
    /// The prime modulus, as a reduction context.
    pub p: Barrett,
    /// The prime divisor of `p − 1`.
    pub q: Barrett,
    /// The even cofactor, `p − 1 = q·r`.
    pub r: MpNumber,
    /// The generator.
    pub g: MpNumber,
    /// Reduction context for the group order `p − 1`, kept by the
    /// order-(p−1) variants where exponent arithmetic reduces modulo it.
    pub n: Option<Barrett>,
}

/// Generate parameters with a generator of order `q` (IEEE P1363 A.16.1
/// shape): a fresh prime `q`, then `p = q·r + 1` under the given cofactor
/// policy, then `g = h^r mod p` for random `h` until the result is
/// non-trivial.
pub fn generate_order_q(
    rng: &mut dyn RandomSource,
    pbits: usize,
    qbits: usize,
    cofactor: Cofactor,
) -> DomainParams {
    let q = prime::random_prime(rng, qbits, miller_rabin_trials(qbits), None);
    let (p, r) = prime::random_congruent_one(
        rng,
        pbits,
        miller_rabin_trials(pbits),
        &q,
        None,
        cofactor,
    );
    let g = generator_order_q(&p, &r, rng);
    DomainParams { p, q, r, g, n: None }
}

/// Order-`q` parameters over a safe prime: `p = 2q + 1`, `r = 2`, and `g`
/// generates the order-`q` subgroup of squares.
pub fn generate_order_q_safe(rng: &mut dyn RandomSource, bits: usize) -> DomainParams {
    let p = prime::random_safe_prime(rng, bits, miller_rabin_trials(bits));
    let q = half_context(&p);
    let r = MpNumber::from_word(2);
    let g = generator_order_q(&p, &r, rng);
    DomainParams { p, q, r, g, n: None }
}

/// Generate parameters with a generator of the full order `p − 1`:
/// `p = q·r + 1` with `r = 2s` and `s` itself prime, so the group order
/// factors as `2·q·s` and a primitive root is recognizable by three
/// subgroup tests.
pub fn generate_order_n(rng: &mut dyn RandomSource, pbits: usize, qbits: usize) -> DomainParams {
    let q = prime::random_prime(rng, qbits, miller_rabin_trials(qbits), None);
    let (p, r) = prime::random_congruent_one(
        rng,
        pbits,
        miller_rabin_trials(pbits),
        &q,
        None,
        Cofactor::HalfPrime,
    );
    let n = Barrett::from_number(&p.minus_one());
    let g = generator_order_n(&p, &q, &r, rng);
    DomainParams { p, q, r, g, n: Some(n) }
}

/// Order-(p−1) parameters over a safe prime.
pub fn generate_order_n_safe(rng: &mut dyn RandomSource, bits: usize) -> DomainParams {
    let p = prime::random_safe_prime(rng, bits, miller_rabin_trials(bits));
    let n = Barrett::from_number(&p.minus_one());
    let q = half_context(&p);
    let r = MpNumber::from_word(2);
    let g = generator_order_n(&p, &q, &r, rng);
    DomainParams { p, q, r, g, n: Some(n) }
}

/// Context for `q = (p - 1) / 2` of a safe prime.
fn half_context(p: &Barrett) -> Barrett {
    let mut qwords = p.modulus().to_vec();
    word::halve(&mut qwords);
    Barrett::new(&qwords)
}

/// Sample a generator of order `q`: `h^r mod p` has order dividing `q`,
/// and rejecting the value 1 leaves exactly the order-`q` elements.
fn generator_order_q(p: &Barrett, r: &MpNumber, rng: &mut dyn RandomSource) -> MpNumber {
    let size = p.size();
    let mut wksp = vec![0; 4 * size + 2];
    let mut h = vec![0; size];
    let mut g = MpNumber::with_size(size);
    loop {
        p.random_element_w(rng, &mut h, &mut wksp);
        p.pow_mod_w(&h, r.as_words(), g.as_words_mut(), &mut wksp);
        if !g.is_one() {
            return g;
        }
    }
}

/// Sample a generator of the full order `p − 1 = 2·q·s`: a candidate is a
/// primitive root exactly when none of `g^r`, `g^(q·s)`, `g^(2q)` is 1
/// (order 2 is impossible — the only such element is `p − 1`, which the
/// sampler never returns).
fn generator_order_n(
    p: &Barrett,
    q: &Barrett,
    r: &MpNumber,
    rng: &mut dyn RandomSource,
) -> MpNumber {
    let size = p.size();
    let mut wksp = vec![0; 4 * size + 2];
    let mut g = MpNumber::with_size(size);
    let mut s = vec![0; size];
    let mut t1 = vec![0; size];
    let mut t2 = vec![0; size];
    loop {
        p.random_element_w(rng, g.as_words_mut(), &mut wksp);

        if word::is_two(r.as_words()) {
            // safe prime: order divides 2q; not 1 or 2 by sampling, so
            // the candidate fails only when its order is exactly q
            p.pow_mod_w(g.as_words(), q.modulus(), &mut t1, &mut wksp);
            if word::is_one(&t1) {
                continue;
            }
        } else {
            word::set_ext(&mut s, r.as_words());
            word::halve(&mut s);
            // t1 = g^s, t2 = g^(2s) = g^r
            p.pow_mod_w(g.as_words(), &s, &mut t1, &mut wksp);
            p.sqr_mod_w(&t1, &mut t2, &mut wksp);
            if word::is_one(&t2) {
                continue;
            }
            // t2 = t1^q = g^(q·s)
            p.pow_mod_w(&t1, q.modulus(), &mut t2, &mut wksp);
            if word::is_one(&t2) {
                continue;
            }
            // t1 = g^q, t2 = g^(2q)
            p.pow_mod_w(g.as_words(), q.modulus(), &mut t1, &mut wksp);
            p.sqr_mod_w(&t1, &mut t2, &mut wksp);
            if word::is_one(&t2) {
                continue;
            }
        }
        return g;
    }
}

impl DomainParams {
    /// Structural equality of the `(p, q, g)` triple.
    pub fn same_group(&self, other: &DomainParams) -> bool {
        word::eq_ext(self.p.modulus(), other.p.modulus())
            && word::eq_ext(self.q.modulus(), other.q.modulus())
            && self.g == other.g
    }

    /// Re-derive and re-check every relationship for parameters received
    /// from an untrusted source: `p` and `q` odd probable primes (50
    /// witnesses), `1 < g < p`, `q | p − 1`, and `p = q·r + 1` whenever a
    /// cofactor is carried.
    pub fn validate(&self, rng: &mut dyn RandomSource) -> bool {
        if word::is_even(self.p.modulus()) || word::is_even(self.q.modulus()) {
            return false;
        }
        if !prime::miller_rabin(&self.p, rng, VALIDATE_TRIALS) {
            return false;
        }
        if !prime::miller_rabin(&self.q, rng, VALIDATE_TRIALS) {
            return false;
        }
        if self.g <= MpNumber::from_word(1) || self.g >= self.p.to_number() {
            return false;
        }
        if !self.p.minus_one().reduce(&self.q.to_number()).is_zero() {
            return false;
        }
        if !self.r.is_zero() {
            let mut qr = MpNumber::mul(&self.q.to_number(), &self.r);
            qr.add_word_assign(1);
            if qr != self.p.to_number() {
                return false;
            }
        }
        true
    }

    /// [`validate`](DomainParams::validate) plus the order-`q` generator
    /// condition `g^q ≡ 1 (mod p)`.
    pub fn validate_order_q(&self, rng: &mut dyn RandomSource) -> bool {
        self.validate(rng)
            && self
                .p
                .pow_mod(self.g.as_words(), self.q.modulus())
                .is_one()
    }

    /// A private key: a random value in `(1, q - 1)`.
    pub fn private_key(&self, rng: &mut dyn RandomSource) -> MpNumber {
        self.q.random_element(rng)
    }

    /// The public key for `x`: `g^x mod p`.
    pub fn public_key(&self, x: &MpNumber) -> MpNumber {
        self.p.pow_mod(self.g.as_words(), x.as_words())
    }

    /// A fresh private/public pair.
    pub fn keypair(&self, rng: &mut dyn RandomSource) -> (MpNumber, MpNumber) {
        let x = self.private_key(rng);
        let y = self.public_key(&x);
        (x, y)
    }
}
