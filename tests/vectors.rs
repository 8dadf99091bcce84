//! Fixed test vectors and end-to-end invariants.
//!
//! The hex strings here are the externally observable format (every word
//! zero-padded to 16 digits, most-significant first); the modular-inverse
//! vector is a 160-bit DSA-style case with a known expected result and
//! must match bit-exactly.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::SeedableRng;

use keystone::{dlparam, prime, rsa, Barrett, Cofactor, MpNumber};

fn rng(seed: u64) -> rand_chacha::ChaCha20Rng {
    rand_chacha::ChaCha20Rng::seed_from_u64(seed)
}

fn to_big(n: &MpNumber) -> BigUint {
    BigUint::from_bytes_be(&n.to_bytes())
}

const INV_MODULUS: &str = "c773218c737ec8ee993b4f2ded30f48edace915f";
const INV_VALUE: &str = "358dad571462710f50e254cf1a376b2bdeaadfbf";
const INV_EXPECTED: &str = "0d5167298202e49b4116ac104fc3f415ae52f917";

#[test]
fn modular_inverse_known_vector() {
    let m = Barrett::from_hex(INV_MODULUS).expect("vector modulus");
    let k = MpNumber::from_hex(INV_VALUE).expect("vector value");
    let inv = m.mod_inverse(k.as_words()).expect("k is invertible mod m");
    assert_eq!(
        inv,
        MpNumber::from_hex(INV_EXPECTED).unwrap(),
        "inverse must match the reference vector exactly"
    );
    // and it really is the inverse
    assert!(m.mul_mod(k.as_words(), inv.as_words()).is_one());
}

#[test]
fn modular_inverse_known_vector_without_a_context() {
    let m = MpNumber::from_hex(INV_MODULUS).unwrap();
    let k = MpNumber::from_hex(INV_VALUE).unwrap();
    let inv = k.mod_inverse(&m).expect("k is invertible mod m");
    assert_eq!(inv, MpNumber::from_hex(INV_EXPECTED).unwrap());
}

#[test]
fn vector_hex_strings_round_trip_in_canonical_width() {
    // 160 bits is 2.5 words: 3 words render as 48 digits, 8 of them the
    // top word's leading zeros
    let k = MpNumber::from_hex(INV_VALUE).unwrap();
    assert_eq!(k.size(), 3);
    assert_eq!(k.to_hex(), format!("00000000{INV_VALUE}"));
    assert_eq!(MpNumber::from_hex(&k.to_hex()).unwrap(), k);
}

#[test]
fn generator_order_divides_into_exponentiation_to_one() {
    // the property that validates DSA-style parameters: g^q == 1 mod p
    let mut rng = rng(70);
    let dp = dlparam::generate_order_q(&mut rng, 160, 96, Cofactor::CoprimeToQ);
    assert!(dp.p.pow_mod(dp.g.as_words(), dp.q.modulus()).is_one());
    // q divides p - 1 exactly
    let pm1 = to_big(&dp.p.minus_one());
    let q = to_big(&dp.q.to_number());
    assert!((&pm1 % &q).is_zero(), "q must divide p - 1");
    // both p and q pass the primality engine
    assert!(prime::miller_rabin(&dp.p, &mut rng, 20));
    assert!(prime::miller_rabin(&dp.q, &mut rng, 20));
}

#[test]
fn rsa_keypair_invariants_against_the_reference() {
    let mut rng = rng(71);
    let bits = 512;
    let kp = rsa::generate(&mut rng, bits);

    let p = to_big(&kp.p.to_number());
    let q = to_big(&kp.q.to_number());
    let n = to_big(&kp.n.to_number());
    let e = to_big(&kp.e);
    let d = to_big(&kp.d);

    assert_eq!(&p * &q, n.clone(), "p * q == n");
    assert_eq!(n.bits() as usize, bits, "modulus bit length is exact");

    let p1 = &p - 1u32;
    let q1 = &q - 1u32;
    let lcm = p1.lcm(&q1);
    assert!((&e * &d % &lcm).is_one(), "e*d == 1 mod lcm(p-1, q-1)");

    assert_eq!(to_big(&kp.d1), &d % &p1, "d1 == d mod (p-1)");
    assert_eq!(to_big(&kp.d2), &d % &q1, "d2 == d mod (q-1)");
    assert!(
        (to_big(&kp.c) * &q % &p).is_one(),
        "c*q == 1 mod p"
    );
}

#[test]
fn rsa_round_trip_against_the_reference() {
    let mut rng = rng(72);
    let kp = rsa::generate(&mut rng, 512);
    let m = MpNumber::from_hex("00facade00c0ffee0123456789abcdef").unwrap();

    let c = kp.public_op(&m);
    let expect = to_big(&m).modpow(&to_big(&kp.e), &to_big(&kp.n.to_number()));
    assert_eq!(to_big(&c), expect, "public op is plain modpow");
    assert_eq!(kp.private_op(&c), m, "private op inverts it");
}

#[test]
fn safe_prime_parameters_validate_as_received() {
    // simulate receiving parameters from a peer and re-validating them
    let mut rng = rng(73);
    let dp = dlparam::generate_order_q_safe(&mut rng, 160);
    let received = dp.clone();
    assert!(received.validate_order_q(&mut rng));
}
