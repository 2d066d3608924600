use std::sync::Arc;

use paillier_encoded::{utils, DecryptionKey, EncodingContext};
use rug::Integer;

fn test_context(signed: bool) -> Arc<EncodingContext> {
    let mut rng = rand_dev::DevRng::new();
    let p = utils::generate_safe_prime(&mut rng, 512);
    let q = utils::generate_safe_prime(&mut rng, 512);
    let dk = DecryptionKey::from_primes(p, q).unwrap();
    let ek = dk.encryption_key();
    Arc::new(EncodingContext::new(ek, signed, ek_bits(&dk), 16).unwrap())
}

fn ek_bits(dk: &DecryptionKey) -> u32 {
    dk.n().significant_bits()
}

#[test]
fn round_trip_int() {
    let context = test_context(true);
    for i in [0i64, 1, -1, 123456789, -314159265, i64::MAX, i64::MIN] {
        let i = Integer::from(i);
        let encoded = context.encode_int(&i).unwrap();
        let decoded = encoded.decode_int().unwrap();
        assert_eq!(decoded, i, "round trip failed for {i}");
    }
}

#[test]
fn round_trip_double() {
    let context = test_context(true);
    for d in [0.0, 1.0, -1.0, 3.14, -0.4, 2.71828, -123456.789] {
        let encoded = context.encode_double(d).unwrap();
        let decoded = encoded.decode_double().unwrap();
        assert!((decoded - d).abs() < 1e-9, "round trip failed for {d}: got {decoded}");
    }
}

#[test]
fn unsigned_context_rejects_negative_doubles() {
    let context = test_context(false);
    assert!(context.encode_double(-1.0).is_err());
    assert!(context.encode_int(&Integer::from(-1)).is_err());
}

#[test]
fn unsigned_partial_precision_overflow_decodes_as_error() {
    let mut rng = rand_dev::DevRng::new();
    let p = utils::generate_safe_prime(&mut rng, 512);
    let q = utils::generate_safe_prime(&mut rng, 512);
    let dk = DecryptionKey::from_primes(p, q).unwrap();
    let ek = dk.encryption_key();
    // 4 base-16 digits of precision: valid significands are 0..=16^4-1.
    let context = Arc::new(EncodingContext::new(ek, false, 4, 16).unwrap());

    let too_big = Integer::from(16i64.pow(4));
    assert!(context.encode_int(&too_big).is_err());

    let max = Integer::from(16i64.pow(4) - 1);
    assert!(context.encode_int(&max).is_ok());
}

#[test]
fn signed_boundary_significands() {
    let context = test_context(true);
    let max = context.max_significand().clone();
    let min = context.min_significand().clone();

    let encoded_max = context.encode_int(&max).unwrap();
    assert_eq!(encoded_max.significand().unwrap(), max);

    let encoded_min = context.encode_int(&min).unwrap();
    assert_eq!(encoded_min.significand().unwrap(), min);

    assert!(context.encode_int(&(max + 1)).is_err());
    assert!(context.encode_int(&(min - 1)).is_err());
}

#[test]
fn add_and_subtract_match_arithmetic() {
    let context = test_context(true);
    let a = context.encode_int(&Integer::from(123456789)).unwrap();
    let b = context.encode_int(&Integer::from(314159265359i64)).unwrap();

    let sum = a.add(&b).unwrap();
    assert_eq!(sum.decode_int().unwrap(), Integer::from(123580722148i64));

    let diff = b.subtract(&a).unwrap();
    assert_eq!(diff.decode_int().unwrap(), Integer::from(314159265359i64 - 123456789));
}

#[test]
fn add_double_matches_arithmetic() {
    let context = test_context(true);
    let a = context.encode_double(3.14).unwrap();
    let sum = a.add_double(-0.4).unwrap();
    let decoded = sum.decode_double().unwrap();
    assert!((decoded - 2.74).abs() < 1e-9, "got {decoded}");
}

#[test]
fn negative_sum_crosses_zero() {
    let context = test_context(true);
    let a = context.encode_int(&Integer::from(-15)).unwrap();
    let b = context.encode_int(&Integer::from(1)).unwrap();
    let sum = a.add(&b).unwrap();
    assert_eq!(sum.decode_int().unwrap(), Integer::from(-14));
}

#[test]
fn divide_is_approximately_inverse_of_multiply() {
    let context = test_context(true);
    let a = context.encode_double(6.28).unwrap();
    let halved = a.divide(&Integer::from(2)).unwrap();
    let decoded = halved.decode_double().unwrap();
    assert!((decoded - 3.14).abs() < 1e-6, "got {decoded}");
}

#[test]
fn multiply_adds_exponents() {
    let context = test_context(true);
    let a = context.encode_with_exponent(&Integer::from(5), -2).unwrap();
    let b = context.encode_with_exponent(&Integer::from(3), -1).unwrap();
    let product = a.multiply(&b).unwrap();
    assert_eq!(product.exponent(), -3);
    let expected = 5.0 * 16f64.powi(-2) * (3.0 * 16f64.powi(-1));
    let decoded = product.decode_double().unwrap();
    assert!((decoded - expected).abs() < 1e-12, "got {decoded}, expected {expected}");
}

#[test]
fn context_mismatch_is_rejected() {
    let context_a = test_context(true);
    let context_b = test_context(true);
    let a = context_a.encode_int(&Integer::from(1)).unwrap();
    let b = context_b.encode_int(&Integer::from(1)).unwrap();
    assert!(a.add(&b).is_err());
}

#[test]
fn change_context_reencodes_significand() {
    let signed = test_context(true);
    let unsigned = test_context(false);
    let positive = signed.encode_int(&Integer::from(42)).unwrap();
    let moved = positive.change_context(unsigned.clone()).unwrap();
    assert_eq!(moved.decode_int().unwrap(), Integer::from(42));

    let negative = signed.encode_int(&Integer::from(-1)).unwrap();
    assert!(negative.change_context(unsigned).is_err());
}
