use std::sync::Arc;

use paillier_encoded::{utils, DecryptionKey, EncodingContext, EncryptedNumber};
use rug::Integer;

fn test_setup(signed: bool) -> (DecryptionKey, Arc<EncodingContext>) {
    let mut rng = rand_dev::DevRng::new();
    let p = utils::generate_safe_prime(&mut rng, 512);
    let q = utils::generate_safe_prime(&mut rng, 512);
    let dk = DecryptionKey::from_primes(p, q).unwrap();
    let bits = dk.n().significant_bits();
    let ek = dk.encryption_key();
    let context = Arc::new(EncodingContext::new(ek, signed, bits, 16).unwrap());
    (dk, context)
}

#[test]
fn encrypt_decrypt_round_trip() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    for i in [0i64, 1, -1, 123456789, -987654321] {
        let encoded = context.encode_int(&Integer::from(i)).unwrap();
        let encrypted = EncryptedNumber::encrypt(&encoded, &mut rng).unwrap();
        let decrypted = encrypted.decrypt(&dk).unwrap();
        assert_eq!(decrypted.decode_int().unwrap(), Integer::from(i));
    }
}

#[test]
fn homomorphic_addition_matches_plaintext_sum() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(123456789)).unwrap();
    let b = context.encode_int(&Integer::from(314159265359i64)).unwrap();

    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();

    let enc_sum = enc_a.add(&enc_b).unwrap();
    let sum = enc_sum.decrypt(&dk).unwrap();
    assert_eq!(sum.decode_int().unwrap(), Integer::from(123580722148i64));
}

#[test]
fn addition_is_commutative() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(42)).unwrap();
    let b = context.encode_int(&Integer::from(-17)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();

    let sum_ab = enc_a.add(&enc_b).unwrap().decrypt(&dk).unwrap();
    let sum_ba = enc_b.add(&enc_a).unwrap().decrypt(&dk).unwrap();
    assert_eq!(sum_ab.decode_int().unwrap(), sum_ba.decode_int().unwrap());
}

#[test]
fn add_encoded_plaintext_directly() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(-15)).unwrap();
    let one = context.encode_int(&Integer::from(1)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();

    let result = enc_a.add_encoded(&one).unwrap().decrypt(&dk).unwrap();
    assert_eq!(result.decode_int().unwrap(), Integer::from(-14));
}

#[test]
fn multiply_by_int_scales_plaintext() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_double(3.14).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let scaled = enc_a.multiply_int(&Integer::from(2)).unwrap();
    let decoded = scaled.decrypt(&dk).unwrap().decode_double().unwrap();
    assert!((decoded - 6.28).abs() < 1e-9, "got {decoded}");
}

#[test]
fn divide_by_integer_scalar() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(100)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let halved = enc_a.divide(&Integer::from(2)).unwrap();
    let decoded = halved.decrypt(&dk).unwrap();
    assert_eq!(decoded.decode_int().unwrap(), Integer::from(50));
}

#[test]
fn negate_matches_plaintext_negation() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(77)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let neg = enc_a.negate().unwrap().decrypt(&dk).unwrap();
    assert_eq!(neg.decode_int().unwrap(), Integer::from(-77));
}

#[test]
fn subtract_matches_plaintext_difference() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(10)).unwrap();
    let b = context.encode_int(&Integer::from(4)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();

    let diff = enc_a.subtract(&enc_b).unwrap().decrypt(&dk).unwrap();
    assert_eq!(diff.decode_int().unwrap(), Integer::from(6));
}

#[test]
fn obfuscate_preserves_plaintext_and_changes_ciphertext() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_int(&Integer::from(5)).unwrap();
    let enc_a = EncryptedNumber::encrypt_without_obfuscation(&a).unwrap();
    assert!(!enc_a.is_obfuscated());

    let mut seen_different = false;
    for _ in 0..32 {
        let obfuscated = enc_a.obfuscate(&mut rng).unwrap();
        assert!(obfuscated.is_obfuscated());
        assert_eq!(
            obfuscated.decrypt(&dk).unwrap().decode_int().unwrap(),
            Integer::from(5)
        );
        if obfuscated.ciphertext() != enc_a.ciphertext() {
            seen_different = true;
        }
    }
    assert!(seen_different, "obfuscation should re-randomise the ciphertext");
}

#[test]
fn decrypt_rejects_mismatched_key() {
    let mut rng = rand_dev::DevRng::new();
    let (_dk, context) = test_setup(true);
    let (other_dk, _other_context) = test_setup(true);

    let a = context.encode_int(&Integer::from(1)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    assert!(enc_a.decrypt(&other_dk).is_err());
}

#[test]
fn add_rejects_mismatched_context() {
    let mut rng = rand_dev::DevRng::new();
    let (_dk1, context1) = test_setup(true);
    let (_dk2, context2) = test_setup(true);

    let a = context1.encode_int(&Integer::from(1)).unwrap();
    let b = context2.encode_int(&Integer::from(1)).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();
    assert!(enc_a.add(&enc_b).is_err());
}

#[test]
fn homomorphic_addition_across_exponents() {
    let mut rng = rand_dev::DevRng::new();
    let (dk, context) = test_setup(true);

    let a = context.encode_double(3.14).unwrap();
    let b = context.encode_double(-0.4).unwrap();
    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();

    let sum = enc_a.add(&enc_b).unwrap().decrypt(&dk).unwrap();
    let decoded = sum.decode_double().unwrap();
    assert!((decoded - 2.74).abs() < 1e-9, "got {decoded}");
}

#[test]
fn unsigned_partial_precision_overflow_surfaces_on_decrypt() {
    let mut rng = rand_dev::DevRng::new();
    let p = utils::generate_safe_prime(&mut rng, 512);
    let q = utils::generate_safe_prime(&mut rng, 512);
    let dk = DecryptionKey::from_primes(p, q).unwrap();
    let ek = dk.encryption_key();
    // 16-bit precision: valid significands are 0..=2^16-1.
    let context = Arc::new(EncodingContext::new(ek, false, 16, 2).unwrap());

    let max_encoded = context.encode_int(context.max_encoded()).unwrap();
    let one = context.encode_int(&Integer::from(1)).unwrap();

    let enc_max = EncryptedNumber::encrypt(&max_encoded, &mut rng).unwrap();
    let enc_sum = enc_max.add_encoded(&one).unwrap();

    let decrypted = enc_sum.decrypt(&dk).unwrap();
    assert!(decrypted.decode_int().is_err());
    assert!(decrypted.decode_double().is_err());
}
