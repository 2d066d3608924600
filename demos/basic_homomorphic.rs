//! Walks through the end-to-end scenarios of the crate's testable-properties
//! section: key generation, encoding, homomorphic addition, scalar division,
//! and the obfuscation step that must precede handing a ciphertext to
//! anything outside the process.

use std::sync::Arc;

use paillier_encoded::{DecryptionKey, EncodingContext, EncryptedNumber};
use rug::Integer;

fn main() {
    let mut rng = rand_dev::DevRng::new();

    // A small-ish modulus keeps this demo fast; production keys should use
    // DecryptionKey::generate_default (a 3072-bit modulus).
    let dk = DecryptionKey::generate(&mut rng, 1024).expect("key generation");
    let ek = dk.encryption_key();
    let bits = ek.n().significant_bits();

    let context = Arc::new(
        EncodingContext::new(ek, /* signed */ true, bits, /* base */ 16)
            .expect("valid encoding configuration"),
    );

    // a + b over integers, via ciphertext addition.
    let a = context.encode_int(&Integer::from(123_456_789)).unwrap();
    let b = context.encode_int(&Integer::from(314_159_265_359i64)).unwrap();

    let enc_a = EncryptedNumber::encrypt(&a, &mut rng).unwrap();
    let enc_b = EncryptedNumber::encrypt(&b, &mut rng).unwrap();

    let enc_sum = enc_a.add(&enc_b).unwrap();
    let sum = enc_sum.decrypt(&dk).unwrap().decode_int().unwrap();
    println!("encrypt(123456789) + encrypt(314159265359) = {sum}");
    assert_eq!(sum, Integer::from(123_580_722_148i64));

    // (encrypt(6.28) / 2) decrypts to ~3.14.
    let c = context.encode_double(6.28).unwrap();
    let enc_c = EncryptedNumber::encrypt(&c, &mut rng).unwrap();
    let halved = enc_c.divide(&Integer::from(2)).unwrap();
    let halved_value = halved.decrypt(&dk).unwrap().decode_double().unwrap();
    println!("encrypt(6.28) / 2 = {halved_value}");
    assert!((halved_value - 3.14).abs() < 1e-5);

    // -15 + 1 crosses zero and stays negative.
    let neg = context.encode_int(&Integer::from(-15)).unwrap();
    let one = context.encode_int(&Integer::from(1)).unwrap();
    let enc_neg = EncryptedNumber::encrypt(&neg, &mut rng).unwrap();
    let crossed = enc_neg.add_encoded(&one).unwrap();
    let crossed_value = crossed.decrypt(&dk).unwrap().decode_int().unwrap();
    println!("encrypt(-15) + 1 = {crossed_value}");
    assert_eq!(crossed_value, Integer::from(-14));

    // Obfuscation changes the ciphertext without changing the plaintext: the
    // only safe form to hand to a caller outside this process.
    let obfuscated = enc_sum.obfuscate(&mut rng).unwrap();
    assert_ne!(obfuscated.ciphertext(), enc_sum.ciphertext());
    assert_eq!(
        obfuscated.decrypt(&dk).unwrap().decode_int().unwrap(),
        sum
    );
    println!("obfuscated ciphertext decrypts to the same plaintext: {sum}");

    // Under an unsigned, 16-bit-precision context, encrypt(maxEncoded) +
    // encrypt(1) wraps past the context's valid range. The ring arithmetic
    // can't catch this (n is far larger than 2^16); it only surfaces once
    // something tries to decode the decrypted result.
    let unsigned = Arc::new(
        EncodingContext::new(dk.encryption_key(), /* signed */ false, 16, /* base */ 2)
            .expect("valid encoding configuration"),
    );
    let max_encoded = unsigned.encode_int(unsigned.max_encoded()).unwrap();
    let one = unsigned.encode_int(&Integer::from(1)).unwrap();
    let enc_max = EncryptedNumber::encrypt(&max_encoded, &mut rng).unwrap();
    let enc_overflowed = enc_max.add_encoded(&one).unwrap();
    let decrypted = enc_overflowed.decrypt(&dk).unwrap();
    match decrypted.decode_int() {
        Ok(v) => println!("unexpectedly decoded as {v}"),
        Err(e) => println!("encrypt(maxEncoded) + encrypt(1) correctly rejected on decode: {e}"),
    }
}
