//! Demonstrates the encoding layer on its own, without encryption: overflow
//! detection under a partial-precision unsigned context, and exact versus
//! double-precision round trips under a signed context.

use std::sync::Arc;

use paillier_encoded::{DecryptionKey, EncodingContext};
use rug::Integer;

fn main() {
    let mut rng = rand_dev::DevRng::new();
    let dk = DecryptionKey::generate(&mut rng, 1024).expect("key generation");
    let ek = dk.encryption_key();

    // 16-bit precision, base 2: significands are restricted to [0, 2^16).
    let unsigned = Arc::new(EncodingContext::new(ek.clone(), false, 16, 2).unwrap());
    let max_encoded = unsigned.max_encoded().clone();
    println!("unsigned 16-bit context: max_encoded = {max_encoded}");

    let at_max = unsigned.encode_int(&max_encoded).unwrap();
    let one = unsigned.encode_int(&Integer::from(1)).unwrap();

    // max_encoded + 1 is still a valid element of Z_n (n is far larger than
    // 2^16), so the ring arithmetic itself can't detect the overflow; it's
    // only caught when something tries to decode the result.
    let wrapped = at_max.add(&one).unwrap();
    match wrapped.decode_int() {
        Ok(v) => println!("unexpectedly decoded as {v}"),
        Err(e) => println!("max_encoded + 1 correctly rejected on decode: {e}"),
    }

    // A signed, full-precision context recovers negative significands from
    // the upper half of Z_n.
    let bits = ek.n().significant_bits();
    let signed = Arc::new(EncodingContext::new(ek, true, bits, 10).unwrap());
    let neg = signed.encode_int(&Integer::from(-42)).unwrap();
    println!("encode(-42).value() = {} (n - 42)", neg.value());
    assert_eq!(neg.decode_int().unwrap(), Integer::from(-42));

    let pi = signed.encode_double(3.14159).unwrap();
    let pi_back = pi.decode_double().unwrap();
    println!("encode_double(3.14159) round-trips to {pi_back}");
    assert!((pi_back - 3.14159).abs() < 1e-9);
}
