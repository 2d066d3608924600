//! Paillier homomorphic encryption, plus a fixed-point encoding layer that
//! extends ciphertext arithmetic to signed/unsigned integers, rationals, and
//! floating-point doubles.
//!
//! The crate is layered bottom-up:
//!
//! - [`EncryptionKey`] / [`DecryptionKey`] implement the Paillier trapdoor
//!   itself: key generation, raw encryption/decryption, and the ciphertext
//!   homomorphism (`oadd`/`osub`/`omul`/`oneg`).
//! - [`EncodingContext`] binds a public key to a `(signed, precision, base)`
//!   configuration and maps rationals into the plaintext ring.
//! - [`EncodedNumber`] and [`EncryptedNumber`] are the values produced by
//!   that mapping, carrying an `exponent` alongside their ring value and
//!   supporting addition, subtraction, and scalar multiplication with
//!   automatic exponent alignment.
mod decryption_key;
mod encoded_number;
mod encoding;
mod encrypted_number;
mod encryption_key;
pub mod utils;

#[cfg(feature = "serde")]
mod serde;

use rug::Integer;

/// An element of `Z*_{n^2}` produced by the Paillier encryption function.
pub type Ciphertext = Integer;
/// An element of `Z_n` (or `Z_{n^2}`) being encrypted or recovered.
pub type Plaintext = Integer;
/// A randomiser sampled from `Z*_n` used to blind a ciphertext.
pub type Nonce = Integer;

pub use self::{
    decryption_key::DecryptionKey,
    encoded_number::EncodedNumber,
    encoding::EncodingContext,
    encrypted_number::EncryptedNumber,
    encryption_key::EncryptionKey,
};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(#[from] Reason);

#[derive(Debug, thiserror::Error)]
enum Reason {
    #[error("p,q are invalid")]
    InvalidPQ,
    #[error("n is not a valid paillier modulus")]
    InvalidModulus,
    #[error("totient does not factor n into two primes")]
    InvalidTotient,
    #[error("could not generate a key pair within the retry budget")]
    KeyGenFailure,
    #[error("encryption error")]
    Encrypt,
    #[error("decryption error")]
    Decrypt,
    #[error("homorphic operation failed: invalid inputs")]
    Ops,
    #[error("invalid encoding context configuration")]
    InvalidConfig,
    #[error("value is out of the encoding context's significand range")]
    EncodeOutOfRange,
    #[error("value is not finite and cannot be encoded")]
    EncodeNotFinite,
    #[error("encoded value overflows the context's valid range")]
    DecodeOverflow,
    #[error("exact integer decode requested on a value with a fractional exponent")]
    DecodeNonInteger,
    #[error("operands belong to different encoding contexts")]
    ContextMismatch,
    #[error("private key does not match the ciphertext's public key")]
    KeyMismatch,
    #[error("exponent alignment would exceed the safety margin")]
    ExponentGapTooLarge,
    #[error("bug occurred")]
    Bug(#[source] Bug),
}

#[derive(Debug, thiserror::Error)]
enum Bug {
    #[error("pow mod undefined")]
    PowModUndef,
    #[error("could not construct faster encryption")]
    NewFasterEncrypt,
}

impl From<Bug> for Error {
    fn from(err: Bug) -> Self {
        Error(Reason::Bug(err))
    }
}
