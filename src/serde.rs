use std::sync::Arc;

use rug::Integer;

use crate::{DecryptionKey, EncodedNumber, EncodingContext, EncryptedNumber, EncryptionKey};

impl serde::Serialize for EncryptionKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.n().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for EncryptionKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let n = Integer::deserialize(deserializer)?;
        EncryptionKey::from_modulus(n)
            .map_err(|_| <D::Error as serde::de::Error>::custom("invalid paillier modulus"))
    }
}

impl serde::Serialize for DecryptionKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let pq = [self.p(), self.q()];
        pq.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for DecryptionKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [p, q] = <[Integer; 2]>::deserialize(deserializer)?;
        DecryptionKey::from_primes(p, q)
            .map_err(|_| <D::Error as serde::de::Error>::custom("invalid paillier key"))
    }
}

/// Encodes as `(public_key, signed, precision, base)`; the derived bounds
/// are recomputed by [`EncodingContext::new`] on deserialize rather than
/// carried over the wire.
impl serde::Serialize for EncodingContext {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.public_key(), self.is_signed(), self.precision(), self.base()).serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for EncodingContext {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (public_key, signed, precision, base) =
            <(EncryptionKey, bool, u32, u32)>::deserialize(deserializer)?;
        EncodingContext::new(public_key, signed, precision, base)
            .map_err(|_| <D::Error as serde::de::Error>::custom("invalid encoding context"))
    }
}

impl serde::Serialize for EncodedNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.context(), self.value(), self.exponent()).serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for EncodedNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (context, value, exponent) =
            <(Arc<EncodingContext>, Integer, i32)>::deserialize(deserializer)?;
        Ok(EncodedNumber::new_unchecked(context, value, exponent))
    }
}

impl serde::Serialize for EncryptedNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (
            self.context(),
            self.ciphertext(),
            self.exponent(),
            self.is_obfuscated(),
        )
            .serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for EncryptedNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (context, ciphertext, exponent, obfuscated) =
            <(Arc<EncodingContext>, Integer, i32, bool)>::deserialize(deserializer)?;
        Ok(EncryptedNumber::new(context, ciphertext, exponent, obfuscated))
    }
}
