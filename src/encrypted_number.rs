use std::sync::Arc;

use rand_core::{CryptoRng, RngCore};
use rug::ops::Pow;
use rug::{Complete, Integer};

use crate::encoded_number::EncodedNumber;
use crate::encoding::EncodingContext;
use crate::utils;
use crate::utils::FactorizedExp;
use crate::{Ciphertext, DecryptionKey, Error, Reason};

/// A Paillier ciphertext together with the exponent it was encoded at and
/// whether it has been re-randomised since its plaintext last changed.
///
/// Ciphertexts are never mutated in place: every operation here returns a
/// new value. See the crate-level obfuscation policy — intermediate
/// results of arithmetic are deliberately left un-obfuscated, and must be
/// passed through [`EncryptedNumber::obfuscate`] before leaving the
/// process.
#[derive(Clone, Debug)]
pub struct EncryptedNumber {
    context: Arc<EncodingContext>,
    ciphertext: Ciphertext,
    exponent: i32,
    obfuscated: bool,
}

impl EncryptedNumber {
    pub(crate) fn new(context: Arc<EncodingContext>, ciphertext: Ciphertext, exponent: i32, obfuscated: bool) -> Self {
        Self {
            context,
            ciphertext,
            exponent,
            obfuscated,
        }
    }

    /// Encrypts `encoded` with a freshly sampled nonce: the result is
    /// immediately obfuscated.
    pub fn encrypt(
        encoded: &EncodedNumber,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, Error> {
        let context = encoded.context();
        let n = context.public_key().n();
        let nonce = utils::sample_in_mult_group(rng, n);
        let ciphertext = context.public_key().encrypt_value(encoded.value(), &nonce)?;
        Ok(Self::new(context.clone(), ciphertext, encoded.exponent(), true))
    }

    /// Encrypts `encoded` without sampling a fresh nonce: cheaper, but not
    /// semantically secure until [`EncryptedNumber::obfuscate`] is called.
    /// Intended for intermediate, in-process results only.
    pub fn encrypt_without_obfuscation(encoded: &EncodedNumber) -> Result<Self, Error> {
        let context = encoded.context();
        let ciphertext = context.public_key().encrypt_unobfuscated(encoded.value())?;
        Ok(Self::new(context.clone(), ciphertext, encoded.exponent(), false))
    }

    /// The context this ciphertext was encrypted under.
    pub fn context(&self) -> &Arc<EncodingContext> {
        &self.context
    }

    /// The raw ciphertext in `Z*_{n^2}`.
    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    /// The exponent this ciphertext's plaintext is expressed at.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Whether this ciphertext has been re-randomised since its plaintext
    /// last changed.
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscated
    }

    fn check_same_context(&self, other: &Self) -> Result<(), Error> {
        if *self.context == *other.context {
            Ok(())
        } else {
            Err(Reason::ContextMismatch.into())
        }
    }

    /// Multiplies `self.ciphertext` by `base^shift` homomorphically:
    /// `c ^ (base^shift) mod n^2`, used to align two ciphertexts (or a
    /// ciphertext and an encoded plaintext) onto a common exponent.
    fn rescale(&self, shift: u32) -> Result<Ciphertext, Error> {
        if shift == 0 {
            return Ok(self.ciphertext.clone());
        }
        self.context.check_exponent_gap(shift)?;
        let base_pow = Integer::from(self.context.base()).pow(shift);
        self.context
            .public_key()
            .omul(&base_pow, &self.ciphertext)
    }

    /// `self + other`
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        self.check_same_context(other)?;
        let target = self.exponent.min(other.exponent);
        let shift_self = self.context.exponent_gap(self.exponent, target)?;
        let shift_other = self.context.exponent_gap(other.exponent, target)?;
        let c1 = self.rescale(shift_self)?;
        let c2 = other.rescale(shift_other)?;
        let ciphertext = self.context.public_key().oadd(&c1, &c2)?;
        Ok(Self::new(self.context.clone(), ciphertext, target, false))
    }

    /// `self + p`: homomorphically adds the encoded plaintext `p`.
    ///
    /// Equivalent to encrypting `p` with `r=1` and multiplying ciphertexts.
    pub fn add_encoded(&self, p: &EncodedNumber) -> Result<Self, Error> {
        if *self.context != **p.context() {
            return Err(Reason::ContextMismatch.into());
        }
        let target = self.exponent.min(p.exponent());
        let c1 = self.rescale(self.context.exponent_gap(self.exponent, target)?)?;

        let shift_p = self.context.exponent_gap(p.exponent(), target)?;
        self.context.check_exponent_gap(shift_p)?;
        let p_value = if shift_p > 0 {
            self.context.shift_up(p.value(), shift_p)
        } else {
            p.value().clone()
        };

        let encoded_as_unobfuscated = self.context.public_key().encrypt_unobfuscated(&p_value)?;
        let ciphertext = self
            .context
            .public_key()
            .oadd(&c1, &encoded_as_unobfuscated)?;
        Ok(Self::new(self.context.clone(), ciphertext, target, false))
    }

    /// `self - other`
    pub fn subtract(&self, other: &Self) -> Result<Self, Error> {
        self.add(&other.negate()?)
    }

    /// `self - p`
    pub fn subtract_encoded(&self, p: &EncodedNumber) -> Result<Self, Error> {
        self.add_encoded(&p.additive_inverse())
    }

    /// `self * s`: raises the ciphertext to the (possibly negative)
    /// significand of `s`, and adds the exponents.
    pub fn multiply(&self, s: &EncodedNumber) -> Result<Self, Error> {
        if *self.context != **s.context() {
            return Err(Reason::ContextMismatch.into());
        }
        let scalar = s.significand()?;
        let ciphertext = self.context.public_key().omul(&scalar, &self.ciphertext)?;
        Ok(Self::new(
            self.context.clone(),
            ciphertext,
            self.exponent + s.exponent(),
            false,
        ))
    }

    /// `self * k`, `k` lifted into this context at exponent 0.
    pub fn multiply_int(&self, k: &Integer) -> Result<Self, Error> {
        let encoded = self.context.encode_int(k)?;
        self.multiply(&encoded)
    }

    /// `self / scalar`: raises the ciphertext to `scalar`'s modular inverse
    /// mod `n`.
    ///
    /// This is exact in `Z_n`, not merely in a double's precision: working
    /// directly with the raw ring value (rather than routing it through
    /// [`EncodedNumber`], whose significand range is deliberately narrower
    /// than `Z_n`) is what makes the trick exact. Correct whenever `scalar`
    /// evenly divides the plaintext; otherwise it recovers the unique `y`
    /// with `scalar * y = self (mod n)`, which generally isn't the rational
    /// `self / scalar`.
    pub fn divide(&self, scalar: &Integer) -> Result<Self, Error> {
        let n = self.context.public_key().n();
        if scalar.cmp0().is_eq() || (scalar.gcd_ref(n).complete()) != *Integer::ONE {
            return Err(Reason::Ops.into());
        }
        let inverse = scalar.clone().invert(n).map_err(|_| Reason::Ops)?;
        let ciphertext = self.context.public_key().omul(&inverse, &self.ciphertext)?;
        Ok(Self::new(self.context.clone(), ciphertext, self.exponent, false))
    }

    /// `-self`
    pub fn negate(&self) -> Result<Self, Error> {
        let ciphertext = self.context.public_key().oneg(&self.ciphertext)?;
        Ok(Self::new(self.context.clone(), ciphertext, self.exponent, false))
    }

    /// Re-randomises the ciphertext: `c <- c * r^n mod n^2` for a fresh
    /// `r` sampled from `Z*_n`. The plaintext and exponent are unchanged.
    pub fn obfuscate(&self, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self, Error> {
        let n = self.context.public_key().n();
        let r = utils::sample_in_mult_group(rng, n);
        let r_to_n = r
            .pow_mod(n, self.context.public_key().nn())
            .map_err(|_| crate::Bug::PowModUndef)?;
        let ciphertext = (&self.ciphertext * r_to_n).complete() % self.context.public_key().nn();
        Ok(Self::new(self.context.clone(), ciphertext, self.exponent, true))
    }

    /// Decrypts and decodes this ciphertext.
    ///
    /// Fails with `KeyMismatch` if `private_key`'s public key differs from
    /// this ciphertext's context.
    pub fn decrypt<FastExp: FactorizedExp>(
        &self,
        private_key: &DecryptionKey<FastExp>,
    ) -> Result<EncodedNumber, Error> {
        if private_key.encryption_key().n() != self.context.public_key().n() {
            return Err(Reason::KeyMismatch.into());
        }
        let value = private_key.decrypt_raw(&self.ciphertext)?;
        Ok(EncodedNumber::new_unchecked(
            self.context.clone(),
            value,
            self.exponent,
        ))
    }
}

impl PartialEq for EncryptedNumber {
    fn eq(&self, other: &Self) -> bool {
        *self.context == *other.context
            && self.ciphertext == other.ciphertext
            && self.exponent == other.exponent
    }
}
