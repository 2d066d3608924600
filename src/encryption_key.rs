use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer};

use crate::{utils, Ciphertext, Nonce, Plaintext};
use crate::{Bug, Error, Reason};

/// Paillier public key: the modulus `N` and the pieces derived from it.
///
/// Corresponds to the classic Paillier generator `g = N+1`; rather than
/// storing `g` and exponentiating, every operation uses the identity
/// `(1+N)^x mod N^2 = (1+xN) mod N^2` to turn an exponentiation into a
/// multiplication.
#[derive(Clone, Debug)]
pub struct EncryptionKey {
    n: Integer,
    nn: Integer,
    half_n: Integer,
    neg_half_n: Integer,
}

impl EncryptionKey {
    /// Constructs an encryption key from `N`, without validating it.
    ///
    /// Prefer [`EncryptionKey::from_modulus`] when `n` comes from an
    /// untrusted source.
    pub fn from_n(n: Integer) -> Self {
        let nn = n.clone() * &n;
        let half_n = n.clone() >> 1u32;
        let neg_half_n = -half_n.clone();
        Self {
            n,
            nn,
            half_n,
            neg_half_n,
        }
    }

    /// Constructs an encryption key from `N`, rejecting moduli that cannot
    /// possibly be a Paillier modulus: `N` must be odd, at least 8 bits
    /// wide, and its bit length must be a multiple of 8.
    pub fn from_modulus(n: Integer) -> Result<Self, Error> {
        let bits = n.significant_bits();
        if n.is_even() || bits < 8 || bits % 8 != 0 {
            return Err(Reason::InvalidModulus.into());
        }
        Ok(Self::from_n(n))
    }

    /// Returns `N`
    pub fn n(&self) -> &Integer {
        &self.n
    }

    /// Returns `N^2`
    pub fn nn(&self) -> &Integer {
        &self.nn
    }

    /// Returns `N/2`
    pub fn half_n(&self) -> &Integer {
        &self.half_n
    }

    /// Returns the classic Paillier generator `g = N + 1`.
    ///
    /// Not used internally (the `(1+N)^x = 1+xN` identity makes it
    /// unnecessary), but part of the public key's data model.
    pub fn g(&self) -> Integer {
        Integer::from(&self.n + 1)
    }

    /// `l(x) = (x-1)/n`
    pub(crate) fn l(&self, x: &Integer) -> Option<Integer> {
        if (x % self.n()).complete() != *Integer::ONE {
            return None;
        }
        if !utils::in_mult_group(x, self.nn()) {
            return None;
        }

        // (x - 1) / N
        Some((x - Integer::ONE).complete() / self.n())
    }

    /// Encrypts plaintext `m` in `[0, N)` with the given `nonce` in `Z*_n`,
    /// without remapping it into a signed range first.
    pub(crate) fn encrypt_value(&self, m: &Integer, nonce: &Integer) -> Result<Integer, Error> {
        if m.cmp0().is_lt() || m >= self.n() || !utils::in_mult_group(nonce, self.n()) {
            return Err(Reason::Encrypt.into());
        }

        // a = (1 + N)^m mod N^2 = (1 + mN) mod N^2
        let a = (Integer::ONE + (m * self.n()).complete()) % self.nn();
        // b = nonce^N mod N^2
        let b = nonce
            .clone()
            .pow_mod(self.n(), self.nn())
            .map_err(|_| Bug::PowModUndef)?;

        Ok((a * b) % self.nn())
    }

    /// Encrypts plaintext `m` in `[0, N)` without blinding: `c0 = (1+mN) mod
    /// N^2`. Cheap, but not semantically secure on its own — see the
    /// obfuscation policy on [`crate::EncryptedNumber`].
    pub(crate) fn encrypt_unobfuscated(&self, m: &Integer) -> Result<Integer, Error> {
        if m.cmp0().is_lt() || m >= self.n() {
            return Err(Reason::Encrypt.into());
        }
        Ok((Integer::ONE + (m * self.n()).complete()) % self.nn())
    }

    /// Encrypts the plaintext `x` in `{-N/2, .., N/2}` with `nonce` in `Z*_n`
    ///
    /// Returns error if inputs are not in specified range
    pub fn encrypt_with(&self, x: &Plaintext, nonce: &Nonce) -> Result<Ciphertext, Error> {
        if !self.in_signed_group(x) {
            return Err(Reason::Encrypt.into());
        }
        let m = if x.cmp0().is_ge() {
            x.clone()
        } else {
            (x + self.n()).complete()
        };
        self.encrypt_value(&m, nonce)
    }

    /// Encrypts the plaintext `x` in `{-N/2, .., N/2}`
    ///
    /// Nonce is sampled randomly using `rng`.
    ///
    /// Returns error if plaintext is not in specified range
    pub fn encrypt_with_random(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        x: &Plaintext,
    ) -> Result<(Ciphertext, Nonce), Error> {
        let nonce = utils::sample_in_mult_group(rng, self.n());
        let ciphertext = self.encrypt_with(x, &nonce)?;
        Ok((ciphertext, nonce))
    }

    /// Homomorphic addition of two ciphertexts
    ///
    /// ```text
    /// oadd(Enc(a1), Enc(a2)) = Enc(a1 + a2)
    /// ```
    pub fn oadd(&self, c1: &Ciphertext, c2: &Ciphertext) -> Result<Ciphertext, Error> {
        if !utils::in_mult_group(c1, self.nn()) || !utils::in_mult_group(c2, self.nn()) {
            return Err(Reason::Ops.into());
        }
        Ok((c1 * c2).complete() % self.nn())
    }

    /// Homomorphic subtraction of two ciphertexts
    ///
    /// ```text
    /// osub(Enc(a1), Enc(a2)) = Enc(a1 - a2)
    /// ```
    pub fn osub(&self, c1: &Ciphertext, c2: &Ciphertext) -> Result<Ciphertext, Error> {
        if !utils::in_mult_group(c1, self.nn()) {
            return Err(Reason::Ops.into());
        }
        let c2 = self.oneg(c2)?;
        Ok((c1 * c2) % self.nn())
    }

    /// Homomorphic multiplication of scalar at ciphertext
    ///
    /// ```text
    /// omul(a, Enc(c)) = Enc(a * c)
    /// ```
    pub fn omul(&self, scalar: &Integer, ciphertext: &Ciphertext) -> Result<Ciphertext, Error> {
        if !utils::in_mult_group_abs(scalar, self.n())
            || !utils::in_mult_group(ciphertext, self.nn())
        {
            return Err(Reason::Ops.into());
        }

        Ok(ciphertext
            .pow_mod_ref(scalar, self.nn())
            .ok_or(Reason::Ops)?
            .into())
    }

    /// Homomorphic negation of a ciphertext
    ///
    /// ```text
    /// oneg(Enc(a)) = Enc(-a)
    /// ```
    pub fn oneg(&self, ciphertext: &Ciphertext) -> Result<Ciphertext, Error> {
        Ok(ciphertext.invert_ref(self.nn()).ok_or(Reason::Ops)?.into())
    }

    /// Checks whether `x` is in `{-N/2, .., N/2}`
    pub fn in_signed_group(&self, x: &Integer) -> bool {
        self.neg_half_n <= *x && *x <= self.half_n
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
    }
}

impl Eq for EncryptionKey {}
