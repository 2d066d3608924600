use rand_core::{CryptoRng, RngCore};
use rug::{Complete, Integer};

use crate::{utils, Ciphertext, EncryptionKey, Nonce, Plaintext};
use crate::{Bug, Error, Reason};

/// Bit length of each safe prime generated by [`DecryptionKey::generate`]
/// when the caller doesn't specify one — `2 * SAFE_PRIME_BITS` gives a
/// ~3072-bit modulus, comfortably above the 128-bit security level.
const SAFE_PRIME_BITS: u32 = 1536;

/// Number of `(p, q)` candidate pairs tried before [`DecryptionKey::generate`]
/// gives up with [`crate::Error`] `KeyGenFailure`.
const MAX_KEYGEN_ATTEMPTS: u32 = 16;

/// Paillier private key: the prime factorization of `N`, plus the
/// precomputed constants needed to decrypt via the Chinese Remainder
/// Theorem and, optionally, to encrypt faster using the known
/// factorization.
#[derive(Clone)]
pub struct DecryptionKey<FastExp = utils::CrtFixedExp> {
    ek: EncryptionKey,
    /// `lcm(p-1, q-1)`
    lambda: Integer,
    /// `L((N + 1)^lambda mod N^2)^-1 mod N`
    u: Integer,

    p: Integer,
    q: Integer,

    /// Calculates `x ^ N mod N^2`. It's used for faster encryption
    exp_to_n_mod_nn: FastExp,
    /// Calculates `x ^ lambda mod N^2`. It's used for faster decryption
    exp_to_lambda_mod_nn: FastExp,
}

impl<FastExp: utils::FactorizedExp> DecryptionKey<FastExp> {
    /// Generates a paillier key pair.
    ///
    /// Samples two independent safe primes, each `bits/2` wide, so that the
    /// resulting modulus `N` is `bits` wide. `bits` must be a positive
    /// multiple of 8.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng), bits: u32) -> Result<Self, Error> {
        if bits == 0 || bits % 8 != 0 {
            return Err(Reason::InvalidConfig.into());
        }
        let prime_bits = bits / 2;

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let p = utils::generate_safe_prime(rng, prime_bits);
            let mut q = utils::generate_safe_prime(rng, prime_bits);
            while p == q {
                q = utils::generate_safe_prime(rng, prime_bits);
            }

            let n = (&p * &q).complete();
            if n.significant_bits() != bits {
                continue;
            }

            match Self::from_primes(p, q) {
                Ok(key) => return Ok(key),
                Err(_) => continue,
            }
        }

        Err(Reason::KeyGenFailure.into())
    }

    /// Generates a paillier key using the crate's default security level
    /// (two 1536-bit safe primes, a ~3072-bit modulus).
    pub fn generate_default(rng: &mut (impl RngCore + CryptoRng)) -> Result<Self, Error> {
        Self::generate(rng, 2 * SAFE_PRIME_BITS)
    }

    /// Constructs a paillier key from primes `p`, `q`
    ///
    /// `p` and `q` need to be distinct primes such that `gcd(pq, (p-1)(q-1))
    /// = 1`; sufficiently large safe primes satisfy this automatically.
    ///
    /// Returns error if `p` and `q` do not correspond to a valid paillier key.
    #[allow(clippy::many_single_char_names)]
    pub fn from_primes(p: Integer, q: Integer) -> Result<Self, Error> {
        // Paillier doesn't work if p == q
        if p == q {
            return Err(Reason::InvalidPQ.into());
        }
        let pm1 = Integer::from(&p - 1);
        let qm1 = Integer::from(&q - 1);
        let ek = EncryptionKey::from_n((&p * &q).complete());
        let lambda = pm1.clone().lcm(&qm1);
        if lambda.cmp0().is_eq() {
            return Err(Reason::InvalidPQ.into());
        }
        if ek.n().gcd_ref(&lambda).complete() != *Integer::ONE {
            return Err(Reason::InvalidPQ.into());
        }

        // (N+1)^lambda mod N^2
        let t = Integer::from(ek.n() + 1);
        let tt = t
            .clone()
            .pow_mod(&lambda, ek.nn())
            .map_err(|_| Bug::PowModUndef)?;

        // L((N+1)^lambda mod N^2)^-1 mod N
        let u = ek
            .l(&tt)
            .ok_or(Reason::InvalidPQ)?
            .invert(ek.n())
            .map_err(|_| Reason::InvalidPQ)?;

        let exp_to_n_mod_nn =
            FastExp::build(ek.n(), &p, &q).ok_or(Bug::NewFasterEncrypt)?;
        let exp_to_lambda_mod_nn =
            FastExp::build(&lambda, &p, &q).ok_or(Bug::NewFasterEncrypt)?;

        Ok(Self {
            ek,
            lambda,
            u,
            p,
            q,
            exp_to_n_mod_nn,
            exp_to_lambda_mod_nn,
        })
    }

    /// Constructs a paillier key from a public key and its totient
    /// `phi(N) = (p-1)(q-1)`, factoring `N` back into `p, q`.
    ///
    /// `p, q` are the roots of `x^2 - (N - phi + 1)x + N = 0`; this holds
    /// because `N - phi + 1 = p + q` and `N = p*q`.
    pub fn from_totient(n: &Integer, totient: &Integer) -> Result<Self, Error> {
        let sum_pq = Integer::from(n - totient) + 1;
        let four_n = Integer::from(n * 4);
        let discriminant = (&sum_pq * &sum_pq).complete() - four_n;
        if discriminant.cmp0().is_lt() {
            return Err(Reason::InvalidTotient.into());
        }
        let root = discriminant.clone().sqrt();
        if (&root * &root).complete() != discriminant {
            return Err(Reason::InvalidTotient.into());
        }

        let p = Integer::from(&sum_pq + &root) / 2u8;
        let q = Integer::from(&sum_pq - &root) / 2u8;

        if (&p * &q).complete() != *n {
            return Err(Reason::InvalidTotient.into());
        }

        Self::from_primes(p, q)
    }

    /// Decrypts the ciphertext, returns plaintext in `{-N/2, .., N_2}`
    pub fn decrypt(&self, c: &Ciphertext) -> Result<Plaintext, Error> {
        let plaintext = self.decrypt_raw(c)?;
        if Integer::from(&plaintext << 1) >= *self.n() {
            Ok(plaintext - self.n())
        } else {
            Ok(plaintext)
        }
    }

    /// Decrypts the ciphertext, returns the raw plaintext in `[0, N)`
    /// without remapping it into the signed `{-N/2, .., N/2}` range.
    pub(crate) fn decrypt_raw(&self, c: &Ciphertext) -> Result<Plaintext, Error> {
        if !utils::in_mult_group(c, self.ek.nn()) {
            return Err(Reason::Decrypt.into());
        }

        // a = c^\lambda mod n^2
        let a = self
            .exp_to_lambda_mod_nn
            .exp(c)
            .ok_or(Bug::PowModUndef)?;

        // l = L(a)
        let l = self.ek.l(&a).ok_or(Reason::Decrypt)?;

        // m = l * u = L(c^lambda) * u mod n
        Ok((l * &self.u) % self.ek.n())
    }

    /// Encrypts a plaintext `x` in `{-N/2, .., N/2}` with `nonce` from `Z*_n`
    ///
    /// It uses the fact that the factorization of `N` is known to speed up
    /// encryption.
    ///
    /// Returns error if inputs are not in specified range
    pub fn encrypt_with(&self, x: &Plaintext, nonce: &Nonce) -> Result<Ciphertext, Error> {
        if !self.ek.in_signed_group(x) {
            return Err(Reason::Encrypt.into());
        }
        let m = if x.cmp0().is_ge() {
            x.clone()
        } else {
            (x + self.n()).complete()
        };
        self.encrypt_value(&m, nonce)
    }

    /// Encrypts plaintext `m` in `[0, N)` with `nonce` from `Z*_n`, using the
    /// known factorization of `N` to speed up the `nonce^N` exponentiation.
    pub(crate) fn encrypt_value(&self, m: &Integer, nonce: &Integer) -> Result<Integer, Error> {
        if m.cmp0().is_lt() || m >= self.ek.n() || !utils::in_mult_group(nonce, self.n()) {
            return Err(Reason::Encrypt.into());
        }

        // a = (1 + N)^m mod N^2 = (1 + mN) mod N^2
        let a = (Integer::ONE + (m * self.ek.n()).complete()) % self.ek.nn();
        // b = nonce^N mod N^2
        let b = self
            .exp_to_n_mod_nn
            .exp(nonce)
            .ok_or(Bug::PowModUndef)?;

        Ok((a * b) % self.ek.nn())
    }

    /// Encrypts the plaintext `x` in `{-N/2, .., N_2}`
    ///
    /// It uses the fact that the factorization of `N` is known to speed up
    /// encryption.
    ///
    /// Nonce is sampled randomly using `rng`.
    ///
    /// Returns error if plaintext is not in specified range
    pub fn encrypt_with_random(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        x: &Plaintext,
    ) -> Result<(Ciphertext, Nonce), Error> {
        let nonce = utils::sample_in_mult_group(rng, self.ek.n());
        let ciphertext = self.encrypt_with(x, &nonce)?;
        Ok((ciphertext, nonce))
    }

    /// Returns a (public) encryption key corresponding to the (secret) decryption key
    pub fn encryption_key(&self) -> EncryptionKey {
        self.ek.clone()
    }

    /// The Paillier modulus
    pub fn n(&self) -> &Integer {
        self.ek.n()
    }

    /// The Paillier `lambda`
    pub fn lambda(&self) -> &Integer {
        &self.lambda
    }

    /// The Paillier `u`
    pub fn u(&self) -> &Integer {
        &self.u
    }

    /// Prime `p`
    pub fn p(&self) -> &Integer {
        &self.p
    }
    /// Prime `q`
    pub fn q(&self) -> &Integer {
        &self.q
    }

    /// Bits length of smaller prime (`p` or `q`)
    pub fn bits_length(&self) -> u32 {
        self.p.significant_bits().min(self.q.significant_bits())
    }
}

impl<FastExp> PartialEq for DecryptionKey<FastExp> {
    fn eq(&self, other: &Self) -> bool {
        // Equality by the unordered set {p, q}: a key built from (p, q) and
        // one built from (q, p) are the same key.
        (self.p == other.p && self.q == other.q) || (self.p == other.q && self.q == other.p)
    }
}
