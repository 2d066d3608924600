use rand_core::RngCore;
use rug::{Assign, Complete, Integer};

/// Wraps any randomness source that implements [`rand_core::RngCore`] and makes
/// it compatible with [`rug::rand`].
pub fn external_rand(rng: &mut impl RngCore) -> rug::rand::ThreadRandState {
    use bytemuck::TransparentWrapper;

    #[derive(TransparentWrapper)]
    #[repr(transparent)]
    pub struct ExternalRand<R>(R);

    impl<R: RngCore> rug::rand::ThreadRandGen for ExternalRand<R> {
        fn gen(&mut self) -> u32 {
            self.0.next_u32()
        }
    }

    rug::rand::ThreadRandState::new_custom(ExternalRand::wrap_mut(rng))
}

/// Checks that `x` is in Z*_n
#[inline(always)]
pub fn in_mult_group(x: &Integer, n: &Integer) -> bool {
    x.cmp0().is_ge() && in_mult_group_abs(x, n)
}

/// Checks that `abs(x)` is in Z*_n
#[inline(always)]
pub fn in_mult_group_abs(x: &Integer, n: &Integer) -> bool {
    x.gcd_ref(n).complete() == *Integer::ONE
}

/// Samples `x` in Z*_n
pub fn sample_in_mult_group(rng: &mut impl RngCore, n: &Integer) -> Integer {
    let mut rng = external_rand(rng);
    let mut x = Integer::new();
    loop {
        x.assign(n.random_below_ref(&mut rng));
        if in_mult_group(&x, n) {
            return x;
        }
    }
}

/// Generates a random safe prime: a prime `x` such that `(x-1)/2` is also prime.
pub fn generate_safe_prime(rng: &mut impl RngCore, bits: u32) -> Integer {
    use rug::integer::IsPrime;
    let mut rng = external_rand(rng);
    loop {
        let mut x = Integer::from(Integer::random_bits(bits - 1, &mut rng));
        x.set_bit(bits - 2, true);
        x <<= 1;
        x += 1;

        let q = Integer::from(&x - 1u8) / 2u8;
        if let IsPrime::Yes | IsPrime::Probably = q.is_probably_prime(25) {
            if let IsPrime::Yes | IsPrime::Probably = x.is_probably_prime(25) {
                return x;
            }
        }
    }
}

/// Same as [`generate_safe_prime`], but rejects candidates divisible by one of
/// the first `sieve_size` small primes before running the (expensive)
/// probabilistic primality test, trading a little extra bookkeeping for far
/// fewer Miller-Rabin rounds spent on doomed candidates.
pub fn sieve_generate_safe_primes(rng: &mut impl RngCore, bits: u32, sieve_size: u32) -> Integer {
    use rug::integer::IsPrime;
    let small_primes = first_n_primes(sieve_size);
    let mut rng = external_rand(rng);
    loop {
        let mut x = Integer::from(Integer::random_bits(bits - 1, &mut rng));
        x.set_bit(bits - 2, true);
        x <<= 1;
        x += 1;

        let q = Integer::from(&x - 1u8) / 2u8;

        if small_primes
            .iter()
            .any(|&p| x != p && x.is_divisible_u(p))
        {
            continue;
        }
        if small_primes
            .iter()
            .any(|&p| q != p && q.is_divisible_u(p))
        {
            continue;
        }

        if let IsPrime::Yes | IsPrime::Probably = q.is_probably_prime(25) {
            if let IsPrime::Yes | IsPrime::Probably = x.is_probably_prime(25) {
                return x;
            }
        }
    }
}

/// The first `n` prime numbers, smallest first.
fn first_n_primes(n: u32) -> Vec<u32> {
    let mut primes = Vec::with_capacity(n as usize);
    let mut candidate = 2u32;
    while primes.len() < n as usize {
        if primes.iter().all(|p| candidate % p != 0) {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Provides functionality that's yet missing in [`rug::Integer`]
pub trait IntegerExt {
    /// Returns `self mod module`
    fn modulo(&self, module: &Self) -> Self;
}

impl IntegerExt for Integer {
    fn modulo(&self, module: &Self) -> Self {
        let c = (self % module).complete();
        if c.cmp0().is_lt() {
            module + c
        } else {
            c
        }
    }
}

/// An exponent already split into its residues modulo the Euler totients of
/// the two CRT components, ready to be fed to [`CrtExp::exp`].
#[derive(Clone, Debug)]
pub struct PreparedExponent {
    /// Whether the original exponent was negative, in which case `exp` must
    /// invert the base before raising it to `e_p`/`e_q`.
    negative: bool,
    e_p: Integer,
    e_q: Integer,
}

/// Accelerates `x^e mod (pp * qq)` by exponentiating modulo each of two
/// coprime components (sized like `p`/`q` or `p^2`/`q^2`) and recombining
/// with Garner's formula, instead of working modulo the full-size product
/// directly.
#[derive(Clone, Debug)]
pub struct CrtExp {
    pp: Integer,
    qq: Integer,
    phi_pp: Integer,
    phi_qq: Integer,
    /// `pp^-1 mod qq`, used to recombine the two residues.
    pp_inv_mod_qq: Integer,
}

impl CrtExp {
    /// Builds an engine that works modulo `n = p * q`.
    pub fn build_n(p: &Integer, q: &Integer) -> Option<Self> {
        let phi_pp = Integer::from(p - 1);
        let phi_qq = Integer::from(q - 1);
        Self::build(p.clone(), q.clone(), phi_pp, phi_qq)
    }

    /// Builds an engine that works modulo `n^2 = p^2 * q^2`.
    pub fn build_nn(p: &Integer, q: &Integer) -> Option<Self> {
        let pp = (p * p).complete();
        let qq = (q * q).complete();
        let phi_pp = Integer::from(&pp - p);
        let phi_qq = Integer::from(&qq - q);
        Self::build(pp, qq, phi_pp, phi_qq)
    }

    fn build(pp: Integer, qq: Integer, phi_pp: Integer, phi_qq: Integer) -> Option<Self> {
        let pp_inv_mod_qq = pp.clone().invert(&qq).ok()?;
        Some(Self {
            pp,
            qq,
            phi_pp,
            phi_qq,
            pp_inv_mod_qq,
        })
    }

    /// Splits `e` into residues modulo the Euler totients of each component,
    /// so the result can be reused across many [`CrtExp::exp`] calls with
    /// the same exponent.
    pub fn prepare_exponent(&self, e: &Integer) -> PreparedExponent {
        let negative = e.cmp0().is_lt();
        let e_abs = e.clone().abs();
        PreparedExponent {
            negative,
            e_p: Integer::from(&e_abs % &self.phi_pp),
            e_q: Integer::from(&e_abs % &self.phi_qq),
        }
    }

    /// Computes `x^e mod (pp * qq)` for the exponent previously prepared
    /// with [`CrtExp::prepare_exponent`]. Returns `None` if `x` is not
    /// invertible modulo `pp` or `qq` (only relevant for negative exponents).
    pub fn exp(&self, x: &Integer, e: &PreparedExponent) -> Option<Integer> {
        let mut x_p = Integer::from(x % &self.pp);
        let mut x_q = Integer::from(x % &self.qq);
        if e.negative {
            x_p = x_p.invert(&self.pp).ok()?;
            x_q = x_q.invert(&self.qq).ok()?;
        }

        let r_p = x_p.pow_mod(&e.e_p, &self.pp).ok()?;
        let r_q = x_q.pow_mod(&e.e_q, &self.qq).ok()?;

        // Garner's formula: r = r_p + pp * ((r_q - r_p) * pp^-1 mod qq)
        let diff = Integer::from(&r_q - &r_p).modulo(&self.qq);
        let t = Integer::from(diff * &self.pp_inv_mod_qq) % &self.qq;
        Some(r_p + Integer::from(&self.pp * t))
    }
}

/// An exponentiation engine that knows the factorization of its modulus and
/// can therefore accelerate `x ^ exponent mod n^2` for one fixed `exponent`
/// baked in at construction time (`n` or `lambda`, in [`crate::DecryptionKey`]).
pub trait FactorizedExp: Sized {
    /// Precomputes everything needed to raise any base to `exponent` modulo
    /// `(p*q)^2`, given the factorization `p, q`.
    fn build(exponent: &Integer, p: &Integer, q: &Integer) -> Option<Self>;

    /// Computes `x ^ exponent mod n^2` for the `exponent` baked in at
    /// [`FactorizedExp::build`] time. Returns `None` if `x` is not
    /// invertible (should not happen for well-formed Paillier ciphertexts).
    fn exp(&self, x: &Integer) -> Option<Integer>;
}

/// Default [`FactorizedExp`] implementation: a [`CrtExp`] engine over
/// `n^2 = p^2*q^2` with one exponent prepared ahead of time.
#[derive(Clone, Debug)]
pub struct CrtFixedExp {
    engine: CrtExp,
    exponent: PreparedExponent,
}

impl FactorizedExp for CrtFixedExp {
    fn build(exponent: &Integer, p: &Integer, q: &Integer) -> Option<Self> {
        let engine = CrtExp::build_nn(p, q)?;
        let exponent = engine.prepare_exponent(exponent);
        Some(Self { engine, exponent })
    }

    fn exp(&self, x: &Integer) -> Option<Integer> {
        self.engine.exp(x, &self.exponent)
    }
}
