use std::sync::Arc;

use rug::ops::Pow;
use rug::{Complete, Integer};

use crate::encoded_number::EncodedNumber;
use crate::{Error, Reason};
use crate::EncryptionKey;

/// How many bits of a `f64`'s mantissa [`EncodingContext::encode_double`]
/// preserves when choosing an exponent automatically.
const DOUBLE_MANTISSA_BITS: u32 = 53;

/// A hint steering [`EncodingContext::encode_double`] towards a particular
/// exponent, instead of the smallest one that preserves full double
/// precision.
#[derive(Clone, Copy, Debug)]
pub enum PrecisionHint {
    /// Use this exact exponent.
    Exponent(i32),
    /// Choose the largest exponent `e` (coarsest precision) such that
    /// `base^e <= tolerance`. `tolerance` must be a positive value less
    /// than 1.
    Tolerance(f64),
}

/// Binds a [`EncryptionKey`] to a `(signed, precision, base)` configuration
/// and defines the injective map from rationals into the plaintext ring
/// `Z_n` that [`EncodedNumber`] and [`crate::EncryptedNumber`] build on.
///
/// Two contexts are equal iff their public key, signedness, precision, and
/// base all match — see the [`PartialEq`] impl.
#[derive(Clone, Debug)]
pub struct EncodingContext {
    public_key: EncryptionKey,
    signed: bool,
    precision: u32,
    base: u32,
    max_encoded: Integer,
    min_encoded: Integer,
    max_significand: Integer,
    min_significand: Integer,
}

impl EncodingContext {
    /// Builds a context over `public_key`.
    ///
    /// `precision` is the number of `base`-digits of the significand that
    /// are considered valid; passing the bit length of `public_key`'s
    /// modulus requests "full precision" (the natural range of `Z_n`).
    /// `base` must be at least 2; `precision` must be at least 1 (at least
    /// 2 when `signed`), and at most the modulus' bit length.
    pub fn new(
        public_key: EncryptionKey,
        signed: bool,
        precision: u32,
        base: u32,
    ) -> Result<Self, Error> {
        if base < 2 {
            return Err(Reason::InvalidConfig.into());
        }
        let bitlen = public_key.n().significant_bits();
        if precision == 0 || precision > bitlen {
            return Err(Reason::InvalidConfig.into());
        }
        if signed && precision < 2 {
            return Err(Reason::InvalidConfig.into());
        }

        let full_precision = precision == bitlen;
        let n = public_key.n();

        let (max_encoded, min_encoded) = if signed {
            let max_encoded = if full_precision {
                // The classic Paillier signed range: n/3, which leaves room
                // to detect overflow into the negative half of the ring.
                (n / 3u8).complete()
            } else {
                Integer::from(base).pow(precision - 1) - Integer::from(1)
            };
            let min_encoded = (n - &max_encoded).complete();
            (max_encoded, min_encoded)
        } else {
            let max_encoded = if full_precision {
                (n - 1u8).complete()
            } else {
                Integer::from(base).pow(precision) - Integer::from(1)
            };
            (max_encoded, Integer::from(0))
        };

        let max_significand = max_encoded.clone();
        let min_significand = if signed {
            -max_encoded.clone()
        } else {
            Integer::from(0)
        };

        Ok(Self {
            public_key,
            signed,
            precision,
            base,
            max_encoded,
            min_encoded,
            max_significand,
            min_significand,
        })
    }

    /// The public key this context encodes against.
    pub fn public_key(&self) -> &EncryptionKey {
        &self.public_key
    }

    /// Whether this context maps negative rationals to the upper half of
    /// `Z_n` (`true`) or rejects them outright (`false`).
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Number of `base`-digits of significand this context considers valid.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// The base significands are expressed in.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Largest valid value of `value` in the unsigned half of the ring.
    pub fn max_encoded(&self) -> &Integer {
        &self.max_encoded
    }

    /// Smallest `value` that is interpreted as a negative significand
    /// (signed contexts only; `0` for unsigned contexts).
    pub fn min_encoded(&self) -> &Integer {
        &self.min_encoded
    }

    /// Largest significand this context can encode.
    pub fn max_significand(&self) -> &Integer {
        &self.max_significand
    }

    /// Smallest significand this context can encode (`0` if unsigned).
    pub fn min_significand(&self) -> &Integer {
        &self.min_significand
    }

    /// The maximum number of `base`-steps two exponents may differ by and
    /// still be safely aligned by [`EncodedNumber`]/[`crate::EncryptedNumber`]
    /// arithmetic.
    ///
    /// Derived as `floor(bitlen(n) / log2(base)) - (mantissa_bits + 1)`,
    /// leaving headroom for a double's 53-bit mantissa on top of the
    /// largest shift that keeps the significand inside `Z_n`.
    pub fn max_exponent_gap(&self) -> u32 {
        let bitlen = self.public_key.n().significant_bits() as f64;
        let digits = (bitlen / (self.base as f64).log2()).floor();
        let margin = (DOUBLE_MANTISSA_BITS + 1) as f64;
        (digits - margin).max(0.0) as u32
    }

    /// Checks that `diff` (an exponent gap) is within [`Self::max_exponent_gap`].
    pub(crate) fn check_exponent_gap(&self, diff: u32) -> Result<(), Error> {
        if diff > self.max_exponent_gap() {
            Err(Reason::ExponentGapTooLarge.into())
        } else {
            Ok(())
        }
    }

    /// `exponent - target` as a `u32` shift, used to align a value at
    /// `exponent` down onto the common `target` exponent.
    ///
    /// `target` is always `<= exponent` by construction (it's the minimum of
    /// the two operands' exponents), but the two are independent `i32`s, so
    /// the raw subtraction can itself overflow `i32` (e.g. `exponent =
    /// i32::MAX`, `target = i32::MIN`) before the gap is ever compared
    /// against [`Self::max_exponent_gap`]. That's reported the same way an
    /// in-range-but-too-large gap is: `ExponentGapTooLarge`, never a panic
    /// or a silently wrapped shift.
    pub(crate) fn exponent_gap(&self, exponent: i32, target: i32) -> Result<u32, Error> {
        exponent
            .checked_sub(target)
            .and_then(|diff| u32::try_from(diff).ok())
            .ok_or_else(|| Reason::ExponentGapTooLarge.into())
    }

    /// Multiplies `value` by `base^shift` modulo `n`, the operation used to
    /// align two significands onto a common exponent.
    pub(crate) fn shift_up(&self, value: &Integer, shift: u32) -> Integer {
        let factor = Integer::from(self.base).pow(shift);
        (value * factor).complete() % self.public_key.n()
    }

    fn in_significand_range(&self, significand: &Integer) -> bool {
        *significand >= self.min_significand && *significand <= self.max_significand
    }
}

/// Encoding entry points that need to hand out a shared handle on the
/// context to the [`EncodedNumber`] they produce.
///
/// These take `&self` rather than `self: Arc<Self>`: stable Rust's arbitrary
/// self types only whitelist `Arc<Self>` by value as a receiver, not
/// `&Arc<Self>`, and a by-value receiver would force every caller to clone
/// the `Arc` before each call. An ordinary `&self` method works unchanged
/// whether it's invoked directly on an `EncodingContext` or through
/// `Arc<EncodingContext>`'s `Deref`, at the cost of each encoded value
/// getting its own freshly allocated `Arc` rather than sharing the caller's.
impl EncodingContext {
    /// Encodes an integer significand at exponent `0`.
    pub fn encode_int(&self, i: &Integer) -> Result<EncodedNumber, Error> {
        self.encode_with_exponent(i, 0)
    }

    /// Encodes `(significand, exponent)` directly, checking that the
    /// significand lies within this context's valid range.
    pub fn encode_with_exponent(
        &self,
        significand: &Integer,
        exponent: i32,
    ) -> Result<EncodedNumber, Error> {
        if !self.in_significand_range(significand) {
            return Err(Reason::EncodeOutOfRange.into());
        }
        let value = if significand.cmp0().is_lt() {
            (significand + self.public_key.n()).complete()
        } else {
            significand.clone()
        };
        Ok(EncodedNumber::new_unchecked(
            Arc::new(self.clone()),
            value,
            exponent,
        ))
    }

    /// Encodes a double, automatically choosing the smallest exponent (in
    /// this context's base) that keeps the whole 53-bit mantissa of `d`.
    pub fn encode_double(&self, d: f64) -> Result<EncodedNumber, Error> {
        self.encode_double_with_precision(d, None)
    }

    /// Encodes a double with an explicit [`PrecisionHint`].
    pub fn encode_double_with_precision(
        &self,
        d: f64,
        hint: Option<PrecisionHint>,
    ) -> Result<EncodedNumber, Error> {
        if d.is_nan() || d.is_infinite() {
            return Err(Reason::EncodeNotFinite.into());
        }
        if !self.signed && d.is_sign_negative() && d != 0.0 {
            return Err(Reason::EncodeNotFinite.into());
        }

        // `PrecisionHint::Tolerance`/`None` search for a fitting exponent,
        // growing it until the significand fits. `PrecisionHint::Exponent`
        // names the exponent to encode at exactly, so it's handled on its
        // own: one attempt at exactly `e`, propagating whatever
        // `encode_with_exponent` says rather than silently drifting to a
        // different exponent when the significand doesn't fit at `e`.
        let base_log2 = (self.base as f64).log2();

        let mut exponent = match hint {
            Some(PrecisionHint::Exponent(e)) => {
                let scale = (self.base as f64).powi(e);
                let scaled = d / scale;
                if !scaled.is_finite() {
                    return Err(Reason::EncodeOutOfRange.into());
                }
                let significand =
                    Integer::from_f64(scaled.round()).ok_or(Reason::EncodeOutOfRange)?;
                return self.encode_with_exponent(&significand, e);
            }
            Some(PrecisionHint::Tolerance(tol)) => {
                if !(tol > 0.0 && tol < 1.0) {
                    return Err(Reason::EncodeOutOfRange.into());
                }
                (tol.log2() / base_log2).floor() as i32
            }
            None => {
                if d == 0.0 {
                    0
                } else {
                    let bin_exponent = d.abs().log2().floor() as i64;
                    let bin_lsb_exponent = bin_exponent - (DOUBLE_MANTISSA_BITS as i64 - 1);
                    (bin_lsb_exponent as f64 / base_log2).ceil() as i32
                }
            }
        };

        // Grow the exponent (coarsen precision) until the significand fits;
        // bounded by twice the context's precision so a pathological hint
        // can't spin forever.
        let max_tries = self.precision.max(1) * 2 + 64;
        for _ in 0..max_tries {
            let scale = (self.base as f64).powi(exponent);
            let scaled = d / scale;
            if !scaled.is_finite() {
                exponent += 1;
                continue;
            }
            let rounded = scaled.round();
            let significand = match Integer::from_f64(rounded) {
                Some(s) => s,
                None => {
                    exponent += 1;
                    continue;
                }
            };
            if self.in_significand_range(&significand) {
                return self.encode_with_exponent(&significand, exponent);
            }
            exponent += 1;
        }

        Err(Reason::EncodeOutOfRange.into())
    }
}

impl PartialEq for EncodingContext {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.signed == other.signed
            && self.precision == other.precision
            && self.base == other.base
    }
}

impl Eq for EncodingContext {}
