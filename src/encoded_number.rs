use std::sync::Arc;

use rug::ops::{DivRem, Pow};
use rug::{Complete, Integer};

use crate::encoding::EncodingContext;
use crate::{Error, Reason};

/// A rational `significand * base^exponent` mapped into `Z_n` by an
/// [`EncodingContext`].
///
/// `value` always lies in `[0, n)`; in a signed context, a `value` greater
/// than `n/2` represents the negative significand `value - n`.
#[derive(Clone, Debug)]
pub struct EncodedNumber {
    context: Arc<EncodingContext>,
    value: Integer,
    exponent: i32,
}

impl EncodedNumber {
    /// Builds an `EncodedNumber` from an already-reduced `value` and its
    /// `exponent`, without re-checking the significand range (the caller is
    /// expected to have validated it, e.g. via [`EncodingContext::encode_with_exponent`]).
    pub(crate) fn new_unchecked(context: Arc<EncodingContext>, value: Integer, exponent: i32) -> Self {
        Self {
            context,
            value,
            exponent,
        }
    }

    /// The context this value was encoded under.
    pub fn context(&self) -> &Arc<EncodingContext> {
        &self.context
    }

    /// The raw ring value in `[0, n)`.
    pub fn value(&self) -> &Integer {
        &self.value
    }

    /// The exponent: this value represents `significand() * base^exponent`.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Recovers the signed significand from `value`, without range-checking
    /// it against the context's encoded bounds.
    fn raw_significand(&self) -> Integer {
        let n = self.context.public_key().n();
        if self.context.is_signed() && self.value > (n / 2u8).complete() {
            (&self.value - n).complete()
        } else {
            self.value.clone()
        }
    }

    /// The signed significand, after checking `value` lies within the
    /// context's valid encoded range.
    pub fn significand(&self) -> Result<Integer, Error> {
        self.check_valid_value()?;
        Ok(self.raw_significand())
    }

    fn check_valid_value(&self) -> Result<(), Error> {
        let in_upper_band = self.value <= *self.context.max_encoded();
        let in_lower_band =
            self.context.is_signed() && self.value >= *self.context.min_encoded();
        if in_upper_band || in_lower_band {
            Ok(())
        } else {
            Err(Reason::DecodeOverflow.into())
        }
    }

    /// Reconstructs `significand * base^exponent` as an integer.
    ///
    /// Fails with `DecodeError` if the exponent is negative and the
    /// significand isn't evenly divisible by `base^(-exponent)` (the value
    /// has a genuine fractional part), or if `value` falls outside the
    /// context's valid range.
    pub fn decode_int(&self) -> Result<Integer, Error> {
        let significand = self.significand()?;
        if self.exponent >= 0 {
            let factor = Integer::from(self.context.base()).pow(self.exponent as u32);
            Ok(significand * factor)
        } else {
            let divisor = Integer::from(self.context.base()).pow((-self.exponent) as u32);
            let (quotient, remainder) = significand.div_rem(divisor);
            if remainder.cmp0().is_eq() {
                Ok(quotient)
            } else {
                Err(Reason::DecodeNonInteger.into())
            }
        }
    }

    /// Reconstructs the nearest `f64` to `significand * base^exponent`.
    ///
    /// Fails with `DecodeError` if the magnitude overflows `f64`'s range, or
    /// if `value` falls outside the context's valid range.
    pub fn decode_double(&self) -> Result<f64, Error> {
        let significand = self.significand()?;
        let significand = significand.to_f64();
        let scale = (self.context.base() as f64).powi(self.exponent);
        let result = significand * scale;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(Reason::DecodeOverflow.into())
        }
    }

    /// Checks `self` and `other` share the same encoding context.
    pub(crate) fn check_same_context(&self, other: &Self) -> Result<(), Error> {
        if *self.context == *other.context {
            Ok(())
        } else {
            Err(Reason::ContextMismatch.into())
        }
    }

    /// Aligns `self` and `other` onto a common exponent (the smaller of the
    /// two), returning their ring values at that exponent.
    ///
    /// Fails with `ExponentGapTooLarge` if the gap exceeds
    /// [`EncodingContext::max_exponent_gap`].
    pub(crate) fn align(&self, other: &Self) -> Result<(Integer, Integer, i32), Error> {
        self.check_same_context(other)?;
        let target = self.exponent.min(other.exponent);

        let shift_self = self.context.exponent_gap(self.exponent, target)?;
        let shift_other = self.context.exponent_gap(other.exponent, target)?;

        self.context.check_exponent_gap(shift_self)?;
        self.context.check_exponent_gap(shift_other)?;

        let v1 = if shift_self > 0 {
            self.context.shift_up(&self.value, shift_self)
        } else {
            self.value.clone()
        };
        let v2 = if shift_other > 0 {
            self.context.shift_up(&other.value, shift_other)
        } else {
            other.value.clone()
        };

        Ok((v1, v2, target))
    }

    /// `self + other`
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        let (v1, v2, exponent) = self.align(other)?;
        let value = (v1 + v2).complete() % self.context.public_key().n();
        Ok(Self::new_unchecked(self.context.clone(), value, exponent))
    }

    /// `self + i`, `i` lifted into this context at exponent 0.
    pub fn add_int(&self, i: &Integer) -> Result<Self, Error> {
        let other = self.context.encode_int(i)?;
        self.add(&other)
    }

    /// `self + d`, `d` lifted into this context via [`EncodingContext::encode_double`].
    pub fn add_double(&self, d: f64) -> Result<Self, Error> {
        let other = self.context.encode_double(d)?;
        self.add(&other)
    }

    /// `self - other`
    pub fn subtract(&self, other: &Self) -> Result<Self, Error> {
        self.add(&other.additive_inverse())
    }

    /// `self * other`: multiplies significands, adds exponents.
    pub fn multiply(&self, other: &Self) -> Result<Self, Error> {
        self.check_same_context(other)?;
        let a = self.raw_significand();
        let b = other.raw_significand();
        let product = (a * b).complete();
        self.context
            .encode_with_exponent(&product, self.exponent + other.exponent)
    }

    /// `self * i`, `i` lifted into this context at exponent 0.
    pub fn multiply_int(&self, i: &Integer) -> Result<Self, Error> {
        let other = self.context.encode_int(i)?;
        self.multiply(&other)
    }

    /// `self / scalar`.
    ///
    /// Unlike [`crate::EncryptedNumber::divide`] (which multiplies by a
    /// modular inverse and is exact whenever `scalar` evenly divides the
    /// plaintext), this operates on a plaintext that's already known in
    /// full, so it simply multiplies by the nearest double approximation
    /// of `1/scalar`. Not exact in general; good to the precision of an
    /// `f64` reciprocal.
    pub fn divide(&self, scalar: &Integer) -> Result<Self, Error> {
        if scalar.cmp0().is_eq() {
            return Err(Reason::EncodeOutOfRange.into());
        }
        let reciprocal = 1.0 / scalar.to_f64();
        let factor = self.context.encode_double(reciprocal)?;
        self.multiply(&factor)
    }

    /// `-self`
    pub fn additive_inverse(&self) -> Self {
        let value = if self.value.cmp0().is_eq() {
            Integer::from(0)
        } else {
            (self.context.public_key().n() - &self.value).complete()
        };
        Self::new_unchecked(self.context.clone(), value, self.exponent)
    }

    /// Re-encodes the underlying numeric value into `other`.
    ///
    /// Fails with `OutOfRange` if the value does not fit `other`'s
    /// significand range.
    pub fn change_context(&self, other: Arc<EncodingContext>) -> Result<Self, Error> {
        let significand = self.significand()?;
        other.encode_with_exponent(&significand, self.exponent)
    }
}

impl PartialEq for EncodedNumber {
    fn eq(&self, other: &Self) -> bool {
        *self.context == *other.context && self.value == other.value && self.exponent == other.exponent
    }
}
