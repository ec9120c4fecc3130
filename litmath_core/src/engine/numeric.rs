use std::cmp::Ordering;
use std::fmt;

use float_cmp::approx_eq;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use num_traits::Signed;
use num_traits::ToPrimitive;
use num_traits::Zero;

use super::format::FormatOptions;
use super::format::format_number;

/// Significant digits kept when an exact rational grows too large.
pub const BIGNUMBER_PRECISION: usize = 128;

/// Integer exponents up to this magnitude are computed exactly in
/// [`NumericMode::BigNumber`].
const MAX_EXACT_EXPONENT: i64 = 4096;

/// Combined numerator and denominator size (in bits) above which a rational
/// is rounded back to [`BIGNUMBER_PRECISION`] significant digits.
const MAX_RATIONAL_BITS: u64 = 1024;

/// Largest operand `factorial` computes exactly.
const MAX_FACTORIAL: u64 = 1000;

/// Largest `n` whose factorial is a finite `f64`.
const MAX_FLOAT_FACTORIAL: i64 = 170;

/// How number literals are read and how arithmetic is carried out.
///
/// The mode is switched by the `bignumber` directive and stays in effect for
/// every later parse of the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NumericMode {
	/// IEEE-754 double precision.
	#[default]
	Number,
	/// Exact rational arithmetic with a fixed significant digit budget.
	BigNumber,
}

impl NumericMode {
	pub fn from_flag(bignumber: bool) -> Self {
		if bignumber {
			Self::BigNumber
		} else {
			Self::Number
		}
	}
}

/// A scalar produced by the engine.
#[derive(Debug, Clone)]
pub enum Numeric {
	Float(f64),
	Big(BigRational),
}

impl PartialEq for Numeric {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) => left == right,
			(left, right) => approx_eq!(f64, left.to_f64(), right.to_f64(), ulps = 2),
		}
	}
}

impl Numeric {
	/// Parse a number literal (`12`, `1.5`, `.5`, `2e-3`) in the given mode.
	pub fn parse_literal(text: &str, mode: NumericMode) -> Option<Self> {
		match mode {
			NumericMode::Number => text.parse::<f64>().ok().map(Self::Float),
			NumericMode::BigNumber => {
				parse_decimal(text)
					.map(Self::Big)
					.or_else(|| text.parse::<f64>().ok().map(Self::Float))
			}
		}
	}

	/// Wrap a float result. In [`NumericMode::BigNumber`] the shortest decimal
	/// that round-trips the float becomes the exact value.
	pub fn from_f64(value: f64, mode: NumericMode) -> Self {
		match mode {
			NumericMode::BigNumber if value.is_finite() => {
				parse_decimal(&format!("{value:e}")).map_or(Self::Float(value), Self::Big)
			}
			_ => Self::Float(value),
		}
	}

	pub fn mode(&self) -> NumericMode {
		match self {
			Self::Float(_) => NumericMode::Number,
			Self::Big(_) => NumericMode::BigNumber,
		}
	}

	/// Scale by an exact factor, keeping the representation of `self`.
	pub fn scale(&self, factor: &BigRational) -> Self {
		match self {
			Self::Float(value) => Self::Float(value * factor.to_f64().unwrap_or(f64::NAN)),
			Self::Big(value) => Self::Big(bound(value * factor)),
		}
	}

	pub fn from_i64(value: i64, mode: NumericMode) -> Self {
		match mode {
			NumericMode::BigNumber => Self::Big(BigRational::from_integer(BigInt::from(value))),
			NumericMode::Number => Self::Float(value as f64),
		}
	}

	pub fn zero(mode: NumericMode) -> Self {
		Self::from_i64(0, mode)
	}

	pub fn to_f64(&self) -> f64 {
		match self {
			Self::Float(value) => *value,
			Self::Big(value) => value.to_f64().unwrap_or(f64::NAN),
		}
	}

	pub fn is_zero(&self) -> bool {
		match self {
			Self::Float(value) => *value == 0.0,
			Self::Big(value) => value.is_zero(),
		}
	}

	pub fn is_negative(&self) -> bool {
		match self {
			Self::Float(value) => *value < 0.0,
			Self::Big(value) => value.is_negative(),
		}
	}

	pub fn is_finite(&self) -> bool {
		match self {
			Self::Float(value) => value.is_finite(),
			Self::Big(_) => true,
		}
	}

	pub fn is_integer(&self) -> bool {
		match self {
			Self::Float(value) => value.is_finite() && value.fract() == 0.0,
			Self::Big(value) => value.is_integer(),
		}
	}

	/// The value as an `i64`, when it is an integer in range.
	pub fn to_i64(&self) -> Option<i64> {
		if !self.is_integer() {
			return None;
		}

		match self {
			Self::Float(value) => {
				if value.abs() <= i64::MAX as f64 {
					Some(*value as i64)
				} else {
					None
				}
			}
			Self::Big(value) => value.to_integer().to_i64(),
		}
	}

	/// The exact rational value, converting floats where possible.
	pub fn to_rational(&self) -> Option<BigRational> {
		match self {
			Self::Float(value) => BigRational::from_float(*value),
			Self::Big(value) => Some(value.clone()),
		}
	}

	pub fn add(&self, other: &Self) -> Self {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) => Self::Big(bound(left + right)),
			_ => Self::Float(self.to_f64() + other.to_f64()),
		}
	}

	pub fn sub(&self, other: &Self) -> Self {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) => Self::Big(bound(left - right)),
			_ => Self::Float(self.to_f64() - other.to_f64()),
		}
	}

	pub fn mul(&self, other: &Self) -> Self {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) => Self::Big(bound(left * right)),
			_ => Self::Float(self.to_f64() * other.to_f64()),
		}
	}

	/// Division by zero follows floating point rules (`Infinity`, `NaN`) in
	/// both modes.
	pub fn div(&self, other: &Self) -> Self {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) if !right.is_zero() => {
				Self::Big(bound(left / right))
			}
			_ => Self::Float(self.to_f64() / other.to_f64()),
		}
	}

	/// Modulo with the sign of the divisor: `x - y * floor(x / y)`. A zero
	/// divisor returns `x`.
	pub fn rem(&self, other: &Self) -> Self {
		if other.is_zero() {
			return self.clone();
		}

		match (self, other) {
			(Self::Big(left), Self::Big(right)) => {
				let quotient = (left / right).floor();
				Self::Big(bound(left - right * quotient))
			}
			_ => {
				let (left, right) = (self.to_f64(), other.to_f64());
				Self::Float(left - right * (left / right).floor())
			}
		}
	}

	pub fn pow(&self, exponent: &Self) -> Self {
		if let (Self::Big(base), Self::Big(power)) = (self, exponent) {
			if let Some(power) = power
				.is_integer()
				.then(|| power.to_integer().to_i64())
				.flatten()
				.filter(|power| power.abs() <= MAX_EXACT_EXPONENT)
			{
				if !(base.is_zero() && power < 0) {
					return Self::Big(bound(pow_rational(base, power)));
				}
			}
		}

		Self::Float(self.to_f64().powf(exponent.to_f64()))
	}

	pub fn neg(&self) -> Self {
		match self {
			Self::Float(value) => Self::Float(-value),
			Self::Big(value) => Self::Big(-value),
		}
	}

	pub fn abs(&self) -> Self {
		match self {
			Self::Float(value) => Self::Float(value.abs()),
			Self::Big(value) => Self::Big(value.abs()),
		}
	}

	pub fn floor(&self) -> Self {
		match self {
			Self::Float(value) => Self::Float(value.floor()),
			Self::Big(value) => Self::Big(value.floor()),
		}
	}

	pub fn ceil(&self) -> Self {
		match self {
			Self::Float(value) => Self::Float(value.ceil()),
			Self::Big(value) => Self::Big(value.ceil()),
		}
	}

	/// Round towards zero.
	pub fn trunc(&self) -> Self {
		match self {
			Self::Float(value) => Self::Float(value.trunc()),
			Self::Big(value) => Self::Big(value.trunc()),
		}
	}

	/// Round half away from zero to `decimals` places.
	pub fn round(&self, decimals: u32) -> Self {
		match self {
			Self::Float(value) => {
				let scale = 10f64.powi(decimals as i32);
				Self::Float((value * scale).round() / scale)
			}
			Self::Big(value) => {
				let scale = BigRational::from_integer(pow10(decimals as usize));
				Self::Big((value * &scale).round() / scale)
			}
		}
	}

	pub fn signum(&self) -> Self {
		match self {
			Self::Float(value) if value.is_nan() || *value == 0.0 => Self::Float(*value),
			Self::Float(value) => Self::Float(value.signum()),
			Self::Big(value) => Self::Big(value.signum()),
		}
	}

	/// `n!` for non-negative integers, `NaN` otherwise.
	pub fn factorial(&self) -> Self {
		let Some(n) = self.to_i64().filter(|n| *n >= 0) else {
			return Self::Float(f64::NAN);
		};

		match self {
			Self::Big(_) if n as u64 <= MAX_FACTORIAL => {
				let product = (2..=n).fold(BigInt::one(), |acc, k| acc * BigInt::from(k));
				Self::Big(BigRational::from_integer(product))
			}
			_ if n > MAX_FLOAT_FACTORIAL => Self::Float(f64::INFINITY),
			_ => Self::Float((2..=n).fold(1.0, |acc, k| acc * k as f64)),
		}
	}

	pub fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Self::Big(left), Self::Big(right)) => Some(left.cmp(right)),
			_ => self.to_f64().partial_cmp(&other.to_f64()),
		}
	}
}

impl fmt::Display for Numeric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&format_number(self, &FormatOptions::shortest()))
	}
}

/// `10^exponent` as a big integer.
pub(crate) fn pow10(exponent: usize) -> BigInt {
	num_traits::pow(BigInt::from(10u8), exponent)
}

/// Multiply `value` by `10^exponent` exactly.
pub(crate) fn scale_pow10(value: BigRational, exponent: i64) -> BigRational {
	let factor = BigRational::from_integer(pow10(exponent.unsigned_abs() as usize));
	if exponent >= 0 {
		value * factor
	} else {
		value / factor
	}
}

/// Parse a decimal literal into an exact rational.
pub(crate) fn parse_decimal(text: &str) -> Option<BigRational> {
	let (mantissa, exponent) = match text.find(['e', 'E']) {
		Some(index) => (&text[..index], text[index + 1..].parse::<i64>().ok()?),
		None => (text, 0),
	};

	if exponent.abs() > 100_000 {
		return None;
	}

	let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
	if integer.is_empty() && fraction.is_empty() {
		return None;
	}

	let digits = format!("{integer}{fraction}");
	if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	let numerator = BigInt::parse_bytes(digits.as_bytes(), 10)?;
	Some(scale_pow10(
		BigRational::from_integer(numerator),
		exponent - fraction.len() as i64,
	))
}

/// Decimal exponent of a positive rational: the `e` with
/// `10^e <= value < 10^(e + 1)`.
pub(crate) fn exponent10(value: &BigRational) -> i64 {
	let numerator_digits = value.numer().abs().to_string().len() as i64;
	let denominator_digits = value.denom().to_string().len() as i64;
	let mut exponent = numerator_digits - denominator_digits;

	let one = BigRational::one();
	while scale_pow10(value.clone(), -exponent) < one {
		exponent -= 1;
	}
	while scale_pow10(value.clone(), -exponent) >= BigRational::from_integer(BigInt::from(10u8)) {
		exponent += 1;
	}

	exponent
}

/// Round `value` to `precision` significant digits, returning the sign, the
/// digit string (exactly `precision` long) and the decimal exponent of the
/// first digit.
pub(crate) fn significant_digits(value: &BigRational, precision: usize) -> (bool, String, i64) {
	let precision = precision.max(1);
	let negative = value.is_negative();
	let magnitude = value.abs();

	if magnitude.is_zero() {
		return (false, "0".repeat(precision), 0);
	}

	let mut exponent = exponent10(&magnitude);
	let scaled = scale_pow10(magnitude, precision as i64 - 1 - exponent).round();
	let mut digits = scaled.to_integer().to_string();

	if digits.len() > precision {
		exponent += 1;
		digits.truncate(precision);
	}

	(negative, digits, exponent)
}

fn round_significant(value: &BigRational, precision: usize) -> BigRational {
	let (negative, digits, exponent) = significant_digits(value, precision);
	let Some(integer) = BigInt::parse_bytes(digits.as_bytes(), 10) else {
		return value.clone();
	};
	let rounded = scale_pow10(
		BigRational::from_integer(integer),
		exponent - (precision as i64 - 1),
	);

	if negative { -rounded } else { rounded }
}

fn bound(value: BigRational) -> BigRational {
	if value.numer().bits() + value.denom().bits() > MAX_RATIONAL_BITS {
		round_significant(&value, BIGNUMBER_PRECISION)
	} else {
		value
	}
}

fn pow_rational(base: &BigRational, exponent: i64) -> BigRational {
	let power = exponent.unsigned_abs() as usize;
	let numerator = num_traits::pow(base.numer().clone(), power);
	let denominator = num_traits::pow(base.denom().clone(), power);
	let result = BigRational::new(numerator, denominator);

	if exponent < 0 { result.recip() } else { result }
}
