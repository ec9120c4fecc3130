use num_rational::BigRational;
use num_traits::Signed;

use super::numeric::BIGNUMBER_PRECISION;
use super::numeric::Numeric;
use super::numeric::pow10;
use super::numeric::significant_digits;
use super::value::Value;

/// Most significant digits (or fixed decimals) a result is written with.
pub const MAX_PRECISION: usize = 100;

/// How numbers are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Notation {
	/// Positional for moderate exponents, exponential otherwise. Trailing
	/// zeros are removed.
	#[default]
	Auto,
	/// A fixed number of digits after the decimal point.
	Fixed,
	/// Always `d.ddde+N`.
	Exponential,
	/// Exponential with the exponent a multiple of three.
	Engineering,
}

impl Notation {
	/// Read a notation name. Unknown names fall back to [`Notation::Auto`].
	pub fn parse(name: &str) -> Self {
		match name.trim().to_ascii_lowercase().as_str() {
			"fixed" => Self::Fixed,
			"exponential" => Self::Exponential,
			"engineering" => Self::Engineering,
			_ => Self::Auto,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatOptions {
	pub notation: Notation,
	/// Significant digits, or digits after the point for
	/// [`Notation::Fixed`]. `None` writes the shortest exact form.
	pub precision: Option<usize>,
	/// Exponents below this switch [`Notation::Auto`] to exponential.
	pub lower_exp: Option<i32>,
	/// Exponents at or above this switch [`Notation::Auto`] to exponential.
	pub upper_exp: Option<i32>,
}

impl Default for FormatOptions {
	fn default() -> Self {
		Self {
			notation: Notation::Auto,
			precision: Some(8),
			lower_exp: Some(-3),
			upper_exp: Some(8),
		}
	}
}

impl FormatOptions {
	/// Shortest exact output with JavaScript style exponent bounds.
	pub fn shortest() -> Self {
		Self {
			notation: Notation::Auto,
			precision: None,
			lower_exp: Some(-7),
			upper_exp: Some(21),
		}
	}
}

/// A finite number split into sign, significant digits and the decimal
/// exponent of the first digit.
struct Digits {
	negative: bool,
	digits: String,
	exponent: i64,
}

impl Digits {
	fn of(number: &Numeric, precision: Option<usize>) -> Self {
		if number.is_zero() {
			return Self {
				negative: false,
				digits: "0".repeat(precision.unwrap_or(1).max(1)),
				exponent: 0,
			};
		}

		match number {
			Numeric::Float(value) => {
				let text = match precision {
					Some(precision) => format!("{:.*e}", precision.max(1) - 1, value.abs()),
					None => format!("{:e}", value.abs()),
				};
				let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));

				Self {
					negative: *value < 0.0,
					digits: mantissa.replace('.', ""),
					exponent: exponent.parse().unwrap_or(0),
				}
			}
			Numeric::Big(value) => {
				let (negative, digits, exponent) = match precision {
					Some(precision) => significant_digits(value, precision),
					None => {
						let (negative, digits, exponent) =
							significant_digits(value, BIGNUMBER_PRECISION);
						(negative, trim_zeros(&digits).to_string(), exponent)
					}
				};

				Self {
					negative,
					digits,
					exponent,
				}
			}
		}
	}

	fn sign(&self) -> &'static str {
		if self.negative { "-" } else { "" }
	}

	fn positional(&self) -> String {
		let digits = &self.digits;
		let body = if self.exponent >= 0 {
			let integer_len = self.exponent as usize + 1;
			if digits.len() <= integer_len {
				format!("{digits}{}", "0".repeat(integer_len - digits.len()))
			} else {
				format!("{}.{}", &digits[..integer_len], &digits[integer_len..])
			}
		} else {
			format!("0.{}{digits}", "0".repeat((-self.exponent - 1) as usize))
		};

		format!("{}{body}", self.sign())
	}

	fn exponential(&self, integer_len: usize) -> String {
		let mut digits = self.digits.clone();
		if digits.len() < integer_len {
			digits.push_str(&"0".repeat(integer_len - digits.len()));
		}

		let (integer, fraction) = digits.split_at(integer_len);
		let exponent = self.exponent - (integer_len as i64 - 1);
		let exponent_sign = if exponent < 0 { "-" } else { "+" };
		let mantissa = if fraction.is_empty() {
			integer.to_string()
		} else {
			format!("{integer}.{fraction}")
		};

		format!("{}{mantissa}e{exponent_sign}{}", self.sign(), exponent.abs())
	}
}

fn trim_zeros(digits: &str) -> &str {
	let trimmed = digits.trim_end_matches('0');
	if trimmed.is_empty() { "0" } else { trimmed }
}

fn format_fixed(number: &Numeric, decimals: usize) -> String {
	let text = match number {
		Numeric::Float(value) => format!("{value:.decimals$}"),
		Numeric::Big(value) => {
			let scaled = (value * BigRational::from_integer(pow10(decimals))).round();
			let integer = scaled.to_integer();
			let negative = integer.is_negative();
			let digits = format!("{:0>width$}", integer.abs(), width = decimals + 1);
			let (whole, fraction) = digits.split_at(digits.len() - decimals);
			let sign = if negative { "-" } else { "" };

			if fraction.is_empty() {
				format!("{sign}{whole}")
			} else {
				format!("{sign}{whole}.{fraction}")
			}
		}
	};

	// `-0.00` is written without its sign.
	if text.starts_with('-') && text.bytes().all(|byte| matches!(byte, b'-' | b'0' | b'.')) {
		text[1..].to_string()
	} else {
		text
	}
}

fn non_finite(number: &Numeric) -> Option<&'static str> {
	match number {
		Numeric::Float(value) if value.is_nan() => Some("NaN"),
		Numeric::Float(value) if value.is_infinite() && *value > 0.0 => Some("Infinity"),
		Numeric::Float(value) if value.is_infinite() => Some("-Infinity"),
		_ => None,
	}
}

/// Write a number according to `options`.
pub fn format_number(number: &Numeric, options: &FormatOptions) -> String {
	if let Some(text) = non_finite(number) {
		return text.to_string();
	}

	let precision = options.precision.map(|value| value.min(MAX_PRECISION));

	match options.notation {
		Notation::Fixed => {
			match precision {
				Some(decimals) => format_fixed(number, decimals),
				None => Digits::of(number, None).positional(),
			}
		}
		Notation::Exponential => Digits::of(number, precision).exponential(1),
		Notation::Engineering => {
			let digits = Digits::of(number, precision);
			let integer_len = digits.exponent.rem_euclid(3) as usize + 1;
			digits.exponential(integer_len)
		}
		Notation::Auto => {
			let mut digits = Digits::of(number, precision);
			digits.digits = trim_zeros(&digits.digits).to_string();

			let exponent = digits.exponent;
			let below = options
				.lower_exp
				.is_some_and(|lower| exponent < i64::from(lower));
			let above = options
				.upper_exp
				.is_some_and(|upper| exponent >= i64::from(upper));

			if number.is_zero() {
				"0".to_string()
			} else if below || above {
				digits.exponential(1)
			} else {
				digits.positional()
			}
		}
	}
}

/// Write any value: numbers per `options`, quantities as `<number> <unit>`,
/// functions as their signature and symbolic results as expression text.
pub fn format_value(value: &Value, options: &FormatOptions) -> String {
	match value {
		Value::Number(number) => format_number(number, options),
		Value::Quantity(quantity) => {
			format!("{} {}", format_number(&quantity.value, options), quantity.unit)
		}
		Value::Boolean(flag) => flag.to_string(),
		Value::Function(function) => {
			format!("{}({})", function.name, function.params.join(", "))
		}
		Value::Symbolic(node) => node.to_string(),
	}
}

