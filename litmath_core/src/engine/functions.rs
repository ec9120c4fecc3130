use std::ops::RangeInclusive;

use super::node::BinaryOp;
use super::numeric::Numeric;
use super::numeric::NumericMode;
use super::units::Quantity;
use super::value::Value;
use crate::EvalError;
use crate::EvalResult;

fn arity(name: &str, args: &[Value], expected: RangeInclusive<usize>) -> EvalResult<()> {
	if expected.contains(&args.len()) {
		return Ok(());
	}

	let (low, high) = (*expected.start(), *expected.end());
	let expected = if low == high {
		low.to_string()
	} else if high == usize::MAX {
		format!("at least {low}")
	} else {
		format!("{low} to {high}")
	};

	Err(EvalError::ArgumentCount {
		function: name.to_string(),
		expected,
		actual: args.len(),
	})
}

fn number(name: &str, value: &Value) -> EvalResult<Numeric> {
	match value {
		Value::Number(number) => Ok(number.clone()),
		Value::Boolean(flag) => Ok(Numeric::Float(if *flag { 1.0 } else { 0.0 })),
		other => {
			Err(EvalError::ArgumentType {
				function: name.to_string(),
				expected: "number".to_string(),
				actual: other.type_name().to_string(),
			})
		}
	}
}

/// Apply `apply` to a number, or to the magnitude of a quantity.
fn map_magnitude(
	name: &str,
	value: &Value,
	apply: impl Fn(&Numeric) -> Numeric,
) -> EvalResult<Value> {
	match value {
		Value::Quantity(quantity) => {
			Ok(Value::Quantity(Quantity::new(
				apply(&quantity.value),
				quantity.unit.clone(),
			)))
		}
		other => Ok(Value::Number(apply(&number(name, other)?))),
	}
}

fn float(
	name: &str,
	args: &[Value],
	mode: NumericMode,
	apply: impl Fn(f64) -> f64,
) -> EvalResult<Value> {
	arity(name, args, 1..=1)?;
	let value = number(name, &args[0])?.to_f64();
	Ok(Value::Number(Numeric::from_f64(apply(value), mode)))
}

fn extremum(name: &str, args: &[Value], operator: BinaryOp) -> EvalResult<Value> {
	arity(name, args, 1..=usize::MAX)?;

	let mut best = args[0].clone();
	for candidate in &args[1..] {
		if candidate.compare(operator, &best)? == Value::Boolean(true) {
			best = candidate.clone();
		}
	}

	if !best.is_numeric() {
		return Err(EvalError::ArgumentType {
			function: name.to_string(),
			expected: "number | Unit".to_string(),
			actual: best.type_name().to_string(),
		});
	}

	Ok(best)
}

/// Call the built-in function `name`. Returns `None` when no such function
/// exists.
pub fn call(name: &str, args: &[Value], mode: NumericMode) -> Option<EvalResult<Value>> {
	let result = match name {
		"sqrt" => float(name, args, mode, f64::sqrt),
		"cbrt" => float(name, args, mode, f64::cbrt),
		"exp" => float(name, args, mode, f64::exp),
		"log10" => float(name, args, mode, f64::log10),
		"log2" => float(name, args, mode, f64::log2),
		"sin" => float(name, args, mode, f64::sin),
		"cos" => float(name, args, mode, f64::cos),
		"tan" => float(name, args, mode, f64::tan),
		"asin" => float(name, args, mode, f64::asin),
		"acos" => float(name, args, mode, f64::acos),
		"atan" => float(name, args, mode, f64::atan),
		"sinh" => float(name, args, mode, f64::sinh),
		"cosh" => float(name, args, mode, f64::cosh),
		"tanh" => float(name, args, mode, f64::tanh),
		"log" => log(args, mode),
		"atan2" => {
			arity(name, args, 2..=2).and_then(|()| {
				let y = number(name, &args[0])?.to_f64();
				let x = number(name, &args[1])?.to_f64();
				Ok(Value::Number(Numeric::from_f64(y.atan2(x), mode)))
			})
		}
		"hypot" => {
			arity(name, args, 1..=usize::MAX).and_then(|()| {
				let sum = args.iter().try_fold(0.0, |sum, arg| {
					let value = number(name, arg)?.to_f64();
					Ok::<_, EvalError>(sum + value * value)
				})?;
				Ok(Value::Number(Numeric::from_f64(sum.sqrt(), mode)))
			})
		}
		"abs" => arity(name, args, 1..=1).and_then(|()| map_magnitude(name, &args[0], Numeric::abs)),
		"floor" => {
			arity(name, args, 1..=1).and_then(|()| map_magnitude(name, &args[0], Numeric::floor))
		}
		"ceil" => arity(name, args, 1..=1).and_then(|()| map_magnitude(name, &args[0], Numeric::ceil)),
		"fix" => arity(name, args, 1..=1).and_then(|()| map_magnitude(name, &args[0], Numeric::trunc)),
		"sign" => {
			arity(name, args, 1..=1)
				.and_then(|()| Ok(Value::Number(number(name, &args[0])?.signum())))
		}
		"round" => round(args),
		"min" => extremum(name, args, BinaryOp::Lt),
		"max" => extremum(name, args, BinaryOp::Gt),
		"mod" => arity(name, args, 2..=2).and_then(|()| args[0].rem(&args[1])),
		"pow" => arity(name, args, 2..=2).and_then(|()| args[0].pow(&args[1])),
		"factorial" => {
			arity(name, args, 1..=1)
				.and_then(|()| Ok(Value::Number(number(name, &args[0])?.factorial())))
		}
		_ => return None,
	};

	Some(result)
}

fn log(args: &[Value], mode: NumericMode) -> EvalResult<Value> {
	arity("log", args, 1..=2)?;
	let value = number("log", &args[0])?.to_f64();
	let result = match args.get(1) {
		Some(base) => value.ln() / number("log", base)?.to_f64().ln(),
		None => value.ln(),
	};

	Ok(Value::Number(Numeric::from_f64(result, mode)))
}

fn round(args: &[Value]) -> EvalResult<Value> {
	arity("round", args, 1..=2)?;
	let decimals = match args.get(1) {
		Some(decimals) => {
			number("round", decimals)?
				.to_i64()
				.and_then(|decimals| u32::try_from(decimals).ok())
				.filter(|decimals| *decimals <= 15)
				.ok_or_else(|| {
					EvalError::ArgumentType {
						function: "round".to_string(),
						expected: "integer between 0 and 15".to_string(),
						actual: decimals.type_name().to_string(),
					}
				})?
		}
		None => 0,
	};

	map_magnitude("round", &args[0], |value| value.round(decimals))
}
