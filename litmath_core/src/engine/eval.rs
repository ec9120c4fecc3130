use std::f64::consts;
use std::sync::Arc;

use super::functions;
use super::node::BinaryOp;
use super::node::Node;
use super::node::UnaryOp;
use super::numeric::Numeric;
use super::numeric::NumericMode;
use super::units::CompoundUnit;
use super::units::Quantity;
use super::units::UnitRegistry;
use super::value::UserFunction;
use super::value::Value;
use crate::EvalError;
use crate::EvalResult;
use crate::Scope;

/// Nesting limit for calls to functions defined in a note. Every call uses
/// up as many levels as its function body is deep.
pub const MAX_CALL_DEPTH: usize = 256;

/// The golden ratio.
const PHI: f64 = 1.618_033_988_749_895;

/// Named constants, looked up after the scope and before units.
pub(crate) fn constant(name: &str, mode: NumericMode) -> Option<Value> {
	let number = match name {
		"true" => return Some(Value::Boolean(true)),
		"false" => return Some(Value::Boolean(false)),
		"pi" => consts::PI,
		"e" => consts::E,
		"tau" => consts::TAU,
		"phi" => PHI,
		"Infinity" => f64::INFINITY,
		"NaN" => f64::NAN,
		_ => return None,
	};

	Some(Value::Number(Numeric::from_f64(number, mode)))
}

/// ISO 4217 codes published in the ECB reference rate feed.
const CURRENCY_CODES: [&str; 33] = [
	"AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HRK", "HUF",
	"IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PHP", "PLN", "RON",
	"RUB", "SEK", "SGD", "THB", "TRY", "USD", "ZAR",
];

/// A known currency code written in one case, e.g. `USD` or `usd`.
pub(crate) fn is_currency_code(name: &str) -> bool {
	let single_case = name.bytes().all(|byte| byte.is_ascii_uppercase())
		|| name.bytes().all(|byte| byte.is_ascii_lowercase());

	single_case
		&& CURRENCY_CODES
			.iter()
			.any(|code| code.eq_ignore_ascii_case(name))
}

fn unit_not_available(name: &str) -> EvalError {
	EvalError::UnitCreation {
		name: name.to_string(),
		reason: "no exchange rate is installed for this currency".to_string(),
	}
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Evaluator<'a> {
	units: &'a UnitRegistry,
	mode: NumericMode,
	currencies: bool,
	depth: usize,
}

impl<'a> Evaluator<'a> {
	pub(crate) fn new(units: &'a UnitRegistry, mode: NumericMode) -> Self {
		Self {
			units,
			mode,
			currencies: true,
			depth: 0,
		}
	}

	/// Whether currency codes without rates report a missing unit instead of
	/// an undefined symbol.
	pub(crate) fn with_currencies(self, currencies: bool) -> Self {
		Self { currencies, ..self }
	}

	fn awaits_rates(&self, name: &str) -> bool {
		self.currencies && is_currency_code(name)
	}

	pub(crate) fn eval(&self, node: &Node, scope: &mut Scope) -> EvalResult<Value> {
		match node {
			Node::Constant(text) => {
				Numeric::parse_literal(text, self.mode)
					.map(Value::Number)
					.ok_or_else(|| EvalError::UndefinedSymbol(text.clone()))
			}
			Node::Symbol(name) => self.resolve_symbol(name, scope),
			Node::Unary { op, operand } => {
				let value = self.eval(operand, scope)?;
				self.unary(*op, &value)
			}
			Node::Binary {
				op,
				lhs,
				rhs,
				implicit,
			} => {
				let left = self.eval(lhs, scope)?;
				if *implicit {
					if let Node::Symbol(name) = rhs.as_ref() {
						self.ensure_unit_available(name, scope)?;
					}
				}
				let right = self.eval(rhs, scope)?;
				left.binary(*op, &right)
			}
			Node::Call { name, args } => self.call(name, args, scope),
			Node::Conversion { value, target } => {
				let value = self.eval(value, scope)?;
				let unit = self.resolve_unit(target)?;
				match value {
					Value::Quantity(quantity) => Ok(Value::Quantity(quantity.convert(&unit)?)),
					other => {
						Err(EvalError::TypeMismatch {
							operator: "to".to_string(),
							left: other.type_name().to_string(),
							right: "Unit".to_string(),
						})
					}
				}
			}
			Node::Parens(inner) => self.eval(inner, scope),
			Node::Assign { name, value } => {
				let value = self.eval(value, scope)?;
				scope.insert(name.clone(), value.clone());
				Ok(value)
			}
			Node::FunctionAssign { name, params, body } => {
				let function = Value::Function(Arc::new(UserFunction {
					name: name.clone(),
					params: params.clone(),
					body: body.as_ref().clone(),
				}));
				scope.insert(name.clone(), function.clone());
				Ok(function)
			}
		}
	}

	fn resolve_symbol(&self, name: &str, scope: &Scope) -> EvalResult<Value> {
		if let Some(value) = scope.get(name) {
			return Ok(value.clone());
		}

		if let Some(value) = constant(name, self.mode) {
			return Ok(value);
		}

		if let Some(unit) = self.units.unit(name) {
			return Ok(Value::Quantity(Quantity::new(
				Numeric::from_i64(1, self.mode),
				unit,
			)));
		}

		Err(EvalError::UndefinedSymbol(name.to_string()))
	}

	/// A currency code written after a number, like `5 USD`, before its rates
	/// have been installed.
	fn ensure_unit_available(&self, name: &str, scope: &Scope) -> EvalResult<()> {
		if self.awaits_rates(name)
			&& !scope.contains_key(name)
			&& constant(name, self.mode).is_none()
			&& !self.units.contains(name)
		{
			return Err(unit_not_available(name));
		}

		Ok(())
	}

	fn resolve_unit(&self, node: &Node) -> EvalResult<CompoundUnit> {
		match node {
			Node::Symbol(name) => {
				self.units.unit(name).ok_or_else(|| {
					if self.awaits_rates(name) {
						unit_not_available(name)
					} else {
						EvalError::UnknownUnit(name.clone())
					}
				})
			}
			Node::Parens(inner) => self.resolve_unit(inner),
			Node::Binary {
				op: BinaryOp::Mul,
				lhs,
				rhs,
				..
			} => Ok(self.resolve_unit(lhs)?.mul(&self.resolve_unit(rhs)?)),
			Node::Binary {
				op: BinaryOp::Div,
				lhs,
				rhs,
				..
			} => Ok(self.resolve_unit(lhs)?.div(&self.resolve_unit(rhs)?)),
			Node::Binary {
				op: BinaryOp::Pow,
				lhs,
				rhs,
				..
			} => {
				let exponent = match rhs.as_ref() {
					Node::Constant(text) => text.parse::<i32>().ok(),
					_ => None,
				};
				let Some(exponent) = exponent else {
					return Err(EvalError::UnknownUnit(node.to_string()));
				};

				Ok(self.resolve_unit(lhs)?.powi(exponent))
			}
			other => Err(EvalError::UnknownUnit(other.to_string())),
		}
	}

	fn unary(&self, op: UnaryOp, value: &Value) -> EvalResult<Value> {
		match (op, value) {
			(UnaryOp::Neg, _) => value.neg(),
			(UnaryOp::Plus, Value::Number(_) | Value::Quantity(_)) => Ok(value.clone()),
			(UnaryOp::Plus, Value::Boolean(flag)) => {
				Ok(Value::Number(Numeric::from_i64(i64::from(*flag), self.mode)))
			}
			(UnaryOp::Factorial, Value::Number(number)) => Ok(Value::Number(number.factorial())),
			(UnaryOp::Plus, _) | (UnaryOp::Factorial, _) => {
				Err(EvalError::ArgumentType {
					function: if op == UnaryOp::Plus {
						"unaryPlus"
					} else {
						"factorial"
					}
					.to_string(),
					expected: "number".to_string(),
					actual: value.type_name().to_string(),
				})
			}
		}
	}

	fn call(&self, name: &str, args: &[Node], scope: &mut Scope) -> EvalResult<Value> {
		if let Some(Value::Function(function)) = scope.get(name).cloned() {
			return self.call_user(&function, args, scope);
		}

		let values = args
			.iter()
			.map(|arg| self.eval(arg, scope))
			.collect::<EvalResult<Vec<_>>>()?;

		functions::call(name, &values, self.mode)
			.unwrap_or_else(|| Err(EvalError::UndefinedFunction(name.to_string())))
	}

	fn call_user(
		&self,
		function: &UserFunction,
		args: &[Node],
		scope: &mut Scope,
	) -> EvalResult<Value> {
		if args.len() != function.params.len() {
			return Err(EvalError::ArgumentCount {
				function: function.name.clone(),
				expected: function.params.len().to_string(),
				actual: args.len(),
			});
		}

		let depth = self.depth + function.body.depth();
		if depth > MAX_CALL_DEPTH {
			return Err(EvalError::CallDepth(MAX_CALL_DEPTH));
		}

		let mut local = scope.clone();
		for (param, arg) in function.params.iter().zip(args) {
			let value = self.eval(arg, scope)?;
			local.insert(param.clone(), value);
		}

		let nested = Self { depth, ..*self };
		nested.eval(&function.body, &mut local)
	}
}
