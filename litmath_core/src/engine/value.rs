use std::cmp::Ordering;
use std::sync::Arc;

use super::node::BinaryOp;
use super::node::Node;
use super::numeric::Numeric;
use super::units::Quantity;
use crate::EvalError;
use crate::EvalResult;

/// A function defined in a note, e.g. `f(x) = x^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
	pub name: String,
	pub params: Vec<String>,
	pub body: Node,
}

/// Anything an expression can evaluate to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Number(Numeric),
	Quantity(Quantity),
	Boolean(bool),
	Function(Arc<UserFunction>),
	/// An unevaluated expression, produced by simplification.
	Symbolic(Node),
}

impl From<Numeric> for Value {
	fn from(value: Numeric) -> Self {
		Self::Number(value)
	}
}

impl From<Quantity> for Value {
	fn from(value: Quantity) -> Self {
		Self::Quantity(value).collapse()
	}
}

impl Value {
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Number(Numeric::Float(_)) => "number",
			Self::Number(Numeric::Big(_)) => "BigNumber",
			Self::Quantity(_) => "Unit",
			Self::Boolean(_) => "boolean",
			Self::Function(_) => "function",
			Self::Symbolic(_) => "Node",
		}
	}

	/// Numbers and quantities. Booleans, functions and symbolic expressions
	/// never take part in a running total.
	pub fn is_numeric(&self) -> bool {
		matches!(self, Self::Number(_) | Self::Quantity(_))
	}

	pub fn as_number(&self) -> Option<&Numeric> {
		match self {
			Self::Number(number) => Some(number),
			_ => None,
		}
	}

	/// Dimensionless quantities, such as `km / m`, become plain numbers.
	fn collapse(self) -> Self {
		match self {
			Self::Quantity(quantity) if quantity.unit.is_dimensionless() => {
				Self::Number(quantity.base_value())
			}
			other => other,
		}
	}

	fn arithmetic(&self) -> Option<Self> {
		match self {
			Self::Boolean(flag) => {
				Some(Self::Number(Numeric::Float(if *flag { 1.0 } else { 0.0 })))
			}
			Self::Number(_) | Self::Quantity(_) => Some(self.clone()),
			Self::Function(_) | Self::Symbolic(_) => None,
		}
	}

	fn mismatch(&self, operator: BinaryOp, other: &Self) -> EvalError {
		EvalError::TypeMismatch {
			operator: operator.symbol().to_string(),
			left: self.type_name().to_string(),
			right: other.type_name().to_string(),
		}
	}

	fn operands(&self, operator: BinaryOp, other: &Self) -> EvalResult<(Self, Self)> {
		match (self.arithmetic(), other.arithmetic()) {
			(Some(left), Some(right)) => Ok((left, right)),
			_ => Err(self.mismatch(operator, other)),
		}
	}

	pub fn add(&self, other: &Self) -> EvalResult<Self> {
		self.additive(BinaryOp::Add, other)
	}

	pub fn sub(&self, other: &Self) -> EvalResult<Self> {
		self.additive(BinaryOp::Sub, other)
	}

	fn additive(&self, operator: BinaryOp, other: &Self) -> EvalResult<Self> {
		let combine = |left: &Numeric, right: &Numeric| {
			if operator == BinaryOp::Add {
				left.add(right)
			} else {
				left.sub(right)
			}
		};

		match self.operands(operator, other)? {
			(Self::Number(left), Self::Number(right)) => Ok(Self::Number(combine(&left, &right))),
			(Self::Quantity(left), Self::Quantity(right)) => {
				let right = right.convert(&left.unit)?;
				Ok(Quantity::new(combine(&left.value, &right.value), left.unit).into())
			}
			_ => Err(self.mismatch(operator, other)),
		}
	}

	pub fn mul(&self, other: &Self) -> EvalResult<Self> {
		match self.operands(BinaryOp::Mul, other)? {
			(Self::Number(left), Self::Number(right)) => Ok(Self::Number(left.mul(&right))),
			(Self::Number(scalar), Self::Quantity(quantity))
			| (Self::Quantity(quantity), Self::Number(scalar)) => {
				Ok(Quantity::new(quantity.value.mul(&scalar), quantity.unit).into())
			}
			(Self::Quantity(left), Self::Quantity(right)) => {
				Ok(
					Quantity::new(left.value.mul(&right.value), left.unit.mul(&right.unit))
						.into(),
				)
			}
			_ => Err(self.mismatch(BinaryOp::Mul, other)),
		}
	}

	pub fn div(&self, other: &Self) -> EvalResult<Self> {
		match self.operands(BinaryOp::Div, other)? {
			(Self::Number(left), Self::Number(right)) => Ok(Self::Number(left.div(&right))),
			(Self::Quantity(quantity), Self::Number(scalar)) => {
				Ok(Quantity::new(quantity.value.div(&scalar), quantity.unit).into())
			}
			(Self::Number(scalar), Self::Quantity(quantity)) => {
				Ok(Quantity::new(scalar.div(&quantity.value), quantity.unit.powi(-1)).into())
			}
			(Self::Quantity(left), Self::Quantity(right)) => {
				Ok(
					Quantity::new(left.value.div(&right.value), left.unit.div(&right.unit))
						.into(),
				)
			}
			_ => Err(self.mismatch(BinaryOp::Div, other)),
		}
	}

	pub fn rem(&self, other: &Self) -> EvalResult<Self> {
		match self.operands(BinaryOp::Mod, other)? {
			(Self::Number(left), Self::Number(right)) => Ok(Self::Number(left.rem(&right))),
			(Self::Quantity(left), Self::Quantity(right)) => {
				let right = right.convert(&left.unit)?;
				Ok(Quantity::new(left.value.rem(&right.value), left.unit).into())
			}
			_ => Err(self.mismatch(BinaryOp::Mod, other)),
		}
	}

	pub fn pow(&self, other: &Self) -> EvalResult<Self> {
		match self.operands(BinaryOp::Pow, other)? {
			(Self::Number(base), Self::Number(exponent)) => Ok(Self::Number(base.pow(&exponent))),
			(Self::Quantity(base), Self::Number(exponent)) => {
				let Some(power) = exponent.to_i64().and_then(|power| i32::try_from(power).ok())
				else {
					return Err(self.mismatch(BinaryOp::Pow, other));
				};

				Ok(Quantity::new(base.value.pow(&exponent), base.unit.powi(power)).into())
			}
			_ => Err(self.mismatch(BinaryOp::Pow, other)),
		}
	}

	pub fn neg(&self) -> EvalResult<Self> {
		match self.arithmetic() {
			Some(Self::Number(number)) => Ok(Self::Number(number.neg())),
			Some(Self::Quantity(quantity)) => {
				Ok(Self::Quantity(Quantity::new(quantity.value.neg(), quantity.unit)))
			}
			_ => {
				Err(EvalError::ArgumentType {
					function: "unaryMinus".to_string(),
					expected: "number | Unit".to_string(),
					actual: self.type_name().to_string(),
				})
			}
		}
	}

	/// Evaluate a relational operator.
	pub fn compare(&self, operator: BinaryOp, other: &Self) -> EvalResult<Self> {
		if let (Self::Boolean(left), Self::Boolean(right)) = (self, other) {
			return match operator {
				BinaryOp::Eq => Ok(Self::Boolean(left == right)),
				BinaryOp::Ne => Ok(Self::Boolean(left != right)),
				_ => Err(self.mismatch(operator, other)),
			};
		}

		let ordering = match self.operands(operator, other)? {
			(Self::Number(left), Self::Number(right)) => left.partial_cmp(&right),
			(Self::Quantity(left), Self::Quantity(right)) => {
				let right = right.convert(&left.unit)?;
				left.value.partial_cmp(&right.value)
			}
			_ => return Err(self.mismatch(operator, other)),
		};

		let result = match operator {
			BinaryOp::Eq => ordering == Some(Ordering::Equal),
			BinaryOp::Ne => ordering != Some(Ordering::Equal),
			BinaryOp::Lt => ordering == Some(Ordering::Less),
			BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
			BinaryOp::Gt => ordering == Some(Ordering::Greater),
			BinaryOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
			_ => return Err(self.mismatch(operator, other)),
		};

		Ok(Self::Boolean(result))
	}

	/// Apply an arithmetic or relational operator.
	pub fn binary(&self, operator: BinaryOp, other: &Self) -> EvalResult<Self> {
		match operator {
			BinaryOp::Add => self.add(other),
			BinaryOp::Sub => self.sub(other),
			BinaryOp::Mul => self.mul(other),
			BinaryOp::Div => self.div(other),
			BinaryOp::Mod => self.rem(other),
			BinaryOp::Pow => self.pow(other),
			BinaryOp::Eq
			| BinaryOp::Ne
			| BinaryOp::Lt
			| BinaryOp::Le
			| BinaryOp::Gt
			| BinaryOp::Ge => self.compare(operator, other),
		}
	}
}
