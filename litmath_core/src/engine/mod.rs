//! The expression engine: parsing, evaluation against a [`Scope`],
//! symbolic simplification, unit handling and number formatting.
//!
//! ```rust
//! use litmath_core::engine::Engine;
//! use litmath_core::engine::FormatOptions;
//! use litmath_core::engine::NumericMode;
//! use litmath_core::Scope;
//!
//! let engine = Engine::new();
//! let mut scope = Scope::default();
//! let node = engine.parse("x = 3 * 4").unwrap();
//! let value = engine.evaluate(&node, &mut scope, NumericMode::Number).unwrap();
//!
//! assert_eq!(engine.format(&value, &FormatOptions::default()), "12");
//! assert!(scope.contains_key("x"));
//! ```

pub use eval::MAX_CALL_DEPTH;
pub use format::FormatOptions;
pub use format::MAX_PRECISION;
pub use format::Notation;
pub use format::format_number;
pub use format::format_value;
pub use node::*;
pub use numeric::BIGNUMBER_PRECISION;
pub use numeric::Numeric;
pub use numeric::NumericMode;
pub use parser::MAX_PARSE_DEPTH;
pub use units::*;
pub use value::*;

mod eval;
mod format;
mod functions;
mod lexer;
mod node;
mod numeric;
mod parser;
mod simplify;
mod units;
mod value;

use eval::Evaluator;
use num_traits::ToPrimitive;

use crate::EvalResult;
use crate::Scope;

/// Owns the unit registry and exposes every operation the note processor
/// needs from an expression engine.
#[derive(Debug, Clone)]
pub struct Engine {
	units: UnitRegistry,
	currencies: bool,
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

impl Engine {
	/// An engine with the built-in units and no currencies.
	pub fn new() -> Self {
		Self {
			units: UnitRegistry::with_builtins(),
			currencies: true,
		}
	}

	pub fn units(&self) -> &UnitRegistry {
		&self.units
	}

	/// With currencies on, a currency code such as `USD` used before its
	/// rates are installed is a missing unit and its line shows no result.
	/// With currencies off it is an ordinary undefined symbol.
	pub fn set_currencies(&mut self, enabled: bool) {
		self.currencies = enabled;
	}

	pub fn parse(&self, source: &str) -> EvalResult<Node> {
		parser::parse(source)
	}

	/// Evaluate `node`. Assignments write into `scope`.
	pub fn evaluate(&self, node: &Node, scope: &mut Scope, mode: NumericMode) -> EvalResult<Value> {
		Evaluator::new(&self.units, mode)
			.with_currencies(self.currencies)
			.eval(node, scope)
	}

	/// Parse and evaluate in one step.
	pub fn evaluate_str(
		&self,
		source: &str,
		scope: &mut Scope,
		mode: NumericMode,
	) -> EvalResult<Value> {
		let node = self.parse(source)?;
		self.evaluate(&node, scope, mode)
	}

	/// Simplify `node` without a scope. Assignments are not performed; their
	/// right hand side is simplified instead. A tree that reduces to a single
	/// literal becomes a number.
	pub fn simplify(&self, node: &Node, mode: NumericMode) -> EvalResult<Value> {
		let target = match node {
			Node::Assign { value, .. } => value.as_ref(),
			Node::FunctionAssign { body, .. } => body.as_ref(),
			other => other,
		};

		let simplified = simplify::simplify(target);
		if let Some(value) = simplify::rational(&simplified) {
			let number = match mode {
				NumericMode::BigNumber => Numeric::Big(value),
				NumericMode::Number => {
					Numeric::Float(value.to_f64().unwrap_or(f64::NAN))
				}
			};
			return Ok(Value::Number(number));
		}

		Ok(Value::Symbolic(simplified))
	}

	pub fn format(&self, value: &Value, options: &FormatOptions) -> String {
		format_value(value, options)
	}

	/// Register a unit; see [`UnitRegistry::create_unit`].
	pub fn create_unit(
		&mut self,
		name: &str,
		definition: UnitDefinition,
		override_existing: bool,
	) -> EvalResult<()> {
		self.units
			.create_unit(name, definition, override_existing)
			.map(|_| ())
	}
}
