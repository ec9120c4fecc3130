use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use num_traits::Signed;
use num_traits::ToPrimitive;
use num_traits::Zero;

use super::node::BinaryOp;
use super::node::Node;
use super::node::UnaryOp;
use super::numeric::parse_decimal;
use super::numeric::pow10;

/// Rewrites are repeated until the tree stops changing, up to this many
/// times.
const MAX_PASSES: usize = 8;

/// Largest exponent folded when both sides of `^` are literals.
const MAX_FOLDED_EXPONENT: i64 = 64;

/// Simplify an expression tree symbolically. No scope is consulted, so
/// symbols stay symbols.
pub fn simplify(node: &Node) -> Node {
	let mut current = rewrite(node);
	for _ in 1..MAX_PASSES {
		let next = rewrite(&current);
		if next == current {
			break;
		}
		current = next;
	}

	current
}

/// The exact value of a literal, or of a negated literal.
pub(crate) fn rational(node: &Node) -> Option<BigRational> {
	match node {
		Node::Constant(text) => parse_decimal(text),
		Node::Unary {
			op: UnaryOp::Neg,
			operand,
		} => rational(operand).map(|value| -value),
		Node::Parens(inner) => rational(inner),
		_ => None,
	}
}

/// Decimal text for `value` when it terminates, e.g. `0.25` but not `1/3`.
fn decimal_text(value: &BigRational) -> Option<String> {
	let magnitude = value.abs();
	let mut denominator = magnitude.denom().clone();
	let two = BigInt::from(2u8);
	let five = BigInt::from(5u8);
	let (mut twos, mut fives) = (0usize, 0usize);

	while (&denominator % &two).is_zero() {
		denominator /= &two;
		twos += 1;
	}
	while (&denominator % &five).is_zero() {
		denominator /= &five;
		fives += 1;
	}
	if !denominator.is_one() {
		return None;
	}

	let scale = twos.max(fives);
	let scaled = (magnitude * BigRational::from_integer(pow10(scale))).to_integer();
	let digits = format!("{scaled:0>width$}", width = scale + 1);
	let (integer, fraction) = digits.split_at(digits.len() - scale);

	Some(if fraction.is_empty() {
		integer.to_string()
	} else {
		format!("{integer}.{fraction}")
	})
}

/// A literal node for `value`, when it can be written exactly.
fn literal(value: &BigRational) -> Option<Node> {
	let text = decimal_text(value)?;
	let node = Node::Constant(text);

	Some(if value.is_negative() {
		Node::unary(UnaryOp::Neg, node)
	} else {
		node
	})
}

/// A node for the magnitude of `value`: a literal, or `numerator / denominator`.
fn magnitude(value: &BigRational) -> Node {
	let value = value.abs();
	literal(&value).unwrap_or_else(|| {
		Node::binary(
			BinaryOp::Div,
			Node::Constant(value.numer().to_string()),
			Node::Constant(value.denom().to_string()),
		)
	})
}

fn is_literal(node: &Node, expected: i64) -> bool {
	rational(node).is_some_and(|value| value == BigRational::from_integer(BigInt::from(expected)))
}

fn rewrite(node: &Node) -> Node {
	match node {
		Node::Constant(_) | Node::Symbol(_) => node.clone(),
		Node::Parens(inner) => rewrite(inner),
		Node::Unary { op, operand } => rewrite_unary(*op, rewrite(operand)),
		Node::Binary {
			op,
			lhs,
			rhs,
			implicit,
		} => rewrite_binary(*op, rewrite(lhs), rewrite(rhs), *implicit),
		Node::Call { name, args } => {
			Node::Call {
				name: name.clone(),
				args: args.iter().map(rewrite).collect(),
			}
		}
		Node::Conversion { value, target } => {
			Node::Conversion {
				value: Box::new(rewrite(value)),
				target: target.clone(),
			}
		}
		Node::Assign { name, value } => {
			Node::Assign {
				name: name.clone(),
				value: Box::new(rewrite(value)),
			}
		}
		Node::FunctionAssign { name, params, body } => {
			Node::FunctionAssign {
				name: name.clone(),
				params: params.clone(),
				body: Box::new(rewrite(body)),
			}
		}
	}
}

fn rewrite_unary(op: UnaryOp, operand: Node) -> Node {
	match op {
		UnaryOp::Plus => operand,
		UnaryOp::Neg => {
			match operand {
				Node::Unary {
					op: UnaryOp::Neg,
					operand: inner,
				} => *inner,
				other if is_literal(&other, 0) => Node::Constant("0".to_string()),
				other => Node::unary(UnaryOp::Neg, other),
			}
		}
		UnaryOp::Factorial => {
			let folded = rational(&operand)
				.filter(|value| value.is_integer() && !value.is_negative())
				.and_then(|value| value.to_integer().to_i64())
				.filter(|value| *value <= 20)
				.map(|value| {
					let product = (2..=value).fold(BigInt::one(), |acc, k| acc * BigInt::from(k));
					Node::Constant(product.to_string())
				});

			folded.unwrap_or_else(|| Node::unary(UnaryOp::Factorial, operand))
		}
	}
}

fn fold(op: BinaryOp, left: &BigRational, right: &BigRational) -> Option<BigRational> {
	match op {
		BinaryOp::Add => Some(left + right),
		BinaryOp::Sub => Some(left - right),
		BinaryOp::Mul => Some(left * right),
		BinaryOp::Div if !right.is_zero() => Some(left / right),
		BinaryOp::Mod if !right.is_zero() => Some(left - right * (left / right).floor()),
		BinaryOp::Pow => {
			let exponent = right
				.is_integer()
				.then(|| right.to_integer().to_i64())
				.flatten()
				.filter(|exponent| exponent.abs() <= MAX_FOLDED_EXPONENT)?;
			if left.is_zero() && exponent < 0 {
				return None;
			}

			let power = exponent.unsigned_abs() as usize;
			let result = BigRational::new(
				num_traits::pow(left.numer().clone(), power),
				num_traits::pow(left.denom().clone(), power),
			);
			Some(if exponent < 0 { result.recip() } else { result })
		}
		_ => None,
	}
}

fn rewrite_binary(op: BinaryOp, lhs: Node, rhs: Node, implicit: bool) -> Node {
	if let (Some(left), Some(right)) = (rational(&lhs), rational(&rhs)) {
		if let Some(node) = fold(op, &left, &right).as_ref().and_then(literal) {
			return node;
		}
	}

	match op {
		BinaryOp::Add if is_literal(&lhs, 0) => return rhs,
		BinaryOp::Add | BinaryOp::Sub if is_literal(&rhs, 0) => return lhs,
		BinaryOp::Sub if is_literal(&lhs, 0) => return rewrite_unary(UnaryOp::Neg, rhs),
		BinaryOp::Mul if is_literal(&lhs, 0) || is_literal(&rhs, 0) => {
			return Node::Constant("0".to_string());
		}
		BinaryOp::Mul if is_literal(&lhs, 1) => return rhs,
		BinaryOp::Mul | BinaryOp::Div if is_literal(&rhs, 1) => return lhs,
		BinaryOp::Pow if is_literal(&rhs, 1) => return lhs,
		BinaryOp::Pow if is_literal(&rhs, 0) => return Node::Constant("1".to_string()),
		_ => {}
	}

	let node = Node::Binary {
		op,
		lhs: Box::new(lhs),
		rhs: Box::new(rhs),
		implicit,
	};

	match op {
		BinaryOp::Add | BinaryOp::Sub => collect_terms(&node),
		BinaryOp::Mul if !implicit => collect_factors(&node),
		_ => node,
	}
}

/// Split a term into its numeric coefficient and the remaining factor.
fn split_coefficient(node: &Node) -> (BigRational, Option<Node>) {
	if let Some(value) = rational(node) {
		return (value, None);
	}

	match node {
		Node::Unary {
			op: UnaryOp::Neg,
			operand,
		} => {
			let (coefficient, rest) = split_coefficient(operand);
			(-coefficient, rest)
		}
		Node::Binary {
			op: BinaryOp::Mul,
			lhs,
			rhs,
			..
		} => {
			if let Some(value) = rational(lhs) {
				(value, Some(rhs.as_ref().clone()))
			} else if let Some(value) = rational(rhs) {
				(value, Some(lhs.as_ref().clone()))
			} else {
				(BigRational::one(), Some(node.clone()))
			}
		}
		_ => (BigRational::one(), Some(node.clone())),
	}
}

fn flatten_sum(node: &Node, negate: bool, terms: &mut Vec<(BigRational, Option<Node>)>) {
	match node {
		Node::Binary {
			op: BinaryOp::Add,
			lhs,
			rhs,
			..
		} => {
			flatten_sum(lhs, negate, terms);
			flatten_sum(rhs, negate, terms);
		}
		Node::Binary {
			op: BinaryOp::Sub,
			lhs,
			rhs,
			..
		} => {
			flatten_sum(lhs, negate, terms);
			flatten_sum(rhs, !negate, terms);
		}
		other => {
			let (coefficient, rest) = split_coefficient(other);
			terms.push((if negate { -coefficient } else { coefficient }, rest));
		}
	}
}

/// Combine like terms: `2x + 3x - 1 + 4` becomes `5 * x + 3`.
fn collect_terms(node: &Node) -> Node {
	let mut flat = Vec::new();
	flatten_sum(node, false, &mut flat);

	let mut constant = BigRational::zero();
	let mut terms: Vec<(String, BigRational, Node)> = Vec::new();
	for (coefficient, rest) in flat {
		let Some(rest) = rest else {
			constant += coefficient;
			continue;
		};

		let key = rest.to_string();
		match terms.iter_mut().find(|(existing, ..)| *existing == key) {
			Some((_, total, _)) => *total += coefficient,
			None => terms.push((key, coefficient, rest)),
		}
	}

	let mut parts: Vec<(bool, Node)> = terms
		.into_iter()
		.filter(|(_, coefficient, _)| !coefficient.is_zero())
		.map(|(_, coefficient, rest)| {
			let body = if coefficient.abs().is_one() {
				rest
			} else {
				Node::binary(BinaryOp::Mul, magnitude(&coefficient), rest)
			};
			(coefficient.is_negative(), body)
		})
		.collect();

	if !constant.is_zero() {
		parts.push((constant.is_negative(), magnitude(&constant)));
	}

	let mut parts = parts.into_iter();
	let Some((negative, first)) = parts.next() else {
		return Node::Constant("0".to_string());
	};

	let first = if negative {
		Node::unary(UnaryOp::Neg, first)
	} else {
		first
	};

	parts.fold(first, |sum, (negative, part)| {
		let op = if negative { BinaryOp::Sub } else { BinaryOp::Add };
		Node::binary(op, sum, part)
	})
}

fn flatten_product(node: &Node, factors: &mut Vec<Node>) {
	match node {
		Node::Binary {
			op: BinaryOp::Mul,
			lhs,
			rhs,
			implicit: false,
		} => {
			flatten_product(lhs, factors);
			flatten_product(rhs, factors);
		}
		other => factors.push(other.clone()),
	}
}

/// Combine like factors: `2 * x * 3 * x` becomes `6 * x ^ 2`.
fn collect_factors(node: &Node) -> Node {
	let mut flat = Vec::new();
	flatten_product(node, &mut flat);

	let mut coefficient = BigRational::one();
	let mut factors: Vec<(String, Node, BigRational)> = Vec::new();
	for factor in flat {
		if let Some(value) = rational(&factor) {
			coefficient *= value;
			continue;
		}

		let (base, exponent) = match &factor {
			Node::Binary {
				op: BinaryOp::Pow,
				lhs,
				rhs,
				..
			} => {
				match rational(rhs) {
					Some(exponent) => (lhs.as_ref().clone(), exponent),
					None => (factor.clone(), BigRational::one()),
				}
			}
			_ => (factor.clone(), BigRational::one()),
		};

		let key = base.to_string();
		match factors.iter_mut().find(|(existing, ..)| *existing == key) {
			Some((_, _, total)) => *total += exponent,
			None => factors.push((key, base, exponent)),
		}
	}

	if coefficient.is_zero() {
		return Node::Constant("0".to_string());
	}

	let product = factors
		.into_iter()
		.filter(|(_, _, exponent)| !exponent.is_zero())
		.map(|(_, base, exponent)| {
			if exponent.is_one() {
				base
			} else {
				Node::binary(BinaryOp::Pow, base, signed(&exponent))
			}
		})
		.reduce(|product, factor| Node::binary(BinaryOp::Mul, product, factor));

	let Some(product) = product else {
		return signed(&coefficient);
	};

	let scaled = if coefficient.abs().is_one() {
		product
	} else {
		Node::binary(BinaryOp::Mul, magnitude(&coefficient), product)
	};

	if coefficient.is_negative() {
		Node::unary(UnaryOp::Neg, scaled)
	} else {
		scaled
	}
}

fn signed(value: &BigRational) -> Node {
	let node = magnitude(value);
	if value.is_negative() {
		Node::unary(UnaryOp::Neg, node)
	} else {
		node
	}
}
