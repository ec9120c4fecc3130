use serde::Deserialize;
use serde::Serialize;

use crate::engine::BinaryOp;
use crate::trim::CLOSE_FENCE;
use crate::trim::INLINE_MATH;
use crate::trim::OPEN_FENCE;

/// How an expression line contributes to its block's running total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
	#[default]
	Plus,
	Minus,
}

impl Sign {
	pub fn operator(self) -> BinaryOp {
		match self {
			Self::Plus => BinaryOp::Add,
			Self::Minus => BinaryOp::Sub,
		}
	}

	fn from_marker(marker: &str) -> Self {
		if marker == "-" { Self::Minus } else { Self::Plus }
	}
}

/// What a line left by [`trim`](crate::trim::trim) means to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
	/// An empty line or an opening fence. The running total restarts.
	Boundary,
	/// A closing fence. Block settings and the running total reset.
	CloseFence,
	/// A `key: value` directive.
	Config { key: &'a str, value: &'a str },
	/// `# ...` or `// ...`.
	Comment,
	/// Anything else, with its marker already removed.
	Expression { sign: Sign, expression: &'a str },
}

/// Classify a trimmed line.
///
/// Any line containing `:` is a directive, even when it was meant as an
/// expression.
pub fn classify(line: &str) -> LineKind<'_> {
	if line.is_empty() || line == OPEN_FENCE {
		return LineKind::Boundary;
	}

	if line == CLOSE_FENCE {
		return LineKind::CloseFence;
	}

	if let Some((key, rest)) = line.split_once(':') {
		let value = rest.split_once(':').map_or(rest, |(value, _)| value);
		return LineKind::Config {
			key: key.trim(),
			value: value.trim(),
		};
	}

	let trimmed = line.trim();
	if trimmed.starts_with('#') || trimmed.starts_with("//") {
		return LineKind::Comment;
	}

	let (sign, expression) = strip_marker(line);
	LineKind::Expression { sign, expression }
}

/// Split an expression line into its accumulation sign and the bare
/// expression.
///
/// The inline marker (`=`, `+=`, `-=`) is removed when present. Otherwise a
/// leading `+` or `-` acts as the marker, so `-5` subtracts `5` from the
/// total.
pub fn strip_marker(line: &str) -> (Sign, &str) {
	if let Some(captures) = INLINE_MATH.captures(line) {
		let sign = captures.get(1).map_or(Sign::Plus, |marker| Sign::from_marker(marker.as_str()));
		let marker_len = captures.get(1).map_or(0, |marker| marker.len()) + 1;
		return (sign, &line[marker_len..]);
	}

	let trimmed = line.trim_start();
	match trimmed.chars().next() {
		Some('-') => (Sign::Minus, &trimmed[1..]),
		Some('+') => (Sign::Plus, &trimmed[1..]),
		_ => (Sign::Plus, line),
	}
}
