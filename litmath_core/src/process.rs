use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::trace;

use crate::EvalResult;
use crate::Scope;
use crate::classify::LineKind;
use crate::classify::Sign;
use crate::classify::classify;
use crate::config::GlobalConfig;
use crate::engine::Engine;
use crate::engine::Node;
use crate::engine::Numeric;
use crate::engine::NumericMode;
use crate::engine::Value;
use crate::trim::trim;

/// The name bound to the running total of the current block.
pub const TOTAL: &str = "total";

/// Presentation data for one line that took part in math processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineData {
	/// A `key: value` directive.
	Config,
	/// An evaluated expression.
	Expression(ExpressionLine),
}

impl LineData {
	pub fn as_expression(&self) -> Option<&ExpressionLine> {
		match self {
			Self::Expression(line) => Some(line),
			Self::Config => None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionLine {
	/// The formatted result or an error message. Empty when the line
	/// produced nothing to show.
	pub result: String,
	/// The formatted block total after this line, empty when there is none.
	pub total: String,
	pub displaytotal: bool,
	pub input_hidden: bool,
	pub result_hidden: bool,
	pub inline: bool,
	pub align_right: bool,
	pub copy_button: bool,
}

/// State threaded through [`process_next`] while a document is folded.
#[derive(Debug, Clone)]
pub struct ProcessContext {
	/// Running total of the current block.
	pub total: Option<Value>,
	/// Settings of the current block.
	pub config: GlobalConfig,
	/// Settings every block starts from.
	pub global_config: GlobalConfig,
	pub scope: Scope,
	pub mode: NumericMode,
}

impl ProcessContext {
	pub fn new(global_config: GlobalConfig, scope: Scope) -> Self {
		Self {
			total: None,
			config: global_config.clone(),
			mode: global_config.numeric_mode(),
			global_config,
			scope,
		}
	}
}

/// Process a single trimmed line, updating `ctx`.
///
/// Returns `None` for lines without output: blank lines, fences and
/// comments. Evaluation failures never escape; they become the line's
/// result instead.
pub fn process_next(engine: &Engine, line: &str, ctx: &mut ProcessContext) -> Option<LineData> {
	let data = match classify(line) {
		LineKind::Boundary => {
			ctx.total = None;
			None
		}
		LineKind::CloseFence => {
			ctx.config = ctx.global_config.clone();
			ctx.total = None;
			None
		}
		LineKind::Config { key, value } => {
			trace!(key, value, "config directive");
			ctx.config.set(key, value);
			ctx.mode = ctx.config.numeric_mode();
			Some(LineData::Config)
		}
		LineKind::Comment => None,
		LineKind::Expression { sign, expression } => {
			Some(LineData::Expression(process_expression(
				engine, sign, expression, ctx,
			)))
		}
	};

	if ctx.config.global.is_truthy() {
		ctx.global_config = ctx.config.promoted();
	}

	data
}

fn process_expression(
	engine: &Engine,
	sign: Sign,
	expression: &str,
	ctx: &mut ProcessContext,
) -> ExpressionLine {
	let mode = ctx.mode;
	let block_total = ctx
		.total
		.clone()
		.unwrap_or_else(|| Value::Number(Numeric::zero(mode)));
	let mut local = ctx.scope.seeded_with(TOTAL, block_total.clone());
	let simplify = !ctx.config.simplify.is_falsey();

	let node = engine.parse(expression);
	let contains_total = node.as_ref().is_ok_and(|node| node.contains_symbol(TOTAL));
	let assigns_total = node.as_ref().is_ok_and(|node| node.assigns(TOTAL));

	let outcome = node.and_then(|node| {
		let value = if simplify {
			engine.simplify(&node, mode)?
		} else {
			engine.evaluate(&node, &mut local, mode)?
		};
		Ok((node, value))
	});

	let result = match outcome {
		Ok((node, value)) => {
			if !contains_total {
				if let Some(total) = accumulate(engine, &block_total, sign, &value, &local, mode) {
					ctx.total = Some(total);
				}
			}

			match ctx.config.format_options() {
				Ok(options) => {
					let formatted = engine.format(&value, &options);
					match node.name() {
						Some(name) if ctx.config.verbose.is_truthy() => format!("{name}: {formatted}"),
						_ => formatted,
					}
				}
				Err(error) => error.to_string(),
			}
		}
		Err(error) if error.is_unit_creation() => {
			trace!(%error, "unit not available");
			String::new()
		}
		Err(error) => error.to_string(),
	};

	if !assigns_total {
		local.remove(TOTAL);
	}
	ctx.scope.merge(&local);

	let config = &ctx.config;
	let total = match (ctx.total.as_ref(), config.format_options()) {
		(Some(total), Ok(options)) => engine.format(total, &options),
		_ => String::new(),
	};

	ExpressionLine {
		displaytotal: config.displaytotal.is_truthy() && !contains_total,
		input_hidden: config.hide.as_str() == "expression",
		result_hidden: config.hide.as_str() == "result" || result.is_empty(),
		inline: config.inline.is_truthy(),
		align_right: config.align.as_str() == "right",
		copy_button: config.copy_button.is_truthy(),
		result,
		total,
	}
}

type TotalStrategy = fn(&Value, Sign, &Value) -> EvalResult<Value>;

/// Ways of folding a line's value into the block total, tried in order.
const TOTAL_STRATEGIES: [TotalStrategy; 3] = [combine_with_total, signed_value, bare_value];

fn combine_with_total(total: &Value, sign: Sign, value: &Value) -> EvalResult<Value> {
	total.binary(sign.operator(), value)
}

fn signed_value(_total: &Value, sign: Sign, value: &Value) -> EvalResult<Value> {
	match sign {
		Sign::Plus => Ok(value.clone()),
		Sign::Minus => value.neg(),
	}
}

fn bare_value(_total: &Value, _sign: Sign, value: &Value) -> EvalResult<Value> {
	Ok(value.clone())
}

/// The new block total, or `None` when the value does not take part in
/// totals.
fn accumulate(
	engine: &Engine,
	total: &Value,
	sign: Sign,
	value: &Value,
	local: &Scope,
	mode: NumericMode,
) -> Option<Value> {
	let operand = match value {
		Value::Symbolic(node) => resolve(engine, node, local, mode)?,
		other => other.clone(),
	};

	if !operand.is_numeric() {
		return None;
	}

	TOTAL_STRATEGIES
		.iter()
		.find_map(|strategy| strategy(total, sign, &operand).ok())
}

/// Evaluate a simplified expression against a throwaway copy of `scope`.
fn resolve(engine: &Engine, node: &Node, scope: &Scope, mode: NumericMode) -> Option<Value> {
	let mut scratch = scope.clone();
	engine.evaluate(node, &mut scratch, mode).ok()
}

/// The outcome of a full pass over a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
	/// The input lines, unchanged.
	pub lines: Vec<String>,
	/// One entry per input line.
	pub data: Vec<Option<LineData>>,
	/// The scope after the last line.
	pub scope: Scope,
}

impl ProcessedDocument {
	/// Lines that produced output, with their index.
	pub fn entries(&self) -> impl Iterator<Item = (usize, &LineData)> {
		self.data
			.iter()
			.enumerate()
			.filter_map(|(index, data)| data.as_ref().map(|data| (index, data)))
	}
}

/// Trim and fold every line of a document.
pub fn process_all<S: AsRef<str>>(
	engine: &Engine,
	lines: &[S],
	global_config: &GlobalConfig,
	scope: Scope,
) -> ProcessedDocument {
	let trimmed = trim(lines, global_config.inlinesyntax.is_truthy());
	let mut ctx = ProcessContext::new(global_config.clone(), scope);
	let data: Vec<_> = trimmed
		.iter()
		.map(|line| process_next(engine, line, &mut ctx))
		.collect();

	debug!(
		lines = data.len(),
		math_lines = data.iter().flatten().count(),
		"processed document"
	);

	ProcessedDocument {
		lines: lines.iter().map(|line| line.as_ref().to_string()).collect(),
		data,
		scope: ctx.scope,
	}
}

/// [`process_all`] over text split on newlines.
pub fn process_document(
	engine: &Engine,
	text: &str,
	global_config: &GlobalConfig,
	scope: Scope,
) -> ProcessedDocument {
	let lines: Vec<&str> = text
		.split('\n')
		.map(|line| line.strip_suffix('\r').unwrap_or(line))
		.collect();

	process_all(engine, &lines, global_config, scope)
}
