use miette::Diagnostic;
use thiserror::Error;

/// Errors raised outside of per-line evaluation: loading configuration,
/// talking to the host, reading exchange rates.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MathError {
	#[error(transparent)]
	#[diagnostic(code(litmath::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(litmath::config_parse),
		help("check that litmath.toml is valid TOML with [settings], [rates] and/or [watch] sections")
	)]
	ConfigParse(String),

	#[error("configuration was not available after {attempts} attempt(s)")]
	#[diagnostic(
		code(litmath::config_timeout),
		help("the host never answered the configuration request; math processing cannot start without it")
	)]
	ConfigTimeout { attempts: u32 },

	#[error("failed to parse exchange rates: {0}")]
	#[diagnostic(
		code(litmath::rates_parse),
		help("supported rate files: the ECB daily XML feed or JSON `{{\"base\": ..., \"rates\": {{...}}}}`")
	)]
	RatesParse(String),

	#[error("unsupported exchange rate format: `{0}`")]
	#[diagnostic(code(litmath::unsupported_rates_format), help("supported formats: xml, json"))]
	UnsupportedRatesFormat(String),

	#[error("failed to install currency `{code}`: {reason}")]
	#[diagnostic(code(litmath::currency))]
	Currency { code: String, reason: String },
}

/// Errors produced by the expression engine while parsing or evaluating a
/// single line. The `Display` text is what ends up in a line's result.
#[derive(Debug, Clone, Diagnostic, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvalError {
	#[error("Unexpected end of expression (char {0})")]
	#[diagnostic(code(litmath::eval::unexpected_end))]
	UnexpectedEnd(usize),

	#[error("Unexpected \"{token}\" (char {position})")]
	#[diagnostic(code(litmath::eval::unexpected_token))]
	UnexpectedToken { token: String, position: usize },

	#[error("Parenthesis ) expected (char {0})")]
	#[diagnostic(code(litmath::eval::missing_paren))]
	MissingParen(usize),

	#[error("Invalid left hand side of assignment (char {0})")]
	#[diagnostic(code(litmath::eval::invalid_assignment))]
	InvalidAssignment(usize),

	#[error("Undefined symbol {0}")]
	#[diagnostic(code(litmath::eval::undefined_symbol))]
	UndefinedSymbol(String),

	#[error("Undefined function {0}")]
	#[diagnostic(code(litmath::eval::undefined_function))]
	UndefinedFunction(String),

	#[error("Cannot create unit \"{name}\": {reason}")]
	#[diagnostic(code(litmath::eval::unit_creation))]
	UnitCreation { name: String, reason: String },

	#[error("Unit \"{0}\" not found")]
	#[diagnostic(code(litmath::eval::unknown_unit))]
	UnknownUnit(String),

	#[error("Units do not match ({left} and {right})")]
	#[diagnostic(code(litmath::eval::unit_mismatch))]
	UnitMismatch { left: String, right: String },

	#[error("Unexpected type of argument in function {function} (expected: {expected}, actual: {actual})")]
	#[diagnostic(code(litmath::eval::argument_type))]
	ArgumentType {
		function: String,
		expected: String,
		actual: String,
	},

	#[error("Wrong number of arguments in function {function} (expected: {expected}, actual: {actual})")]
	#[diagnostic(code(litmath::eval::argument_count))]
	ArgumentCount {
		function: String,
		expected: String,
		actual: usize,
	},

	#[error("Cannot apply operator {operator} to {left} and {right}")]
	#[diagnostic(code(litmath::eval::type_mismatch))]
	TypeMismatch {
		operator: String,
		left: String,
		right: String,
	},

	#[error("Precision must be between 0 and {max} (got {value})")]
	#[diagnostic(code(litmath::eval::precision_range))]
	PrecisionRange { value: String, max: usize },

	#[error("Expression is nested too deeply (more than {0} levels)")]
	#[diagnostic(code(litmath::eval::nesting_depth))]
	NestingDepth(usize),

	#[error("Maximum call depth of {0} exceeded")]
	#[diagnostic(code(litmath::eval::call_depth))]
	CallDepth(usize),
}

impl EvalError {
	/// Unit creation failures mean "unit not available yet" (for example a
	/// currency before rates are installed) rather than a real fault.
	pub fn is_unit_creation(&self) -> bool {
		matches!(self, Self::UnitCreation { .. })
	}
}

pub type MathResult<T> = Result<T, MathError>;
pub type EvalResult<T> = Result<T, EvalError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
