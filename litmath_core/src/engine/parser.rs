use super::lexer::Spanned;
use super::lexer::Token;
use super::lexer::char_position;
use super::lexer::tokenize;
use super::node::BinaryOp;
use super::node::Node;
use super::node::UnaryOp;
use crate::EvalError;
use crate::EvalResult;

/// Words with a grammatical meaning that can never be symbols.
const KEYWORDS: [&str; 3] = ["to", "in", "mod"];

/// Deepest expression tree the parser builds. Operator chains count one
/// level per operator, like nested parentheses.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Parse a single expression.
///
/// Grammar, lowest precedence first:
///
/// ```text
/// assignment     = relational [ "=" assignment ]
/// relational     = conversion { ("==" | "!=" | "<" | "<=" | ">" | ">=") conversion }
/// conversion     = additive { ("to" | "in") multiplicative }
/// additive       = multiplicative { ("+" | "-") multiplicative }
/// multiplicative = unary { ("*" | "/" | "%" | "mod") unary | implicit unary }
/// unary          = ("-" | "+") unary | power
/// power          = postfix [ "^" unary ]
/// postfix        = primary { "!" }
/// primary        = number | symbol | call | "(" assignment ")"
/// ```
pub fn parse(source: &str) -> EvalResult<Node> {
	let tokens = tokenize(source)?;
	let mut parser = Parser {
		source,
		tokens,
		cursor: 0,
		depth: 0,
	};

	let node = parser.parse_assignment()?;
	if let Some(spanned) = parser.peek() {
		return Err(parser.unexpected(spanned));
	}

	Ok(node)
}

struct Parser<'a> {
	source: &'a str,
	tokens: Vec<Spanned>,
	cursor: usize,
	depth: usize,
}

impl Parser<'_> {
	fn peek(&self) -> Option<&Spanned> {
		self.tokens.get(self.cursor)
	}

	fn peek_token(&self) -> Option<Token> {
		self.peek().map(|spanned| spanned.token)
	}

	fn next(&mut self) -> Option<Spanned> {
		let spanned = self.tokens.get(self.cursor).cloned();
		if spanned.is_some() {
			self.cursor += 1;
		}
		spanned
	}

	fn text(&self, spanned: &Spanned) -> &str {
		&self.source[spanned.span.clone()]
	}

	fn peek_keyword(&self, keywords: &[&str]) -> bool {
		self.peek().is_some_and(|spanned| {
			spanned.token == Token::Ident && keywords.contains(&self.text(spanned))
		})
	}

	fn end_position(&self) -> usize {
		self.source.chars().count() + 1
	}

	fn unexpected(&self, spanned: &Spanned) -> EvalError {
		EvalError::UnexpectedToken {
			token: self.text(spanned).to_string(),
			position: char_position(self.source, spanned.span.start),
		}
	}

	/// Enter one more level of the tree.
	fn descend(&mut self) -> EvalResult<()> {
		self.depth += 1;
		if self.depth > MAX_PARSE_DEPTH {
			return Err(EvalError::NestingDepth(MAX_PARSE_DEPTH));
		}

		Ok(())
	}

	fn parse_assignment(&mut self) -> EvalResult<Node> {
		let start = self.peek().map_or(self.source.len(), |spanned| spanned.span.start);
		let target = self.parse_relational()?;

		if self.peek_token() != Some(Token::Assign) {
			return Ok(target);
		}
		self.next();
		self.descend()?;
		let value = self.parse_assignment()?;
		self.depth -= 1;

		match target {
			Node::Symbol(name) => {
				Ok(Node::Assign {
					name,
					value: Box::new(value),
				})
			}
			Node::Call { name, args } => {
				let params = args
					.into_iter()
					.map(|arg| {
						match arg {
							Node::Symbol(param) => Some(param),
							_ => None,
						}
					})
					.collect::<Option<Vec<_>>>()
					.ok_or_else(|| {
						EvalError::InvalidAssignment(char_position(self.source, start))
					})?;

				Ok(Node::FunctionAssign {
					name,
					params,
					body: Box::new(value),
				})
			}
			_ => Err(EvalError::InvalidAssignment(char_position(self.source, start))),
		}
	}

	fn parse_relational(&mut self) -> EvalResult<Node> {
		let base = self.depth;
		let mut node = self.parse_conversion()?;

		loop {
			let op = match self.peek_token() {
				Some(Token::Equal) => BinaryOp::Eq,
				Some(Token::NotEqual) => BinaryOp::Ne,
				Some(Token::Less) => BinaryOp::Lt,
				Some(Token::LessEqual) => BinaryOp::Le,
				Some(Token::Greater) => BinaryOp::Gt,
				Some(Token::GreaterEqual) => BinaryOp::Ge,
				_ => break,
			};
			self.next();
			self.descend()?;
			node = Node::binary(op, node, self.parse_conversion()?);
		}

		self.depth = base;
		Ok(node)
	}

	fn parse_conversion(&mut self) -> EvalResult<Node> {
		let base = self.depth;
		let mut node = self.parse_additive()?;

		while self.peek_keyword(&["to", "in"]) {
			self.next();
			self.descend()?;
			let target = self.parse_multiplicative()?;
			node = Node::Conversion {
				value: Box::new(node),
				target: Box::new(target),
			};
		}

		self.depth = base;
		Ok(node)
	}

	fn parse_additive(&mut self) -> EvalResult<Node> {
		let base = self.depth;
		let mut node = self.parse_multiplicative()?;

		loop {
			let op = match self.peek_token() {
				Some(Token::Plus) => BinaryOp::Add,
				Some(Token::Minus) => BinaryOp::Sub,
				_ => break,
			};
			self.next();
			self.descend()?;
			node = Node::binary(op, node, self.parse_multiplicative()?);
		}

		self.depth = base;
		Ok(node)
	}

	/// Whether the next token can begin an implicitly multiplied operand.
	fn starts_implicit_operand(&self) -> bool {
		match self.peek_token() {
			Some(Token::Number | Token::ParenOpen) => true,
			Some(Token::Ident) => !self.peek_keyword(&KEYWORDS),
			_ => false,
		}
	}

	fn parse_multiplicative(&mut self) -> EvalResult<Node> {
		let base = self.depth;
		let mut node = self.parse_unary()?;

		loop {
			let op = match self.peek_token() {
				Some(Token::Star) => Some(BinaryOp::Mul),
				Some(Token::Slash) => Some(BinaryOp::Div),
				Some(Token::Percent) => Some(BinaryOp::Mod),
				Some(Token::Ident) if self.peek_keyword(&["mod"]) => Some(BinaryOp::Mod),
				_ => None,
			};

			if let Some(op) = op {
				self.next();
				self.descend()?;
				let mut rhs = self.parse_unary()?;

				// `100 km / 2 h` divides by `2 h`.
				if op == BinaryOp::Div
					&& matches!(rhs, Node::Constant(_))
					&& self.peek_token() == Some(Token::Ident)
					&& !self.peek_keyword(&KEYWORDS)
				{
					self.descend()?;
					rhs = Node::Binary {
						op: BinaryOp::Mul,
						lhs: Box::new(rhs),
						rhs: Box::new(self.parse_unary()?),
						implicit: true,
					};
				}

				node = Node::binary(op, node, rhs);
			} else if self.starts_implicit_operand() {
				self.descend()?;
				node = Node::Binary {
					op: BinaryOp::Mul,
					lhs: Box::new(node),
					rhs: Box::new(self.parse_unary()?),
					implicit: true,
				};
			} else {
				self.depth = base;
				return Ok(node);
			}
		}
	}

	fn parse_unary(&mut self) -> EvalResult<Node> {
		let op = match self.peek_token() {
			Some(Token::Minus) => UnaryOp::Neg,
			Some(Token::Plus) => UnaryOp::Plus,
			_ => return self.parse_power(),
		};
		self.next();
		self.descend()?;
		let operand = self.parse_unary()?;
		self.depth -= 1;

		Ok(Node::unary(op, operand))
	}

	fn parse_power(&mut self) -> EvalResult<Node> {
		let base = self.parse_postfix()?;

		if self.peek_token() != Some(Token::Caret) {
			return Ok(base);
		}
		self.next();
		self.descend()?;
		let exponent = self.parse_unary()?;
		self.depth -= 1;

		Ok(Node::binary(BinaryOp::Pow, base, exponent))
	}

	fn parse_postfix(&mut self) -> EvalResult<Node> {
		let base = self.depth;
		let mut node = self.parse_primary()?;

		while self.peek_token() == Some(Token::Bang) {
			self.next();
			self.descend()?;
			node = Node::unary(UnaryOp::Factorial, node);
		}

		self.depth = base;
		Ok(node)
	}

	fn parse_primary(&mut self) -> EvalResult<Node> {
		let Some(spanned) = self.next() else {
			return Err(EvalError::UnexpectedEnd(self.end_position()));
		};

		match spanned.token {
			Token::Number => Ok(Node::Constant(self.text(&spanned).to_string())),
			// `mod(a, b)` is still a call.
			Token::Ident
				if KEYWORDS.contains(&self.text(&spanned))
					&& !(self.text(&spanned) == "mod" && self.peek_token() == Some(Token::ParenOpen)) =>
			{
				Err(self.unexpected(&spanned))
			}
			Token::Ident => {
				let name = self.text(&spanned).to_string();
				if self.peek_token() == Some(Token::ParenOpen) {
					self.next();
					self.descend()?;
					let args = self.parse_arguments()?;
					self.depth -= 1;
					return Ok(Node::Call { name, args });
				}

				Ok(Node::Symbol(name))
			}
			Token::ParenOpen => {
				self.descend()?;
				let inner = self.parse_assignment()?;
				self.expect_close_paren()?;
				self.depth -= 1;
				Ok(Node::Parens(Box::new(inner)))
			}
			_ => Err(self.unexpected(&spanned)),
		}
	}

	fn parse_arguments(&mut self) -> EvalResult<Vec<Node>> {
		let mut args = Vec::new();
		if self.peek_token() == Some(Token::ParenClose) {
			self.next();
			return Ok(args);
		}

		loop {
			args.push(self.parse_relational()?);
			if self.peek_token() == Some(Token::Comma) {
				self.next();
				continue;
			}

			self.expect_close_paren()?;
			return Ok(args);
		}
	}

	fn expect_close_paren(&mut self) -> EvalResult<()> {
		match self.peek() {
			Some(spanned) if spanned.token == Token::ParenClose => {
				self.next();
				Ok(())
			}
			Some(spanned) => {
				Err(EvalError::MissingParen(char_position(
					self.source,
					spanned.span.start,
				)))
			}
			None => Err(EvalError::MissingParen(self.end_position())),
		}
	}
}
