use std::ops::Range;

use logos::Logos;

use crate::EvalError;
use crate::EvalResult;

/// Tokens of the expression language. Whitespace and `#` comments are
/// skipped.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip(r"([ \t\r\n\f]+|#[^\n]*)", allow_greedy = true))]
pub enum Token {
	#[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?")]
	#[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
	Number,
	#[regex(r"[\p{L}_$][\p{L}\p{N}_$]*")]
	Ident,
	#[token("+")]
	Plus,
	#[token("-")]
	Minus,
	#[token("*")]
	Star,
	#[token("/")]
	Slash,
	#[token("%")]
	Percent,
	#[token("^")]
	Caret,
	#[token("!")]
	Bang,
	#[token("=")]
	Assign,
	#[token("==")]
	Equal,
	#[token("!=")]
	NotEqual,
	#[token("<")]
	Less,
	#[token("<=")]
	LessEqual,
	#[token(">")]
	Greater,
	#[token(">=")]
	GreaterEqual,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token(",")]
	Comma,
}

/// A token together with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
	pub token: Token,
	pub span: Range<usize>,
}

/// One based character position of a byte offset, as shown in error
/// messages.
pub(crate) fn char_position(source: &str, offset: usize) -> usize {
	source
		.get(..offset)
		.map_or(offset, |prefix| prefix.chars().count())
		+ 1
}

pub fn tokenize(source: &str) -> EvalResult<Vec<Spanned>> {
	let mut lexer = Token::lexer(source);
	let mut tokens = Vec::new();

	while let Some(result) = lexer.next() {
		let span = lexer.span();
		match result {
			Ok(token) => tokens.push(Spanned { token, span }),
			Err(()) => {
				return Err(EvalError::UnexpectedToken {
					token: lexer.slice().to_string(),
					position: char_position(source, span.start),
				});
			}
		}
	}

	Ok(tokens)
}
