use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
	/// `-x`
	Neg,
	/// `+x`
	Plus,
	/// `x!`
	Factorial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Pow,
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}

impl BinaryOp {
	pub fn symbol(self) -> &'static str {
		match self {
			Self::Add => "+",
			Self::Sub => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
			Self::Pow => "^",
			Self::Eq => "==",
			Self::Ne => "!=",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
		}
	}

	pub fn is_relational(self) -> bool {
		matches!(
			self,
			Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
		)
	}

	fn precedence(self) -> u8 {
		match self {
			Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 1,
			Self::Add | Self::Sub => 3,
			Self::Mul | Self::Div | Self::Mod => 4,
			Self::Pow => 6,
		}
	}
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	/// A number literal, kept as written so it can be read in either numeric
	/// mode.
	Constant(String),
	Symbol(String),
	Unary {
		op: UnaryOp,
		operand: Box<Node>,
	},
	Binary {
		op: BinaryOp,
		lhs: Box<Node>,
		rhs: Box<Node>,
		/// Written without an operator, as in `5 km` or `2x`.
		implicit: bool,
	},
	Call {
		name: String,
		args: Vec<Node>,
	},
	/// `value to target` or `value in target`.
	Conversion {
		value: Box<Node>,
		target: Box<Node>,
	},
	Parens(Box<Node>),
	Assign {
		name: String,
		value: Box<Node>,
	},
	FunctionAssign {
		name: String,
		params: Vec<String>,
		body: Box<Node>,
	},
}

impl Node {
	pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
		Self::Binary {
			op,
			lhs: Box::new(lhs),
			rhs: Box::new(rhs),
			implicit: false,
		}
	}

	pub fn unary(op: UnaryOp, operand: Node) -> Self {
		Self::Unary {
			op,
			operand: Box::new(operand),
		}
	}

	/// Levels in the tree, a leaf being one.
	pub fn depth(&self) -> usize {
		let below = match self {
			Self::Constant(_) | Self::Symbol(_) => 0,
			Self::Unary { operand: inner, .. }
			| Self::Parens(inner)
			| Self::Assign { value: inner, .. }
			| Self::FunctionAssign { body: inner, .. } => inner.depth(),
			Self::Binary { lhs, rhs, .. }
			| Self::Conversion {
				value: lhs,
				target: rhs,
			} => lhs.depth().max(rhs.depth()),
			Self::Call { args, .. } => args.iter().map(Self::depth).max().unwrap_or(0),
		};

		below + 1
	}

	/// Visit this node and every descendant, parents first.
	pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
		visit(self);
		match self {
			Self::Constant(_) | Self::Symbol(_) => {}
			Self::Unary { operand, .. } => operand.walk(visit),
			Self::Binary { lhs, rhs, .. } => {
				lhs.walk(visit);
				rhs.walk(visit);
			}
			Self::Call { args, .. } => {
				for arg in args {
					arg.walk(visit);
				}
			}
			Self::Conversion { value, target } => {
				value.walk(visit);
				target.walk(visit);
			}
			Self::Parens(inner) => inner.walk(visit),
			Self::Assign { value, .. } => value.walk(visit),
			Self::FunctionAssign { body, .. } => body.walk(visit),
		}
	}

	/// Whether `name` appears anywhere in the tree as a symbol, an assignment
	/// target or a called function.
	pub fn contains_symbol(&self, name: &str) -> bool {
		let mut found = false;
		self.walk(&mut |node| {
			found |= match node {
				Self::Symbol(symbol) => symbol == name,
				Self::Assign { name: target, .. }
				| Self::FunctionAssign { name: target, .. }
				| Self::Call { name: target, .. } => target == name,
				_ => false,
			};
		});

		found
	}

	/// Whether any assignment in the tree writes to `name`.
	pub fn assigns(&self, name: &str) -> bool {
		let mut found = false;
		self.walk(&mut |node| {
			found |= matches!(
				node,
				Self::Assign { name: target, .. } | Self::FunctionAssign { name: target, .. }
				if target == name
			);
		});

		found
	}

	/// The name bound by a top level assignment.
	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Assign { name, .. } | Self::FunctionAssign { name, .. } => Some(name),
			_ => None,
		}
	}

	fn precedence(&self) -> u8 {
		match self {
			Self::Assign { .. } | Self::FunctionAssign { .. } => 0,
			Self::Binary { op, .. } => op.precedence(),
			Self::Conversion { .. } => 2,
			Self::Unary {
				op: UnaryOp::Neg | UnaryOp::Plus,
				..
			} => 5,
			Self::Unary {
				op: UnaryOp::Factorial,
				..
			} => 7,
			Self::Constant(text) if text.starts_with('-') => 5,
			Self::Constant(_) | Self::Symbol(_) | Self::Call { .. } | Self::Parens(_) => 8,
		}
	}
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &Node, wrap: bool) -> fmt::Result {
	if wrap {
		write!(f, "({node})")
	} else {
		write!(f, "{node}")
	}
}

impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let precedence = self.precedence();
		match self {
			Self::Constant(text) | Self::Symbol(text) => f.write_str(text),
			Self::Unary {
				op: UnaryOp::Factorial,
				operand,
			} => {
				write_operand(f, operand, operand.precedence() < precedence)?;
				f.write_str("!")
			}
			Self::Unary { op, operand } => {
				f.write_str(if *op == UnaryOp::Neg { "-" } else { "+" })?;
				write_operand(f, operand, operand.precedence() < precedence)
			}
			Self::Binary {
				op,
				lhs,
				rhs,
				implicit,
			} => {
				let right_associative = *op == BinaryOp::Pow;
				let wrap_lhs = if right_associative {
					lhs.precedence() <= precedence
				} else {
					lhs.precedence() < precedence
				};
				let wrap_rhs = rhs.precedence() < precedence
					|| (!right_associative
						&& rhs.precedence() == precedence
						&& !matches!(op, BinaryOp::Add | BinaryOp::Mul));

				write_operand(f, lhs, wrap_lhs)?;
				if *implicit {
					f.write_str(" ")?;
				} else {
					write!(f, " {} ", op.symbol())?;
				}
				write_operand(f, rhs, wrap_rhs)
			}
			Self::Call { name, args } => {
				write!(f, "{name}(")?;
				for (index, arg) in args.iter().enumerate() {
					if index > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{arg}")?;
				}
				f.write_str(")")
			}
			Self::Conversion { value, target } => {
				write_operand(f, value, value.precedence() < precedence)?;
				f.write_str(" to ")?;
				write_operand(f, target, target.precedence() <= precedence)
			}
			Self::Parens(inner) => write!(f, "({inner})"),
			Self::Assign { name, value } => write!(f, "{name} = {value}"),
			Self::FunctionAssign { name, params, body } => {
				write!(f, "{name}({}) = {body}", params.join(", "))
			}
		}
	}
}
