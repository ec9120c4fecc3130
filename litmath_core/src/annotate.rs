use crate::process::ExpressionLine;
use crate::process::LineData;
use crate::process::ProcessedDocument;

/// Placed between an expression and its result.
pub const RESULT_SEPARATOR: &str = " => ";
/// Placed before a result whose expression is hidden.
pub const RESULT_COLLAPSED: &str = " |> ";

/// Layout of [`annotate`]d documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotateOptions {
	/// Column that right aligned results end at.
	pub width: usize,
}

impl Default for AnnotateOptions {
	fn default() -> Self {
		Self { width: 60 }
	}
}

/// The marker and text shown for an expression, such as ` => 12`. `None`
/// when the result is hidden.
pub fn render_result(line: &ExpressionLine) -> Option<String> {
	if line.result_hidden {
		return None;
	}

	let marker = if line.input_hidden {
		RESULT_COLLAPSED
	} else {
		RESULT_SEPARATOR
	};
	let result = if line.displaytotal && !line.result.contains("total") {
		&line.total
	} else {
		&line.result
	};

	Some(format!("{marker}{result}"))
}

/// Render a processed document as plain text with results written next to
/// (or below) their expressions.
///
/// Lines without math data are copied unchanged. An expression whose input
/// and result are both hidden disappears.
pub fn annotate(document: &ProcessedDocument, options: &AnnotateOptions) -> String {
	let mut output = Vec::with_capacity(document.lines.len());

	for (index, input) in document.lines.iter().enumerate() {
		match document.data.get(index).and_then(Option::as_ref) {
			Some(LineData::Expression(line)) => annotate_line(input, line, options, &mut output),
			Some(LineData::Config) | None => output.push(input.clone()),
		}
	}

	output.join("\n")
}

fn annotate_line(input: &str, line: &ExpressionLine, options: &AnnotateOptions, output: &mut Vec<String>) {
	let result = render_result(line);
	let shown_input = if line.input_hidden { "" } else { input };

	match result {
		None if line.input_hidden => {}
		None => output.push(input.to_string()),
		Some(result) if line.inline => output.push(place(shown_input, &result, line.align_right, options)),
		Some(result) => {
			if !line.input_hidden {
				output.push(input.to_string());
			}
			output.push(place("", &result, line.align_right, options));
		}
	}
}

/// `result` after `prefix`, pushed right so that it ends at
/// `options.width` when `align_right` is set and there is room.
fn place(prefix: &str, result: &str, align_right: bool, options: &AnnotateOptions) -> String {
	if !align_right {
		return format!("{prefix}{result}");
	}

	let used = prefix.chars().count() + result.chars().count();
	let padding = options.width.saturating_sub(used);
	format!("{prefix}{}{result}", " ".repeat(padding))
}
