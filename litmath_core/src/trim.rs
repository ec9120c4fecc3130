use std::sync::LazyLock;

use regex::Regex;

/// Canonical opening fence written by [`trim`].
pub const OPEN_FENCE: &str = "```math";
/// Canonical closing fence written by [`trim`].
pub const CLOSE_FENCE: &str = "```";

/// `=`, optionally signed, at the start of a line and followed by something
/// that can start an expression.
pub(crate) static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([+-])?=( *[0-9a-zA-Z\[(\-+])").unwrap()
});

static OPEN_FENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^`{3,}math$").unwrap()
});

static CLOSE_FENCE_LINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^`{3,}$").unwrap());

/// Whether `line` is an inline math line such as `= 5 + 3` or `-= 2`.
pub fn is_inline_math(line: &str) -> bool {
	INLINE_MATH.is_match(line)
}

pub fn is_open_fence(line: &str) -> bool {
	OPEN_FENCE_LINE.is_match(line.trim())
}

pub fn is_close_fence(line: &str) -> bool {
	CLOSE_FENCE_LINE.is_match(line.trim())
}

/// Keep only the lines that take part in evaluation.
///
/// The result has the same length as `lines`. Fenced block interiors are
/// kept verbatim with their fences rewritten to [`OPEN_FENCE`] and
/// [`CLOSE_FENCE`], inline math lines are kept when `allow_inline` is set,
/// and everything else becomes an empty string.
///
/// A block that is never closed does not swallow the rest of the document:
/// its lines are blanked again, back to its opening fence.
pub fn trim<S: AsRef<str>>(lines: &[S], allow_inline: bool) -> Vec<String> {
	let mut trimmed: Vec<String> = lines.iter().map(|line| line.as_ref().to_string()).collect();
	let mut in_block = false;

	for line in &mut trimmed {
		if line.is_empty() {
			continue;
		}

		if allow_inline && is_inline_math(line) {
			continue;
		}

		if in_block && is_close_fence(line) {
			in_block = false;
			*line = CLOSE_FENCE.to_string();
			continue;
		}

		if is_open_fence(line) {
			in_block = true;
			*line = OPEN_FENCE.to_string();
		}

		if !in_block {
			line.clear();
		}
	}

	if in_block {
		erase_to_start(&mut trimmed, allow_inline);
	}

	trimmed
}

/// Blank lines from the end of the document back to the last opening fence,
/// keeping inline math lines.
fn erase_to_start(lines: &mut [String], allow_inline: bool) {
	for line in lines.iter_mut().rev() {
		if line.is_empty() {
			continue;
		}

		if line.trim() == OPEN_FENCE {
			break;
		}

		if !(allow_inline && is_inline_math(line)) {
			line.clear();
		}
	}
}
