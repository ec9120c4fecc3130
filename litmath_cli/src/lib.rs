use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Evaluate the math written inside plain text notes.",
	long_about = "litmath evaluates ```math fenced blocks and `=` prefixed lines in plain text \
	              notes. Variables are shared across the whole note and every block keeps a \
	              running `total`.\n\nQuick start:\n  litmath init          Create a sample \
	              note and litmath.toml\n  litmath eval note.md  Print the note with results\n  \
	              litmath eval --watch  Re-evaluate whenever the note changes"
)]
pub struct LitmathCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory, where `litmath.toml` is looked up.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample note and a `litmath.toml` file.
	///
	/// Existing files are left untouched.
	Init,
	/// Evaluate every math line of a note.
	///
	/// Lines inside ```` ```math ```` blocks and lines starting with `=` are
	/// evaluated in order. Everything else is copied to the output unchanged.
	Eval {
		/// The note to evaluate. Use `-` to read from stdin.
		#[arg(default_value = "-")]
		file: PathBuf,

		/// Output format. `text` prints the note with results written next
		/// to each expression, `json` prints one entry per line of the note.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Watch the note and evaluate it again after every change.
		#[arg(long, default_value_t = false)]
		watch: bool,

		/// Column that right aligned results end at.
		#[arg(long, default_value_t = 60)]
		width: usize,

		/// Exchange rate file (ECB XML or JSON). Overrides `[rates]` in
		/// `litmath.toml`.
		#[arg(long)]
		rates: Option<PathBuf>,
	},
	/// Print the currencies found in an exchange rate file.
	Rates {
		/// ECB daily XML or `{"base": ..., "rates": {...}}` JSON.
		file: PathBuf,

		/// `xml` or `json`. Detected from the file when omitted.
		#[arg(long)]
		format: Option<String>,
	},
	/// Print the resolved configuration.
	///
	/// Shows which config file was found and the settings every note
	/// starts from.
	Config,
	/// Print only the lines of a note that are evaluated.
	///
	/// Every other line is blanked so line numbers stay the same.
	Trim {
		/// The note to trim. Use `-` to read from stdin.
		#[arg(default_value = "-")]
		file: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// The note with results written next to or below each expression.
	Text,
	/// JSON output for programmatic consumption. One entry per line of the
	/// note, `null` for lines that are not math.
	Json,
}
