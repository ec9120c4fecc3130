use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc;

use clap::Parser;
use litmath_cli::Commands;
use litmath_cli::LitmathCli;
use litmath_cli::OutputFormat;
use litmath_core::AnnotateOptions;
use litmath_core::Debouncer;
use litmath_core::ExchangeRates;
use litmath_core::FileRateSource;
use litmath_core::LitmathConfig;
use litmath_core::ProcessedDocument;
use litmath_core::RatesFormat;
use litmath_core::Session;
use litmath_core::annotate;
use litmath_core::load_exchange_rates;
use litmath_core::trim::trim;
use owo_colors::OwoColorize;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_NOTE: &str = "# Groceries\n\n```math\napples = 3 * 0.5\nbread = 2.25\ntotal\n```\n\n= \
                           1 km to m\n";

const SAMPLE_CONFIG: &str = "# litmath configuration\n\n# Settings every note starts from. Notes \
                             can override them with `key: value` lines.\n[settings]\nprecision = \
                             8\nnotation = \"auto\"\nverbose = true\ncurrency = true\n\n# \
                             Exchange rates for currency units (ECB daily XML or JSON).\n# \
                             [rates]\n# path = \"eurofxref-daily.xml\"\n\n[watch]\ndebounce_ms = \
                             300\n";

fn main() {
	let args = LitmathCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Eval {
			file,
			format,
			watch,
			width,
			rates,
		}) => run_eval(&args, file, *format, *watch, *width, rates.as_deref()),
		Some(Commands::Rates { file, format }) => run_rates(file, format.as_deref()),
		Some(Commands::Config) => run_config(&args),
		Some(Commands::Trim { file }) => run_trim(&args, file),
		None => {
			eprintln!("No subcommand specified. Run `litmath --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<litmath_core::MathError>() {
			Ok(math_err) => {
				let report: miette::Report = (*math_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr so that stdout only carries results. `--verbose` shows
/// debug events, otherwise `RUST_LOG` decides and defaults to warnings.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &LitmathCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(root: &Path) -> Result<LitmathConfig, Box<dyn std::error::Error>> {
	Ok(LitmathConfig::load(root)?.unwrap_or_default())
}

fn print_section(title: &str) {
	println!();
	println!("{}", colored!(title, bold));
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("{label:<12} {value}");
}

fn is_stdin(file: &Path) -> bool {
	file.as_os_str() == "-"
}

fn read_input(file: &Path) -> std::io::Result<String> {
	if is_stdin(file) {
		let mut text = String::new();
		std::io::stdin().read_to_string(&mut text)?;
		return Ok(text);
	}

	std::fs::read_to_string(file)
}

fn run_init(args: &LitmathCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let note_path = root.join("note.md");
	let config_path = root.join("litmath.toml");

	let note_exists = note_path.exists();

	if note_exists {
		println!("Note already exists: {}", note_path.display());
	} else {
		std::fs::write(&note_path, SAMPLE_NOTE)?;
		println!("{} {}", colored!("Created note:", green), note_path.display());
	}

	if config_path.exists() {
		println!("Config already exists: {}", config_path.display());
	} else {
		std::fs::write(&config_path, SAMPLE_CONFIG)?;
		println!("{} litmath.toml", colored!("Created", green));
	}

	if !note_exists {
		println!();
		println!("Next steps:");
		println!("  1. Write math in {} between ```math fences", note_path.display());
		println!("  2. Run `litmath eval note.md` to see the results");
		println!("  3. Run `litmath eval note.md --watch` while you edit");
	}

	Ok(())
}

/// The rate file from `--rates`, falling back to `[rates]` in the config.
fn rate_source(
	root: &Path,
	config: &LitmathConfig,
	rates: Option<&Path>,
) -> Result<Option<FileRateSource>, Box<dyn std::error::Error>> {
	if let Some(path) = rates {
		return Ok(Some(FileRateSource::new(path)));
	}

	let Some(rates) = &config.rates else {
		return Ok(None);
	};
	let source = FileRateSource::new(root.join(&rates.path));

	match &rates.format {
		Some(name) => Ok(Some(source.with_format(RatesFormat::from_name(name)?))),
		None => Ok(Some(source)),
	}
}

fn run_eval(
	args: &LitmathCli,
	file: &Path,
	format: OutputFormat,
	watch: bool,
	width: usize,
	rates: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
	if watch && is_stdin(file) {
		return Err("`--watch` needs a file to watch, not stdin".into());
	}

	let root = resolve_root(args);
	let config = load_config(&root)?;
	let runtime = Runtime::new()?;
	let mut session = Session::new(config.global_config());

	if let Some(source) = rate_source(&root, &config, rates)? {
		let exchange_rates = runtime.block_on(load_exchange_rates(&source));
		session.install_rates(&exchange_rates)?;
	}

	let options = AnnotateOptions { width };
	evaluate_file(&mut session, file, format, &options)?;

	if !watch {
		return Ok(());
	}

	watch_file(&runtime, &config, session, file, format, options)
}

fn evaluate_file(
	session: &mut Session,
	file: &Path,
	format: OutputFormat,
	options: &AnnotateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
	let text = read_input(file)?;
	let document = session.process(&text);
	println!("{}", render(&document, format, options)?);

	Ok(())
}

fn render(
	document: &ProcessedDocument,
	format: OutputFormat,
	options: &AnnotateOptions,
) -> Result<String, serde_json::Error> {
	match format {
		OutputFormat::Text => Ok(annotate(document, options)),
		OutputFormat::Json => serde_json::to_string_pretty(&document.data),
	}
}

/// Evaluate `file` again whenever it changes. Bursts of events collapse into
/// a single pass after the configured quiet period.
fn watch_file(
	runtime: &Runtime,
	config: &LitmathConfig,
	session: Session,
	file: &Path,
	format: OutputFormat,
	options: AnnotateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
	println!(
		"\nWatching {} for changes... (press Ctrl+C to stop)",
		file.display()
	);

	// Editors often save by replacing the file, so the directory is watched.
	let target = file.canonicalize()?;
	let directory = target
		.parent()
		.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
	let file_name = target.file_name().map(ToOwned::to_owned);

	let (tx, rx) = mpsc::channel();
	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) && event
					.paths
					.iter()
					.any(|path| path.file_name() == file_name.as_deref())
				{
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&directory, notify::RecursiveMode::NonRecursive)?;

	let debouncer = Debouncer::new(runtime.handle().clone(), config.debounce());
	let session = Arc::new(Mutex::new(session));

	loop {
		rx.recv()?;

		let session = Arc::clone(&session);
		let target = target.clone();
		debouncer.schedule(move || {
			println!("\nFile change detected, evaluating...");
			let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
			if let Err(e) = evaluate_file(&mut session, &target, format, &options) {
				eprintln!("{} {e}", colored!("error:", red));
			}
		});
	}
}

fn run_rates(file: &Path, format: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
	let format = format.map(RatesFormat::from_name).transpose()?;
	let rates = ExchangeRates::load(file, format)?;

	println!("{}", colored!("Exchange rates", bold));
	print_field("Base", &rates.base);
	if let Some(date) = &rates.date {
		print_field("Date", date);
	}
	print_field("Currencies", rates.rates.len());

	if rates.is_empty() {
		println!(
			"{} no currencies found in {}",
			colored!("warning:", yellow),
			file.display()
		);
		return Ok(());
	}

	print_section("Rates");
	for (code, rate) in &rates.rates {
		println!("  {code:<6} {rate}");
	}

	Ok(())
}

fn run_config(args: &LitmathCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config_path = LitmathConfig::resolve_path(&root);
	let config = load_config(&root)?;

	println!("{}", colored!("litmath config", bold));
	print_field(
		"File",
		config_path.map_or_else(
			|| "(none, using defaults)".to_string(),
			|path| make_relative(&path, &root),
		),
	);
	print_field(
		"Rates",
		config
			.rates_path(&root)
			.map_or_else(|| "(none)".to_string(), |path| make_relative(&path, &root)),
	);
	print_field("Debounce", format!("{}ms", config.watch.debounce_ms));

	print_section("Settings");
	println!("{}", serde_json::to_string_pretty(&config.global_config())?);

	Ok(())
}

fn run_trim(args: &LitmathCli, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let text = read_input(file)?;

	let lines: Vec<&str> = text.lines().collect();
	let allow_inline = config.global_config().inlinesyntax.is_truthy();
	println!("{}", trim(&lines, allow_inline).join("\n"));

	Ok(())
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
