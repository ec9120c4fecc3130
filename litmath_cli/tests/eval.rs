mod common;

use clap::Parser;
use litmath_cli::Commands;
use litmath_cli::LitmathCli;
use litmath_cli::OutputFormat;
use litmath_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use similar_asserts::assert_eq;

const RATES_JSON: &str = r#"{"base": "EUR", "date": "2024-06-14", "rates": {"USD": 1.071, "GBP": 0.84498}}"#;

#[test]
fn eval_annotates_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let note = tmp.path().join("note.md");
	std::fs::write(&note, "Budget\n```math\na = 2\nb = a * 3\ntotal\n```\n")?;

	let output = common::litmath_cmd()
		.arg("eval")
		.arg(&note)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	assert_eq!(
		String::from_utf8(output)?,
		"Budget\n```math\na = 2 => a: 2\nb = a * 3 => b: 6\ntotal => 8\n```\n\n"
	);

	Ok(())
}

#[test]
fn eval_reads_stdin() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("= 2 ^ 10\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("= 2 ^ 10 => 1024"));

	Ok(())
}

#[test]
fn eval_json_has_one_entry_per_line() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let output = common::litmath_cmd()
		.arg("eval")
		.arg("-")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("```math\nhide: result\n1 + 1\n```")
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let data: Value = serde_json::from_slice(&output)?;
	let entries = data.as_array().ok_or("expected a JSON array")?;
	assert_eq!(entries.len(), 4);
	assert!(entries[0].is_null());
	assert_eq!(entries[1]["type"], "config");
	assert_eq!(entries[2]["type"], "expression");
	assert_eq!(entries[2]["result"], "2");
	assert_eq!(entries[2]["resultHidden"], Value::Bool(true));
	assert_eq!(entries[2]["inputHidden"], Value::Bool(false));
	assert!(entries[3].is_null());

	Ok(())
}

#[test]
fn eval_uses_settings_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("litmath.toml"),
		"[settings]\nprecision = 3\nverbose = false\n",
	)?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("= x = 1 / 3\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("= x = 1 / 3 => 0.333"))
		.stdout(predicates::str::contains("x:").not());

	Ok(())
}

#[test]
fn eval_installs_currency_rates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let rates = tmp.path().join("rates.json");
	std::fs::write(&rates, RATES_JSON)?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.arg("--rates")
		.arg(&rates)
		.write_stdin("= 10 EUR to USD\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("= 10 EUR to USD => 10.71 USD"));

	Ok(())
}

#[test]
fn eval_reads_rates_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("fx.json"), RATES_JSON)?;
	std::fs::write(
		tmp.path().join("litmath.toml"),
		"[rates]\npath = \"fx.json\"\nformat = \"json\"\n",
	)?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("= 10 EUR to USD\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("=> 10.71 USD"));

	Ok(())
}

#[test]
fn currencies_without_rates_show_no_result() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("= 5 USD\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("= 5 USD"))
		.stdout(predicates::str::contains("=>").not());

	Ok(())
}

#[test]
fn unreadable_rates_are_skipped_with_a_warning() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.arg("--rates")
		.arg(tmp.path().join("missing.xml"))
		.write_stdin("= 1 + 1\n")
		.assert()
		.success()
		.stdout(predicates::str::contains("= 1 + 1 => 2"))
		.stderr(predicates::str::contains("failed to load exchange rates"));

	Ok(())
}

#[test]
fn eval_fails_for_missing_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("eval")
		.arg(tmp.path().join("missing.md"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("error:"));

	Ok(())
}

#[test]
fn eval_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("litmath.toml"), "[settings\n")?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("= 1\n")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse config file"));

	Ok(())
}

#[test]
fn watch_requires_a_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("eval")
		.arg("--watch")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("`--watch` needs a file"));

	Ok(())
}

#[test]
fn eval_defaults() {
	let cli = LitmathCli::parse_from(["litmath", "eval"]);
	match cli.command {
		Some(Commands::Eval {
			file,
			format,
			watch,
			width,
			rates,
		}) => {
			assert_eq!(file.to_str(), Some("-"));
			assert!(matches!(format, OutputFormat::Text));
			assert!(!watch);
			assert_eq!(width, 60);
			assert!(rates.is_none());
		}
		_ => panic!("expected Eval command"),
	}
}

#[test]
fn eval_accepts_watch_and_json() {
	let cli = LitmathCli::parse_from(["litmath", "eval", "note.md", "--watch", "--format", "json"]);
	match cli.command {
		Some(Commands::Eval {
			file,
			format,
			watch,
			..
		}) => {
			assert_eq!(file.to_str(), Some("note.md"));
			assert!(matches!(format, OutputFormat::Json));
			assert!(watch);
		}
		_ => panic!("expected Eval command"),
	}
}
