mod common;

use litmath_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;

const ECB_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<Cube>
		<Cube time='2024-06-14'>
			<Cube currency='USD' rate='1.071'/>
			<Cube currency='GBP' rate='0.84498'/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;

#[test]
fn rates_lists_currencies() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let feed = tmp.path().join("eurofxref-daily.xml");
	std::fs::write(&feed, ECB_FEED)?;

	common::litmath_cmd()
		.arg("rates")
		.arg(&feed)
		.assert()
		.success()
		.stdout(predicates::str::contains("Base         EUR"))
		.stdout(predicates::str::contains("Date         2024-06-14"))
		.stdout(predicates::str::contains("Currencies   2"))
		.stdout(predicates::str::contains("USD    1.071"))
		.stdout(predicates::str::contains("GBP    0.84498"));

	Ok(())
}

#[test]
fn rates_warns_about_empty_tables() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("rates.txt");
	std::fs::write(&file, r#"{"base": "USD", "rates": {}}"#)?;

	common::litmath_cmd()
		.arg("rates")
		.arg(&file)
		.arg("--format")
		.arg("json")
		.assert()
		.success()
		.stdout(predicates::str::contains("Base         USD"))
		.stdout(predicates::str::contains("warning: no currencies found"));

	Ok(())
}

#[test]
fn rates_rejects_unknown_formats() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("rates.csv");
	std::fs::write(&file, "USD,1.071")?;

	common::litmath_cmd()
		.arg("rates")
		.arg(&file)
		.arg("--format")
		.arg("csv")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unsupported exchange rate format"));

	Ok(())
}

#[test]
fn rates_reports_broken_feeds() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("broken.xml");
	std::fs::write(&file, "<Envelope></Envelope>")?;

	common::litmath_cmd()
		.arg("rates")
		.arg(&file)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse exchange rates"));

	Ok(())
}

#[test]
fn config_without_file_uses_defaults() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("config")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("(none, using defaults)"))
		.stdout(predicates::str::contains("Debounce     300ms"))
		.stdout(predicates::str::contains("\"precision\": \"8\""))
		.stdout(predicates::str::contains("\"verbose\": \"yes\""));

	Ok(())
}

#[test]
fn config_shows_the_discovered_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir(tmp.path().join(".config"))?;
	std::fs::write(
		tmp.path().join(".config/litmath.toml"),
		"[settings]\nnotation = \"fixed\"\n\n[rates]\npath = \"fx.xml\"\n\n[watch]\ndebounce_ms = \
		 150\n",
	)?;

	common::litmath_cmd()
		.arg("config")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(".config/litmath.toml"))
		.stdout(predicates::str::contains("Rates        fx.xml"))
		.stdout(predicates::str::contains("Debounce     150ms"))
		.stdout(predicates::str::contains("\"notation\": \"fixed\""))
		.stdout(predicates::str::contains("using defaults").not());

	Ok(())
}

#[test]
fn trim_blanks_prose() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::litmath_cmd()
		.arg("trim")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("note\n````math\n1 + 1\n```\ntext\n= 2\n")
		.assert()
		.success()
		.stdout("\n```math\n1 + 1\n```\n\n= 2\n");

	Ok(())
}
