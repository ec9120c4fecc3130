use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rstest::rstest;
use similar_asserts::assert_eq;
use tokio::runtime::Handle;
use tracing_test::traced_test;

use super::*;
use crate::classify::LineKind;
use crate::classify::Sign;
use crate::classify::classify;
use crate::engine::Engine;
use crate::engine::MAX_PARSE_DEPTH;
use crate::engine::MAX_PRECISION;
use crate::engine::NumericMode;
use crate::trim::trim;

const ECB_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<gesmes:subject>Reference rates</gesmes:subject>
	<gesmes:Sender>
		<gesmes:name>European Central Bank</gesmes:name>
	</gesmes:Sender>
	<Cube>
		<Cube time='2024-06-14'>
			<Cube currency='USD' rate='1.0710'/>
			<Cube currency='JPY' rate='168.78'/>
			<Cube currency='GBP' rate='0.84498'/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;

fn process(lines: &[&str]) -> ProcessedDocument {
	process_all(&Engine::new(), lines, &GlobalConfig::default(), Scope::default())
}

fn expression(document: &ProcessedDocument, index: usize) -> &ExpressionLine {
	document.data[index]
		.as_ref()
		.and_then(LineData::as_expression)
		.unwrap_or_else(|| panic!("line {index} is not an expression: {:?}", document.data[index]))
}

fn results(document: &ProcessedDocument) -> Vec<&str> {
	document
		.entries()
		.filter_map(|(_, data)| data.as_expression())
		.map(|line| line.result.as_str())
		.collect()
}

#[rstest]
#[case::prose(&["# Title", "Some text", "", "More text"])]
#[case::block(&["intro", "```math", "1 + 1", "```", "outro"])]
#[case::inline(&["= 1 + 1", "text", "-= 2"])]
#[case::unclosed(&["text", "```math", "1 + 1", "= 2", "3"])]
#[case::long_fences(&["````math", "x = 1", "````", "```math", "x", "```"])]
#[case::indented_fences(&["  ```math", "a = 1", "  ```"])]
fn trim_is_idempotent(#[case] lines: &[&str]) {
	for allow_inline in [true, false] {
		let once = trim(lines, allow_inline);
		let twice = trim(&once, allow_inline);

		assert_eq!(once.len(), lines.len());
		assert_eq!(twice, once);
	}
}

#[test]
fn trim_keeps_blocks_and_inline_lines() {
	let lines = [
		"intro",
		"````math",
		"a = 1",
		"```",
		"between",
		"= a + 1",
		"outro",
	];

	assert_eq!(
		trim(&lines, true),
		["", "```math", "a = 1", "```", "", "= a + 1", ""]
	);
	assert_eq!(
		trim(&lines, false),
		["", "```math", "a = 1", "```", "", "", ""]
	);
}

#[test]
fn trim_erases_unclosed_blocks() {
	let lines = ["```math", "1 + 1", "= 2", "3"];

	assert_eq!(trim(&lines, true), ["```math", "", "= 2", ""]);
	assert_eq!(trim(&lines, false), ["```math", "", "", ""]);
}

#[rstest]
#[case::empty("", LineKind::Boundary)]
#[case::open_fence("```math", LineKind::Boundary)]
#[case::close_fence("```", LineKind::CloseFence)]
#[case::config("total: 5", LineKind::Config { key: "total", value: "5" })]
#[case::config_second_colon("a: b: c", LineKind::Config { key: "a", value: "b" })]
#[case::config_spacing("  hide :result ", LineKind::Config { key: "hide", value: "result" })]
#[case::hash_comment("# rent", LineKind::Comment)]
#[case::indented_comment("  // food", LineKind::Comment)]
#[case::expression("x = 2", LineKind::Expression { sign: Sign::Plus, expression: "x = 2" })]
#[case::bare_minus("-5", LineKind::Expression { sign: Sign::Minus, expression: "5" })]
#[case::indented_minus("  -5", LineKind::Expression { sign: Sign::Minus, expression: "5" })]
#[case::bare_plus("+ 3", LineKind::Expression { sign: Sign::Plus, expression: " 3" })]
#[case::inline("= 1 + 1", LineKind::Expression { sign: Sign::Plus, expression: " 1 + 1" })]
#[case::inline_plus("+= 3", LineKind::Expression { sign: Sign::Plus, expression: " 3" })]
#[case::inline_minus("-= 2", LineKind::Expression { sign: Sign::Minus, expression: " 2" })]
fn classifies_lines(#[case] line: &str, #[case] expected: LineKind<'_>) {
	assert_eq!(classify(line), expected);
}

#[test]
fn lines_outside_fences_produce_nothing() {
	let document = process(&[
		"Some prose",
		"1 + 1",
		"```math",
		"2",
		"```",
		"more prose: yes",
	]);

	assert_eq!(document.data.len(), 6);
	for index in [0, 1, 2, 4, 5] {
		assert_eq!(document.data[index], None, "line {index}");
	}
	assert_eq!(expression(&document, 3).result, "2");
}

#[test]
fn block_total_accumulates() {
	let document = process(&["```math", "a = 1", "b = 2", "total", "```"]);

	assert_eq!(results(&document), ["1", "2", "3"]);
	assert_eq!(expression(&document, 2).total, "3");
	assert!(!expression(&document, 3).displaytotal);
}

#[test]
fn displaytotal_skips_lines_reading_the_total() {
	let document = process(&["```math", "displaytotal: yes", "a = 4", "total * 2", "```"]);

	assert_eq!(document.data[1], Some(LineData::Config));
	assert!(expression(&document, 2).displaytotal);
	assert!(!expression(&document, 3).displaytotal);
	assert_eq!(expression(&document, 3).result, "8");
	assert_eq!(expression(&document, 3).total, "4");
}

#[test]
fn leading_minus_subtracts_from_the_total() {
	let document = process(&["```math", "-5", "```"]);
	let line = expression(&document, 1);

	assert_eq!(line.result, "5");
	assert_eq!(line.total, "-5");
}

#[test]
fn inline_lines_accumulate() {
	let document = process(&["Shopping", "= 5 + 3", "+= 2", "-= 1", "", "= 7"]);

	assert_eq!(results(&document), ["8", "2", "1", "7"]);
	assert_eq!(expression(&document, 3).total, "9");
	assert_eq!(expression(&document, 5).total, "7");
}

#[test]
fn blank_lines_restart_the_total() {
	let document = process(&["```math", "10", "", "20", "```"]);

	assert_eq!(expression(&document, 1).total, "10");
	assert_eq!(expression(&document, 3).total, "20");
}

#[test]
fn mixed_units_restart_the_total_from_the_line_value() {
	let document = process(&["```math", "5 km", "3", "2 kg", "```"]);

	assert_eq!(results(&document), ["5 km", "3", "2 kg"]);
	assert_eq!(expression(&document, 1).total, "5 km");
	assert_eq!(expression(&document, 2).total, "3");
	assert_eq!(expression(&document, 3).total, "2 kg");
}

#[rstest]
#[case::whitespace_only(&["```math", "   ", "```"], "Unexpected end of expression (char 4)")]
#[case::unclosed_parenthesis(&["```math", "(1 + 2", "```"], "Parenthesis ) expected (char 7)")]
#[case::stray_parenthesis(&["```math", "1 + 2)", "```"], "Unexpected \")\" (char 6)")]
#[case::huge_factorial(&["```math", "1e11!", "```"], "Infinity")]
#[case::huge_precision(
	&["```math", "precision: 1e30", "1/3", "```"],
	"Precision must be between 0 and 100 (got 1e30)"
)]
#[case::negative_precision(
	&["```math", "precision: -2", "1/3", "```"],
	"Precision must be between 0 and 100 (got -2)"
)]
fn malformed_lines_still_yield_a_result(#[case] lines: &[&str], #[case] expected: &str) {
	let document = process(lines);

	assert_eq!(document.data.len(), lines.len());
	assert_eq!(expression(&document, lines.len() - 2).result, expected);
}

#[rstest]
#[case::parentheses(format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000)))]
#[case::minus_chain(format!("0 {}1", "- ".repeat(200_000)))]
fn deeply_nested_lines_report_an_error(#[case] line: String) {
	let document = process(&["```math", line.as_str(), "2", "```"]);

	assert_eq!(
		expression(&document, 1).result,
		format!("Expression is nested too deeply (more than {MAX_PARSE_DEPTH} levels)")
	);
	assert_eq!(expression(&document, 2).result, "2");
}

#[test]
fn largest_precision_is_accepted() {
	let precision = format!("precision: {MAX_PRECISION}");
	let document = process(&["```math", precision.as_str(), "1/4", "```"]);

	assert_eq!(expression(&document, 2).result, "0.25");
	assert_eq!(expression(&document, 2).total, "0.25");
}

#[test]
fn currency_codes_without_rates_hide_their_result() {
	let document = process(&["```math", "5 USD", "2 abc", "```"]);

	assert!(expression(&document, 1).result_hidden);
	assert_eq!(expression(&document, 2).result, "Undefined symbol abc");
}

#[test]
fn currency_codes_are_undefined_when_currency_is_off() {
	let mut config = GlobalConfig::default();
	config.set("currency", "no");
	let mut session = Session::new(config);

	let document = session.process_lines(&["```math", "5 USD", "2 abc", "```"]);

	assert_eq!(results(&document), ["Undefined symbol USD", "Undefined symbol abc"]);
}

#[test]
fn hide_result_only_hides_the_result() {
	let document = process(&["```math", "hide: result", "1 + 1", "```"]);
	let line = expression(&document, 2);

	assert!(line.result_hidden);
	assert!(!line.input_hidden);
}

#[test]
fn hide_expression_only_hides_the_input() {
	let document = process(&["```math", "hide: expression", "1 + 1", "```"]);
	let line = expression(&document, 2);

	assert!(line.input_hidden);
	assert!(!line.result_hidden);
}

#[test]
fn global_settings_carry_into_later_blocks() {
	let document = process(&[
		"```math",
		"global: yes",
		"align: right",
		"1",
		"```",
		"",
		"```math",
		"2",
		"```",
	]);

	assert!(expression(&document, 3).align_right);
	assert!(expression(&document, 7).align_right);
}

#[test]
fn block_settings_reset_at_the_closing_fence() {
	let document = process(&["```math", "align: right", "1", "```", "```math", "2", "```"]);

	assert!(expression(&document, 2).align_right);
	assert!(!expression(&document, 5).align_right);
}

#[test]
fn config_lines_are_recognized_before_expressions() {
	let document = process(&["```math", "total: 5", "total", "```"]);

	assert_eq!(document.data[1], Some(LineData::Config));
	assert_eq!(expression(&document, 2).result, "0");
}

#[test]
fn comments_produce_nothing() {
	let document = process(&["```math", "# groceries", "// more", "3", "```"]);

	assert_eq!(document.data[1], None);
	assert_eq!(document.data[2], None);
	assert_eq!(expression(&document, 3).result, "3");
}

#[test]
fn repeated_passes_are_identical() {
	let lines = [
		"```math",
		"price = 12.5",
		"qty = 3",
		"price * qty",
		"-2",
		"```",
		"= price / 5",
	];
	let engine = Engine::new();
	let config = GlobalConfig::default();

	let first = process_all(&engine, &lines, &config, Scope::default());
	let second = process_all(&engine, &lines, &config, Scope::default());

	assert_eq!(first, second);
}

#[test]
fn scope_is_shared_across_blocks() {
	let document = process(&[
		"```math",
		"price = 10",
		"```",
		"",
		"```math",
		"price * 2",
		"```",
	]);

	assert_eq!(expression(&document, 5).result, "20");
	assert!(document.scope.contains_key("price"));
	assert!(!document.scope.contains_key("total"));
}

#[test]
fn assigning_total_keeps_it_in_scope() {
	let document = process(&["```math", "total = 100", "total + 1", "```"]);

	assert_eq!(results(&document), ["100", "101"]);
	assert!(document.scope.contains_key("total"));
}

#[test]
fn errors_become_results() {
	let document = process(&["```math", "1 +", "5 USD", "2", "```"]);

	assert_eq!(
		expression(&document, 1).result,
		"Unexpected end of expression (char 4)"
	);

	let currency = expression(&document, 2);
	assert_eq!(currency.result, "");
	assert!(currency.result_hidden);

	assert_eq!(expression(&document, 3).total, "2");
}

#[test]
fn verbose_prefixes_assignments() {
	let document = process(&[
		"```math",
		"verbose: yes",
		"x = 2",
		"f(y) = y + 1",
		"f(x)",
		"```",
	]);

	assert_eq!(results(&document), ["x: 2", "f: f(y)", "3"]);
}

#[test]
fn simplify_returns_expressions() {
	let document = process(&["```math", "simplify: yes", "2x + 3x", "```"]);
	let line = expression(&document, 2);

	assert_eq!(line.result, "5 * x");
	assert_eq!(line.total, "");
}

#[test]
fn simplified_results_resolve_against_scope_for_totals() {
	let document = process(&["```math", "x = 4", "simplify: yes", "2x + x", "```"]);

	assert_eq!(expression(&document, 3).result, "3 * x");
	assert_eq!(expression(&document, 3).total, "16");
}

#[test]
fn bignumber_directive_switches_numeric_mode() {
	let engine = Engine::new();
	let mut ctx = ProcessContext::new(GlobalConfig::default(), Scope::default());
	assert_eq!(ctx.mode, NumericMode::Number);

	assert_eq!(
		process_next(&engine, "bignumber: yes", &mut ctx),
		Some(LineData::Config)
	);
	assert_eq!(ctx.mode, NumericMode::BigNumber);

	let line = process_next(&engine, "2 ^ 70", &mut ctx);
	assert_eq!(
		line.as_ref().and_then(LineData::as_expression).map(|line| line.result.as_str()),
		Some("1.1805916e+21")
	);

	// The mode survives the end of the block.
	process_next(&engine, "```", &mut ctx);
	assert_eq!(ctx.mode, NumericMode::BigNumber);
}

#[test]
fn precision_and_notation_directives_format_results() {
	let document = process(&[
		"```math",
		"precision: 3",
		"1 / 3",
		"notation: fixed",
		"2 / 3",
		"```",
	]);

	assert_eq!(results(&document), ["0.333", "0.667"]);
}

#[test]
fn line_data_serializes_for_hosts() -> AnyEmptyResult {
	let document = process(&["```math", "precision: 4", "1 + 2", "```"]);

	insta::assert_snapshot!(serde_json::to_string(&document.data[1])?, @r#"{"type":"config"}"#);
	insta::assert_snapshot!(
		serde_json::to_string(&document.data[2])?,
		@r#"{"type":"expression","result":"3","total":"3","displaytotal":false,"inputHidden":false,"resultHidden":false,"inline":true,"alignRight":false,"copyButton":true}"#
	);

	Ok(())
}

#[rstest]
#[case::yes("yes", true, false)]
#[case::true_mixed_case("True", true, false)]
#[case::one("1", true, false)]
#[case::no("no", false, true)]
#[case::false_word("false", false, true)]
#[case::zero("0", false, true)]
#[case::neither("result", false, false)]
fn settings_read_truthiness(#[case] value: &str, #[case] truthy: bool, #[case] falsey: bool) {
	let setting = Setting::from(value);

	assert_eq!(setting.is_truthy(), truthy);
	assert_eq!(setting.is_falsey(), falsey);
}

#[test]
fn global_config_defaults() {
	let config = GlobalConfig::default();

	assert!(!config.global.is_truthy());
	assert!(config.simplify.is_falsey());
	assert!(config.inline.is_truthy());
	assert_eq!(config.precision.as_str(), "8");
	assert_eq!(config.lower_exp.as_str(), "-3");
	assert_eq!(config.notation.as_str(), "auto");
	assert_eq!(config.numeric_mode(), NumericMode::Number);
}

#[test]
fn global_config_keeps_unknown_directives() {
	let mut config = GlobalConfig::default();
	config.set("precision", "4");
	config.set("currencyFormat", "symbol");

	assert_eq!(config.get("precision"), Some(&Setting::from("4")));
	assert_eq!(config.get("currencyFormat"), Some(&Setting::from("symbol")));
	assert_eq!(config.get("missing"), None);
}

#[test]
fn global_config_deserializes_loose_values() -> AnyEmptyResult {
	let config: GlobalConfig =
		serde_json::from_str(r#"{"precision": 4, "verbose": true, "hide": "result", "theme": "dark"}"#)?;

	assert_eq!(config.precision.as_str(), "4");
	assert_eq!(config.verbose.as_str(), "yes");
	assert_eq!(config.hide.as_str(), "result");
	assert_eq!(config.extra.get("theme"), Some(&Setting::from("dark")));
	assert_eq!(config.align.as_str(), "left");

	Ok(())
}

#[test]
fn invalid_precision_formats_shortest() {
	let mut config = GlobalConfig::default();
	config.set("precision", "lots");

	assert_eq!(config.format_options().ok().and_then(|options| options.precision), None);

	let document = process_all(
		&Engine::new(),
		&["```math", "1 / 3", "```"],
		&config,
		Scope::default(),
	);
	assert_eq!(expression(&document, 1).result, "0.3333333333333333");
}

#[test]
fn host_settings_convert_to_global_config() {
	let settings = HostSettings {
		bignumber: true,
		precision: 4,
		align: "right".to_string(),
		..HostSettings::default()
	};
	let config = GlobalConfig::from(settings);

	assert_eq!(config.bignumber.as_str(), "yes");
	assert_eq!(config.verbose.as_str(), "yes");
	assert_eq!(config.precision.as_str(), "4");
	assert_eq!(config.align.as_str(), "right");
	assert_eq!(config.hide.as_str(), "no");
	assert_eq!(config.numeric_mode(), NumericMode::BigNumber);
}

#[test]
fn parses_config_file() -> MathResult<()> {
	let config = LitmathConfig::parse(
		r#"
[settings]
precision = 4
verbose = false
notation = "fixed"

[rates]
path = "rates/eurofxref-daily.xml"

[watch]
debounce_ms = 50
"#,
	)?;

	let global = config.global_config();
	assert_eq!(global.precision.as_str(), "4");
	assert_eq!(global.verbose.as_str(), "no");
	assert_eq!(global.notation.as_str(), "fixed");
	assert_eq!(config.debounce(), Duration::from_millis(50));
	assert_eq!(
		config.rates_path(std::path::Path::new("/notes")),
		Some(std::path::PathBuf::from("/notes/rates/eurofxref-daily.xml"))
	);

	Ok(())
}

#[test]
fn invalid_config_file_is_an_error() {
	let error = LitmathConfig::parse("[settings\nprecision = 4").unwrap_err();
	assert!(matches!(error, MathError::ConfigParse(_)), "{error}");
}

#[test]
fn loads_config_from_discovered_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	assert_eq!(LitmathConfig::load(tmp.path())?, None);

	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(
		tmp.path().join(".config/litmath.toml"),
		"[settings]\nprecision = 3\n",
	)?;
	std::fs::write(tmp.path().join("litmath.toml"), "[settings]\nprecision = 5\n")?;

	let config = LitmathConfig::load(tmp.path())?.unwrap_or_default();
	assert_eq!(config.settings.precision, 5);
	assert_eq!(config.watch.debounce_ms, DEFAULT_DEBOUNCE_MS);

	Ok(())
}

#[test]
fn parses_ecb_feed() -> MathResult<()> {
	let rates = ExchangeRates::parse(ECB_FEED, None)?;

	assert_eq!(rates.base, "EUR");
	assert_eq!(rates.date.as_deref(), Some("2024-06-14"));
	assert_eq!(rates.rates.len(), 3);
	assert_eq!(rates.rates.get("USD"), Some(&1.071));

	Ok(())
}

#[test]
fn parses_json_rates() -> MathResult<()> {
	let rates = ExchangeRates::parse(r#"{"base": "USD", "rates": {"EUR": 0.93}}"#, None)?;

	assert_eq!(rates.base, "USD");
	assert_eq!(rates.date, None);
	assert_eq!(rates.rates.get("EUR"), Some(&0.93));

	Ok(())
}

#[rstest]
#[case::not_xml("<rates><broken", RatesFormat::Xml)]
#[case::no_cubes("<Envelope></Envelope>", RatesFormat::Xml)]
#[case::bad_rate("<Cube currency='USD' rate='lots'/>", RatesFormat::Xml)]
#[case::bad_json("{\"base\": 1}", RatesFormat::Json)]
fn rejects_invalid_rates(#[case] text: &str, #[case] format: RatesFormat) {
	let error = ExchangeRates::parse(text, Some(format)).unwrap_err();
	assert!(matches!(error, MathError::RatesParse(_)), "{error}");
}

#[test]
fn rates_format_from_name() {
	assert_eq!(RatesFormat::from_name("XML").ok(), Some(RatesFormat::Xml));
	assert_eq!(RatesFormat::from_name("json").ok(), Some(RatesFormat::Json));
	assert!(matches!(
		RatesFormat::from_name("csv"),
		Err(MathError::UnsupportedRatesFormat(_))
	));
}

#[test]
fn installs_currency_units() -> MathResult<()> {
	let rates = ExchangeRates::parse(ECB_FEED, None)?;
	let mut session = Session::new(GlobalConfig::default());

	assert_eq!(session.install_rates(&rates)?, 8);

	let document = session.process("```math\n10 EUR to USD\n100 usd to eur\n5 GBP + 1 EUR\n```");
	assert_eq!(
		results(&document),
		["10.71 USD", "93.370682 eur", "5.84498 GBP"]
	);

	Ok(())
}

#[test]
fn reinstalling_rates_replaces_currencies() -> MathResult<()> {
	let mut session = Session::new(GlobalConfig::default());
	session.install_rates(&ExchangeRates::from_json(
		r#"{"base": "EUR", "rates": {"USD": 2}}"#,
	)?)?;
	session.install_rates(&ExchangeRates::from_json(
		r#"{"base": "EUR", "rates": {"USD": 4}}"#,
	)?)?;

	let document = session.process("= 1 EUR to USD");
	assert_eq!(results(&document), ["4 USD"]);

	Ok(())
}

#[test]
#[traced_test]
fn skips_invalid_exchange_rates() -> MathResult<()> {
	let rates = ExchangeRates::from_json(r#"{"base": "EUR", "rates": {"USD": 1.1, "XXX": 0}}"#)?;
	let mut engine = Engine::new();

	assert_eq!(install_currency_units(&mut engine, &rates)?, 4);
	assert!(engine.units().contains("usd"));
	assert!(!engine.units().contains("XXX"));
	assert!(logs_contain("skipping currency with an invalid exchange rate"));

	Ok(())
}

#[test]
fn currency_setting_disables_installation() -> MathResult<()> {
	let mut config = GlobalConfig::default();
	config.set("currency", "no");
	let mut session = Session::new(config);

	assert_eq!(session.install_rates(&ExchangeRates::parse(ECB_FEED, None)?)?, 0);
	assert!(!session.engine().units().contains("USD"));

	Ok(())
}

#[test]
fn session_scope_persists_until_reset() {
	let mut session = Session::new(GlobalConfig::default());

	session.process("= rate = 3");
	let document = session.process("= rate * 2");
	assert_eq!(results(&document), ["6"]);

	session.reset_scope();
	let document = session.process("= rate * 2");
	assert_eq!(results(&document), ["Undefined symbol rate"]);
}

#[test]
fn annotates_documents() {
	let document = process(&[
		"# Budget",
		"```math",
		"rent = 1200",
		"food = 300",
		"total",
		"```",
		"= 2 + 2",
	]);

	insta::assert_snapshot!(annotate(&document, &AnnotateOptions::default()), @r"
	# Budget
	```math
	rent = 1200 => 1200
	food = 300 => 300
	total => 1500
	```
	= 2 + 2 => 4
	");
}

#[test]
fn annotates_hidden_and_aligned_results() {
	let document = process(&[
		"```math",
		"inline: no",
		"hide: expression",
		"4 * 2",
		"hide: no",
		"align: right",
		"1 + 1",
		"```",
	]);
	let options = AnnotateOptions { width: 12 };

	let expected = [
		"```math",
		"inline: no",
		"hide: expression",
		" |> 8",
		"hide: no",
		"align: right",
		"1 + 1",
		"        => 2",
		"```",
	]
	.join("\n");
	assert_eq!(annotate(&document, &options), expected);
}

#[test]
fn annotation_shows_the_total_when_asked() {
	let document = process(&["```math", "displaytotal: yes", "3", "4", "```"]);

	assert_eq!(
		render_result(expression(&document, 3)).as_deref(),
		Some(" => 7")
	);
}

struct FlakyConfigSource {
	ready_after: u32,
	calls: u32,
}

impl ConfigSource for FlakyConfigSource {
	async fn request_config(&mut self) -> MathResult<Option<GlobalConfig>> {
		self.calls += 1;
		Ok((self.calls >= self.ready_after).then(GlobalConfig::default))
	}
}

#[tokio::test(start_paused = true)]
async fn config_request_backs_off_until_answered() -> MathResult<()> {
	let mut source = FlakyConfigSource {
		ready_after: 3,
		calls: 0,
	};
	let start = tokio::time::Instant::now();

	let config = request_global_config(&mut source, RetryPolicy::default()).await?;

	assert_eq!(config, GlobalConfig::default());
	assert_eq!(source.calls, 3);
	assert_eq!(start.elapsed(), Duration::from_millis(50 + 100 + 200));

	Ok(())
}

#[tokio::test(start_paused = true)]
async fn config_request_times_out() {
	let mut source = FlakyConfigSource {
		ready_after: u32::MAX,
		calls: 0,
	};
	let policy = RetryPolicy {
		initial_delay: Duration::from_millis(10),
		max_attempts: 3,
	};

	let error = request_global_config(&mut source, policy).await.unwrap_err();

	assert!(matches!(error, MathError::ConfigTimeout { attempts: 3 }), "{error}");
	assert_eq!(source.calls, 3);
}

#[tokio::test]
async fn static_config_source_answers_immediately() -> MathResult<()> {
	let mut config = GlobalConfig::default();
	config.set("precision", "2");
	let mut source = StaticConfigSource(config.clone());

	let policy = RetryPolicy {
		initial_delay: Duration::ZERO,
		max_attempts: 1,
	};
	assert_eq!(request_global_config(&mut source, policy).await?, config);

	Ok(())
}

#[tokio::test]
async fn loads_rates_from_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let path = tmp.path().join("eurofxref-daily.xml");
	std::fs::write(&path, ECB_FEED)?;

	let rates = load_exchange_rates(&FileRateSource::new(&path)).await;
	assert_eq!(rates.rates.len(), 3);

	let json_path = tmp.path().join("rates.txt");
	std::fs::write(&json_path, r#"{"base": "EUR", "rates": {"CHF": 0.96}}"#)?;
	let rates =
		load_exchange_rates(&FileRateSource::new(&json_path).with_format(RatesFormat::Json)).await;
	assert_eq!(rates.rates.get("CHF"), Some(&0.96));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn failed_rate_loads_yield_empty_rates() {
	let rates = load_exchange_rates(&FileRateSource::new("/does/not/exist.xml")).await;

	assert!(rates.is_empty());
	assert_eq!(rates.base, ECB_BASE);
	assert!(logs_contain("failed to load exchange rates"));
}

#[tokio::test(start_paused = true)]
async fn debouncer_runs_only_the_latest_task() {
	let debouncer = Debouncer::new(Handle::current(), Duration::from_millis(300));
	let runs = Arc::new(AtomicUsize::new(0));

	let first = debouncer.schedule({
		let runs = Arc::clone(&runs);
		move || {
			runs.fetch_add(1, Ordering::SeqCst);
		}
	});
	tokio::time::sleep(Duration::from_millis(100)).await;
	let second = debouncer.schedule({
		let runs = Arc::clone(&runs);
		move || {
			runs.fetch_add(10, Ordering::SeqCst);
		}
	});

	assert!(!first.await.unwrap_or(true));
	assert!(second.await.unwrap_or(false));
	assert_eq!(runs.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn debouncer_waits_for_the_quiet_period() {
	let debouncer = Debouncer::new(Handle::current(), Duration::from_millis(300));
	let runs = Arc::new(AtomicUsize::new(0));
	let start = tokio::time::Instant::now();

	let task = debouncer.schedule({
		let runs = Arc::clone(&runs);
		move || {
			runs.fetch_add(1, Ordering::SeqCst);
		}
	});

	assert!(task.await.unwrap_or(false));
	assert_eq!(runs.load(Ordering::SeqCst), 1);
	assert!(start.elapsed() >= debouncer.delay());
}

#[tokio::test(start_paused = true)]
async fn debouncer_cancel_drops_the_waiting_task() {
	let debouncer = Debouncer::new(Handle::current(), Duration::from_millis(300));
	let task = debouncer.schedule(|| panic!("cancelled tasks never run"));

	debouncer.cancel();

	assert!(!task.await.unwrap_or(true));
}
