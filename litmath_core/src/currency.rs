use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::MathError;
use crate::MathResult;
use crate::engine::Engine;
use crate::engine::UnitDefinition;

/// Base currency of the European Central Bank reference rates.
pub const ECB_BASE: &str = "EUR";

/// Exchange rates relative to a base currency: one `base` buys `rate` of
/// each listed currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
	pub base: String,
	/// The day the rates were published, when the source says so.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	pub rates: BTreeMap<String, f64>,
}

/// Supported exchange rate file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatesFormat {
	/// The ECB daily reference feed (`eurofxref-daily.xml`).
	Xml,
	/// `{"base": "EUR", "rates": {"USD": 1.08}}`.
	Json,
}

impl RatesFormat {
	pub fn from_name(name: &str) -> MathResult<Self> {
		match name.to_ascii_lowercase().as_str() {
			"xml" | "ecb" => Ok(Self::Xml),
			"json" => Ok(Self::Json),
			_ => Err(MathError::UnsupportedRatesFormat(name.to_string())),
		}
	}

	/// Infer the format from a file extension.
	pub fn from_path(path: &Path) -> Option<Self> {
		let extension = path.extension()?.to_str()?;
		Self::from_name(extension).ok()
	}

	/// Guess the format from the content itself.
	fn sniff(text: &str) -> Self {
		if text.trim_start().starts_with('<') {
			Self::Xml
		} else {
			Self::Json
		}
	}
}

impl ExchangeRates {
	/// No rates at all. Installing these only registers the base.
	pub fn empty() -> Self {
		Self {
			base: ECB_BASE.to_string(),
			date: None,
			rates: BTreeMap::new(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.rates.is_empty()
	}

	/// Parse rates in `format`, or in whatever format `text` looks like.
	pub fn parse(text: &str, format: Option<RatesFormat>) -> MathResult<Self> {
		match format.unwrap_or_else(|| RatesFormat::sniff(text)) {
			RatesFormat::Xml => Self::from_ecb_xml(text),
			RatesFormat::Json => Self::from_json(text),
		}
	}

	pub fn from_json(text: &str) -> MathResult<Self> {
		serde_json::from_str(text).map_err(|e| MathError::RatesParse(e.to_string()))
	}

	/// Read every `<Cube currency="..." rate="..."/>` element of an ECB
	/// feed. The base is always [`ECB_BASE`].
	pub fn from_ecb_xml(text: &str) -> MathResult<Self> {
		let mut reader = Reader::from_str(text);
		reader.config_mut().trim_text(true);
		let mut rates = Self::empty();

		loop {
			match reader.read_event() {
				Ok(Event::Start(element) | Event::Empty(element))
					if element.local_name().as_ref() == b"Cube" =>
				{
					read_cube(&element, &mut rates)?;
				}
				Ok(Event::Eof) => break,
				Ok(_) => {}
				Err(e) => {
					return Err(MathError::RatesParse(format!(
						"error at position {}: {e}",
						reader.error_position()
					)));
				}
			}
		}

		if rates.is_empty() {
			return Err(MathError::RatesParse(
				"no <Cube currency=\"...\" rate=\"...\"> elements found".to_string(),
			));
		}

		Ok(rates)
	}

	/// Read rates from a file, inferring the format from its extension when
	/// `format` is `None`.
	pub fn load(path: &Path, format: Option<RatesFormat>) -> MathResult<Self> {
		let text = std::fs::read_to_string(path)?;
		Self::parse(&text, format.or_else(|| RatesFormat::from_path(path)))
	}
}

fn read_cube(element: &BytesStart<'_>, rates: &mut ExchangeRates) -> MathResult<()> {
	let mut currency = None;
	let mut rate = None;

	for attribute in element.attributes() {
		let attribute = attribute.map_err(|e| MathError::RatesParse(e.to_string()))?;
		let value = attribute
			.unescape_value()
			.map_err(|e| MathError::RatesParse(e.to_string()))?
			.into_owned();

		match attribute.key.as_ref() {
			b"currency" => currency = Some(value),
			b"rate" => rate = Some(value),
			b"time" => rates.date = Some(value),
			_ => {}
		}
	}

	let (Some(currency), Some(rate)) = (currency, rate) else {
		return Ok(());
	};

	let rate = rate.trim().parse::<f64>().map_err(|e| {
		MathError::RatesParse(format!("invalid rate `{rate}` for {currency}: {e}"))
	})?;
	rates.rates.insert(currency, rate);

	Ok(())
}

/// Register `rates` as units of `engine`.
///
/// The base becomes a new base unit and every currency an alias worth
/// `1 / rate` of it, under both its upper and lower case spelling. Existing
/// currency units are replaced. Rates that are not finite and positive are
/// skipped. Returns the number of units created.
pub fn install_currency_units(engine: &mut Engine, rates: &ExchangeRates) -> MathResult<usize> {
	let base = rates.base.as_str();
	let currency_error = |code: &str, error: crate::EvalError| {
		MathError::Currency {
			code: code.to_string(),
			reason: error.to_string(),
		}
	};

	engine
		.create_unit(base, UnitDefinition::Base, true)
		.map_err(|e| currency_error(base, e))?;
	let mut created = 1;

	let lower_base = base.to_lowercase();
	if lower_base != base {
		let alias = UnitDefinition::per(1.0, base).ok_or_else(|| {
			MathError::Currency {
				code: lower_base.clone(),
				reason: "invalid alias".to_string(),
			}
		})?;
		engine
			.create_unit(&lower_base, alias, true)
			.map_err(|e| currency_error(&lower_base, e))?;
		created += 1;
	}

	for (code, rate) in &rates.rates {
		if code.eq_ignore_ascii_case(base) {
			continue;
		}

		let Some(definition) = UnitDefinition::per(*rate, base) else {
			warn!(code, rate, "skipping currency with an invalid exchange rate");
			continue;
		};

		for name in [code.to_uppercase(), code.to_lowercase()] {
			engine
				.create_unit(&name, definition.clone(), true)
				.map_err(|e| currency_error(&name, e))?;
			created += 1;
		}
	}

	debug!(base, units = created, "installed currency units");
	Ok(created)
}
