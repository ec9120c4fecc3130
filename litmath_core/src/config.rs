use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::EvalError;
use crate::EvalResult;
use crate::MathError;
use crate::MathResult;
use crate::engine::FormatOptions;
use crate::engine::MAX_PRECISION;
use crate::engine::Notation;
use crate::engine::NumericMode;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["litmath.toml", ".litmath.toml", ".config/litmath.toml"];

/// Default quiet period before a watched file is processed again.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// A single configuration value as written in a note, e.g. the `yes` of
/// `verbose: yes` or the `result` of `hide: result`.
///
/// Deserializes from strings, numbers and booleans. Booleans become `yes` or
/// `no`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawSetting", into = "String")]
pub struct Setting(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSetting {
	Bool(bool),
	Integer(i64),
	Float(f64),
	Text(String),
}

impl From<RawSetting> for Setting {
	fn from(raw: RawSetting) -> Self {
		match raw {
			RawSetting::Bool(flag) => Self::from(flag),
			RawSetting::Integer(value) => Self(value.to_string()),
			RawSetting::Float(value) => Self(value.to_string()),
			RawSetting::Text(text) => Self(text),
		}
	}
}

impl From<Setting> for String {
	fn from(setting: Setting) -> Self {
		setting.0
	}
}

impl From<bool> for Setting {
	fn from(flag: bool) -> Self {
		Self(if flag { "yes" } else { "no" }.to_string())
	}
}

impl From<&str> for Setting {
	fn from(text: &str) -> Self {
		Self(text.to_string())
	}
}

impl From<String> for Setting {
	fn from(text: String) -> Self {
		Self(text)
	}
}

impl fmt::Display for Setting {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Setting {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// `true`, `yes`, `y`, `1` and anything else starting with `t` or `y`.
	pub fn is_truthy(&self) -> bool {
		let value = self.0.to_lowercase();
		value.starts_with('t') || value.starts_with('y') || value == "1"
	}

	/// `false`, `no`, `n`, `0` and anything else starting with `f` or `n`.
	pub fn is_falsey(&self) -> bool {
		let value = self.0.to_lowercase();
		value.starts_with('f') || value.starts_with('n') || value == "0"
	}

	/// The value read as a number, if it is one.
	pub fn as_number(&self) -> Option<f64> {
		self.0.trim().parse::<f64>().ok().filter(|value| value.is_finite())
	}
}

/// Settings that control evaluation and presentation of math lines.
///
/// Every field is a [`Setting`] so that notes can override any of them with
/// a `key: value` line. Keys without a dedicated field are kept in
/// [`GlobalConfig::extra`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
	/// Promote the current block's settings to every later block.
	pub global: Setting,
	/// Simplify expressions symbolically instead of evaluating them.
	pub simplify: Setting,
	/// Use exact arbitrary precision arithmetic.
	pub bignumber: Setting,
	/// Show the running total next to each result.
	pub displaytotal: Setting,
	/// `expression` hides the input, `result` hides the output.
	pub hide: Setting,
	/// Prefix assignment results with the assigned name.
	pub verbose: Setting,
	/// Show results on the same line as the input.
	pub inline: Setting,
	pub notation: Setting,
	#[serde(rename = "lowerExp")]
	pub lower_exp: Setting,
	pub precision: Setting,
	pub align: Setting,
	pub inlinesyntax: Setting,
	#[serde(rename = "copyButton")]
	pub copy_button: Setting,
	pub currency: Setting,
	/// Directives without a dedicated field.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Setting>,
}

impl Default for GlobalConfig {
	fn default() -> Self {
		Self {
			global: false.into(),
			simplify: false.into(),
			bignumber: false.into(),
			displaytotal: false.into(),
			hide: false.into(),
			verbose: false.into(),
			inline: true.into(),
			notation: "auto".into(),
			lower_exp: "-3".into(),
			precision: "8".into(),
			align: "left".into(),
			inlinesyntax: "true".into(),
			copy_button: "true".into(),
			currency: "true".into(),
			extra: BTreeMap::new(),
		}
	}
}

impl GlobalConfig {
	/// Write a directive. Known keys update their field, anything else is
	/// stored in [`GlobalConfig::extra`].
	pub fn set(&mut self, key: &str, value: impl Into<Setting>) {
		let value = value.into();
		match key {
			"global" => self.global = value,
			"simplify" => self.simplify = value,
			"bignumber" => self.bignumber = value,
			"displaytotal" => self.displaytotal = value,
			"hide" => self.hide = value,
			"verbose" => self.verbose = value,
			"inline" => self.inline = value,
			"notation" => self.notation = value,
			"lowerExp" => self.lower_exp = value,
			"precision" => self.precision = value,
			"align" => self.align = value,
			"inlinesyntax" => self.inlinesyntax = value,
			"copyButton" => self.copy_button = value,
			"currency" => self.currency = value,
			other => {
				self.extra.insert(other.to_string(), value);
			}
		}
	}

	pub fn get(&self, key: &str) -> Option<&Setting> {
		match key {
			"global" => Some(&self.global),
			"simplify" => Some(&self.simplify),
			"bignumber" => Some(&self.bignumber),
			"displaytotal" => Some(&self.displaytotal),
			"hide" => Some(&self.hide),
			"verbose" => Some(&self.verbose),
			"inline" => Some(&self.inline),
			"notation" => Some(&self.notation),
			"lowerExp" => Some(&self.lower_exp),
			"precision" => Some(&self.precision),
			"align" => Some(&self.align),
			"inlinesyntax" => Some(&self.inlinesyntax),
			"copyButton" => Some(&self.copy_button),
			"currency" => Some(&self.currency),
			other => self.extra.get(other),
		}
	}

	pub fn numeric_mode(&self) -> NumericMode {
		NumericMode::from_flag(self.bignumber.is_truthy())
	}

	/// Formatting options for results. The upper exponent bound follows
	/// `precision`.
	///
	/// A `precision` that is not a number writes the shortest form. A number
	/// outside `0..=MAX_PRECISION` is an error.
	pub fn format_options(&self) -> EvalResult<FormatOptions> {
		let precision = match self.precision.as_number() {
			Some(value) if (0.0..=MAX_PRECISION as f64).contains(&value) => Some(value as usize),
			Some(_) => {
				return Err(EvalError::PrecisionRange {
					value: self.precision.as_str().trim().to_string(),
					max: MAX_PRECISION,
				});
			}
			None => None,
		};
		let lower_exp = self.lower_exp.as_number().map(|value| value as i32);

		Ok(FormatOptions {
			notation: Notation::parse(self.notation.as_str()),
			precision,
			lower_exp,
			upper_exp: precision.map(|value| value as i32),
		})
	}

	/// This configuration as a new baseline for later blocks, with `global`
	/// switched off.
	#[must_use]
	pub fn promoted(&self) -> Self {
		Self {
			global: false.into(),
			..self.clone()
		}
	}
}

/// Settings as stored by a host application, with real booleans and
/// numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostSettings {
	pub bignumber: bool,
	pub verbose: bool,
	pub inline: bool,
	pub notation: String,
	pub lower_exp: i32,
	pub precision: u32,
	pub align: String,
	pub inlinesyntax: bool,
	pub copy_button: bool,
	pub currency: bool,
}

impl Default for HostSettings {
	fn default() -> Self {
		Self {
			bignumber: false,
			verbose: true,
			inline: true,
			notation: "auto".to_string(),
			lower_exp: -3,
			precision: 8,
			align: "left".to_string(),
			inlinesyntax: true,
			copy_button: true,
			currency: true,
		}
	}
}

impl From<HostSettings> for GlobalConfig {
	fn from(settings: HostSettings) -> Self {
		Self {
			bignumber: settings.bignumber.into(),
			verbose: settings.verbose.into(),
			inline: settings.inline.into(),
			notation: settings.notation.into(),
			lower_exp: settings.lower_exp.to_string().into(),
			precision: settings.precision.to_string().into(),
			align: settings.align.into(),
			inlinesyntax: settings.inlinesyntax.into(),
			copy_button: settings.copy_button.into(),
			currency: settings.currency.into(),
			..Self::default()
		}
	}
}

/// Where exchange rates are read from.
///
/// ```toml
/// [rates]
/// path = "eurofxref-daily.xml"
/// format = "xml"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RatesConfig {
	pub path: PathBuf,
	/// `xml` or `json`. Inferred from the file extension when absent.
	#[serde(default)]
	pub format: Option<String>,
}

/// Watch mode settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
}

impl Default for WatchConfig {
	fn default() -> Self {
		Self {
			debounce_ms: DEFAULT_DEBOUNCE_MS,
		}
	}
}

fn default_debounce_ms() -> u64 {
	DEFAULT_DEBOUNCE_MS
}

/// Configuration loaded from a `litmath.toml` file.
///
/// ```toml
/// [settings]
/// precision = 8
/// verbose = true
/// notation = "auto"
///
/// [rates]
/// path = "eurofxref-daily.xml"
///
/// [watch]
/// debounce_ms = 300
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LitmathConfig {
	/// Session settings in the host shape.
	#[serde(default)]
	pub settings: HostSettings,
	/// Exchange rate source for currency units.
	#[serde(default)]
	pub rates: Option<RatesConfig>,
	#[serde(default)]
	pub watch: WatchConfig,
}

impl LitmathConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> MathResult<Option<LitmathConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::parse(&content).map(Some)
	}

	pub fn parse(content: &str) -> MathResult<LitmathConfig> {
		toml::from_str(content).map_err(|e| MathError::ConfigParse(e.to_string()))
	}

	/// The session's global configuration.
	pub fn global_config(&self) -> GlobalConfig {
		self.settings.clone().into()
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.watch.debounce_ms)
	}

	/// The rates path resolved against `root`.
	pub fn rates_path(&self, root: &Path) -> Option<PathBuf> {
		self.rates.as_ref().map(|rates| root.join(&rates.path))
	}
}
