use tracing::debug;

use crate::MathResult;
use crate::Scope;
use crate::config::GlobalConfig;
use crate::currency::ExchangeRates;
use crate::currency::install_currency_units;
use crate::engine::Engine;
use crate::process::ProcessedDocument;
use crate::process::process_all;
use crate::process::process_document;

/// Everything that outlives a single pass over a document: the engine with
/// its installed units, the global configuration and the scope.
///
/// Variables defined in one pass stay visible to later passes until
/// [`Session::reset_scope`] is called.
#[derive(Debug, Clone, Default)]
pub struct Session {
	engine: Engine,
	config: GlobalConfig,
	scope: Scope,
}

impl Session {
	pub fn new(config: GlobalConfig) -> Self {
		let mut engine = Engine::new();
		engine.set_currencies(config.currency.is_truthy());

		Self {
			engine,
			config,
			scope: Scope::default(),
		}
	}

	pub fn engine(&self) -> &Engine {
		&self.engine
	}

	pub fn config(&self) -> &GlobalConfig {
		&self.config
	}

	pub fn set_config(&mut self, config: GlobalConfig) {
		self.engine.set_currencies(config.currency.is_truthy());
		self.config = config;
	}

	pub fn scope(&self) -> &Scope {
		&self.scope
	}

	pub fn reset_scope(&mut self) {
		self.scope = Scope::default();
	}

	/// Run a full pass over `text`.
	pub fn process(&mut self, text: &str) -> ProcessedDocument {
		let document = process_document(&self.engine, text, &self.config, self.scope.clone());
		self.scope = document.scope.clone();
		document
	}

	/// Run a full pass over already split lines.
	pub fn process_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> ProcessedDocument {
		let document = process_all(&self.engine, lines, &self.config, self.scope.clone());
		self.scope = document.scope.clone();
		document
	}

	/// Install `rates` as currency units. Nothing is installed when the
	/// `currency` setting is off.
	pub fn install_rates(&mut self, rates: &ExchangeRates) -> MathResult<usize> {
		if !self.config.currency.is_truthy() {
			debug!("currency support is disabled");
			return Ok(0);
		}

		install_currency_units(&mut self.engine, rates)
	}
}
