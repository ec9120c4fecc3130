//! Async boundaries between the processor and whatever hosts it: fetching
//! the global configuration and loading exchange rates.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::MathError;
use crate::MathResult;
use crate::config::GlobalConfig;
use crate::currency::ExchangeRates;
use crate::currency::RatesFormat;

/// Something that can answer a request for the session configuration.
pub trait ConfigSource {
	/// `Ok(None)` means the host is not ready yet and should be asked again.
	fn request_config(&mut self) -> impl Future<Output = MathResult<Option<GlobalConfig>>> + Send;
}

/// Something that can provide exchange rates.
pub trait RateSource {
	fn fetch_rates(&self) -> impl Future<Output = MathResult<ExchangeRates>> + Send;
}

/// Exponential backoff for [`request_global_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Wait before the first attempt. Doubles after every unanswered one.
	pub initial_delay: Duration,
	pub max_attempts: u32,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			initial_delay: Duration::from_millis(50),
			max_attempts: 8,
		}
	}
}

/// Ask `source` for the global configuration until it answers.
///
/// Each attempt waits first, since hosts are rarely ready right away. Fails
/// with [`MathError::ConfigTimeout`] once `policy.max_attempts` requests went
/// unanswered. Errors from the source are returned immediately.
pub async fn request_global_config<S: ConfigSource>(
	source: &mut S,
	policy: RetryPolicy,
) -> MathResult<GlobalConfig> {
	let mut delay = policy.initial_delay;

	for attempt in 1..=policy.max_attempts {
		tokio::time::sleep(delay).await;

		if let Some(config) = source.request_config().await? {
			debug!(attempt, "received global config");
			return Ok(config);
		}

		debug!(attempt, ?delay, "global config not ready");
		delay = delay.saturating_mul(2);
	}

	Err(MathError::ConfigTimeout {
		attempts: policy.max_attempts,
	})
}

/// Fetch rates from `source`. Failures are logged and yield
/// [`ExchangeRates::empty`], so currencies simply stay unavailable.
pub async fn load_exchange_rates<S: RateSource>(source: &S) -> ExchangeRates {
	match source.fetch_rates().await {
		Ok(rates) => {
			debug!(base = %rates.base, currencies = rates.rates.len(), "loaded exchange rates");
			rates
		}
		Err(error) => {
			warn!(%error, "failed to load exchange rates");
			ExchangeRates::empty()
		}
	}
}

/// Configuration that is available immediately.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource(pub GlobalConfig);

impl ConfigSource for StaticConfigSource {
	async fn request_config(&mut self) -> MathResult<Option<GlobalConfig>> {
		Ok(Some(self.0.clone()))
	}
}

/// Rates read from a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRateSource {
	pub path: PathBuf,
	/// Inferred from the extension, then the content, when `None`.
	pub format: Option<RatesFormat>,
}

impl FileRateSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			format: None,
		}
	}

	#[must_use]
	pub fn with_format(mut self, format: RatesFormat) -> Self {
		self.format = Some(format);
		self
	}
}

impl RateSource for FileRateSource {
	async fn fetch_rates(&self) -> MathResult<ExchangeRates> {
		ExchangeRates::load(&self.path, self.format)
	}
}
