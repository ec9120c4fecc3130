use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Runs the latest scheduled task once nothing new has been scheduled for a
/// quiet period. Every call to [`Debouncer::schedule`] cancels the task
/// that is still waiting.
#[derive(Debug)]
pub struct Debouncer {
	handle: Handle,
	delay: Duration,
	pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
	pub fn new(handle: Handle, delay: Duration) -> Self {
		Self {
			handle,
			delay,
			pending: Mutex::new(None),
		}
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Run `task` after the quiet period. The returned handle resolves to
	/// `false` when the task was superseded before it started.
	pub fn schedule<F>(&self, task: F) -> JoinHandle<bool>
	where
		F: FnOnce() + Send + 'static,
	{
		let token = CancellationToken::new();
		if let Some(previous) = self.pending().replace(token.clone()) {
			previous.cancel();
		}

		let delay = self.delay;
		self.handle.spawn(async move {
			tokio::select! {
				() = token.cancelled() => {
					trace!("debounced task superseded");
					false
				}
				() = tokio::time::sleep(delay) => {
					task();
					true
				}
			}
		})
	}

	/// Drop the waiting task, if any.
	pub fn cancel(&self) {
		if let Some(token) = self.pending().take() {
			token.cancel();
		}
	}

	fn pending(&self) -> MutexGuard<'_, Option<CancellationToken>> {
		self.pending.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		self.cancel();
	}
}
