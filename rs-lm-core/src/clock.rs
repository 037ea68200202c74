use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time, in milliseconds since the Unix epoch.
///
/// Generation measures its own latency through this trait so tests can
/// substitute a deterministic clock.
pub trait Clock: Send + Sync {
	/// Current time in milliseconds.
	fn now_millis(&self) -> u64;
}

/// System clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> u64 {
		match SystemTime::now().duration_since(UNIX_EPOCH) {
			Ok(elapsed) => elapsed.as_millis() as u64,
			Err(_) => 0, // Clock set before the epoch, should not happen
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn system_clock_does_not_go_backwards() {
		let clock = SystemClock;
		let first = clock.now_millis();
		let second = clock.now_millis();
		assert!(second >= first);
	}
}
