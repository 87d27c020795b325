//! Default values for the shared configuration.

use std::path::PathBuf;

/// Stock location of the Linux GPIO class tree.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Default hard deadline for claim, release, and readiness waits.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default existence-poll interval, one hundredth of the deadline.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// Default GPIO class root as an owned path (serde default hook).
#[must_use]
pub fn default_gpio_root() -> PathBuf {
    PathBuf::from(DEFAULT_GPIO_ROOT)
}

/// Default operation timeout in milliseconds (serde default hook).
#[must_use]
pub const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default poll interval in milliseconds (serde default hook).
#[must_use]
pub const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
