//! Shared configuration for the sysfs GPIO crates.
//!
//! The configuration carries the sysfs class root plus the two timing
//! tunables every lifecycle operation observes: the hard per-operation
//! timeout and the existence-poll interval. Both the port lifecycle and
//! its tests need to agree on the control-file layout beneath the root,
//! so the path derivation lives here as well, in [`SysfsLayout`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;
mod layout;

pub use defaults::{DEFAULT_GPIO_ROOT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use layout::{LinePaths, SysfsLayout};

/// Tunables shared by every GPIO port handle.
///
/// The defaults target the stock Linux layout with a two second
/// operation deadline polled at one hundredth of that interval. Tests
/// substitute a temporary root and much shorter intervals.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the GPIO class tree holding the claim and release files.
    #[serde(default = "defaults::default_gpio_root")]
    pub gpio_root: PathBuf,
    /// Hard deadline for claim, release, and readiness waits.
    #[serde(default = "defaults::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Interval between existence probes while waiting on the deadline.
    #[serde(default = "defaults::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpio_root: defaults::default_gpio_root(),
            timeout_ms: defaults::default_timeout_ms(),
            poll_interval_ms: defaults::default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Operation deadline as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks the configuration for values the lifecycle cannot honour.
    ///
    /// A relative root would silently depend on the process working
    /// directory, a zero poll interval would busy-spin, and a poll
    /// interval beyond the timeout could overshoot the deadline by a
    /// whole interval before the first re-probe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gpio_root.is_absolute() {
            return Err(ConfigError::RelativeRoot {
                path: self.gpio_root.clone(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.poll_interval_ms > self.timeout_ms {
            return Err(ConfigError::PollBeyondTimeout {
                poll_interval_ms: self.poll_interval_ms,
                timeout_ms: self.timeout_ms,
            });
        }
        Ok(())
    }
}

/// Errors raised while validating a [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The GPIO root must not depend on the process working directory.
    #[error("gpio root {path:?} is not an absolute path")]
    RelativeRoot {
        /// Offending root path.
        path: PathBuf,
    },
    /// A zero poll interval would turn every wait into a busy spin.
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    /// The poll interval may not exceed the operation timeout.
    #[error("poll interval {poll_interval_ms} ms exceeds timeout {timeout_ms} ms")]
    PollBeyondTimeout {
        /// Configured poll interval in milliseconds.
        poll_interval_ms: u64,
        /// Configured operation timeout in milliseconds.
        timeout_ms: u64,
    },
}
