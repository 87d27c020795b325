//! Process-wide table of per-line port handles.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use gpiofs_config::{Config, ConfigError, SysfsLayout};

use crate::port::Port;

/// Entry point owning the validated configuration and one [`Port`]
/// per line index.
///
/// Ports are constructed once per line and cached for the life of the
/// host, so every handle for a given line shares the same operation
/// lock and cancellation-hook registry. Claim/release cycles mutate
/// only that shared state, never the identity of the port.
#[derive(Debug)]
pub struct Gpio {
    config: Config,
    layout: SysfsLayout,
    ports: Mutex<HashMap<u32, Port>>,
}

impl Gpio {
    /// Validates the configuration and builds the host.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            layout: SysfsLayout::from_config(&config),
            config,
            ports: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the port handle for a line, creating it on first use.
    #[must_use]
    pub fn port(&self, line: u32) -> Port {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(line)
            .or_insert_with(|| Port::new(line, &self.layout, &self.config))
            .clone()
    }

    /// Configuration the host was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
