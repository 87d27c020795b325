//! Per-line claim/release lifecycle and control-file accessors.
//!
//! A [`Port`] owns the derived control-file paths for one line, an
//! exclusive operation lock, and the registry of cancellation hooks
//! held by its background streams. Every operation takes the lock for
//! its full duration, including the poll loops inside [`Port::enable`]
//! and [`Port::reset`], so two calls on the same line never interleave
//! control-file writes. The lock also orders stream cancellation ahead
//! of the release write: a reset triggers and drains every hook before
//! touching the release file, so no background writer can race a
//! release with a stale value write.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use strum::{Display, EnumString};
use tracing::{debug, info};

use gpiofs_config::{Config, LinePaths, SysfsLayout};

use crate::cancel::{CancelRegistry, CancelToken};
use crate::error::GpioError;
use crate::stream::{self, Event};
use crate::sysfs;
use crate::watch;

/// Tracing target for port lifecycle operations.
const PORT_TARGET: &str = "gpiofs::port";

/// Direction intent applied when configuring a line.
///
/// The two output-with-level variants claim the line as an output and
/// seed its value in the same direction write, which the kernel
/// performs glitch-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Mode {
    /// Configure the line as an input.
    #[strum(serialize = "in")]
    Input,
    /// Configure the line as an output without touching its level.
    #[strum(serialize = "out")]
    Output,
    /// Configure the line as an output driven low.
    #[strum(serialize = "low")]
    OutputLow,
    /// Configure the line as an output driven high.
    #[strum(serialize = "high")]
    OutputHigh,
}

/// Edge-trigger vocabulary accepted by the per-line edge file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Edge {
    /// No transitions are of interest.
    None,
    /// Rising transitions only.
    Rising,
    /// Falling transitions only.
    Falling,
    /// Both rising and falling transitions.
    Both,
}

/// Introspected state of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// The line directory is absent; the line is unclaimed.
    Released,
    /// The line is claimed, with its current direction and level.
    Claimed {
        /// Direction reported by the direction file.
        mode: Mode,
        /// Level reported by the value file.
        value: bool,
    },
}

impl fmt::Display for LineState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Released => formatter.write_str("released"),
            Self::Claimed { mode, value } => write!(formatter, "{mode} with value {value}"),
        }
    }
}

/// Handle for one GPIO line.
///
/// Cloning is cheap and every clone shares the same operation lock and
/// hook registry, so clones of one line's port still serialise against
/// each other. Ports are obtained from [`crate::Gpio`], which caches
/// one per line index for the life of the process.
#[derive(Debug, Clone)]
pub struct Port {
    line: u32,
    token: String,
    paths: LinePaths,
    export: PathBuf,
    unexport: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
    hooks: Arc<Mutex<CancelRegistry>>,
}

impl fmt::Display for Port {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.paths.dir().display())
    }
}

impl Port {
    pub(crate) fn new(line: u32, layout: &SysfsLayout, config: &Config) -> Self {
        Self {
            line,
            token: line.to_string(),
            paths: layout.line_paths(line),
            export: layout.export_path().to_path_buf(),
            unexport: layout.unexport_path().to_path_buf(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            hooks: Arc::new(Mutex::new(CancelRegistry::default())),
        }
    }

    /// Line index this port controls.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Reports whether the line is currently claimed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        let _guard = self.guard();
        sysfs::probe(self.paths.dir())
    }

    /// Claims the line and waits for its control files to become
    /// usable.
    ///
    /// A no-op success when the line is already claimed. Otherwise the
    /// line index is written to the claim file and the line directory
    /// is awaited under the operation timeout; the remaining budget
    /// then covers a readiness pass over the direction and edge files.
    /// The value file is deliberately not checked: an input line
    /// rejects value writes with a permissions-shaped error, which must
    /// not be misread as "not ready".
    pub fn enable(&self) -> Result<(), GpioError> {
        let _guard = self.guard();
        if sysfs::probe(self.paths.dir()) {
            return Ok(());
        }
        info!(target: PORT_TARGET, line = self.line, port = %self, "claiming line");
        sysfs::write_control(&self.export, &self.token)?;
        let started = Instant::now();
        watch::await_create(self.paths.dir(), self.timeout, self.poll_interval).wait()?;
        for path in [self.paths.direction(), self.paths.edge()] {
            self.await_control_ready(path, started)?;
        }
        info!(target: PORT_TARGET, line = self.line, port = %self, "line claimed");
        Ok(())
    }

    /// Polls one control file until it is present and writable or the
    /// remaining budget runs out.
    ///
    /// A placeholder write that succeeds, or fails with a
    /// permissions-shaped error, marks the file ready; any other
    /// failure means the controller has not finished populating it.
    fn await_control_ready(&self, path: &Path, started: Instant) -> Result<(), GpioError> {
        loop {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            debug!(
                target: PORT_TARGET,
                line = self.line,
                path = %path.display(),
                remaining_ms = remaining.as_millis() as u64,
                "checking control file readiness"
            );
            if sysfs::probe(path) {
                match sysfs::write_raw(path, " ") {
                    Ok(()) => return Ok(()),
                    Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                        return Ok(());
                    }
                    Err(error) => {
                        debug!(
                            target: PORT_TARGET,
                            line = self.line,
                            path = %path.display(),
                            %error,
                            "control file not yet writable"
                        );
                    }
                }
            }
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(GpioError::Timeout {
                    path: path.to_path_buf(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            thread::sleep(self.poll_interval.min(remaining));
        }
    }

    /// Releases the line after cancelling every background stream.
    ///
    /// A no-op success when the line is already released. Hooks are
    /// triggered and the registry drained before the release write, so
    /// no stream can write a stale value once the release is in
    /// flight. The line directory is then awaited out of existence
    /// under the operation timeout.
    pub fn reset(&self) -> Result<(), GpioError> {
        let mut registry = self.guard();
        if !sysfs::probe(self.paths.dir()) {
            return Ok(());
        }
        info!(target: PORT_TARGET, line = self.line, port = %self, "releasing line");
        registry.cancel_all();
        sysfs::write_control(&self.unexport, &self.token)?;
        watch::await_remove(self.paths.dir(), self.timeout, self.poll_interval).wait()?;
        info!(target: PORT_TARGET, line = self.line, port = %self, "line released");
        Ok(())
    }

    /// Writes the direction token for the requested mode.
    pub fn set_mode(&self, mode: Mode) -> Result<(), GpioError> {
        let _guard = self.guard();
        self.ensure_enabled()?;
        info!(target: PORT_TARGET, line = self.line, %mode, "setting direction");
        sysfs::write_control(self.paths.direction(), &mode.to_string())
    }

    /// Reports whether the line is configured as an output.
    pub fn is_output(&self) -> Result<bool, GpioError> {
        let _guard = self.guard();
        self.ensure_enabled()?;
        Ok(self.read_direction()? != Mode::Input)
    }

    /// Reads the current level of the line.
    pub fn value(&self) -> Result<bool, GpioError> {
        let _guard = self.guard();
        self.ensure_enabled()?;
        Ok(sysfs::read_control(self.paths.value())? == "1")
    }

    /// Drives the line to the requested level.
    pub fn set_value(&self, value: bool) -> Result<(), GpioError> {
        let _guard = self.guard();
        self.ensure_enabled()?;
        debug!(target: PORT_TARGET, line = self.line, value, "setting value");
        sysfs::write_control(self.paths.value(), level_token(value))
    }

    /// Introspects the line without mutating it.
    pub fn state(&self) -> Result<LineState, GpioError> {
        let _guard = self.guard();
        if !sysfs::probe(self.paths.dir()) {
            return Ok(LineState::Released);
        }
        let mode = self.read_direction()?;
        let value = sysfs::read_control(self.paths.value())? == "1";
        Ok(LineState::Claimed { mode, value })
    }

    /// Starts a background monitor emitting a timestamped [`Event`] on
    /// every observed value change.
    ///
    /// Requires the line to be claimed. The edge mode is set to
    /// [`Edge::Both`] first, then the monitor samples the value file
    /// once per poll interval into a bounded channel of `buffer`
    /// events. When the buffer is full, production blocks rather than
    /// drops; the sampling interval already rate-limits freshness.
    /// The channel closes when the consumer hangs up, the value file
    /// becomes unreadable, or the line is reset, and a reset is
    /// observed within one poll tick.
    pub fn values(&self, buffer: usize) -> Result<Receiver<Event>, GpioError> {
        let mut registry = self.guard();
        self.ensure_enabled()?;
        info!(target: PORT_TARGET, line = self.line, buffer, "starting value monitor");
        sysfs::write_control(self.paths.edge(), &Edge::Both.to_string())?;
        let hook = registry.register();
        Ok(stream::spawn_value_monitor(self.clone(), buffer, hook))
    }

    /// Starts a background feeder applying each value received on
    /// `source` to the line.
    ///
    /// Requires the line to be claimed. The feeder stops on the first
    /// write failure, surfacing it once on the returned one-slot
    /// channel, and also stops on source closure or when the line is
    /// reset. A stopped feeder never resumes.
    pub fn set_values(&self, source: Receiver<bool>) -> Result<Receiver<GpioError>, GpioError> {
        let mut registry = self.guard();
        self.ensure_enabled()?;
        info!(target: PORT_TARGET, line = self.line, "starting value feeder");
        let hook = registry.register();
        Ok(stream::spawn_value_feeder(self.clone(), source, hook))
    }

    /// Applies one stream value under the operation lock.
    ///
    /// Re-checks the hook after acquiring the lock: a reset triggers
    /// hooks before its release write while holding this same lock, so
    /// a feeder that was queued behind the reset observes the
    /// cancellation here instead of writing to a released line.
    /// Returns `Ok(false)` when cancelled.
    pub(crate) fn apply_stream_value(
        &self,
        value: bool,
        hook: &CancelToken,
    ) -> Result<bool, GpioError> {
        let _guard = self.guard();
        if hook.is_cancelled() {
            return Ok(false);
        }
        self.ensure_enabled()?;
        debug!(target: PORT_TARGET, line = self.line, value, "applying stream value");
        sysfs::write_control(self.paths.value(), level_token(value))?;
        Ok(true)
    }

    pub(crate) fn deregister_hook(&self, id: u64) {
        self.guard().deregister(id);
    }

    pub(crate) fn value_path(&self) -> &Path {
        self.paths.value()
    }

    pub(crate) const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[cfg(test)]
    pub(crate) fn shares_state(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hooks, &other.hooks)
    }

    fn read_direction(&self) -> Result<Mode, GpioError> {
        let raw = sysfs::read_control(self.paths.direction())?;
        Mode::from_str(&raw).map_err(|_| GpioError::InvalidMode {
            token: raw,
            path: self.paths.direction().to_path_buf(),
        })
    }

    fn ensure_enabled(&self) -> Result<(), GpioError> {
        if sysfs::probe(self.paths.dir()) {
            Ok(())
        } else {
            Err(GpioError::NotEnabled { line: self.line })
        }
    }

    /// Takes the operation lock, recovering the registry from a
    /// poisoned mutex; the guarded state stays consistent across a
    /// panicking holder.
    fn guard(&self) -> MutexGuard<'_, CancelRegistry> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const fn level_token(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
