//! Single-shot waits on filesystem conditions.
//!
//! The pin-control interface offers no notification for claims or
//! releases, so "the line directory appeared" and "the line directory
//! disappeared" are observed by polling existence at a fixed interval
//! under a hard deadline. [`await_create`] and [`await_remove`] return
//! immediately with a [`FileWatch`] handle that resolves exactly once:
//! with success when the condition holds, or with
//! [`WatchError::Timeout`] when the deadline elapses first.
//!
//! The polling loop is deliberately the only waiting strategy here; a
//! platform readiness-notification mechanism could replace it without
//! changing the handle contract.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::sysfs;

/// Tracing target for watch operations.
const WATCH_TARGET: &str = "gpiofs::watch";

/// Errors delivered through a [`FileWatch`].
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watched condition was still unmet when the deadline passed.
    #[error("timed out after {timeout_ms} ms waiting on {path:?}")]
    Timeout {
        /// Path whose condition never held.
        path: PathBuf,
        /// Deadline that was exhausted, in milliseconds.
        timeout_ms: u64,
    },
    /// The poller stopped without delivering a verdict. Only reachable
    /// if the poller thread panicked.
    #[error("watch poller for {path:?} stopped without resolving")]
    Abandoned {
        /// Path the watch was observing.
        path: PathBuf,
    },
}

/// Single-shot handle for one filesystem condition.
///
/// Resolution is delivered over a one-slot channel, so the handle may
/// be held while other work proceeds and consumed with [`wait`] when
/// the caller is ready to block.
///
/// [`wait`]: FileWatch::wait
#[derive(Debug)]
pub struct FileWatch {
    path: PathBuf,
    receiver: mpsc::Receiver<Result<(), WatchError>>,
}

impl FileWatch {
    /// Blocks until the watch resolves and returns its verdict.
    pub fn wait(self) -> Result<(), WatchError> {
        self.receiver
            .recv()
            .unwrap_or(Err(WatchError::Abandoned { path: self.path }))
    }
}

/// Watches for a path to come into existence.
///
/// Never short-circuits: even a path that already exists is confirmed
/// by the poller's first probe, which runs immediately, so resolution
/// is still prompt without assuming the observation is stable.
pub fn await_create(path: &Path, timeout: Duration, poll_interval: Duration) -> FileWatch {
    spawn_poller(path.to_path_buf(), timeout, poll_interval, true)
}

/// Watches for a path to stop existing.
///
/// A path that is already absent resolves synchronously with success
/// and spawns no background work.
pub fn await_remove(path: &Path, timeout: Duration, poll_interval: Duration) -> FileWatch {
    if !sysfs::probe(path) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let _ = sender.send(Ok(()));
        return FileWatch {
            path: path.to_path_buf(),
            receiver,
        };
    }
    spawn_poller(path.to_path_buf(), timeout, poll_interval, false)
}

fn spawn_poller(
    path: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
    want_present: bool,
) -> FileWatch {
    let (sender, receiver) = mpsc::sync_channel(1);
    let watched = path.clone();
    thread::spawn(move || {
        let verdict = poll_until(&watched, timeout, poll_interval, want_present);
        let _ = sender.send(verdict);
    });
    FileWatch { path, receiver }
}

fn poll_until(
    path: &Path,
    timeout: Duration,
    poll_interval: Duration,
    want_present: bool,
) -> Result<(), WatchError> {
    let deadline = Instant::now() + timeout;
    loop {
        if sysfs::probe(path) == want_present {
            debug!(
                target: WATCH_TARGET,
                path = %path.display(),
                want_present,
                "watch condition satisfied"
            );
            return Ok(());
        }
        if Instant::now() >= deadline {
            debug!(
                target: WATCH_TARGET,
                path = %path.display(),
                want_present,
                timeout_ms = timeout.as_millis() as u64,
                "watch deadline exhausted"
            );
            return Err(WatchError::Timeout {
                path: path.to_path_buf(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(150);
    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn await_create_resolves_for_preexisting_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("present");
        fs::write(&path, "boo").expect("seed file");
        let started = Instant::now();
        await_create(&path, TIMEOUT, POLL).wait().expect("resolve");
        assert!(started.elapsed() < TIMEOUT);
    }

    #[test]
    fn await_create_resolves_after_delayed_creation() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("late");
        let watch = await_create(&path, Duration::from_secs(2), POLL);
        let writer = thread::spawn({
            let target = path.clone();
            move || {
                thread::sleep(Duration::from_millis(50));
                fs::write(&target, "boo").expect("write file");
            }
        });
        watch.wait().expect("resolve after creation");
        writer.join().expect("join writer");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "boo");
    }

    #[test]
    fn await_remove_on_absent_path_resolves_immediately() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("never-existed");
        let started = Instant::now();
        await_remove(&path, TIMEOUT, POLL).wait().expect("resolve");
        // Short-circuit path: no poller runs, so resolution beats even
        // a single poll interval.
        assert!(started.elapsed() < POLL);
    }

    #[test]
    fn await_remove_resolves_after_delayed_removal() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("doomed");
        fs::write(&path, "x").expect("seed file");
        let watch = await_remove(&path, Duration::from_secs(2), POLL);
        let remover = thread::spawn({
            let target = path.clone();
            move || {
                thread::sleep(Duration::from_millis(50));
                fs::remove_file(&target).expect("remove file");
            }
        });
        watch.wait().expect("resolve after removal");
        remover.join().expect("join remover");
    }

    #[rstest]
    #[case::create_never_appears(true)]
    #[case::remove_never_disappears(false)]
    fn unmet_condition_times_out_near_the_deadline(#[case] want_present: bool) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stuck");
        let watch = if want_present {
            await_create(&path, TIMEOUT, POLL)
        } else {
            fs::write(&path, "x").expect("seed file");
            await_remove(&path, TIMEOUT, POLL)
        };
        let started = Instant::now();
        let error = watch.wait().expect_err("deadline should pass");
        let elapsed = started.elapsed();
        let WatchError::Timeout { path: reported, timeout_ms } = error else {
            panic!("expected Timeout, got {error:?}");
        };
        assert_eq!(reported, path);
        assert_eq!(timeout_ms, TIMEOUT.as_millis() as u64);
        assert!(elapsed >= TIMEOUT, "resolved early after {elapsed:?}");
        // One poll interval of slack per the contract, plus scheduling
        // headroom so the assertion holds on loaded runners.
        assert!(
            elapsed < TIMEOUT + POLL + Duration::from_millis(100),
            "resolved late after {elapsed:?}"
        );
    }
}
