//! Fake GPIO controller harness for the integration tests.
//!
//! Animates a temporary sysfs tree the way the kernel side would: a
//! background thread services the claim and release files, creates and
//! removes line directories, and normalises direction writes (the
//! `high`/`low` tokens become `out` with the value seeded). Tokens
//! outside a control file's vocabulary are rolled back to the last
//! accepted content, as the kernel would have refused the write. The
//! thread also counts claim requests so tests can assert how many
//! times the claim file was actually written.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use gpiofs::Config;

const CONTROLLER_TICK: Duration = Duration::from_millis(5);

const DIRECTION_TOKENS: [&str; 4] = ["in", "out", "high", "low"];
const EDGE_TOKENS: [&str; 4] = ["none", "rising", "falling", "both"];

/// Temporary sysfs tree plus the controller thread animating it.
pub struct FakeController {
    root: TempDir,
    claims: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeController {
    /// Creates the tree, seeds the claim/release files, and starts the
    /// controller thread.
    pub fn spawn() -> Self {
        let root = TempDir::new().expect("create fake sysfs root");
        fs::write(root.path().join("export"), "").expect("seed claim file");
        fs::write(root.path().join("unexport"), "").expect("seed release file");
        let claims = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let dir = root.path().to_path_buf();
            let claims = Arc::clone(&claims);
            let shutdown = Arc::clone(&shutdown);
            move || controller_loop(&dir, &claims, &shutdown)
        });
        Self {
            root,
            claims,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Configuration pointing at this tree, with test-sized intervals.
    pub fn config(&self) -> Config {
        Config {
            gpio_root: self.root.path().to_path_buf(),
            timeout_ms: 1000,
            poll_interval_ms: 10,
        }
    }

    /// Number of claim requests the controller has serviced.
    pub fn claim_requests(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    /// Directory the controller maintains for one line.
    pub fn line_dir(&self, line: u32) -> PathBuf {
        self.root.path().join(format!("gpio{line}"))
    }
}

impl Drop for FakeController {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn controller_loop(root: &Path, claims: &AtomicUsize, shutdown: &AtomicBool) {
    let export = root.join("export");
    let unexport = root.join("unexport");
    let mut accepted: HashMap<PathBuf, String> = HashMap::new();
    let mut pending: HashMap<PathBuf, String> = HashMap::new();
    while !shutdown.load(Ordering::SeqCst) {
        if let Some(line) = take_request(&export) {
            claims.fetch_add(1, Ordering::SeqCst);
            create_line(root, line);
        }
        if let Some(line) = take_request(&unexport) {
            let _ = fs::remove_dir_all(root.join(format!("gpio{line}")));
        }
        normalise_lines(root, &mut accepted, &mut pending);
        thread::sleep(CONTROLLER_TICK);
    }
}

/// Reads a pending line index from a claim/release file and clears it.
fn take_request(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    let line = trimmed.parse().ok();
    let _ = fs::write(path, "");
    line
}

fn create_line(root: &Path, line: u32) {
    let dir = root.join(format!("gpio{line}"));
    let _ = fs::create_dir_all(&dir);
    let _ = fs::write(dir.join("value"), "0\n");
    let _ = fs::write(dir.join("direction"), "in\n");
    let _ = fs::write(dir.join("edge"), "none\n");
}

/// Applies the kernel's control-file write semantics after the fact:
/// `high`/`low` claims become `out` with the value seeded, and tokens
/// outside a file's vocabulary roll back to the last accepted content.
fn normalise_lines(
    root: &Path,
    accepted: &mut HashMap<PathBuf, String>,
    pending: &mut HashMap<PathBuf, String>,
) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let direction = dir.join("direction");
        match read_token(&direction).as_deref() {
            Some("high") => {
                pending.remove(&direction);
                let _ = fs::write(&direction, "out\n");
                let _ = fs::write(dir.join("value"), "1\n");
                accepted.insert(direction, "out\n".to_owned());
            }
            Some("low") => {
                pending.remove(&direction);
                let _ = fs::write(&direction, "out\n");
                let _ = fs::write(dir.join("value"), "0\n");
                accepted.insert(direction, "out\n".to_owned());
            }
            Some(token) if DIRECTION_TOKENS.contains(&token) => {
                pending.remove(&direction);
                accepted.insert(direction, format!("{token}\n"));
            }
            Some(observed) => restore(&direction, accepted, pending, "in\n", observed),
            None => {}
        }
        let edge = dir.join("edge");
        match read_token(&edge).as_deref() {
            Some(token) if EDGE_TOKENS.contains(&token) => {
                pending.remove(&edge);
                accepted.insert(edge, format!("{token}\n"));
            }
            Some(observed) => restore(&edge, accepted, pending, "none\n", observed),
            None => {}
        }
    }
}

fn read_token(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|content| content.trim().to_owned())
}

/// Puts back the last accepted token, or the seed value for a file the
/// controller has not yet recorded.
///
/// The rollback is debounced: it only fires once the same invalid
/// content has been observed on two consecutive ticks, and is skipped
/// if the file changed in the meantime. A transient bad read (a
/// concurrent `fs::write` caught between truncate and write looks like
/// an empty file, as does the readiness placeholder) must not let the
/// rollback clobber the valid token that lands moments later — the
/// kernel refuses a bad write without disturbing a subsequent good one.
fn restore(
    path: &Path,
    accepted: &HashMap<PathBuf, String>,
    pending: &mut HashMap<PathBuf, String>,
    seed: &str,
    observed: &str,
) {
    if pending.get(path).map(String::as_str) != Some(observed) {
        pending.insert(path.to_path_buf(), observed.to_owned());
        return;
    }
    pending.remove(path);
    if read_token(path).as_deref() != Some(observed) {
        return;
    }
    let token = accepted.get(path).map_or(seed, String::as_str);
    let _ = fs::write(path, token);
}

/// Polls a condition until it holds or the deadline passes.
pub fn eventually(mut condition: impl FnMut() -> bool, deadline: Duration) -> bool {
    let limit = Instant::now() + deadline;
    while Instant::now() < limit {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
