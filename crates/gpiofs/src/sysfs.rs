//! Thin helpers over the sysfs control files.
//!
//! Control files hold single short tokens and are rewritten whole on
//! every update, so plain `std::fs` reads and writes are sufficient.
//! The raw write variant keeps the `io::ErrorKind` visible for the
//! enable readiness heuristic, which must distinguish permissions
//! failures from everything else.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::GpioError;

/// Reports whether a path currently exists.
pub(crate) fn probe(path: &Path) -> bool {
    path.exists()
}

/// Reads a control file and trims the trailing newline the kernel
/// appends.
pub(crate) fn read_control(path: &Path) -> Result<String, GpioError> {
    fs::read_to_string(path)
        .map(|content| content.trim().to_owned())
        .map_err(|source| GpioError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes a single token to a control file.
pub(crate) fn write_control(path: &Path, token: &str) -> Result<(), GpioError> {
    write_raw(path, token).map_err(|source| GpioError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a token, preserving the raw I/O error for callers that
/// classify failure kinds.
pub(crate) fn write_raw(path: &Path, token: &str) -> io::Result<()> {
    fs::write(path, token)
}
