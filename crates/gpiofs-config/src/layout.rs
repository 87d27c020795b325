//! Derives the sysfs control-file paths shared by the port lifecycle
//! and its tests.
//!
//! The kernel exposes one claim file and one release file at the class
//! root, plus a per-line directory that exists exactly while the line
//! is claimed. Both sides of the crate need to agree on this layout, so
//! it is derived in one place from the configured root.

use std::path::{Path, PathBuf};

use crate::Config;

/// Class-level control files beneath the configured GPIO root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsLayout {
    root: PathBuf,
    export: PathBuf,
    unexport: PathBuf,
}

impl SysfsLayout {
    /// Derives the class-level paths from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let root = config.gpio_root.clone();
        Self {
            export: root.join("export"),
            unexport: root.join("unexport"),
            root,
        }
    }

    /// Root of the GPIO class tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// File a line index is written to when claiming the line.
    #[must_use]
    pub fn export_path(&self) -> &Path {
        self.export.as_path()
    }

    /// File a line index is written to when releasing the line.
    #[must_use]
    pub fn unexport_path(&self) -> &Path {
        self.unexport.as_path()
    }

    /// Control files for one line beneath this root.
    #[must_use]
    pub fn line_paths(&self, line: u32) -> LinePaths {
        let dir = self.root.join(format!("gpio{line}"));
        LinePaths {
            value: dir.join("value"),
            direction: dir.join("direction"),
            edge: dir.join("edge"),
            dir,
        }
    }
}

/// Per-line control files; the directory exists iff the line is claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePaths {
    dir: PathBuf,
    value: PathBuf,
    direction: PathBuf,
    edge: PathBuf,
}

impl LinePaths {
    /// Per-line directory whose existence signals the claim.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    /// Current value file, "0" or "1".
    #[must_use]
    pub fn value(&self) -> &Path {
        self.value.as_path()
    }

    /// Direction file holding one of the mode tokens.
    #[must_use]
    pub fn direction(&self) -> &Path {
        self.direction.as_path()
    }

    /// Edge-trigger configuration file.
    #[must_use]
    pub fn edge(&self) -> &Path {
        self.edge.as_path()
    }
}
